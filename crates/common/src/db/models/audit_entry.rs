//! Audit entry entity
//!
//! Immutable record of one status transition of an account report.
//! Rows are append-only; `previous_status` is null only on the creation
//! entry. Deleting an account report does not cascade here, so orphaned
//! entries stay independently queryable.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "audit_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owning account report
    pub report_id: Uuid,

    /// Report version at the time of this transition
    pub version_number: i32,

    /// None on the creation entry
    #[sea_orm(column_type = "Text", nullable)]
    pub previous_status: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub new_status: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub previous_reason: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub new_reason: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub description: String,

    pub changed_by: Uuid,

    #[sea_orm(column_type = "Text")]
    pub changed_by_name: String,

    pub changed_at: DateTimeWithTimeZone,
}

impl Model {
    /// Whether this is the creation entry of its report
    pub fn is_creation(&self) -> bool {
        self.previous_status.is_none()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::account_report::Entity",
        from = "Column::ReportId",
        to = "super::account_report::Column::Id"
    )]
    AccountReport,
}

impl Related<super::account_report::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AccountReport.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
