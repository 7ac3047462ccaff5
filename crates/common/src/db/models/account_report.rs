//! Account report entity
//!
//! One record per case-number + reporting-month pair. `version_number`
//! starts at 1 and advances only on an audited status transition, so it
//! always matches the number of ledger entries owned by the row.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Compliance status of a monthly account report
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    Regular,
    Irregular,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Regular => "REGULAR",
            ReportStatus::Irregular => "IRREGULAR",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "REGULAR" => Some(ReportStatus::Regular),
            "IRREGULAR" => Some(ReportStatus::Irregular),
            _ => None,
        }
    }
}

impl From<ReportStatus> for String {
    fn from(status: ReportStatus) -> Self {
        status.as_str().to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "account_reports")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub process_number: String,

    #[sea_orm(column_type = "Text")]
    pub interested_party: String,

    /// Reporting month at YYYY-MM granularity
    #[sea_orm(column_type = "Text")]
    pub month: String,

    /// REGULAR or IRREGULAR
    #[sea_orm(column_type = "Text")]
    pub status: String,

    /// Populated if and only if status is IRREGULAR
    #[sea_orm(column_type = "Text", nullable)]
    pub reason: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,

    pub entry_date: Date,

    pub exit_date: Option<Date>,

    #[sea_orm(column_type = "Text", nullable)]
    pub external_link: Option<String>,

    /// Monotonic, starts at 1 on creation
    pub version_number: i32,

    pub created_by: Uuid,

    pub updated_by: Uuid,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Get the status as an enum
    pub fn report_status(&self) -> ReportStatus {
        ReportStatus::parse(&self.status).unwrap_or(ReportStatus::Regular)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::audit_entry::Entity")]
    AuditEntries,
}

impl Related<super::audit_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AuditEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
