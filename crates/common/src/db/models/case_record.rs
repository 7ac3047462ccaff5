//! Case record entity
//!
//! One row per movement of a case file. A case `number` may own many rows;
//! the current state of a case is the row with the most recent entry date
//! (or exit date, whichever is later) among rows sharing that number.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "case_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Stable case number, shared by every movement row of the same case
    #[sea_orm(column_type = "Text")]
    pub number: String,

    /// Categorical origin of the case
    #[sea_orm(column_type = "Text")]
    pub origin_code: String,

    pub entry_date: Date,

    #[sea_orm(column_type = "Text", nullable)]
    pub current_location: Option<String>,

    pub exit_date: Option<Date>,

    pub return_deadline: Option<Date>,

    pub urgent: bool,

    #[sea_orm(column_type = "Text")]
    pub subject: String,

    #[sea_orm(column_type = "Text")]
    pub interested_party: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub external_link: Option<String>,

    pub created_by: Uuid,

    pub updated_by: Uuid,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Date this movement was last touched: the later of entry and exit
    pub fn movement_date(&self) -> Date {
        match self.exit_date {
            Some(exit) if exit > self.entry_date => exit,
            _ => self.entry_date,
        }
    }

    /// Whether the return deadline has passed relative to the given date
    pub fn is_overdue_as_of(&self, date: Date) -> bool {
        self.return_deadline.map(|d| d < date).unwrap_or(false)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
