//! SeaORM entity models
//!
//! Database entities for ProControl

mod account_report;
mod audit_entry;
mod case_record;

pub use case_record::{
    Entity as CaseRecordEntity,
    Model as CaseRecord,
    ActiveModel as CaseRecordActiveModel,
    Column as CaseRecordColumn,
};

pub use account_report::{
    Entity as AccountReportEntity,
    Model as AccountReport,
    ActiveModel as AccountReportActiveModel,
    Column as AccountReportColumn,
    ReportStatus,
};

pub use audit_entry::{
    Entity as AuditEntryEntity,
    Model as AuditEntry,
    ActiveModel as AuditEntryActiveModel,
    Column as AuditEntryColumn,
};
