//! ProControl Common Library
//!
//! Shared code for the ProControl services including:
//! - Database entities and repository patterns
//! - Priority query engine for case-record listings
//! - Status audit ledger for account reports
//! - Error types and handling
//! - Configuration management
//! - Principal extraction
//! - Metrics and observability

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod ledger;
pub mod metrics;
pub mod query;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::Repository;
pub use errors::{AppError, Result};
pub use ledger::StatusLedger;
pub use query::PriorityQueryEngine;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
