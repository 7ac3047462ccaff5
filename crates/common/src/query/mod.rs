//! Priority query engine for case-record listings
//!
//! Retrieves one page of case records matching a filter specification,
//! honoring the requested sort order while always surfacing urgent-flagged
//! rows ahead of non-urgent ones. The engine runs a two-phase retrieval
//! against the [`CaseStore`]: the urgent subset is counted first, the page
//! window is split across the urgent/non-urgent boundary, and the total
//! count is computed once per request so pagination math never drifts.
//!
//! The store interface only offers single-predicate filtered reads and
//! counts, which is what forces the two-phase split instead of one query
//! with a compound `urgent DESC, <field>` ordering.

use crate::db::models::CaseRecord;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Filter specification over case records, minus the urgency condition
/// (urgency is applied by the engine itself, one class per phase).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CaseFilter {
    /// Substring match over number, interested party and subject
    #[serde(default)]
    pub search_term: Option<String>,

    /// Exact match on the categorical origin
    #[serde(default)]
    pub origin: Option<String>,

    /// Substring match on the current location
    #[serde(default)]
    pub location: Option<String>,

    #[serde(default)]
    pub entry_date_start: Option<NaiveDate>,

    #[serde(default)]
    pub entry_date_end: Option<NaiveDate>,

    /// Only rows with no current location
    #[serde(default)]
    pub empty_location: bool,

    /// Only rows that have not exited yet
    #[serde(default)]
    pub no_exit_date: bool,

    /// Only rows whose return deadline passed before this date
    #[serde(default)]
    pub overdue_as_of: Option<NaiveDate>,
}

/// Sortable fields of a case record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    EntryDate,
    ReturnDeadline,
    UpdatedAt,
    Number,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Sort directive; ties are broken by row id for a stable total order
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct CaseSort {
    pub field: SortField,
    pub order: SortOrder,
}

impl Default for CaseSort {
    fn default() -> Self {
        Self {
            field: SortField::EntryDate,
            order: SortOrder::Desc,
        }
    }
}

/// One page request over the case-record collection
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CaseQuery {
    /// 1-based page number
    pub page: u64,

    pub page_size: u64,

    #[serde(default)]
    pub filter: CaseFilter,

    #[serde(default)]
    pub sort: CaseSort,

    /// Collapse to the newest movement per case number before pagination,
    /// so the rendered view and `total_count` agree
    #[serde(default)]
    pub latest_only: bool,
}

impl CaseQuery {
    /// Absolute offset of the first row of the requested page
    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.page_size
    }

    /// Reject malformed pagination parameters before touching the store
    pub fn validate(&self) -> Result<()> {
        if self.page < 1 {
            return Err(AppError::Validation {
                message: "page must be >= 1".into(),
                field: Some("page".into()),
            });
        }
        if self.page_size < 1 {
            return Err(AppError::Validation {
                message: "page_size must be >= 1".into(),
                field: Some("page_size".into()),
            });
        }
        if let (Some(start), Some(end)) = (self.filter.entry_date_start, self.filter.entry_date_end) {
            if start > end {
                return Err(AppError::Validation {
                    message: "entry_date_start is after entry_date_end".into(),
                    field: Some("entry_date_start".into()),
                });
            }
        }
        Ok(())
    }
}

/// Urgency class a store read is restricted to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    Urgent,
    NonUrgent,
}

/// One page of results with the pagination-stable total
#[derive(Debug, Clone, Serialize)]
pub struct CasePage {
    pub rows: Vec<CaseRecord>,
    pub total_count: u64,
}

/// Abstract record store consumed by the engine: filtered, sorted,
/// range-limited reads and counts, each restricted to one urgency class.
#[async_trait]
pub trait CaseStore: Send + Sync {
    async fn fetch_cases(
        &self,
        filter: &CaseFilter,
        urgency: Urgency,
        sort: CaseSort,
        latest_only: bool,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<CaseRecord>>;

    async fn count_cases(
        &self,
        filter: &CaseFilter,
        urgency: Urgency,
        latest_only: bool,
    ) -> Result<u64>;
}

/// How one page window splits across the urgent/non-urgent boundary.
/// Each side is an `(offset, limit)` pair into its own ordered subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSplit {
    pub urgent: Option<(u64, u64)>,
    pub non_urgent: Option<(u64, u64)>,
}

impl PageSplit {
    /// Split the absolute window `[offset, offset + page_size)` given the
    /// total number of urgent rows preceding all non-urgent rows.
    pub fn compute(offset: u64, page_size: u64, urgent_total: u64) -> Self {
        let urgent = if offset < urgent_total {
            Some((offset, page_size.min(urgent_total - offset)))
        } else {
            None
        };

        let urgent_len = urgent.map(|(_, len)| len).unwrap_or(0);
        let remaining = page_size - urgent_len;

        let non_urgent = if remaining > 0 {
            Some((offset.saturating_sub(urgent_total), remaining))
        } else {
            None
        };

        Self { urgent, non_urgent }
    }
}

/// Two-phase priority retrieval over a [`CaseStore`]
///
/// Read-only and idempotent for fixed inputs at a fixed point in time.
/// Store failures propagate unchanged; no retry is performed here.
pub struct PriorityQueryEngine<S> {
    store: S,
}

impl<S: CaseStore> PriorityQueryEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Execute one page request
    pub async fn run(&self, query: &CaseQuery) -> Result<CasePage> {
        query.validate()?;

        // Both counts are taken once per request so total_count cannot
        // drift between the urgent and non-urgent phases.
        let urgent_total = self
            .store
            .count_cases(&query.filter, Urgency::Urgent, query.latest_only)
            .await?;
        let non_urgent_total = self
            .store
            .count_cases(&query.filter, Urgency::NonUrgent, query.latest_only)
            .await?;
        let total_count = urgent_total + non_urgent_total;

        let split = PageSplit::compute(query.offset(), query.page_size, urgent_total);

        let mut rows = Vec::with_capacity(query.page_size as usize);

        if let Some((offset, limit)) = split.urgent {
            rows.extend(
                self.store
                    .fetch_cases(
                        &query.filter,
                        Urgency::Urgent,
                        query.sort,
                        query.latest_only,
                        offset,
                        limit,
                    )
                    .await?,
            );
        }

        if let Some((offset, limit)) = split.non_urgent {
            rows.extend(
                self.store
                    .fetch_cases(
                        &query.filter,
                        Urgency::NonUrgent,
                        query.sort,
                        query.latest_only,
                        offset,
                        limit,
                    )
                    .await?,
            );
        }

        Ok(CasePage { rows, total_count })
    }
}
