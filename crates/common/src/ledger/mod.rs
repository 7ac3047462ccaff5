//! Status audit ledger for account reports
//!
//! Guarantees that every status or reason change to an account report is
//! durably, append-only recorded, and that "status as of now" and "history
//! of status" never contradict each other. The chain of entries for one
//! report, read oldest-first, exactly reconstructs the sequence of
//! `(status, reason)` pairs the report held over time.
//!
//! Version contract: `version_number` advances only on an audited
//! transition. A notes-only edit rewrites the row but keeps the version,
//! so the version always equals the number of ledger entries.

use crate::auth::Principal;
use crate::db::models::{AccountReport, AuditEntry, ReportStatus};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use regex_lite::Regex;
use serde::Deserialize;
use std::sync::OnceLock;
use uuid::Uuid;

/// Reporting-month format check (`YYYY-MM`)
fn month_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{4}-(0[1-9]|1[0-2])$").unwrap())
}

/// Caller-supplied fields for creating or updating an account report
#[derive(Debug, Clone, Deserialize)]
pub struct ReportDraft {
    pub process_number: String,

    pub interested_party: String,

    /// Reporting month, `YYYY-MM`
    pub month: String,

    pub status: ReportStatus,

    /// Required when status is IRREGULAR, dropped otherwise
    #[serde(default)]
    pub reason: Option<String>,

    #[serde(default)]
    pub notes: Option<String>,

    pub entry_date: NaiveDate,

    #[serde(default)]
    pub exit_date: Option<NaiveDate>,

    #[serde(default)]
    pub external_link: Option<String>,
}

impl ReportDraft {
    /// Check invariants before any store mutation is attempted
    pub fn validate(&self) -> Result<()> {
        if self.process_number.trim().is_empty() {
            return Err(AppError::MissingField {
                field: "process_number".into(),
            });
        }
        if !month_pattern().is_match(&self.month) {
            return Err(AppError::InvalidFormat {
                message: format!("month must be YYYY-MM, got '{}'", self.month),
            });
        }
        if self.status == ReportStatus::Irregular
            && self.reason.as_deref().map(str::trim).unwrap_or("").is_empty()
        {
            return Err(AppError::Validation {
                message: "reason is required when status is IRREGULAR".into(),
                field: Some("reason".into()),
            });
        }
        Ok(())
    }

    /// Reason normalized to the invariant: populated iff IRREGULAR
    fn normalized_reason(&self) -> Option<String> {
        match self.status {
            ReportStatus::Irregular => self.reason.clone(),
            ReportStatus::Regular => None,
        }
    }
}

/// Abstract record store for account reports and their audit entries.
///
/// The combined write operations default to sequencing the row write and
/// the ledger append, surfacing an append failure as [`AppError::PartialWrite`]
/// so callers never silently lose a transition. Backends with transaction
/// support override them with a single atomic unit.
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn find_report(&self, id: Uuid) -> Result<Option<AccountReport>>;

    async fn reports_by_process_number(&self, process_number: &str) -> Result<Vec<AccountReport>>;

    async fn insert_report(&self, report: &AccountReport) -> Result<()>;

    async fn update_report(&self, report: &AccountReport) -> Result<()>;

    async fn delete_report(&self, id: Uuid) -> Result<bool>;

    async fn append_entry(&self, entry: &AuditEntry) -> Result<()>;

    async fn delete_entry(&self, id: Uuid) -> Result<bool>;

    /// Entries for one report, newest first
    async fn entries_by_report(&self, report_id: Uuid) -> Result<Vec<AuditEntry>>;

    async fn insert_report_with_entry(
        &self,
        report: &AccountReport,
        entry: &AuditEntry,
    ) -> Result<()> {
        self.insert_report(report).await?;
        self.append_entry(entry).await.map_err(|e| {
            crate::metrics::record_partial_write();
            AppError::PartialWrite {
                report_id: report.id.to_string(),
                message: e.to_string(),
            }
        })
    }

    async fn update_report_with_entry(
        &self,
        report: &AccountReport,
        entry: &AuditEntry,
    ) -> Result<()> {
        self.update_report(report).await?;
        self.append_entry(entry).await.map_err(|e| {
            crate::metrics::record_partial_write();
            AppError::PartialWrite {
                report_id: report.id.to_string(),
                message: e.to_string(),
            }
        })
    }
}

/// Append-only status history over a [`ReportStore`]
pub struct StatusLedger<S> {
    store: S,
}

impl<S: ReportStore> StatusLedger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Insert a new report at version 1 and its creation entry
    pub async fn create(&self, draft: &ReportDraft, principal: &Principal) -> Result<AccountReport> {
        draft.validate()?;

        let now = Utc::now();
        let reason = draft.normalized_reason();
        let report = AccountReport {
            id: Uuid::new_v4(),
            process_number: draft.process_number.clone(),
            interested_party: draft.interested_party.clone(),
            month: draft.month.clone(),
            status: draft.status.as_str().to_string(),
            reason: reason.clone(),
            notes: draft.notes.clone(),
            entry_date: draft.entry_date,
            exit_date: draft.exit_date,
            external_link: draft.external_link.clone(),
            version_number: 1,
            created_by: principal.actor_id,
            updated_by: principal.actor_id,
            created_at: now.into(),
            updated_at: now.into(),
        };

        let entry = AuditEntry {
            id: Uuid::new_v4(),
            report_id: report.id,
            version_number: 1,
            previous_status: None,
            new_status: report.status.clone(),
            previous_reason: None,
            new_reason: reason,
            description: format!("created with status {}", report.status),
            changed_by: principal.actor_id,
            changed_by_name: principal.actor_name.clone(),
            changed_at: now.into(),
        };

        self.store.insert_report_with_entry(&report, &entry).await?;

        tracing::info!(
            report_id = %report.id,
            process_number = %report.process_number,
            month = %report.month,
            status = %report.status,
            "Account report created"
        );

        Ok(report)
    }

    /// Rewrite an existing report; append a ledger entry only when the
    /// `(status, reason)` pair actually changed
    pub async fn update(
        &self,
        id: Uuid,
        draft: &ReportDraft,
        principal: &Principal,
    ) -> Result<AccountReport> {
        draft.validate()?;

        let prior = self
            .store
            .find_report(id)
            .await?
            .ok_or_else(|| AppError::Conflict {
                message: format!("account report {} no longer exists", id),
            })?;

        let new_status = draft.status.as_str().to_string();
        let new_reason = draft.normalized_reason();
        let changed = prior.status != new_status || prior.reason != new_reason;

        let version = if changed {
            prior.version_number + 1
        } else {
            prior.version_number
        };

        let now = Utc::now();
        let report = AccountReport {
            id,
            process_number: draft.process_number.clone(),
            interested_party: draft.interested_party.clone(),
            month: draft.month.clone(),
            status: new_status.clone(),
            reason: new_reason.clone(),
            notes: draft.notes.clone(),
            entry_date: draft.entry_date,
            exit_date: draft.exit_date,
            external_link: draft.external_link.clone(),
            version_number: version,
            created_by: prior.created_by,
            updated_by: principal.actor_id,
            created_at: prior.created_at,
            updated_at: now.into(),
        };

        if changed {
            let entry = AuditEntry {
                id: Uuid::new_v4(),
                report_id: id,
                version_number: version,
                previous_status: Some(prior.status.clone()),
                new_status: new_status.clone(),
                previous_reason: prior.reason.clone(),
                new_reason: new_reason.clone(),
                description: describe_transition(&prior.status, &new_status, new_reason.as_deref()),
                changed_by: principal.actor_id,
                changed_by_name: principal.actor_name.clone(),
                changed_at: now.into(),
            };
            self.store.update_report_with_entry(&report, &entry).await?;

            tracing::info!(
                report_id = %id,
                version = version,
                previous_status = %prior.status,
                new_status = %new_status,
                "Account report status transition recorded"
            );
        } else {
            self.store.update_report(&report).await?;
        }

        Ok(report)
    }

    /// Remove the report row; its ledger history stays queryable
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        if !self.store.delete_report(id).await? {
            return Err(AppError::ReportNotFound { id: id.to_string() });
        }
        Ok(())
    }

    /// Remove a single mis-logged entry; sibling versions are not renumbered
    pub async fn delete_entry(&self, entry_id: Uuid) -> Result<()> {
        if !self.store.delete_entry(entry_id).await? {
            return Err(AppError::EntryNotFound {
                id: entry_id.to_string(),
            });
        }
        Ok(())
    }

    /// History of one report, newest first
    pub async fn entries_for_report(&self, report_id: Uuid) -> Result<Vec<AuditEntry>> {
        self.store.entries_by_report(report_id).await
    }

    /// Union of histories across every report row sharing the process
    /// number, newest first
    pub async fn entries_for_process(&self, process_number: &str) -> Result<Vec<AuditEntry>> {
        let reports = self.store.reports_by_process_number(process_number).await?;

        let mut entries = Vec::new();
        for report in &reports {
            entries.extend(self.store.entries_by_report(report.id).await?);
        }
        entries.sort_by(|a, b| b.changed_at.cmp(&a.changed_at));
        Ok(entries)
    }
}

/// Human-readable description of a status or reason change
fn describe_transition(previous: &str, new: &str, new_reason: Option<&str>) -> String {
    if previous == new {
        match new_reason {
            Some(reason) => format!("reason updated to '{}'", reason),
            None => "reason cleared".to_string(),
        }
    } else {
        match new_reason {
            Some(reason) => format!(
                "status changed from {} to {} (reason: {})",
                previous, new, reason
            ),
            None => format!("status changed from {} to {}", previous, new),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryReportStore {
        reports: Mutex<Vec<AccountReport>>,
        entries: Mutex<Vec<AuditEntry>>,
        fail_append: bool,
    }

    #[async_trait]
    impl ReportStore for MemoryReportStore {
        async fn find_report(&self, id: Uuid) -> Result<Option<AccountReport>> {
            Ok(self
                .reports
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.id == id)
                .cloned())
        }

        async fn reports_by_process_number(
            &self,
            process_number: &str,
        ) -> Result<Vec<AccountReport>> {
            Ok(self
                .reports
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.process_number == process_number)
                .cloned()
                .collect())
        }

        async fn insert_report(&self, report: &AccountReport) -> Result<()> {
            self.reports.lock().unwrap().push(report.clone());
            Ok(())
        }

        async fn update_report(&self, report: &AccountReport) -> Result<()> {
            let mut reports = self.reports.lock().unwrap();
            match reports.iter_mut().find(|r| r.id == report.id) {
                Some(existing) => {
                    *existing = report.clone();
                    Ok(())
                }
                None => Err(AppError::Conflict {
                    message: format!("account report {} no longer exists", report.id),
                }),
            }
        }

        async fn delete_report(&self, id: Uuid) -> Result<bool> {
            let mut reports = self.reports.lock().unwrap();
            let before = reports.len();
            reports.retain(|r| r.id != id);
            Ok(reports.len() < before)
        }

        async fn append_entry(&self, entry: &AuditEntry) -> Result<()> {
            if self.fail_append {
                return Err(AppError::StoreUnavailable {
                    message: "audit insert failed".into(),
                });
            }
            self.entries.lock().unwrap().push(entry.clone());
            Ok(())
        }

        async fn delete_entry(&self, id: Uuid) -> Result<bool> {
            let mut entries = self.entries.lock().unwrap();
            let before = entries.len();
            entries.retain(|e| e.id != id);
            Ok(entries.len() < before)
        }

        async fn entries_by_report(&self, report_id: Uuid) -> Result<Vec<AuditEntry>> {
            let mut entries: Vec<AuditEntry> = self
                .entries
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.report_id == report_id)
                .cloned()
                .collect();
            entries.sort_by(|a, b| b.changed_at.cmp(&a.changed_at));
            Ok(entries)
        }
    }

    fn principal() -> Principal {
        Principal::new(Uuid::new_v4(), "Maria Silva")
    }

    fn draft(status: ReportStatus, reason: Option<&str>) -> ReportDraft {
        ReportDraft {
            process_number: "123/2024".into(),
            interested_party: "Prefeitura Municipal".into(),
            month: "2024-01".into(),
            status,
            reason: reason.map(String::from),
            notes: None,
            entry_date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            exit_date: None,
            external_link: None,
        }
    }

    #[tokio::test]
    async fn test_create_yields_one_creation_entry() {
        let ledger = StatusLedger::new(MemoryReportStore::default());
        let actor = principal();

        let report = ledger
            .create(&draft(ReportStatus::Regular, None), &actor)
            .await
            .unwrap();

        assert_eq!(report.version_number, 1);
        assert_eq!(report.status, "REGULAR");

        let entries = ledger.entries_for_report(report.id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].is_creation());
        assert_eq!(entries[0].new_status, "REGULAR");
        assert_eq!(entries[0].version_number, 1);
        assert_eq!(entries[0].changed_by_name, "Maria Silva");
        assert_eq!(entries[0].description, "created with status REGULAR");
    }

    #[tokio::test]
    async fn test_status_transition_appends_and_bumps_version() {
        let ledger = StatusLedger::new(MemoryReportStore::default());
        let actor = principal();

        let report = ledger
            .create(&draft(ReportStatus::Regular, None), &actor)
            .await
            .unwrap();

        let updated = ledger
            .update(
                report.id,
                &draft(ReportStatus::Irregular, Some("missing receipts")),
                &actor,
            )
            .await
            .unwrap();

        assert_eq!(updated.version_number, 2);
        assert_eq!(updated.status, "IRREGULAR");
        assert_eq!(updated.reason.as_deref(), Some("missing receipts"));

        let entries = ledger.entries_for_report(report.id).await.unwrap();
        assert_eq!(entries.len(), 2);
        // Newest first
        assert_eq!(entries[0].previous_status.as_deref(), Some("REGULAR"));
        assert_eq!(entries[0].new_status, "IRREGULAR");
        assert_eq!(entries[0].new_reason.as_deref(), Some("missing receipts"));
        assert_eq!(entries[0].version_number, 2);
        assert!(entries[1].is_creation());
    }

    #[tokio::test]
    async fn test_notes_only_update_keeps_version_and_ledger() {
        let ledger = StatusLedger::new(MemoryReportStore::default());
        let actor = principal();

        let report = ledger
            .create(&draft(ReportStatus::Regular, None), &actor)
            .await
            .unwrap();

        let mut notes_edit = draft(ReportStatus::Regular, None);
        notes_edit.notes = Some("delivered to the coordination office".into());
        let updated = ledger.update(report.id, &notes_edit, &actor).await.unwrap();

        // Version tracks audited transitions, not row rewrites
        assert_eq!(updated.version_number, 1);
        assert_eq!(
            updated.notes.as_deref(),
            Some("delivered to the coordination office")
        );
        assert_eq!(
            ledger.entries_for_report(report.id).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_reason_change_alone_is_audited() {
        let ledger = StatusLedger::new(MemoryReportStore::default());
        let actor = principal();

        let report = ledger
            .create(&draft(ReportStatus::Irregular, Some("missing receipts")), &actor)
            .await
            .unwrap();

        let updated = ledger
            .update(
                report.id,
                &draft(ReportStatus::Irregular, Some("late filing")),
                &actor,
            )
            .await
            .unwrap();

        assert_eq!(updated.version_number, 2);
        let entries = ledger.entries_for_report(report.id).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].previous_reason.as_deref(), Some("missing receipts"));
        assert_eq!(entries[0].new_reason.as_deref(), Some("late filing"));
        assert_eq!(entries[0].description, "reason updated to 'late filing'");
    }

    #[tokio::test]
    async fn test_irregular_without_reason_fails_before_write() {
        let store = MemoryReportStore::default();
        let ledger = StatusLedger::new(store);
        let actor = principal();

        let err = ledger
            .create(&draft(ReportStatus::Irregular, None), &actor)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        // Nothing was persisted
        assert!(ledger
            .store
            .reports_by_process_number("123/2024")
            .await
            .unwrap()
            .is_empty());

        // Blank reason is as invalid as a missing one
        let err = ledger
            .create(&draft(ReportStatus::Irregular, Some("   ")), &actor)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_regular_status_drops_stale_reason() {
        let ledger = StatusLedger::new(MemoryReportStore::default());
        let actor = principal();

        let report = ledger
            .create(&draft(ReportStatus::Irregular, Some("missing receipts")), &actor)
            .await
            .unwrap();

        // Caller echoes the old reason back with the REGULAR status
        let updated = ledger
            .update(
                report.id,
                &draft(ReportStatus::Regular, Some("missing receipts")),
                &actor,
            )
            .await
            .unwrap();

        assert_eq!(updated.status, "REGULAR");
        assert_eq!(updated.reason, None);
        assert_eq!(updated.version_number, 2);
    }

    #[tokio::test]
    async fn test_invalid_month_rejected() {
        let ledger = StatusLedger::new(MemoryReportStore::default());
        let actor = principal();

        for month in ["2024-13", "2024-1", "jan/2024", ""] {
            let mut d = draft(ReportStatus::Regular, None);
            d.month = month.into();
            let err = ledger.create(&d, &actor).await.unwrap_err();
            assert!(matches!(err, AppError::InvalidFormat { .. }), "month {:?}", month);
        }
    }

    #[tokio::test]
    async fn test_update_of_deleted_report_conflicts() {
        let ledger = StatusLedger::new(MemoryReportStore::default());
        let actor = principal();

        let report = ledger
            .create(&draft(ReportStatus::Regular, None), &actor)
            .await
            .unwrap();
        ledger.delete(report.id).await.unwrap();

        let err = ledger
            .update(report.id, &draft(ReportStatus::Regular, None), &actor)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_delete_keeps_history_queryable() {
        let ledger = StatusLedger::new(MemoryReportStore::default());
        let actor = principal();

        let report = ledger
            .create(&draft(ReportStatus::Regular, None), &actor)
            .await
            .unwrap();
        ledger
            .update(
                report.id,
                &draft(ReportStatus::Irregular, Some("missing receipts")),
                &actor,
            )
            .await
            .unwrap();

        ledger.delete(report.id).await.unwrap();

        // No cascade: orphaned entries remain retrievable
        let entries = ledger.entries_for_report(report.id).await.unwrap();
        assert_eq!(entries.len(), 2);

        // Second delete reports not-found
        let err = ledger.delete(report.id).await.unwrap_err();
        assert!(matches!(err, AppError::ReportNotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_entry_does_not_renumber_siblings() {
        let ledger = StatusLedger::new(MemoryReportStore::default());
        let actor = principal();

        let report = ledger
            .create(&draft(ReportStatus::Regular, None), &actor)
            .await
            .unwrap();
        ledger
            .update(
                report.id,
                &draft(ReportStatus::Irregular, Some("missing receipts")),
                &actor,
            )
            .await
            .unwrap();
        ledger
            .update(report.id, &draft(ReportStatus::Regular, None), &actor)
            .await
            .unwrap();

        let entries = ledger.entries_for_report(report.id).await.unwrap();
        assert_eq!(entries.len(), 3);
        let middle = entries[1].id;

        ledger.delete_entry(middle).await.unwrap();

        let remaining = ledger.entries_for_report(report.id).await.unwrap();
        assert_eq!(remaining.len(), 2);
        assert_eq!(remaining[0].version_number, 3);
        assert_eq!(remaining[1].version_number, 1);

        let err = ledger.delete_entry(middle).await.unwrap_err();
        assert!(matches!(err, AppError::EntryNotFound { .. }));
    }

    #[tokio::test]
    async fn test_process_number_union_is_newest_first() {
        let ledger = StatusLedger::new(MemoryReportStore::default());
        let actor = principal();

        // Two report periods for the same process, one for another process
        let mut january = draft(ReportStatus::Regular, None);
        january.process_number = "024.0001-2023".into();
        let mut february = draft(ReportStatus::Irregular, Some("late filing"));
        february.process_number = "024.0001-2023".into();
        february.month = "2024-02".into();
        let other = draft(ReportStatus::Regular, None);

        let jan = ledger.create(&january, &actor).await.unwrap();
        ledger.create(&other, &actor).await.unwrap();
        ledger.create(&february, &actor).await.unwrap();
        ledger
            .update(
                jan.id,
                &{
                    let mut d = january.clone();
                    d.status = ReportStatus::Irregular;
                    d.reason = Some("missing receipts".into());
                    d
                },
                &actor,
            )
            .await
            .unwrap();

        let entries = ledger.entries_for_process("024.0001-2023").await.unwrap();
        assert_eq!(entries.len(), 3);
        for pair in entries.windows(2) {
            assert!(pair[0].changed_at >= pair[1].changed_at);
        }
        // The union spans both report rows
        let mut report_ids: Vec<Uuid> = entries.iter().map(|e| e.report_id).collect();
        report_ids.sort();
        report_ids.dedup();
        assert_eq!(report_ids.len(), 2);
    }

    #[tokio::test]
    async fn test_replaying_chain_reconstructs_final_state() {
        let ledger = StatusLedger::new(MemoryReportStore::default());
        let actor = principal();

        let report = ledger
            .create(&draft(ReportStatus::Regular, None), &actor)
            .await
            .unwrap();
        let steps = [
            draft(ReportStatus::Irregular, Some("missing receipts")),
            draft(ReportStatus::Irregular, Some("late filing")),
            draft(ReportStatus::Regular, None),
            draft(ReportStatus::Irregular, Some("unsigned statement")),
        ];
        let mut last = report.clone();
        for step in &steps {
            last = ledger.update(report.id, step, &actor).await.unwrap();
        }

        let mut chain = ledger.entries_for_report(report.id).await.unwrap();
        chain.reverse(); // oldest first

        let mut status: Option<String> = None;
        let mut reason: Option<String> = None;
        for entry in &chain {
            assert_eq!(entry.previous_status, status);
            status = Some(entry.new_status.clone());
            reason = entry.new_reason.clone();
        }

        assert_eq!(status.as_deref(), Some(last.status.as_str()));
        assert_eq!(reason, last.reason);
        assert_eq!(last.version_number as usize, chain.len());
    }

    #[tokio::test]
    async fn test_ledger_append_failure_surfaces_partial_write() {
        let store = MemoryReportStore {
            fail_append: true,
            ..Default::default()
        };
        let ledger = StatusLedger::new(store);
        let actor = principal();

        let err = ledger
            .create(&draft(ReportStatus::Regular, None), &actor)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PartialWrite { .. }));
    }
}
