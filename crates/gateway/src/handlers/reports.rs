//! Account report handlers
//!
//! All writes go through the status ledger so every status or reason
//! change leaves an audit entry behind.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::AppState;
use procontrol_common::{
    auth::Principal,
    db::models::{AccountReport, AuditEntry, ReportStatus},
    db::{ReportListQuery, ReportPage, ReportSortField, Repository},
    errors::Result,
    ledger::{ReportDraft, StatusLedger},
    metrics,
    query::SortOrder,
};

#[derive(Debug, Deserialize)]
pub struct ListReportsParams {
    #[serde(default)]
    pub page: Option<u64>,

    #[serde(default)]
    pub page_size: Option<u64>,

    #[serde(default)]
    pub search_term: Option<String>,

    #[serde(default)]
    pub process_number: Option<String>,

    #[serde(default)]
    pub status: Option<ReportStatus>,

    #[serde(default)]
    pub month_start: Option<String>,

    #[serde(default)]
    pub month_end: Option<String>,

    #[serde(default)]
    pub sort_field: Option<ReportSortField>,

    #[serde(default)]
    pub sort_order: Option<SortOrder>,
}

/// List account reports with filters and pagination
pub async fn list_reports(
    State(state): State<AppState>,
    _principal: Principal,
    Query(params): Query<ListReportsParams>,
) -> Result<Json<ReportPage>> {
    let query = ReportListQuery {
        page: params.page.unwrap_or(1),
        page_size: params
            .page_size
            .unwrap_or(state.config.server.default_page_size),
        search_term: params.search_term,
        process_number: params.process_number,
        status: params.status,
        month_start: params.month_start,
        month_end: params.month_end,
        sort_field: params.sort_field,
        sort_order: params.sort_order,
    };

    let repo = Repository::new(state.db.clone());
    let page = repo.list_reports(&query).await?;
    Ok(Json(page))
}

/// Create a new account report at version 1
pub async fn create_report(
    State(state): State<AppState>,
    principal: Principal,
    Json(draft): Json<ReportDraft>,
) -> Result<(StatusCode, Json<AccountReport>)> {
    let ledger = StatusLedger::new(Repository::new(state.db.clone()));
    let report = ledger.create(&draft, &principal).await?;

    metrics::record_ledger_append("creation");
    Ok((StatusCode::CREATED, Json(report)))
}

/// Rewrite an account report, appending to the ledger when its
/// status or reason changed
pub async fn update_report(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(draft): Json<ReportDraft>,
) -> Result<Json<AccountReport>> {
    let ledger = StatusLedger::new(Repository::new(state.db.clone()));

    let prior_version = ledger
        .entries_for_report(id)
        .await?
        .first()
        .map(|e| e.version_number);
    let report = ledger.update(id, &draft, &principal).await?;

    if prior_version != Some(report.version_number) {
        metrics::record_ledger_append("transition");
    }
    Ok(Json(report))
}

/// Delete an account report; its ledger history stays queryable
pub async fn delete_report(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    let ledger = StatusLedger::new(Repository::new(state.db.clone()));
    ledger.delete(id).await?;

    tracing::info!(report_id = %id, actor = %principal.actor_id, "Account report deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Audit history of one report, newest first
pub async fn report_audit(
    State(state): State<AppState>,
    _principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<AuditEntry>>> {
    let ledger = StatusLedger::new(Repository::new(state.db.clone()));
    let entries = ledger.entries_for_report(id).await?;
    Ok(Json(entries))
}

/// Audit history across every report row of one process number
pub async fn process_audit(
    State(state): State<AppState>,
    _principal: Principal,
    Path(number): Path<String>,
) -> Result<Json<Vec<AuditEntry>>> {
    let ledger = StatusLedger::new(Repository::new(state.db.clone()));
    let entries = ledger.entries_for_process(&number).await?;
    Ok(Json(entries))
}
