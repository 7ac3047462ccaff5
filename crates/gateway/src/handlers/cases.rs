//! Case record handlers
//!
//! The query endpoint fronts the priority engine: urgent rows always lead
//! the page, and `total_count` is stable for fixed inputs. The remaining
//! endpoints manage individual movement rows and whole flows (every
//! movement sharing one case number).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use procontrol_common::{
    auth::Principal,
    db::models::CaseRecord,
    db::{CaseBulkUpdate, DistinctColumn, Repository},
    errors::{AppError, Result},
    metrics,
    query::{CaseFilter, CaseQuery, CaseSort, PriorityQueryEngine},
};

/// Page request over the case collection
#[derive(Debug, Deserialize)]
pub struct QueryCasesRequest {
    #[serde(default)]
    pub page: Option<u64>,

    #[serde(default)]
    pub page_size: Option<u64>,

    #[serde(default)]
    pub filter: CaseFilter,

    #[serde(default)]
    pub sort: Option<CaseSort>,

    #[serde(default)]
    pub latest_only: bool,
}

#[derive(Serialize)]
pub struct QueryCasesResponse {
    pub rows: Vec<CaseRecord>,
    pub total_count: u64,
    pub page: u64,
    pub page_size: u64,
    pub processing_time_ms: u64,
}

/// Movement row payload; `id` present means rewrite that row
#[derive(Debug, Deserialize, Validate)]
pub struct SaveCaseRequest {
    #[serde(default)]
    pub id: Option<Uuid>,

    #[validate(length(min = 1, max = 100))]
    pub number: String,

    #[validate(length(min = 1, max = 100))]
    pub origin_code: String,

    pub entry_date: chrono::NaiveDate,

    #[serde(default)]
    pub current_location: Option<String>,

    #[serde(default)]
    pub exit_date: Option<chrono::NaiveDate>,

    #[serde(default)]
    pub return_deadline: Option<chrono::NaiveDate>,

    #[serde(default)]
    pub urgent: bool,

    #[validate(length(min = 1, max = 500))]
    pub subject: String,

    #[validate(length(min = 1, max = 500))]
    pub interested_party: String,

    #[serde(default)]
    pub notes: Option<String>,

    #[serde(default)]
    pub external_link: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BulkUpdateRequest {
    pub ids: Vec<Uuid>,
    pub updates: CaseBulkUpdate,
}

#[derive(Serialize)]
pub struct BulkUpdateResponse {
    pub updated: u64,
}

#[derive(Serialize)]
pub struct DeleteFlowResponse {
    pub deleted: u64,
}

#[derive(Serialize)]
pub struct DeleteMovementResponse {
    pub deleted_id: Uuid,
}

/// Run one paginated, urgent-first query over the case collection
pub async fn query_cases(
    State(state): State<AppState>,
    _principal: Principal,
    Json(request): Json<QueryCasesRequest>,
) -> Result<Json<QueryCasesResponse>> {
    let start = Instant::now();

    let query = CaseQuery {
        page: request.page.unwrap_or(1),
        page_size: request
            .page_size
            .unwrap_or(state.config.server.default_page_size),
        filter: request.filter,
        sort: request.sort.unwrap_or_default(),
        latest_only: request.latest_only,
    };

    let engine = PriorityQueryEngine::new(Repository::new(state.db.clone()));
    let page = engine.run(&query).await?;

    let processing_time_ms = start.elapsed().as_millis() as u64;
    metrics::record_case_query(
        processing_time_ms as f64 / 1000.0,
        query.latest_only,
        page.rows.len(),
    );

    tracing::info!(
        page = query.page,
        page_size = query.page_size,
        latest_only = query.latest_only,
        total_count = page.total_count,
        latency_ms = processing_time_ms,
        "Case query completed"
    );

    Ok(Json(QueryCasesResponse {
        rows: page.rows,
        total_count: page.total_count,
        page: query.page,
        page_size: query.page_size,
        processing_time_ms,
    }))
}

/// Insert a new movement row, or rewrite an existing one when `id` is given
pub async fn save_case(
    State(state): State<AppState>,
    principal: Principal,
    Json(request): Json<SaveCaseRequest>,
) -> Result<(StatusCode, Json<CaseRecord>)> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let repo = Repository::new(state.db.clone());
    let now = chrono::Utc::now();

    let (id, created_by, created_at, existed) = match request.id {
        Some(id) => match repo.find_case_by_id(id).await? {
            Some(prior) => (id, prior.created_by, prior.created_at, true),
            None => {
                return Err(AppError::CaseNotFound { id: id.to_string() });
            }
        },
        None => (Uuid::new_v4(), principal.actor_id, now.into(), false),
    };

    let record = CaseRecord {
        id,
        number: request.number,
        origin_code: request.origin_code,
        entry_date: request.entry_date,
        current_location: request.current_location,
        exit_date: request.exit_date,
        return_deadline: request.return_deadline,
        urgent: request.urgent,
        subject: request.subject,
        interested_party: request.interested_party,
        notes: request.notes,
        external_link: request.external_link,
        created_by,
        updated_by: principal.actor_id,
        created_at,
        updated_at: now.into(),
    };

    let saved = repo.save_case(record).await?;

    tracing::info!(
        case_id = %saved.id,
        number = %saved.number,
        urgent = saved.urgent,
        actor = %principal.actor_id,
        "Case movement saved"
    );

    let status = if existed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(saved)))
}

/// Delete a single movement row
pub async fn delete_case(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    let repo = Repository::new(state.db.clone());

    if !repo.delete_case(id).await? {
        return Err(AppError::CaseNotFound { id: id.to_string() });
    }

    tracing::info!(case_id = %id, actor = %principal.actor_id, "Case movement deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Full movement history of a case, newest first
pub async fn case_history(
    State(state): State<AppState>,
    _principal: Principal,
    Path(number): Path<String>,
) -> Result<Json<Vec<CaseRecord>>> {
    let repo = Repository::new(state.db.clone());

    let history = repo.case_history(&number).await?;
    if history.is_empty() {
        return Err(AppError::CaseNotFound { id: number });
    }

    Ok(Json(history))
}

/// Delete every movement of a case in one shot
pub async fn delete_flow(
    State(state): State<AppState>,
    principal: Principal,
    Path(number): Path<String>,
) -> Result<Json<DeleteFlowResponse>> {
    let repo = Repository::new(state.db.clone());

    let deleted = repo.delete_case_flow(&number).await?;
    if deleted == 0 {
        return Err(AppError::CaseNotFound { id: number });
    }

    tracing::info!(
        number = %number,
        deleted,
        actor = %principal.actor_id,
        "Case flow deleted"
    );
    Ok(Json(DeleteFlowResponse { deleted }))
}

/// Delete only the most recent movement of a case
pub async fn delete_latest_movement(
    State(state): State<AppState>,
    principal: Principal,
    Path(number): Path<String>,
) -> Result<Json<DeleteMovementResponse>> {
    let repo = Repository::new(state.db.clone());

    let deleted_id = repo
        .delete_latest_movement(&number)
        .await?
        .ok_or(AppError::CaseNotFound { id: number.clone() })?;

    tracing::info!(
        number = %number,
        case_id = %deleted_id,
        actor = %principal.actor_id,
        "Latest case movement deleted"
    );
    Ok(Json(DeleteMovementResponse { deleted_id }))
}

/// Apply the same partial update to a set of movement rows
pub async fn bulk_update(
    State(state): State<AppState>,
    principal: Principal,
    Json(request): Json<BulkUpdateRequest>,
) -> Result<Json<BulkUpdateResponse>> {
    if request.ids.is_empty() {
        return Err(AppError::Validation {
            message: "ids must not be empty".to_string(),
            field: Some("ids".to_string()),
        });
    }
    if request.updates.is_empty() {
        return Err(AppError::Validation {
            message: "updates must set at least one field".to_string(),
            field: Some("updates".to_string()),
        });
    }

    let repo = Repository::new(state.db.clone());
    let updated = repo
        .bulk_update_cases(&request.ids, &request.updates, principal.actor_id)
        .await?;

    tracing::info!(
        requested = request.ids.len(),
        updated,
        actor = %principal.actor_id,
        "Bulk case update applied"
    );
    Ok(Json(BulkUpdateResponse { updated }))
}

/// Distinct non-empty values of a column, for filter dropdowns
pub async fn distinct_values(
    State(state): State<AppState>,
    _principal: Principal,
    Path(column): Path<DistinctColumn>,
) -> Result<Json<Vec<String>>> {
    let repo = Repository::new(state.db.clone());
    let values = repo.distinct_case_values(column).await?;
    Ok(Json(values))
}
