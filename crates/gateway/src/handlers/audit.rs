//! Audit ledger handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::AppState;
use procontrol_common::{auth::Principal, db::Repository, errors::Result, ledger::StatusLedger};

/// Remove a single mis-logged audit entry. Sibling entries keep their
/// version numbers, so a gap in the sequence is expected afterwards.
pub async fn delete_entry(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    let ledger = StatusLedger::new(Repository::new(state.db.clone()));
    ledger.delete_entry(id).await?;

    tracing::warn!(entry_id = %id, actor = %principal.actor_id, "Audit entry deleted");
    Ok(StatusCode::NO_CONTENT)
}
