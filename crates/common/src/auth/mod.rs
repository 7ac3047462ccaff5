//! Principal extraction
//!
//! Every mutating core operation takes the acting user as an explicit
//! parameter. The extractor pulls the principal from request headers set by
//! the identity collaborator in front of this service; there is no ambient
//! session lookup anywhere in the core.

use crate::errors::{AppError, Result};
use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

/// Acting user carried through every core operation
#[derive(Debug, Clone)]
pub struct Principal {
    /// User ID of the caller
    pub actor_id: Uuid,

    /// Display name recorded on audit rows
    pub actor_name: String,

    /// Request ID for tracing
    pub request_id: String,
}

impl Principal {
    pub fn new(actor_id: Uuid, actor_name: impl Into<String>) -> Self {
        Self {
            actor_id,
            actor_name: actor_name.into(),
            request_id: Uuid::new_v4().to_string(),
        }
    }
}

/// Axum extractor for Principal
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        // Extract request ID
        let request_id = parts
            .headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        // Extract actor ID
        let actor_id = parts
            .headers
            .get("x-actor-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(|| AppError::Unauthorized {
                message: "Missing or invalid X-Actor-ID header".to_string(),
            })?;

        // Extract actor display name, fall back to the id
        let actor_name = parts
            .headers
            .get("x-actor-name")
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.trim().is_empty())
            .map(String::from)
            .unwrap_or_else(|| actor_id.to_string());

        Ok(Principal {
            actor_id,
            actor_name,
            request_id,
        })
    }
}
