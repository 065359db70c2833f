//! User endpoints that trigger the username update saga.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use saga::{SagaResult, SagaStatus, UsernameUpdateSaga};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub saga: UsernameUpdateSaga,
}

// -- Request types --

#[derive(Deserialize)]
pub struct UpdateUsernameRequest {
    pub username: Option<String>,
}

// -- Response types --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsernameUpdateResponse {
    pub success: bool,
    pub message: String,
    pub user_id: i64,
    pub old_username: Option<String>,
    pub new_username: String,
    pub status: SagaStatus,
    pub saga_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compensation_outcome: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reverted_steps: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unreverted_steps: Vec<String>,
}

impl From<SagaResult> for UsernameUpdateResponse {
    fn from(result: SagaResult) -> Self {
        let (error, details) = match result.error {
            Some(failure) => (
                Some("SAGA transaction failed".to_string()),
                Some(failure.message),
            ),
            None => (None, None),
        };

        Self {
            success: result.success,
            message: result.message,
            user_id: result.subject_id.as_i64(),
            old_username: result.old_value,
            new_username: result.new_value,
            status: result.status,
            saga_id: result.saga_id.to_string(),
            error,
            details,
            compensation_outcome: result.compensation_outcome.map(|o| o.to_string()),
            warning: result.warning,
            reverted_steps: result.reverted_steps,
            unreverted_steps: result.unreverted_steps,
        }
    }
}

/// Picks the HTTP status for a finished saga.
///
/// Failures detected before any step changed anything are client errors;
/// everything else that did not commit is a server error.
fn status_for(result: &SagaResult) -> StatusCode {
    if result.success {
        return StatusCode::OK;
    }

    let kind = result.error.as_ref().map(|f| f.kind.as_str());
    match kind {
        Some("not_found") if result.completed_steps.is_empty() => StatusCode::NOT_FOUND,
        Some("conflict" | "invalid_intent") if result.completed_steps.is_empty() => {
            StatusCode::BAD_REQUEST
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// -- Handlers --

/// PUT /users/{id}/username: changes a username everywhere it is stored.
#[tracing::instrument(skip(state, payload))]
pub async fn update_username(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateUsernameRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UsernameUpdateResponse>), ApiError> {
    let user_id = parse_user_id(&id)?;
    let Json(req) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    // Blank values are rejected by the intent; anything else is stored as sent.
    let username = req
        .username
        .ok_or_else(|| ApiError::BadRequest("Username is required".to_string()))?;

    let result = state.saga.update_username(user_id, &username).await?;
    let status = status_for(&result);
    metrics::counter!("username_update_requests_total", "status" => status.as_u16().to_string())
        .increment(1);

    if result.success {
        tracing::info!(user_id, saga_id = %result.saga_id, "username updated");
    } else {
        tracing::warn!(
            user_id,
            saga_id = %result.saga_id,
            status = %result.status,
            message = %result.message,
            "username update failed"
        );
    }

    Ok((status, Json(result.into())))
}

fn parse_user_id(id: &str) -> Result<i64, ApiError> {
    id.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid user ID: {id}")))
}
