//! Execution endpoints. Bodies are the service outcomes themselves; the
//! status code mirrors `success`.

use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use serde::Deserialize;
use std::sync::Arc;
use stepsync_core::config::DEFAULT_STEPS;
use stepsync_core::AccountId;
use stepsync_remote::SubmissionResult;
use stepsync_service::{BulkOutcome, ExecutionOutcome};
use tracing::warn;

use super::accounts::{credentials_required, validate_steps};
use super::{bad_request, core_error, outcome_status, ApiError, ApiJson, ApiPath};
use crate::app::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ExecuteRequest {
    pub steps: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct TestRequest {
    #[serde(default)]
    pub account: String,
    #[serde(default)]
    pub password: String,
    pub steps: Option<i64>,
}

/// POST /api/accounts/{id}/execute: optional `{"steps": N}` body.
pub async fn execute_account(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    body: Bytes,
) -> Result<(StatusCode, Json<ExecutionOutcome>), ApiError> {
    // An empty body means "use the stored step count".
    let req: ExecuteRequest = if body.iter().all(u8::is_ascii_whitespace) {
        ExecuteRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            warn!(account_id = id, error = %e, "invalid JSON in execute body");
            bad_request("invalid JSON body")
        })?
    };
    let steps = req.steps.map(validate_steps).transpose().map_err(core_error)?;

    let outcome = state.service.execute_now(AccountId(id), steps).await;
    Ok((outcome_status(outcome.success), Json(outcome)))
}

/// POST /api/accounts/execute-all
pub async fn execute_all(State(state): State<Arc<AppState>>) -> (StatusCode, Json<BulkOutcome>) {
    let outcome = state.service.execute_all().await;
    (outcome_status(outcome.success), Json(outcome))
}

/// POST /api/test: try credentials against the remote without recording.
pub async fn test_submit(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<TestRequest>,
) -> Result<(StatusCode, Json<SubmissionResult>), ApiError> {
    let login = req.account.trim();
    if login.is_empty() || req.password.is_empty() {
        return Err(core_error(credentials_required()));
    }
    let steps =
        validate_steps(req.steps.unwrap_or(i64::from(DEFAULT_STEPS))).map_err(core_error)?;

    let result = state
        .service
        .submit_to_remote(login, &req.password, steps)
        .await;
    Ok((outcome_status(result.success), Json(result)))
}
