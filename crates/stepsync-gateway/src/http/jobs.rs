use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use stepsync_core::AccountId;

use super::ApiResult;
use crate::app::AppState;

#[derive(Debug, Serialize)]
pub struct JobView {
    pub account_id: AccountId,
    pub schedule_time: String,
    pub next_fire: String,
    pub last_fired: Option<String>,
}

/// GET /api/scheduler/jobs: job table snapshot, soonest first.
pub async fn list_jobs(State(state): State<Arc<AppState>>) -> ApiResult {
    let tz = state.tz;
    let jobs: Vec<_> = state
        .service
        .registry()
        .jobs()
        .into_iter()
        .map(|job| JobView {
            account_id: job.account_id,
            schedule_time: job.trigger.to_string(),
            next_fire: job.next_fire.with_timezone(&tz).to_rfc3339(),
            last_fired: job.last_fired.map(|t| t.with_timezone(&tz).to_rfc3339()),
        })
        .collect();
    Ok(Json(json!({"success": true, "data": jobs})))
}
