use axum::{extract::State, Json};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

/// GET /health: liveness check with server metadata.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "ok": true,
        "time": Utc::now().with_timezone(&state.tz).to_rfc3339(),
        "timezone": state.config.schedule.timezone,
        "version": env!("CARGO_PKG_VERSION"),
        "jobs": state.service.registry().len(),
    }))
}
