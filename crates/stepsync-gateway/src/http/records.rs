use axum::{extract::State, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use stepsync_core::{AccountId, SubmitRecord, SubmitStatus};
use stepsync_store::store::DEFAULT_RECORD_LIMIT;

use super::{store_error, ApiQuery, ApiResult};
use crate::app::AppState;

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Record as shown in the dashboard. `raw` stays server-side.
#[derive(Debug, Serialize)]
pub struct RecordView {
    pub id: i64,
    pub account_id: AccountId,
    pub account_name: String,
    pub steps: u32,
    pub status: SubmitStatus,
    pub message: String,
    pub created_at: String,
}

impl From<&SubmitRecord> for RecordView {
    fn from(r: &SubmitRecord) -> Self {
        Self {
            id: r.id,
            account_id: r.account_id,
            account_name: r.account_name.clone(),
            steps: r.steps,
            status: r.status,
            message: r.message.clone(),
            created_at: r.created_at.format(DISPLAY_FORMAT).to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RecordQuery {
    pub limit: Option<usize>,
}

fn views(records: &[SubmitRecord]) -> Vec<RecordView> {
    records.iter().map(RecordView::from).collect()
}

/// GET /api/records?limit=N
pub async fn list_records(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<RecordQuery>,
) -> ApiResult {
    let limit = query.limit.unwrap_or(DEFAULT_RECORD_LIMIT);
    let records = state.store.list_records(limit).map_err(store_error)?;
    Ok(Json(json!({"success": true, "data": views(&records)})))
}

/// GET /api/records/today: current local day only.
pub async fn records_today(State(state): State<Arc<AppState>>) -> ApiResult {
    let records = state
        .store
        .records_for_day(Utc::now(), DEFAULT_RECORD_LIMIT)
        .map_err(store_error)?;
    Ok(Json(json!({"success": true, "data": views(&records)})))
}

/// GET /api/records/statistics
pub async fn statistics(State(state): State<Arc<AppState>>) -> ApiResult {
    let stats = state.store.statistics(Utc::now()).map_err(store_error)?;
    Ok(Json(json!({"success": true, "data": stats})))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Asia::Shanghai;

    #[test]
    fn view_formats_local_time_and_drops_raw() {
        let record = SubmitRecord {
            id: 5,
            account_id: AccountId(2),
            account_name: "demo".into(),
            steps: 100,
            status: SubmitStatus::Failed,
            message: "bad".into(),
            raw: "<html>".into(),
            created_at: Shanghai.with_ymd_and_hms(2026, 3, 1, 0, 5, 9).unwrap(),
        };
        let value = serde_json::to_value(RecordView::from(&record)).unwrap();
        assert_eq!(value["created_at"], "2026-03-01 00:05:09");
        assert_eq!(value["status"], "failed");
        assert!(value.get("raw").is_none());
    }
}
