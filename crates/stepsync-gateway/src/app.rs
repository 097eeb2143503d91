use axum::{
    routing::{get, post},
    Router,
};
use chrono_tz::Tz;
use std::sync::Arc;
use stepsync_core::config::StepsyncConfig;
use stepsync_service::SchedulerService;
use stepsync_store::AccountStore;
use tower_http::cors::{Any, CorsLayer};

use crate::http::{accounts, execute, health, jobs, records};

/// Central shared state: passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: StepsyncConfig,
    /// Timezone for schedules, "today" and displayed timestamps.
    pub tz: Tz,
    pub store: Arc<AccountStore>,
    pub service: Arc<SchedulerService>,
}

impl AppState {
    pub fn new(
        config: StepsyncConfig,
        tz: Tz,
        store: Arc<AccountStore>,
        service: Arc<SchedulerService>,
    ) -> Self {
        Self {
            config,
            tz,
            store,
            service,
        }
    }

    /// Re-sync scheduler jobs after an account mutation. A failure is logged
    /// and does not fail the request that caused it.
    pub fn sync_jobs(&self) {
        if let Err(e) = self.service.sync_jobs() {
            tracing::warn!(error = %e, "job sync after account change failed");
        }
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route(
            "/accounts",
            get(accounts::list_accounts).post(accounts::create_account),
        )
        .route("/accounts/execute-all", post(execute::execute_all))
        .route(
            "/accounts/{id}",
            get(accounts::get_account)
                .put(accounts::update_account)
                .delete(accounts::delete_account),
        )
        .route("/accounts/{id}/toggle", post(accounts::toggle_account))
        .route("/accounts/{id}/execute", post(execute::execute_account))
        .route("/records", get(records::list_records))
        .route("/records/today", get(records::records_today))
        .route("/records/statistics", get(records::statistics))
        .route("/test", post(execute::test_submit))
        .route("/scheduler/jobs", get(jobs::list_jobs))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    Router::new()
        .route("/health", get(health::health_handler))
        .nest("/api", api)
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
