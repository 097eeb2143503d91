//! HTTP handlers. Every JSON body uses the `{success, message?, data?}`
//! envelope; execution endpoints return the outcome object directly.

pub mod accounts;
pub mod execute;
pub mod health;
pub mod jobs;
pub mod records;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts, Path, Query, Request,
    },
    http::{request::Parts, StatusCode},
    Json,
};
use serde_json::{json, Value};
use stepsync_core::StepsyncError;
use stepsync_store::StoreError;
use tracing::{debug, error};

pub type ApiError = (StatusCode, Json<Value>);
pub type ApiResult = Result<Json<Value>, ApiError>;

pub fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(json!({"success": false, "message": message.into()})),
    )
}

pub fn bad_request(message: impl Into<String>) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, message)
}

/// Maps a domain error onto status and envelope. Unexpected kinds are
/// logged and reported without detail.
pub fn core_error(e: StepsyncError) -> ApiError {
    match e {
        StepsyncError::InvalidInput(message) => bad_request(message),
        StepsyncError::AccountNotFound { .. } => api_error(StatusCode::NOT_FOUND, "account not found"),
        StepsyncError::Duplicate(login) => {
            api_error(StatusCode::CONFLICT, format!("account {login} already exists"))
        }
        db @ StepsyncError::Database(_) => {
            error!(error = %db, code = db.code(), "storage failure");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "storage error")
        }
        other => {
            error!(error = %other, code = other.code(), "request failed");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    }
}

pub fn store_error(e: StoreError) -> ApiError {
    core_error(e.into())
}

fn rejected(status: StatusCode, text: String) -> ApiError {
    debug!(%status, reason = %text, "request rejected");
    api_error(status, text)
}

/// `Json` whose rejection uses the API envelope.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(rejected(rejection.status(), rejection.body_text())),
        }
    }
}

/// `Path` whose rejection uses the API envelope.
pub struct ApiPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    Path<T>: FromRequestParts<S, Rejection = PathRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(Self(value)),
            Err(rejection) => Err(rejected(rejection.status(), rejection.body_text())),
        }
    }
}

/// `Query` whose rejection uses the API envelope.
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    Query<T>: FromRequestParts<S, Rejection = QueryRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Self(value)),
            Err(rejection) => Err(rejected(rejection.status(), rejection.body_text())),
        }
    }
}

/// 200 for a successful outcome, 500 otherwise.
pub fn outcome_status(success: bool) -> StatusCode {
    if success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_input_is_bad_request_with_message() {
        let (status, Json(body)) = core_error(StepsyncError::InvalidInput("steps too low".into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "steps too low");
    }

    #[test]
    fn domain_errors_map_to_status() {
        let (status, _) = core_error(StepsyncError::AccountNotFound { id: 3 });
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, Json(body)) = core_error(StepsyncError::Duplicate("a@b.c".into()));
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["message"], "account a@b.c already exists");
        let (status, Json(body)) = core_error(StepsyncError::Database("locked".into()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "storage error");
    }
}
