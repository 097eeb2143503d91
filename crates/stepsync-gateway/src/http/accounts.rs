//! Account CRUD: /api/accounts.
//!
//! Every successful mutation re-syncs the scheduler job table.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use stepsync_core::config::{DEFAULT_SCHEDULE_HOUR, DEFAULT_SCHEDULE_MINUTE, DEFAULT_STEPS};
use stepsync_core::{Account, AccountId, Result, StepsyncError};
use stepsync_store::{AccountPatch, NewAccount};

use super::{api_error, core_error, store_error, ApiJson, ApiPath, ApiResult};
use crate::app::AppState;

const MSG_CREDENTIALS_REQUIRED: &str = "account and password are required";

/// Account as returned by the API. The password is only included for
/// single-account reads.
#[derive(Debug, Serialize)]
pub struct AccountView {
    pub id: AccountId,
    pub account: String,
    pub steps: u32,
    pub schedule_hour: u8,
    pub schedule_minute: u8,
    pub schedule_time: String,
    pub enabled: bool,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl AccountView {
    pub fn new(account: &Account, include_password: bool) -> Self {
        Self {
            id: account.id,
            account: account.login.clone(),
            steps: account.steps,
            schedule_hour: account.schedule_hour,
            schedule_minute: account.schedule_minute,
            schedule_time: account.schedule_time(),
            enabled: account.enabled,
            created_at: account.created_at.to_rfc3339(),
            password: include_password.then(|| account.password.clone()),
        }
    }
}

/// Body for create and update. Numbers arrive as i64 so out-of-range values
/// get a validation message instead of a deserialization error.
#[derive(Debug, Default, Deserialize)]
pub struct AccountRequest {
    pub account: Option<String>,
    pub password: Option<String>,
    pub steps: Option<i64>,
    pub schedule_hour: Option<i64>,
    pub schedule_minute: Option<i64>,
    pub enabled: Option<bool>,
}

impl AccountRequest {
    fn into_new(self) -> Result<NewAccount> {
        let login = self.account.unwrap_or_default().trim().to_string();
        let password = self.password.unwrap_or_default();
        if login.is_empty() || password.is_empty() {
            return Err(credentials_required());
        }
        Ok(NewAccount {
            login,
            password,
            steps: validate_steps(self.steps.unwrap_or(i64::from(DEFAULT_STEPS)))?,
            schedule_hour: validate_hour(
                self.schedule_hour.unwrap_or(i64::from(DEFAULT_SCHEDULE_HOUR)),
            )?,
            schedule_minute: validate_minute(
                self.schedule_minute.unwrap_or(i64::from(DEFAULT_SCHEDULE_MINUTE)),
            )?,
            enabled: self.enabled.unwrap_or(true),
        })
    }

    fn into_patch(self) -> Result<AccountPatch> {
        let login = self.account.map(|a| a.trim().to_string());
        if login.as_deref() == Some("") || self.password.as_deref() == Some("") {
            return Err(credentials_required());
        }
        Ok(AccountPatch {
            login,
            password: self.password,
            steps: self.steps.map(validate_steps).transpose()?,
            schedule_hour: self.schedule_hour.map(validate_hour).transpose()?,
            schedule_minute: self.schedule_minute.map(validate_minute).transpose()?,
            enabled: self.enabled,
        })
    }
}

pub(crate) fn credentials_required() -> StepsyncError {
    StepsyncError::InvalidInput(MSG_CREDENTIALS_REQUIRED.to_string())
}

fn invalid(message: &str) -> StepsyncError {
    StepsyncError::InvalidInput(message.to_string())
}

pub(crate) fn validate_steps(steps: i64) -> Result<u32> {
    u32::try_from(steps)
        .ok()
        .filter(|s| *s > 0)
        .ok_or_else(|| invalid("steps must be a positive integer"))
}

fn validate_hour(hour: i64) -> Result<u8> {
    u8::try_from(hour)
        .ok()
        .filter(|h| *h <= 23)
        .ok_or_else(|| invalid("schedule_hour must be between 0 and 23"))
}

fn validate_minute(minute: i64) -> Result<u8> {
    u8::try_from(minute)
        .ok()
        .filter(|m| *m <= 59)
        .ok_or_else(|| invalid("schedule_minute must be between 0 and 59"))
}

/// GET /api/accounts: newest first, without passwords.
pub async fn list_accounts(State(state): State<Arc<AppState>>) -> ApiResult {
    let accounts = state.store.list_accounts().map_err(store_error)?;
    let views: Vec<_> = accounts.iter().map(|a| AccountView::new(a, false)).collect();
    Ok(Json(json!({"success": true, "data": views})))
}

/// POST /api/accounts
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<AccountRequest>,
) -> ApiResult {
    let new = req.into_new().map_err(core_error)?;
    let account = state.store.create_account(new).map_err(store_error)?;
    state.sync_jobs();
    Ok(Json(json!({
        "success": true,
        "message": "account created",
        "data": AccountView::new(&account, false),
    })))
}

/// GET /api/accounts/{id}: includes the password for the edit form.
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult {
    let account = state
        .store
        .get_account(AccountId(id))
        .map_err(store_error)?
        .ok_or_else(|| api_error(axum::http::StatusCode::NOT_FOUND, "account not found"))?;
    Ok(Json(json!({"success": true, "data": AccountView::new(&account, true)})))
}

/// PUT /api/accounts/{id}: partial update.
pub async fn update_account(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<AccountRequest>,
) -> ApiResult {
    let patch = req.into_patch().map_err(core_error)?;
    let account = state
        .store
        .update_account(AccountId(id), patch)
        .map_err(store_error)?;
    state.sync_jobs();
    Ok(Json(json!({
        "success": true,
        "message": "account updated",
        "data": AccountView::new(&account, false),
    })))
}

/// DELETE /api/accounts/{id}: also removes the account's records.
pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult {
    state
        .store
        .delete_account(AccountId(id))
        .map_err(store_error)?;
    state.sync_jobs();
    Ok(Json(json!({"success": true, "message": "account deleted"})))
}

/// POST /api/accounts/{id}/toggle
pub async fn toggle_account(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult {
    let account = state
        .store
        .toggle_account(AccountId(id))
        .map_err(store_error)?;
    state.sync_jobs();
    let message = if account.enabled { "enabled" } else { "disabled" };
    Ok(Json(json!({
        "success": true,
        "message": message,
        "data": AccountView::new(&account, false),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(account: &str, password: &str) -> AccountRequest {
        AccountRequest {
            account: Some(account.to_string()),
            password: Some(password.to_string()),
            ..AccountRequest::default()
        }
    }

    #[test]
    fn create_fills_defaults() {
        let new = req(" a@b.c ", "pw").into_new().unwrap();
        assert_eq!(new.login, "a@b.c");
        assert_eq!(new.steps, DEFAULT_STEPS);
        assert_eq!((new.schedule_hour, new.schedule_minute), (0, 5));
        assert!(new.enabled);
    }

    #[test]
    fn create_requires_credentials() {
        assert!(AccountRequest::default().into_new().is_err());
        assert!(req("a", "").into_new().is_err());
    }

    #[test]
    fn patch_keeps_absent_fields() {
        let patch = AccountRequest {
            steps: Some(100),
            ..AccountRequest::default()
        }
        .into_patch()
        .unwrap();
        assert_eq!(patch.steps, Some(100));
        assert!(patch.login.is_none());
        assert!(patch.password.is_none());
    }

    #[test]
    fn patch_rejects_blank_login() {
        let err = AccountRequest {
            account: Some("  ".into()),
            ..AccountRequest::default()
        }
        .into_patch()
        .unwrap_err();
        assert!(matches!(err, StepsyncError::InvalidInput(ref m) if m == MSG_CREDENTIALS_REQUIRED));
        assert_eq!(err.code(), "INVALID_INPUT");
    }

    #[test]
    fn numeric_bounds() {
        assert_eq!(validate_steps(1).unwrap(), 1);
        assert!(validate_steps(0).is_err());
        assert!(validate_steps(-5).is_err());
        assert!(validate_steps(i64::from(u32::MAX) + 1).is_err());
        assert_eq!(validate_hour(23).unwrap(), 23);
        assert!(validate_hour(24).is_err());
        assert_eq!(validate_minute(0).unwrap(), 0);
        assert!(validate_minute(60).is_err());
        assert!(validate_minute(-1).is_err());
    }
}
