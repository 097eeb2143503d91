use serde::Serialize;
use stepsync_core::{Account, AccountId};
use stepsync_remote::SubmissionResult;

pub const MSG_NOT_FOUND: &str = "account does not exist";
pub const MSG_BUSY: &str = "execution already in progress";
pub const MSG_BULK_DONE: &str = "execution finished";

/// Result of one `execute_now` call, serialized as-is by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionOutcome {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<AccountId>,
    /// Login of the account that was executed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<u32>,
}

impl ExecutionOutcome {
    pub fn not_found(id: AccountId) -> Self {
        Self::failure(id, MSG_NOT_FOUND)
    }

    pub fn failure(id: AccountId, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            account_id: Some(id),
            account: None,
            steps: None,
        }
    }

    pub fn busy(account: &Account, steps: u32) -> Self {
        Self {
            success: false,
            message: MSG_BUSY.to_string(),
            account_id: Some(account.id),
            account: Some(account.login.clone()),
            steps: Some(steps),
        }
    }

    pub fn completed(account: &Account, steps: u32, result: &SubmissionResult) -> Self {
        Self {
            success: result.success,
            message: result.message.clone(),
            account_id: Some(account.id),
            account: Some(account.login.clone()),
            steps: Some(steps),
        }
    }
}

/// Aggregate of an `execute_all` pass. `success` only if every account
/// succeeded; `results` is always complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkOutcome {
    pub success: bool,
    pub message: String,
    pub results: Vec<ExecutionOutcome>,
}

impl BulkOutcome {
    pub fn from_results(results: Vec<ExecutionOutcome>) -> Self {
        Self {
            success: results.iter().all(|r| r.success),
            message: MSG_BULK_DONE.to_string(),
            results,
        }
    }

    pub fn aborted(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            results: Vec::new(),
        }
    }
}
