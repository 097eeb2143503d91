//! Storage seams consumed by the scheduling and submission subsystem.
//!
//! The SQLite implementation lives in `stepsync-store`; tests substitute
//! in-memory fakes.

use crate::error::Result;
use crate::types::{Account, AccountId, NewSubmitRecord, SubmitRecord};

/// Read access to the account list.
pub trait AccountSource: Send + Sync {
    fn list_accounts(&self) -> Result<Vec<Account>>;

    /// Returns `Ok(None)` when no account has this id.
    fn get_account(&self, id: AccountId) -> Result<Option<Account>>;
}

/// Append-only sink for submission outcomes.
pub trait RecordSink: Send + Sync {
    fn insert_record(&self, record: NewSubmitRecord) -> Result<SubmitRecord>;
}
