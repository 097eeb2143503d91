//! Shared configuration, errors and domain types for stepsync.

pub mod config;
pub mod error;
pub mod store;
pub mod types;

pub use error::{Result, StepsyncError};
pub use types::{Account, AccountId, NewSubmitRecord, SubmitRecord, SubmitStatus};
