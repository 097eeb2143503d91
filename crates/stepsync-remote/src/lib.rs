//! `stepsync-remote`: outbound step submission to the third-party site.
//!
//! The remote contract is undocumented: it may answer with HTML, JSON or
//! plain text. [`classify::classify`] runs an ordered list of independent
//! predicates over the response and the first match marks the submission
//! as successful. No match means failure.

pub mod classify;
pub mod submitter;
pub mod truncate;

pub use classify::{RemoteResponse, SuccessCheck, SUCCESS_CHECKS};
pub use submitter::{RemoteSubmitter, SubmissionResult, Submitter};
pub use truncate::{truncate_chars, MAX_RAW_CHARS};
