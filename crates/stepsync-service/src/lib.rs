//! `stepsync-service`: execution orchestration.
//!
//! [`SchedulerService`] is the single path every submission takes, whether
//! it comes from the HTTP API, the bulk endpoint or the scheduler clock:
//! look up the account, claim its in-flight slot, submit, record.
//! [`ExecutionRecorder`] turns a submission result into an audit row.

pub mod outcome;
pub mod recorder;
pub mod service;

pub use outcome::{BulkOutcome, ExecutionOutcome};
pub use recorder::ExecutionRecorder;
pub use service::{SchedulerService, Trigger};
