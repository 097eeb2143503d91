//! `stepsync-scheduler`: in-memory daily job registry keyed by account.
//!
//! # Overview
//!
//! [`JobRegistry`] keeps one [`ScheduledJob`] per enabled account and is
//! reconciled against the account list after every mutation. A single
//! clock task sleeps until the earliest next-fire time and hands due
//! accounts to a [`JobRunner`].
//!
//! # Firing rules
//!
//! | Situation                                   | Result                              |
//! |---------------------------------------------|-------------------------------------|
//! | Fire time reached                           | one run                             |
//! | Several occurrences missed                  | coalesced into one run              |
//! | Latest missed occurrence older than grace   | skipped, next occurrence scheduled  |
//! | Previous run for the account still running  | skipped, never queued               |

pub mod error;
pub mod guard;
pub mod registry;
pub mod schedule;
pub mod types;

pub use error::{Result, SchedulerError};
pub use guard::{InFlight, InFlightPermit};
pub use registry::{JobRegistry, JobRunner};
pub use types::{DailyTrigger, JobOptions, ReconcileReport, ScheduledJob};
