use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use stepsync_core::AccountId;

use crate::error::{Result, SchedulerError};

/// Fire every day at HH:MM local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyTrigger {
    pub hour: u8,
    pub minute: u8,
}

impl DailyTrigger {
    pub fn new(hour: u8, minute: u8) -> Result<Self> {
        if hour > 23 || minute > 59 {
            return Err(SchedulerError::InvalidTrigger { hour, minute });
        }
        Ok(Self { hour, minute })
    }
}

impl std::fmt::Display for DailyTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Per-job firing policy. At most one instance per account runs at a time
/// and missed occurrences always coalesce; only the grace window is tunable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobOptions {
    /// How late a run may start and still count.
    pub misfire_grace: Duration,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            misfire_grace: Duration::minutes(10),
        }
    }
}

/// A live entry in the job table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduledJob {
    pub account_id: AccountId,
    pub trigger: DailyTrigger,
    #[serde(skip)]
    pub options: JobOptions,
    pub next_fire: DateTime<Utc>,
    pub last_fired: Option<DateTime<Utc>>,
}

impl ScheduledJob {
    pub fn new(
        account_id: AccountId,
        trigger: DailyTrigger,
        options: JobOptions,
        next_fire: DateTime<Utc>,
    ) -> Self {
        Self {
            account_id,
            trigger,
            options,
            next_fire,
            last_fired: None,
        }
    }
}

/// What a reconcile pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub added: Vec<AccountId>,
    pub rescheduled: Vec<AccountId>,
    pub removed: Vec<AccountId>,
}

impl ReconcileReport {
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.rescheduled.is_empty() && self.removed.is_empty()
    }
}
