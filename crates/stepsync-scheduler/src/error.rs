use thiserror::Error;

/// Errors that can occur within the scheduler subsystem.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    /// Hour or minute outside the valid wall-clock range.
    #[error("Invalid trigger {hour:02}:{minute:02}")]
    InvalidTrigger { hour: u8, minute: u8 },
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
