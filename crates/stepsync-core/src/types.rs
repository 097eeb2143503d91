use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable account identifier (SQLite rowid). Used directly as the job key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub i64);

impl AccountId {
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for AccountId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// A remote-site account whose steps are submitted daily.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub id: AccountId,
    /// Login name on the remote site (the `account` column).
    pub login: String,
    pub password: String,
    /// Default quantity submitted when no override is given.
    pub steps: u32,
    /// Local hour (0-23) in the configured timezone.
    pub schedule_hour: u8,
    /// Local minute (0-59).
    pub schedule_minute: u8,
    pub enabled: bool,
    pub created_at: DateTime<Tz>,
}

impl Account {
    /// `HH:MM` rendering of the daily fire time.
    pub fn schedule_time(&self) -> String {
        format!("{:02}:{:02}", self.schedule_hour, self.schedule_minute)
    }
}

/// Outcome stored on a submit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmitStatus {
    Success,
    Failed,
}

impl SubmitStatus {
    pub fn from_success(success: bool) -> Self {
        if success {
            SubmitStatus::Success
        } else {
            SubmitStatus::Failed
        }
    }
}

impl fmt::Display for SubmitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitStatus::Success => write!(f, "success"),
            SubmitStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for SubmitStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(SubmitStatus::Success),
            "failed" => Ok(SubmitStatus::Failed),
            other => Err(format!("unknown submit status: {other}")),
        }
    }
}

/// A submit record before it is persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSubmitRecord {
    pub account_id: AccountId,
    /// Snapshot of the login at submit time.
    pub account_name: String,
    pub steps: u32,
    pub status: SubmitStatus,
    pub message: String,
    /// Truncated response body.
    pub raw: String,
    pub created_at: DateTime<Tz>,
}

/// An append-only audit row for one submission attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitRecord {
    pub id: i64,
    pub account_id: AccountId,
    pub account_name: String,
    pub steps: u32,
    pub status: SubmitStatus,
    pub message: String,
    pub raw: String,
    pub created_at: DateTime<Tz>,
}

impl SubmitRecord {
    pub fn from_new(id: i64, record: NewSubmitRecord) -> Self {
        Self {
            id,
            account_id: record.account_id,
            account_name: record.account_name,
            steps: record.steps,
            status: record.status,
            message: record.message,
            raw: record.raw,
            created_at: record.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn schedule_time_is_zero_padded() {
        let account = Account {
            id: AccountId(1),
            login: "demo".to_string(),
            password: "pw".to_string(),
            steps: 10,
            schedule_hour: 7,
            schedule_minute: 5,
            enabled: true,
            created_at: chrono_tz::Asia::Shanghai
                .with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
                .unwrap(),
        };
        assert_eq!(account.schedule_time(), "07:05");
    }

    #[test]
    fn submit_status_roundtrips_through_text() {
        for status in [SubmitStatus::Success, SubmitStatus::Failed] {
            assert_eq!(status.to_string().parse::<SubmitStatus>(), Ok(status));
        }
        assert!("pending".parse::<SubmitStatus>().is_err());
    }
}
