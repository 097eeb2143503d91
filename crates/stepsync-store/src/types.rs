use serde::Serialize;

/// Fields for a new account. Validation happens at the API layer.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub login: String,
    pub password: String,
    pub steps: u32,
    pub schedule_hour: u8,
    pub schedule_minute: u8,
    pub enabled: bool,
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct AccountPatch {
    pub login: Option<String>,
    pub password: Option<String>,
    pub steps: Option<u32>,
    pub schedule_hour: Option<u8>,
    pub schedule_minute: Option<u8>,
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccountCounts {
    pub total: u64,
    pub enabled: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayCounts {
    pub success: u64,
    pub failed: u64,
}

/// Dashboard counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub accounts: AccountCounts,
    pub today: DayCounts,
}
