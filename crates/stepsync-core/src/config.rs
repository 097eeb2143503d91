use chrono_tz::Tz;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StepsyncError};

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_TIMEZONE: &str = "Asia/Shanghai";
pub const DEFAULT_CONFIG_PATH: &str = "stepsync.toml";

// Account defaults applied when the API omits a field.
pub const DEFAULT_STEPS: u32 = 89_888;
pub const DEFAULT_SCHEDULE_HOUR: u8 = 0;
pub const DEFAULT_SCHEDULE_MINUTE: u8 = 5;

/// Top-level config (stepsync.toml + STEPSYNC_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepsyncConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    /// Account inserted on first start when the accounts table is empty.
    #[serde(default)]
    pub seed: Option<SeedAccountConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// IANA timezone in which account schedules and "today" are evaluated.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
        }
    }
}

impl ScheduleConfig {
    /// Parse the configured timezone name.
    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| StepsyncError::Config(format!("unknown timezone: {}", self.timezone)))
    }
}

/// Remote submission endpoint. Everything here tracks the third-party site,
/// so none of it is a compile-time constant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Form POST target. Falls back to `base_url` when unset.
    #[serde(default)]
    pub post_url: Option<String>,
    #[serde(default = "default_field_account")]
    pub field_account: String,
    #[serde(default = "default_field_password")]
    pub field_password: String,
    #[serde(default = "default_field_steps")]
    pub field_steps: String,
    /// Warm up a cookie session with a GET against `base_url` before posting.
    #[serde(default = "bool_true")]
    pub use_session: bool,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            post_url: None,
            field_account: default_field_account(),
            field_password: default_field_password(),
            field_steps: default_field_steps(),
            use_session: true,
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl RemoteConfig {
    pub fn post_url(&self) -> &str {
        self.post_url.as_deref().unwrap_or(&self.base_url)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedAccountConfig {
    pub account: String,
    pub password: String,
    #[serde(default = "default_steps")]
    pub steps: u32,
    #[serde(default = "default_schedule_hour")]
    pub schedule_hour: u8,
    #[serde(default = "default_schedule_minute")]
    pub schedule_minute: u8,
}

fn bool_true() -> bool {
    true
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_db_path() -> String {
    "stepsync.db".to_string()
}
fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}
fn default_base_url() -> String {
    "http://8.140.250.130/bushu/".to_string()
}
fn default_field_account() -> String {
    "xmphone".to_string()
}
fn default_field_password() -> String {
    "xmpwd".to_string()
}
fn default_field_steps() -> String {
    "steps".to_string()
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (compatible; stepsync/1.0)".to_string()
}
fn default_timeout_secs() -> u64 {
    20
}
fn default_steps() -> u32 {
    DEFAULT_STEPS
}
fn default_schedule_hour() -> u8 {
    DEFAULT_SCHEDULE_HOUR
}
fn default_schedule_minute() -> u8 {
    DEFAULT_SCHEDULE_MINUTE
}

impl StepsyncConfig {
    /// Load config from a TOML file with STEPSYNC_* env var overrides.
    ///
    /// Nested keys use a double underscore, e.g. `STEPSYNC_REMOTE__BASE_URL`,
    /// because several field names contain single underscores.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path.unwrap_or(DEFAULT_CONFIG_PATH);
        tracing::debug!(path, "loading config");

        let config: StepsyncConfig = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("STEPSYNC_").split("__"))
            .extract()
            .map_err(|e| StepsyncError::Config(e.to_string()))?;

        config.schedule.tz()?;
        if config.remote.timeout_secs == 0 {
            return Err(StepsyncError::Config(
                "remote.timeout_secs must be greater than zero".to_string(),
            ));
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = StepsyncConfig::default();
        assert_eq!(config.gateway.port, 5000);
        assert_eq!(config.remote.field_account, "xmphone");
        assert_eq!(config.remote.field_password, "xmpwd");
        assert_eq!(config.remote.field_steps, "steps");
        assert_eq!(config.remote.timeout_secs, 20);
        assert!(config.remote.use_session);
        assert!(config.seed.is_none());
        assert_eq!(config.schedule.tz().unwrap(), chrono_tz::Asia::Shanghai);
    }

    #[test]
    fn post_url_falls_back_to_base_url() {
        let mut remote = RemoteConfig::default();
        assert_eq!(remote.post_url(), remote.base_url);
        remote.post_url = Some("http://example.test/submit".to_string());
        assert_eq!(remote.post_url(), "http://example.test/submit");
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        let schedule = ScheduleConfig {
            timezone: "Mars/Olympus_Mons".to_string(),
        };
        assert!(matches!(schedule.tz(), Err(StepsyncError::Config(_))));
    }

    #[test]
    fn toml_sections_override_defaults() {
        let config: StepsyncConfig = Figment::new()
            .merge(Toml::string(
                r#"
                [remote]
                base_url = "http://remote.test/"
                field_steps = "bushu"
                use_session = false

                [seed]
                account = "demo@example.com"
                password = "secret"
                "#,
            ))
            .extract()
            .unwrap();
        assert_eq!(config.remote.base_url, "http://remote.test/");
        assert_eq!(config.remote.field_steps, "bushu");
        assert!(!config.remote.use_session);
        let seed = config.seed.unwrap();
        assert_eq!(seed.steps, DEFAULT_STEPS);
        assert_eq!(seed.schedule_minute, DEFAULT_SCHEDULE_MINUTE);
    }
}
