//! Application configuration management.

use std::path::PathBuf;

use chrono::NaiveTime;
use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Leave policy thresholds.
    #[serde(default)]
    pub policy: PolicyConfig,
    /// Background job schedule.
    #[serde(default)]
    pub schedule: ScheduleConfig,
    /// Entitlement config cache.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Seed and snapshot files.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Time thresholds and defaults for the leave lifecycle.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyConfig {
    /// Pending requests older than this many days are escalated.
    #[serde(default = "default_escalation_days")]
    pub escalation_days: u32,
    /// Pending requests older than this many days trigger an approver reminder.
    #[serde(default = "default_reminder_days")]
    pub reminder_days: u32,
    /// Requests and chronology older than this many years are archived at year end.
    #[serde(default = "default_retention_years")]
    pub retention_years: u32,
    /// Holiday region used for employees without one.
    #[serde(default)]
    pub default_region: Option<String>,
    /// Label used when addressing the HR team in notifications.
    #[serde(default = "default_hr_recipient")]
    pub hr_recipient: String,
}

fn default_escalation_days() -> u32 {
    7
}

fn default_reminder_days() -> u32 {
    3
}

fn default_retention_years() -> u32 {
    7
}

fn default_hr_recipient() -> String {
    "hr".to_string()
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            escalation_days: default_escalation_days(),
            reminder_days: default_reminder_days(),
            retention_years: default_retention_years(),
            default_region: None,
            hr_recipient: default_hr_recipient(),
        }
    }
}

/// Wall-clock schedule for the background jobs.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    /// IANA timezone the times below are expressed in.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Daily escalation sweep time.
    #[serde(default = "default_escalation_at")]
    pub escalation_at: NaiveTime,
    /// Daily reminder sweep time.
    #[serde(default = "default_reminder_at")]
    pub reminder_at: NaiveTime,
    /// Month of the year-end run (1-12).
    #[serde(default = "default_year_end_month")]
    pub year_end_month: u32,
    /// Day of month of the year-end run.
    #[serde(default = "default_year_end_day")]
    pub year_end_day: u32,
    /// Time of day of the year-end run.
    #[serde(default = "default_year_end_at")]
    pub year_end_at: NaiveTime,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_escalation_at() -> NaiveTime {
    NaiveTime::MIN
}

fn default_reminder_at() -> NaiveTime {
    NaiveTime::from_hms_opt(1, 0, 0).unwrap_or(NaiveTime::MIN)
}

fn default_year_end_month() -> u32 {
    12
}

fn default_year_end_day() -> u32 {
    31
}

fn default_year_end_at() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 0).unwrap_or(NaiveTime::MIN)
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            escalation_at: default_escalation_at(),
            reminder_at: default_reminder_at(),
            year_end_month: default_year_end_month(),
            year_end_day: default_year_end_day(),
            year_end_at: default_year_end_at(),
        }
    }
}

/// Entitlement config cache settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Seconds a cached policy row stays valid.
    #[serde(default = "default_config_ttl_secs")]
    pub config_ttl_secs: u64,
    /// Maximum number of cached policy rows.
    #[serde(default = "default_config_capacity")]
    pub config_capacity: u64,
}

fn default_config_ttl_secs() -> u64 {
    300 // 5 minutes
}

fn default_config_capacity() -> u64 {
    64
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            config_ttl_secs: default_config_ttl_secs(),
            config_capacity: default_config_capacity(),
        }
    }
}

/// Where the worker reads its reference data and keeps its state.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// JSON file with employees, holidays and policy overrides, loaded at startup.
    #[serde(default)]
    pub seed_path: Option<PathBuf>,
    /// JSON snapshot of requests, chronology and ledger rows. Restored at
    /// startup and rewritten on checkpoint and shutdown.
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: Option<PathBuf>,
    /// Seconds between snapshot checkpoints while the scheduler runs.
    #[serde(default = "default_checkpoint_secs")]
    pub checkpoint_secs: u64,
}

#[allow(clippy::unnecessary_wraps)]
fn default_snapshot_path() -> Option<PathBuf> {
    Some(PathBuf::from("data/leavewise.json"))
}

fn default_checkpoint_secs() -> u64 {
    300
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            seed_path: None,
            snapshot_path: default_snapshot_path(),
            checkpoint_secs: default_checkpoint_secs(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("LEAVEWISE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
