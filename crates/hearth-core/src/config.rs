use chrono_tz::Tz;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TICK_INTERVAL_MINUTES: u64 = 1;
pub const DEFAULT_TIMEZONE: &str = "UTC";
pub const DEFAULT_DELIVERY_BUFFER: usize = 256;
pub const DEFAULT_START_LEAD_HOURS: i64 = 24;
pub const DEFAULT_END_HOUR: u32 = 9;

/// Top-level config (hearth.toml + HEARTH_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HearthConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub reminders: ReminderConfig,
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

/// Notification scheduler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Minutes between automatic ticks.
    #[serde(default = "default_interval")]
    pub interval_minutes: u64,
    /// Start ticking as soon as the host boots (default: true).
    /// Override with env var: HEARTH_SCHEDULER__AUTOSTART=false
    #[serde(default = "bool_true")]
    pub autostart: bool,
    /// IANA zone used for all calendar arithmetic (e.g. "Europe/Berlin").
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Capacity of the fired-notification channel to the host.
    #[serde(default = "default_delivery_buffer")]
    pub delivery_buffer: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_minutes: DEFAULT_TICK_INTERVAL_MINUTES,
            autostart: true,
            timezone: DEFAULT_TIMEZONE.to_string(),
            delivery_buffer: DEFAULT_DELIVERY_BUFFER,
        }
    }
}

impl SchedulerConfig {
    /// Resolve `timezone` to a concrete zone.
    pub fn tz(&self) -> crate::error::Result<Tz> {
        self.timezone.parse::<Tz>().map_err(|e| {
            crate::error::HearthError::Config(format!(
                "unknown timezone '{}': {e}",
                self.timezone
            ))
        })
    }
}

/// When event reminders trigger relative to their event's dates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderConfig {
    /// Hours before the start date's local midnight.
    #[serde(default = "default_start_lead_hours")]
    pub start_lead_hours: i64,
    /// Local hour of day on the end date.
    #[serde(default = "default_end_hour")]
    pub end_hour: u32,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            start_lead_hours: DEFAULT_START_LEAD_HOURS,
            end_hour: DEFAULT_END_HOUR,
        }
    }
}

fn bool_true() -> bool {
    true
}
fn default_interval() -> u64 {
    DEFAULT_TICK_INTERVAL_MINUTES
}
fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}
fn default_delivery_buffer() -> usize {
    DEFAULT_DELIVERY_BUFFER
}
fn default_start_lead_hours() -> i64 {
    DEFAULT_START_LEAD_HOURS
}
fn default_end_hour() -> u32 {
    DEFAULT_END_HOUR
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.hearth/hearth.db", home)
}

impl HearthConfig {
    /// Load config from a TOML file with HEARTH_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.hearth/hearth.toml
    ///
    /// Nested keys use a double underscore: `HEARTH_SCHEDULER__INTERVAL_MINUTES=5`.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: HearthConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("HEARTH_").split("__"))
            .extract()
            .map_err(|e| crate::error::HearthError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> crate::error::Result<()> {
        if self.scheduler.interval_minutes == 0 {
            return Err(crate::error::HearthError::Config(
                "scheduler.interval_minutes must be at least 1".to_string(),
            ));
        }
        if self.reminders.end_hour > 23 {
            return Err(crate::error::HearthError::Config(format!(
                "reminders.end_hour must be 0-23, got {}",
                self.reminders.end_hour
            )));
        }
        self.scheduler.tz()?;
        Ok(())
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.hearth/hearth.toml", home)
}
