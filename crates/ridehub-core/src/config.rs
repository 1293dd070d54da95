use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 18790;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_TICK_INTERVAL_MINUTES: u64 = 5;
pub const DEFAULT_START_TOLERANCE_MINUTES: i64 = 5;
pub const DEFAULT_CONFIRM_LEAD_MINUTES: i64 = 60;
pub const DEFAULT_STATS_LOOKAHEAD_HOURS: i64 = 24;

/// Upper bounds accepted for the scheduler settings. Anything larger is a
/// typo, and left unchecked it would overflow the tick's time arithmetic.
pub const MAX_TICK_INTERVAL_MINUTES: u64 = 24 * 60;
pub const MAX_START_TOLERANCE_MINUTES: i64 = 24 * 60;
pub const MAX_CONFIRM_LEAD_MINUTES: i64 = 7 * 24 * 60;
pub const MAX_STATS_LOOKAHEAD_HOURS: i64 = 366 * 24;

/// Top-level config (ridehub.toml + RIDEHUB_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RidehubConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Bearer token guarding the `/admin/*` routes. `None` leaves them open,
    /// which is only sensible on a loopback bind.
    #[serde(default)]
    pub admin_token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
            admin_token: None,
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

/// Booking scheduler timing.
///
/// Override with env vars, e.g. `RIDEHUB_SCHEDULER__INTERVAL_MINUTES=1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Run the periodic tick in `serve` mode (default: true).
    #[serde(default = "bool_true")]
    pub enabled: bool,
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,
    /// Slack applied to the auto-start comparison against `scheduled_at`.
    #[serde(default = "default_start_tolerance_minutes")]
    pub start_tolerance_minutes: i64,
    /// Pending bookings this close to their pickup time are auto-confirmed.
    #[serde(default = "default_confirm_lead_minutes")]
    pub confirm_lead_minutes: i64,
    #[serde(default = "default_stats_lookahead_hours")]
    pub stats_lookahead_hours: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_minutes: DEFAULT_TICK_INTERVAL_MINUTES,
            start_tolerance_minutes: DEFAULT_START_TOLERANCE_MINUTES,
            confirm_lead_minutes: DEFAULT_CONFIRM_LEAD_MINUTES,
            stats_lookahead_hours: DEFAULT_STATS_LOOKAHEAD_HOURS,
        }
    }
}

impl SchedulerConfig {
    /// Reject values outside the supported ranges.
    pub fn validate(&self) -> crate::error::Result<()> {
        fn check(key: &str, value: i64, max: i64) -> crate::error::Result<()> {
            if (0..=max).contains(&value) {
                Ok(())
            } else {
                Err(crate::error::RidehubError::Config(format!(
                    "scheduler.{key} = {value} is outside 0..={max}"
                )))
            }
        }

        if self.interval_minutes > MAX_TICK_INTERVAL_MINUTES {
            return Err(crate::error::RidehubError::Config(format!(
                "scheduler.interval_minutes = {} is above {MAX_TICK_INTERVAL_MINUTES}",
                self.interval_minutes
            )));
        }
        check(
            "start_tolerance_minutes",
            self.start_tolerance_minutes,
            MAX_START_TOLERANCE_MINUTES,
        )?;
        check(
            "confirm_lead_minutes",
            self.confirm_lead_minutes,
            MAX_CONFIRM_LEAD_MINUTES,
        )?;
        check(
            "stats_lookahead_hours",
            self.stats_lookahead_hours,
            MAX_STATS_LOOKAHEAD_HOURS,
        )
    }
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
fn default_interval_minutes() -> u64 {
    DEFAULT_TICK_INTERVAL_MINUTES
}
fn default_start_tolerance_minutes() -> i64 {
    DEFAULT_START_TOLERANCE_MINUTES
}
fn default_confirm_lead_minutes() -> i64 {
    DEFAULT_CONFIRM_LEAD_MINUTES
}
fn default_stats_lookahead_hours() -> i64 {
    DEFAULT_STATS_LOOKAHEAD_HOURS
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.ridehub/ridehub.db", home)
}

impl RidehubConfig {
    /// Load config from a TOML file with RIDEHUB_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.ridehub/ridehub.toml
    ///
    /// A missing file is not an error; every field has a default. Scheduler
    /// values outside their supported ranges are a `Config` error.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: RidehubConfig = Figment::from(Serialized::defaults(RidehubConfig::default()))
            .merge(Toml::file(&path))
            .merge(Env::prefixed("RIDEHUB_").split("__"))
            .extract()
            .map_err(|e| crate::error::RidehubError::Config(e.to_string()))?;

        config.scheduler.validate()?;
        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.ridehub/ridehub.toml", home)
}
