//! Configuration loading and typed config structures for the fleet engine.
//!
//! The canonical configuration lives in `fleet-config.yaml` at the project
//! root. Every field has a default, so a missing file or a partial file is
//! fine. Values are validated after parsing; an invalid value is a startup
//! error rather than a misbehaving tick later.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

/// Largest accepted `simulation.position_jitter_degrees`.
pub const MAX_POSITION_JITTER_DEGREES: f64 = 1.0;

/// Largest accepted `simulation.speed_jitter`.
pub const MAX_SPEED_JITTER: f64 = 100.0;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is outside its allowed range.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level engine configuration.
///
/// Mirrors the structure of `fleet-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FleetConfig {
    /// Position simulator settings.
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Live-update fan-out settings.
    #[serde(default)]
    pub broadcast: BroadcastConfig,

    /// Arrival estimate bounds.
    #[serde(default)]
    pub arrivals: ArrivalConfig,

    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Where the starting fleet comes from.
    #[serde(default)]
    pub seed: SeedConfig,
}

impl FleetConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `FLEET_HOST` and `FLEET_PORT` override the `server` section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yml::from_str(&contents)?;
        config.server.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every value against its allowed range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sim = &self.simulation;
        if sim.tick_interval_seconds == 0 {
            return Err(invalid("simulation.tick_interval_seconds", "must be at least 1"));
        }
        bounded(
            "simulation.position_jitter_degrees",
            sim.position_jitter_degrees,
            MAX_POSITION_JITTER_DEGREES,
        )?;
        bounded("simulation.speed_jitter", sim.speed_jitter, MAX_SPEED_JITTER)?;
        if !(0.0..=1.0).contains(&sim.notification_probability) {
            return Err(invalid(
                "simulation.notification_probability",
                "must be between 0 and 1",
            ));
        }
        if sim.occupancy_jitter > 100 {
            return Err(invalid("simulation.occupancy_jitter", "must be at most 100"));
        }
        if sim.crowding_threshold > 100 {
            return Err(invalid("simulation.crowding_threshold", "must be at most 100"));
        }
        if self.broadcast.subscriber_buffer == 0 {
            return Err(invalid("broadcast.subscriber_buffer", "must be at least 1"));
        }
        if self.arrivals.arrival_min_minutes > self.arrivals.arrival_max_minutes {
            return Err(invalid(
                "arrivals.arrival_min_minutes",
                "must not exceed arrivals.arrival_max_minutes",
            ));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_owned(),
    }
}

fn bounded(field: &'static str, value: f64, max: f64) -> Result<(), ConfigError> {
    if (0.0..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("must be between 0 and {max}"),
        })
    }
}

/// Position simulator configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Seconds between ticks.
    #[serde(default = "default_tick_interval_seconds")]
    pub tick_interval_seconds: u64,

    /// Maximum per-axis position change per tick, in degrees.
    #[serde(default = "default_position_jitter_degrees")]
    pub position_jitter_degrees: f64,

    /// Maximum speed change per tick.
    #[serde(default = "default_speed_jitter")]
    pub speed_jitter: f64,

    /// Maximum occupancy change per tick, in percentage points.
    #[serde(default = "default_occupancy_jitter")]
    pub occupancy_jitter: u8,

    /// Chance per tick of emitting a synthetic notification.
    #[serde(default = "default_notification_probability")]
    pub notification_probability: f64,

    /// Occupancy at or above which a synthetic notice reports crowding
    /// instead of a delay.
    #[serde(default = "default_crowding_threshold")]
    pub crowding_threshold: u8,

    /// Stop after this many ticks (0 = run until shutdown).
    #[serde(default)]
    pub max_ticks: u64,

    /// Random seed for reproducible runs. Unset means OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl SimulationConfig {
    /// The tick interval as a [`Duration`].
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_seconds)
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_interval_seconds: default_tick_interval_seconds(),
            position_jitter_degrees: default_position_jitter_degrees(),
            speed_jitter: default_speed_jitter(),
            occupancy_jitter: default_occupancy_jitter(),
            notification_probability: default_notification_probability(),
            crowding_threshold: default_crowding_threshold(),
            max_ticks: 0,
            seed: None,
        }
    }
}

/// Live-update fan-out configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BroadcastConfig {
    /// Events queued per subscriber before it counts as lagging.
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,

    /// How long one delivery may wait for queue space (0 = no wait).
    #[serde(default = "default_delivery_timeout_ms")]
    pub delivery_timeout_ms: u64,
}

impl BroadcastConfig {
    /// The delivery timeout as a [`Duration`].
    pub const fn delivery_timeout(&self) -> Duration {
        Duration::from_millis(self.delivery_timeout_ms)
    }
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            subscriber_buffer: default_subscriber_buffer(),
            delivery_timeout_ms: default_delivery_timeout_ms(),
        }
    }
}

/// Bounds for the synthetic arrival estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ArrivalConfig {
    /// Smallest ETA handed out, in minutes.
    #[serde(default = "default_arrival_min_minutes")]
    pub arrival_min_minutes: u32,

    /// Largest ETA handed out, in minutes.
    #[serde(default = "default_arrival_max_minutes")]
    pub arrival_max_minutes: u32,
}

impl Default for ArrivalConfig {
    fn default() -> Self {
        Self {
            arrival_min_minutes: default_arrival_min_minutes(),
            arrival_max_minutes: default_arrival_max_minutes(),
        }
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSettings {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerSettings {
    /// Override host and port with `FLEET_HOST` / `FLEET_PORT` when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("FLEET_HOST") {
            self.host = val;
        }
        if let Ok(val) = std::env::var("FLEET_PORT") {
            match val.parse() {
                Ok(port) => self.port = port,
                Err(e) => warn!(value = val, error = %e, "Ignoring invalid FLEET_PORT"),
            }
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Seed source configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SeedConfig {
    /// YAML seed file. Unset means the built-in starting fleet.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

const fn default_tick_interval_seconds() -> u64 {
    5
}

const fn default_position_jitter_degrees() -> f64 {
    0.001
}

const fn default_speed_jitter() -> f64 {
    5.0
}

const fn default_occupancy_jitter() -> u8 {
    5
}

const fn default_notification_probability() -> f64 {
    0.10
}

const fn default_crowding_threshold() -> u8 {
    80
}

const fn default_subscriber_buffer() -> usize {
    64
}

const fn default_delivery_timeout_ms() -> u64 {
    250
}

const fn default_arrival_min_minutes() -> u32 {
    2
}

const fn default_arrival_max_minutes() -> u32 {
    15
}

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    5000
}

fn default_log_level() -> String {
    "info".to_owned()
}
