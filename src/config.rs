//! Monitor configuration.
//!
//! Options arrive as a flat string map (environment variables, a config
//! file, or test fixtures) and are validated up front so that a typo in
//! `poll_interval` surfaces at construction instead of as a silently
//! wrong cadence.

use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;

/// Option key for the sampling cadence.
pub const OPT_POLL_INTERVAL: &str = "poll_interval";

/// Option key for the start-acknowledgement timeout.
pub const OPT_START_TIMEOUT: &str = "start_timeout";

const DEFAULT_POLL_INTERVAL_SECS: f64 = 1.0;
const DEFAULT_START_TIMEOUT_SECS: f64 = 5.0;

/// Errors raised when an option map contains unusable values.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The value could not be parsed as a number of seconds.
    #[error("invalid value {value:?} for option `{key}`: expected seconds as a number")]
    InvalidNumber { key: &'static str, value: String },

    /// The value parsed but is negative or not finite.
    #[error("option `{key}` must be a finite, non-negative number of seconds (got {value})")]
    OutOfRange { key: &'static str, value: f64 },
}

/// Validated configuration for an [`ActivityMonitor`](crate::monitor::ActivityMonitor).
///
/// Unrecognized options are preserved in [`extra`](Self::extra) but have
/// no effect on behaviour.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Interval between successive samples of the background loop.
    pub poll_interval: Duration,

    /// How long `start()` waits for the loop to acknowledge startup.
    pub start_timeout: Duration,

    /// Options that were present in the source map but not recognized.
    pub extra: HashMap<String, String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs_f64(DEFAULT_POLL_INTERVAL_SECS),
            start_timeout: Duration::from_secs_f64(DEFAULT_START_TIMEOUT_SECS),
            extra: HashMap::new(),
        }
    }
}

impl MonitorConfig {
    /// Builds a configuration from a flat option map.
    ///
    /// Recognized keys are `poll_interval` and `start_timeout`, both float
    /// seconds. Zero is allowed; negative, non-finite, or non-numeric
    /// values fail fast with a [`ConfigError`]. Everything else is kept
    /// in [`extra`](Self::extra) untouched.
    pub fn from_options(options: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();

        for (key, value) in options {
            match key.as_str() {
                OPT_POLL_INTERVAL => {
                    cfg.poll_interval = parse_seconds(OPT_POLL_INTERVAL, value)?;
                }
                OPT_START_TIMEOUT => {
                    cfg.start_timeout = parse_seconds(OPT_START_TIMEOUT, value)?;
                }
                _ => {
                    cfg.extra.insert(key.clone(), value.clone());
                }
            }
        }

        Ok(cfg)
    }
}

/// Parses a float-seconds option value into a `Duration`.
fn parse_seconds(key: &'static str, value: &str) -> Result<Duration, ConfigError> {
    let secs: f64 = value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidNumber {
            key,
            value: value.to_string(),
        })?;

    if !secs.is_finite() || secs < 0.0 {
        return Err(ConfigError::OutOfRange { key, value: secs });
    }

    Ok(Duration::from_secs_f64(secs))
}
