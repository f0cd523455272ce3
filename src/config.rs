//! Sweep configuration loading and validation.
//!
//! Configuration is loaded with the `config` crate: built-in defaults
//! layered under an optional TOML file. Absence of a persisted
//! configuration therefore yields the documented defaults (empty
//! band/power matrix, 5 retries, 30 s timeout) rather than an error —
//! an empty matrix produces zero sweep points and surfaces later as
//! the empty-result condition, not a crash.
//!
//! ## Example configuration file
//!
//! ```toml
//! device_address = "192.168.1.10:5025"
//! bands = ["OB1", "OB3", "OB7"]
//! power_levels = [-50.0, -70.0, -90.0]
//! timeout_ms = 30000
//! max_retries = 5
//! retry_delay_ms = 2000
//! output_path = "network_measurements.csv"
//! error_check = "log"
//! ```

use crate::error::{AppResult, SweepError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// What to do with the instrument's own error queue (`SYST:ERR?`) after
/// the configuration directives of each sweep point.
///
/// The instrument reports configuration errors out-of-band through its
/// error queue rather than failing the configuring command itself, so
/// whether to sample that queue — and whether to act on it — is a
/// policy decision, not a fixed behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCheckPolicy {
    /// Never query the error queue.
    Off,
    /// Query after configuration and log anything it reports.
    Log,
    /// Query after configuration and fail the current point on a
    /// reported error.
    AbortPoint,
}

impl Default for ErrorCheckPolicy {
    fn default() -> Self {
        ErrorCheckPolicy::Log
    }
}

/// Sweep settings, read once at sweep start and immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Instrument address, e.g. "192.168.1.10:5025".
    pub device_address: String,
    /// Band identifiers to sweep, outer loop, in order.
    pub bands: Vec<String>,
    /// Downlink RS EPRE power levels in dBm, inner loop, in order.
    pub power_levels: Vec<f64>,
    /// Default query timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum attempts for availability polling (UE attach, UE report).
    pub max_retries: u32,
    /// Delay between availability-poll attempts in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Destination for the tabular result file.
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
    /// Instrument error-queue sampling policy.
    #[serde(default)]
    pub error_check: ErrorCheckPolicy,
}

fn default_retry_delay_ms() -> u64 {
    2000
}

fn default_output_path() -> PathBuf {
    PathBuf::from("network_measurements.csv")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            device_address: String::new(),
            bands: Vec::new(),
            power_levels: Vec::new(),
            timeout_ms: 30_000,
            max_retries: 5,
            retry_delay_ms: default_retry_delay_ms(),
            output_path: default_output_path(),
            error_check: ErrorCheckPolicy::default(),
        }
    }
}

impl Settings {
    /// Loads settings from an optional TOML file layered over the
    /// built-in defaults, then validates the semantic invariants.
    pub fn new(config_path: Option<&str>) -> AppResult<Self> {
        let mut builder = config::Config::builder()
            .set_default("device_address", "")?
            .set_default("bands", Vec::<String>::new())?
            .set_default("power_levels", Vec::<f64>::new())?
            .set_default("timeout_ms", 30_000i64)?
            .set_default("max_retries", 5i64)?
            .set_default("retry_delay_ms", 2000i64)?
            .set_default("output_path", "network_measurements.csv")?
            .set_default("error_check", "log")?;

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        }

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Semantic validation beyond what deserialization can express.
    pub fn validate(&self) -> AppResult<()> {
        if self.timeout_ms == 0 {
            return Err(SweepError::Configuration(
                "timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.max_retries == 0 {
            return Err(SweepError::Configuration(
                "max_retries must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Default query timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Inter-attempt delay for availability polling.
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Number of sweep points this configuration describes.
    pub fn point_count(&self) -> usize {
        self.bands.len() * self.power_levels.len()
    }
}
