//! Strongly-typed monitor settings loaded with Figment.

use crate::backend::http::parse_base_url;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default location of the optional settings file.
pub const DEFAULT_CONFIG_PATH: &str = "config/droplet.toml";

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration load error: {0}")]
    LoadError(#[from] Box<figment::Error>),
    #[error("Configuration validation error: {0}")]
    ValidationError(String),
}

/// Top-level monitor configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Application settings
    #[serde(default)]
    pub application: ApplicationConfig,
    /// Experiment backend connection
    #[serde(default)]
    pub backend: BackendConfig,
    /// Capture cadence
    #[serde(default)]
    pub capture: CaptureConfig,
    /// Live telemetry view
    #[serde(default)]
    pub live: LiveConfig,
    /// Experiment export
    #[serde(default)]
    pub export: ExportConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name
    #[serde(default = "default_name")]
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Backend connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL the `api/...` paths resolve beneath. A path prefix is
    /// kept and a bare `host:port` means plain HTTP.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in milliseconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

/// Capture scheduling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Initial capture interval in seconds (0 = instant, single capture)
    #[serde(default)]
    pub interval_secs: u64,
    /// Largest interval an operator may select
    #[serde(default = "default_max_interval")]
    pub max_interval_secs: u64,
}

/// Live telemetry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveConfig {
    /// Delay between live polls in milliseconds
    #[serde(default = "default_poll_period")]
    pub poll_period_ms: u64,
    /// Delay between mount point checks in milliseconds
    #[serde(default = "default_readiness_retry")]
    pub readiness_retry_ms: u64,
    /// Index of the live telemetry view among the operator's views
    #[serde(default = "default_live_view_index")]
    pub live_view_index: usize,
    /// Mount point of the temperature chart
    #[serde(default = "default_temperature_mount")]
    pub temperature_mount: String,
    /// Mount point of the humidity chart
    #[serde(default = "default_humidity_mount")]
    pub humidity_mount: String,
}

/// Export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory exported archives are written to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

// ============================================================================
// Default value functions
// ============================================================================

fn default_name() -> String {
    "Droplet Monitor".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_request_timeout() -> u64 {
    10_000
}

fn default_max_interval() -> u64 {
    3600
}

fn default_poll_period() -> u64 {
    1000
}

fn default_readiness_retry() -> u64 {
    100
}

fn default_live_view_index() -> usize {
    1
}

fn default_temperature_mount() -> String {
    "temperatureGraph".to_string()
}

fn default_humidity_mount() -> String {
    "humidityGraph".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_ms: default_request_timeout(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interval_secs: 0,
            max_interval_secs: default_max_interval(),
        }
    }
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            poll_period_ms: default_poll_period(),
            readiness_retry_ms: default_readiness_retry(),
            live_view_index: default_live_view_index(),
            temperature_mount: default_temperature_mount(),
            humidity_mount: default_humidity_mount(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

impl BackendConfig {
    /// Per-request timeout as a `Duration`.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl LiveConfig {
    /// Delay between live polls.
    pub fn poll_period(&self) -> Duration {
        Duration::from_millis(self.poll_period_ms)
    }

    /// Delay between mount point checks.
    pub fn readiness_retry(&self) -> Duration {
        Duration::from_millis(self.readiness_retry_ms)
    }
}

// ============================================================================
// Configuration Loading and Validation
// ============================================================================

impl Settings {
    /// Load configuration from `config/droplet.toml` (if present) and
    /// `DROPLET_` environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path.
    ///
    /// A missing file is not an error: defaults and environment variables
    /// still apply. The result is validated before it is returned.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings: Self = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("DROPLET_").split("__"))
            .extract()
            .map_err(|e| ConfigError::LoadError(Box::new(e)))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration after loading
    ///
    /// Checks:
    /// - Log level is valid (trace, debug, info, warn, error)
    /// - Backend base URL parses
    /// - Live poll period is non-zero and mount point names are non-empty
    /// - Initial capture interval does not exceed the maximum
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }

        if let Err(e) = parse_base_url(&self.backend.base_url) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid backend base_url '{}': {}",
                self.backend.base_url, e
            )));
        }

        if self.live.poll_period_ms == 0 {
            return Err(ConfigError::ValidationError(
                "live.poll_period_ms must be > 0".to_string(),
            ));
        }

        if self.live.temperature_mount.is_empty() || self.live.humidity_mount.is_empty() {
            return Err(ConfigError::ValidationError(
                "Chart mount point names cannot be empty".to_string(),
            ));
        }

        if self.capture.interval_secs > self.capture.max_interval_secs {
            return Err(ConfigError::ValidationError(format!(
                "capture.interval_secs {} exceeds capture.max_interval_secs {}",
                self.capture.interval_secs, self.capture.max_interval_secs
            )));
        }

        Ok(())
    }
}
