//! Monitor configuration
//!
//! Configuration management for the droplet monitor using Figment.
//!
//! # Configuration Sources
//!
//! Configuration is layered (later sources win):
//! 1. Built-in defaults
//! 2. TOML configuration file (default: `config/droplet.toml`, optional)
//! 3. Environment variables prefixed with `DROPLET_`
//!
//! # Example
//!
//! ```no_run
//! use droplet_monitor::config::Settings;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::load()?;
//!     println!("Backend: {}", settings.backend.base_url);
//!     println!("Live poll period: {:?}", settings.live.poll_period());
//!     Ok(())
//! }
//! ```
//!
//! # Environment Variables
//!
//! Nested keys are separated by a double underscore:
//!
//! ```text
//! DROPLET_BACKEND__BASE_URL=http://droplet.local:5000
//! DROPLET_APPLICATION__LOG_LEVEL=debug
//! DROPLET_CAPTURE__INTERVAL_SECS=30
//! ```

pub mod settings;

pub use settings::{
    ApplicationConfig, BackendConfig, CaptureConfig, ConfigError, ExportConfig, LiveConfig,
    Settings,
};
