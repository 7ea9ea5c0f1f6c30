//! Layered configuration using Figment.
//!
//! Configuration is merged from, lowest priority first:
//! 1. Built-in defaults
//! 2. A TOML file (`--config <path>`, or `<config_dir>/astropi/config.toml`)
//! 3. Environment variables prefixed with `ASTROPI_`, nested with `__`
//!
//! # Example
//! ```no_run
//! use astropi_control::config::PanelConfig;
//!
//! // ASTROPI_CAPTURE__POLL_INTERVAL=500ms overrides capture.poll_interval
//! let config = PanelConfig::load(None)?;
//! println!("Server: {}", config.server.url);
//! # Ok::<(), astropi_control::error::CaptureError>(())
//! ```

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::connection::DEFAULT_SERVER_URL;
use crate::error::{CaptureError, Result};

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "ASTROPI_";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PanelConfig {
    /// Capture server connection
    #[serde(default)]
    pub server: ServerConfig,
    /// Capture session behaviour
    #[serde(default)]
    pub capture: CaptureConfig,
    /// Diagnostic logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Capture server connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the capture server
    #[serde(default = "default_server_url")]
    pub url: String,
    /// How long to wait for a TCP connection
    #[serde(default = "default_connect_timeout", with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// Upper bound on a single request, enforced by the HTTP client
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,
}

/// Capture session settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Delay between a "capturing" status and the next poll
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format (pretty, compact, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(2)
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: default_server_url(),
            connect_timeout: default_connect_timeout(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl PanelConfig {
    /// Default configuration file location (`<config_dir>/astropi/config.toml`).
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("astropi").join("config.toml"))
    }

    /// Load configuration from an explicit path or the default location,
    /// then apply environment overrides and validate.
    ///
    /// A missing file is not an error; defaults and environment still apply.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).or_else(Self::default_path);
        let config: Self = Self::figment(path.as_deref()).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Build the provider stack without extracting.
    #[must_use]
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            tracing::debug!(path = %path.display(), "Reading configuration file");
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(CaptureError::Config(format!(
                "Invalid logging.level '{}'. Must be one of: {}",
                self.logging.level,
                valid_levels.join(", ")
            )));
        }

        let valid_formats = ["pretty", "compact", "json"];
        if !valid_formats.contains(&self.logging.format.to_lowercase().as_str()) {
            return Err(CaptureError::Config(format!(
                "Invalid logging.format '{}'. Must be one of: {}",
                self.logging.format,
                valid_formats.join(", ")
            )));
        }

        if self.capture.poll_interval.is_zero() {
            return Err(CaptureError::Config(
                "capture.poll_interval must be greater than zero".to_string(),
            ));
        }

        if self.server.connect_timeout.is_zero() || self.server.request_timeout.is_zero() {
            return Err(CaptureError::Config(
                "server timeouts must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PanelConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.capture.poll_interval, Duration::from_secs(2));
        assert_eq!(config.server.url, "http://127.0.0.1:5000");
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = PanelConfig::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_format() {
        let mut config = PanelConfig::default();
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let mut config = PanelConfig::default();
        config.capture.poll_interval = Duration::ZERO;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("poll_interval"));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist.toml");
        let config: PanelConfig = PanelConfig::figment(Some(&missing)).extract().unwrap();
        assert_eq!(config.capture, CaptureConfig::default());
        assert_eq!(config.logging, LoggingConfig::default());
    }
}
