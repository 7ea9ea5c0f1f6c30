//! Diagnostic tracing setup.
//!
//! Operator-facing messages go through [`crate::notifications`]; this module
//! configures the developer-facing `tracing` output. `RUST_LOG` wins over the
//! configured level, and everything is written to stderr so stdout carries
//! only the notification stream.
//!
//! # Example
//! ```no_run
//! use astropi_control::{config::PanelConfig, tracing_setup};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PanelConfig::load(None)?;
//! tracing_setup::init_from_config(&config)?;
//! tracing::info!("Control panel started");
//! # Ok(())
//! # }
//! ```

use std::io::IsTerminal;
use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

use crate::config::PanelConfig;
use crate::error::{CaptureError, Result};

/// How diagnostic events are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Multi-line, for reading at a terminal
    Pretty,
    /// One line per event
    Compact,
    /// Newline-delimited JSON
    Json,
}

impl FromStr for OutputFormat {
    type Err = CaptureError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            _ => Err(CaptureError::Config(format!(
                "Invalid log format '{s}'. Must be one of: pretty, compact, json"
            ))),
        }
    }
}

/// Level and format taken from the `[logging]` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TracingConfig {
    /// Default level when `RUST_LOG` is unset
    pub level: Level,
    /// Rendering of each event
    pub format: OutputFormat,
}

impl TracingConfig {
    /// Read the `[logging]` table, rejecting unknown levels or formats.
    pub fn from_panel_config(config: &PanelConfig) -> Result<Self> {
        let level = Level::from_str(&config.logging.level).map_err(|_| {
            CaptureError::Config(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                config.logging.level
            ))
        })?;
        let format = config.logging.format.parse()?;
        Ok(Self { level, format })
    }

    fn directives(&self) -> String {
        // HTTP internals stay quiet unless RUST_LOG asks for them
        format!("{},hyper=warn,reqwest=warn", self.level.as_str().to_lowercase())
    }
}

/// Install the global subscriber described by `config.logging`.
///
/// Does nothing if a subscriber is already installed.
pub fn init_from_config(config: &PanelConfig) -> Result<()> {
    let tracing_config = TracingConfig::from_panel_config(config)?;
    if tracing::dispatcher::has_been_set() {
        return Ok(());
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(tracing_config.directives()));
    let ansi = std::io::stderr().is_terminal();

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match tracing_config.format {
        OutputFormat::Pretty => fmt::layer()
            .pretty()
            .with_writer(std::io::stderr)
            .with_ansi(ansi)
            .boxed(),
        OutputFormat::Compact => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_ansi(ansi)
            .boxed(),
        OutputFormat::Json => fmt::layer().json().with_writer(std::io::stderr).boxed(),
    };

    tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .try_init()
        .map_err(|e| CaptureError::Config(format!("Failed to initialize tracing: {e}")))
}
