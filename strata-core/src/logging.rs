//! Tracing and logging setup for Strata

use crate::error::{Result, StrataError};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when RUST_LOG is not set
    pub default_level: String,
    /// Show target module in logs
    pub show_target: bool,
    /// Show source file and line
    pub show_location: bool,
    /// Output logs as JSON
    pub json_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_level: "strata=info".to_string(),
            show_target: false,
            show_location: false,
            json_output: false,
        }
    }
}

impl LoggingConfig {
    /// Debug-level configuration with source locations
    pub fn verbose() -> Self {
        Self {
            default_level: "strata=debug,strata_core=debug,strata_cli=debug".to_string(),
            show_target: true,
            show_location: true,
            json_output: false,
        }
    }

    /// JSON output for machine consumption
    pub fn json() -> Self {
        Self {
            json_output: true,
            show_target: true,
            ..Self::default()
        }
    }
}

/// Install a global subscriber writing to stderr
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_level));

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(config.show_target)
        .with_file(config.show_location)
        .with_line_number(config.show_location);

    let registry = tracing_subscriber::registry().with(env_filter);
    let installed = if config.json_output {
        registry.with(layer.json()).try_init()
    } else {
        registry.with(layer).try_init()
    };

    installed.map_err(|e| StrataError::Config(format!("Failed to install tracing subscriber: {}", e)))
}
