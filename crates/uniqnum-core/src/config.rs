//! Configuration management for the uniqnum server.
//!
//! Settings come from, lowest precedence first:
//! - built-in defaults (every field has one, so no file is required)
//! - an optional YAML file
//! - `UNIQNUM__SECTION__FIELD` environment variables
//!
//! Command line overrides are applied by the binary on top of the result.

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::Level;

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "UNIQNUM";

/// Largest accepted `server.max_clients`.
pub const MAX_CLIENTS_LIMIT: usize = 65_536;

/// Main application configuration.
///
/// # Examples
///
/// ```
/// use uniqnum_core::config::AppConfig;
///
/// let config = AppConfig::from_yaml("server:\n  port: 4100\n").unwrap();
/// assert_eq!(config.server.port, 4100);
/// assert_eq!(config.server.max_clients, 5);
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Listener, admission and scheduling settings
    #[serde(default)]
    pub server: ServerSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl AppConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML cannot be parsed.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| {
            ConfigError::InvalidFormat {
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Loads configuration using the `config` crate: the optional file, then
    /// environment variable overrides (`UNIQNUM__SERVER__PORT=4100`).
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be read or the merged result
    /// does not deserialize.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let source = path
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "environment".to_string());

        let config = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigError::LoadFailed {
                path: source,
                reason: e.to_string(),
            })?;

        config.try_deserialize().map_err(|e| {
            ConfigError::InvalidFormat {
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first invalid value found.
    pub fn validate(&self) -> Result<()> {
        self.server.validate()?;
        self.logging.parse_level()?;
        Ok(())
    }
}

/// Listener, admission and scheduling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Interface to bind
    #[serde(default = "default_bind_host")]
    pub bind_host: String,
    /// TCP port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum simultaneously served clients; extra clients are closed
    #[serde(default = "default_max_clients")]
    pub max_clients: usize,
    /// Seconds between stats reports
    #[serde(default = "default_stats_interval")]
    pub stats_interval_secs: u64,
    /// Seconds in-flight clients may keep running after terminate
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,
    /// Longest accepted line in bytes, excluding the line break
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,
}

fn default_bind_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    4000
}

fn default_max_clients() -> usize {
    5
}

fn default_stats_interval() -> u64 {
    10
}

fn default_shutdown_grace() -> u64 {
    10
}

fn default_max_line_length() -> usize {
    64
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_host: default_bind_host(),
            port: default_port(),
            max_clients: default_max_clients(),
            stats_interval_secs: default_stats_interval(),
            shutdown_grace_secs: default_shutdown_grace(),
            max_line_length: default_max_line_length(),
        }
    }
}

impl ServerSettings {
    /// Returns `host:port`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }

    /// Returns the stats interval as a Duration.
    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_secs)
    }

    /// Returns the shutdown grace period as a Duration.
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.max_clients == 0 {
            return Err(ConfigError::invalid_value("server.max_clients", "must be at least 1").into());
        }
        if self.max_clients > MAX_CLIENTS_LIMIT {
            return Err(ConfigError::invalid_value(
                "server.max_clients",
                format!("must be at most {}", MAX_CLIENTS_LIMIT),
            )
            .into());
        }
        if self.stats_interval_secs == 0 {
            return Err(
                ConfigError::invalid_value("server.stats_interval_secs", "must be at least 1").into(),
            );
        }
        // Shortest line we must accept is "terminate".
        if self.max_line_length < crate::protocol::TERMINATE.len() {
            return Err(ConfigError::invalid_value(
                "server.max_line_length",
                format!("must be at least {}", crate::protocol::TERMINATE.len()),
            )
            .into());
        }
        Ok(())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format: "text" or "json"
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    /// Whether to include timestamps
    #[serde(default = "default_true")]
    pub timestamps: bool,
    /// Optional file receiving one line per unique number
    #[serde(default)]
    pub numbers_file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Text
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            timestamps: true,
            numbers_file: None,
        }
    }
}

impl LoggingConfig {
    /// Parses the log level string to a tracing Level.
    pub fn parse_level(&self) -> Result<Level> {
        self.level.parse().map_err(|_| {
            ConfigError::invalid_value("logging.level", format!("Invalid log level: {}", self.level))
                .into()
        })
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format
    Text,
    /// JSON format for structured logging
    Json,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Serve a Prometheus scrape endpoint
    #[serde(default)]
    pub enabled: bool,
    /// Scrape endpoint address
    #[serde(default = "default_metrics_bind")]
    pub bind_address: String,
}

fn default_metrics_bind() -> String {
    "0.0.0.0:9000".to_string()
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: default_metrics_bind(),
        }
    }
}
