//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `plotter.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::time::Duration;

use serde::Deserialize;

use plotter_app::services::SessionOptions;
use plotter_domain::session_config::SessionConfig;
use plotter_domain::units::mm_to_um;
use plotter_domain::workspace::Workspace;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serial framing and the port to connect to.
    pub serial: SessionConfig,
    /// Travel limits.
    pub workspace: WorkspaceConfig,
    /// Engine tunables and startup behaviour.
    pub session: SessionSection,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Travel limits in millimeters.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    pub max_x_mm: i64,
    pub max_y_mm: i64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// Upper bound on one blocking serial read.
    pub read_poll_ms: u64,
    /// How long a position refresh waits for the device.
    pub query_timeout_ms: u64,
    /// Terminal log records buffered per subscriber.
    pub log_capacity: usize,
    /// Delay before re-reading the position after a real move, 0 disables.
    pub resync_delay_ms: u64,
    /// Start in emulation mode.
    pub emulation: bool,
    /// Connect to `[serial] port` on startup.
    pub auto_connect: bool,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from `plotter.toml` (if present), apply
    /// environment-variable overrides, then validate.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting values are unusable.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("plotter.toml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("PLOTTER_PORT") {
            self.serial.port = val;
        }
        if let Ok(val) = std::env::var("PLOTTER_BAUD") {
            if let Ok(baud) = val.parse() {
                self.serial.baud_rate = baud;
            }
        }
        if let Ok(val) = std::env::var("PLOTTER_EMULATION") {
            if let Some(enabled) = parse_flag(&val) {
                self.session.emulation = enabled;
            }
        }
        if let Ok(val) = std::env::var("PLOTTER_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.serial.baud_rate == 0 {
            return Err(ConfigError::Validation("baud rate must be non-zero".to_string()));
        }
        if self.session.auto_connect && self.serial.port.trim().is_empty() {
            return Err(ConfigError::Validation(
                "auto_connect needs [serial] port".to_string(),
            ));
        }
        if self.session.read_poll_ms == 0 || self.session.query_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "read_poll_ms and query_timeout_ms must be non-zero".to_string(),
            ));
        }
        if self.session.log_capacity == 0 {
            return Err(ConfigError::Validation(
                "log_capacity must be non-zero".to_string(),
            ));
        }
        self.workspace()?;
        Ok(())
    }

    /// Workspace limits converted to micrometers.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] for negative or oversized limits.
    pub fn workspace(&self) -> Result<Workspace, ConfigError> {
        let max_x = mm_to_um(self.workspace.max_x_mm)?;
        let max_y = mm_to_um(self.workspace.max_y_mm)?;
        Ok(Workspace::new(max_x, max_y)?)
    }

    #[must_use]
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            read_poll: Duration::from_millis(self.session.read_poll_ms),
            query_timeout: Duration::from_millis(self.session.query_timeout_ms),
            log_capacity: self.session.log_capacity,
            resync_delay: (self.session.resync_delay_ms > 0)
                .then(|| Duration::from_millis(self.session.resync_delay_ms)),
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            max_x_mm: 200,
            max_y_mm: 150,
        }
    }
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            read_poll_ms: 100,
            query_timeout_ms: 250,
            log_capacity: 256,
            resync_delay_ms: 200,
            emulation: false,
            auto_connect: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "plotterctl=info,plotter_app=info,plotter_adapter_serial=info".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

impl From<plotter_domain::error::ValidationError> for ConfigError {
    fn from(err: plotter_domain::error::ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}
