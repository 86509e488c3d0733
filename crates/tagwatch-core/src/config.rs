//! Application configuration management.
//!
//! Configuration is a TOML file layered with environment overrides of the
//! form `TAGWATCH__SECTION__KEY` (for example `TAGWATCH__SCAN__SCAN_RATE_MS=100`).
//! Every field has a default, so a missing or partial file is fine. Values
//! are validated after loading and all violations are reported together.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound for the staleness threshold.
pub const MAX_STALE_AFTER_SECS: u64 = 30 * 24 * 60 * 60;

/// Prefix for environment overrides.
const ENV_PREFIX: &str = "TAGWATCH";

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested configuration file does not exist.
    #[error("Configuration file not found at: {}", .0.display())]
    NotFound(PathBuf),

    /// The file or environment could not be read or deserialised.
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    /// A single field holds an invalid value.
    #[error("{field}: {message}")]
    ValidationError {
        /// Dotted path of the offending field.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },

    /// Several fields are invalid.
    #[error("{} configuration errors", .0.len())]
    MultipleValidationErrors(Vec<ConfigError>),
}

/// Result alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// What causes the tracker to take a snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SnapshotTrigger {
    /// Every completed scan window.
    #[default]
    ScanWindow,
    /// A fixed-period timer (`snapshot_interval_ms`).
    Interval,
}

/// Radio duty cycle settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Rest between scan windows, in milliseconds.
    pub scan_rate_ms: u64,
    /// Length of an active scan window, in milliseconds.
    pub scan_length_ms: u64,
    /// Capacity of the advertisement channel.
    pub buffer_size: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            scan_rate_ms: 50,
            scan_length_ms: 200,
            buffer_size: 500,
        }
    }
}

impl ScanConfig {
    /// Rest between scan windows.
    #[must_use]
    pub const fn scan_rate(&self) -> Duration {
        Duration::from_millis(self.scan_rate_ms)
    }

    /// Length of an active scan window.
    #[must_use]
    pub const fn scan_length(&self) -> Duration {
        Duration::from_millis(self.scan_length_ms)
    }
}

/// Registry aging and snapshot settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Period of the eviction sweep, in milliseconds.
    pub trim_interval_ms: u64,
    /// Devices silent for longer than this are evicted, in seconds.
    pub stale_after_secs: u64,
    /// Snapshot trigger mode.
    pub snapshot_trigger: SnapshotTrigger,
    /// Snapshot period when the trigger is [`SnapshotTrigger::Interval`], in milliseconds.
    pub snapshot_interval_ms: u64,
    /// Capacity of the snapshot channel.
    pub snapshot_buffer: usize,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            trim_interval_ms: 1_000,
            stale_after_secs: 24 * 60 * 60,
            snapshot_trigger: SnapshotTrigger::ScanWindow,
            snapshot_interval_ms: 10_000,
            snapshot_buffer: 8,
        }
    }
}

impl TrackingConfig {
    /// Period of the eviction sweep.
    #[must_use]
    pub const fn trim_interval(&self) -> Duration {
        Duration::from_millis(self.trim_interval_ms)
    }

    /// Staleness threshold.
    #[must_use]
    pub fn stale_after(&self) -> chrono::Duration {
        let secs = self.stale_after_secs.min(MAX_STALE_AFTER_SECS);
        chrono::Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX / 1_000))
    }

    /// Snapshot period for interval mode.
    #[must_use]
    pub const fn snapshot_interval(&self) -> Duration {
        Duration::from_millis(self.snapshot_interval_ms)
    }
}

/// Terminal display settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Render snapshots to the terminal.
    pub enabled: bool,
    /// Terminal rows reserved for the table header and footer.
    pub row_margin: u16,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            row_margin: 5,
        }
    }
}

/// Read-only HTTP status API settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Serve the status API.
    pub enabled: bool,
    /// Listen address.
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind: "127.0.0.1:3000".to_string(),
        }
    }
}

impl ServerConfig {
    /// Parse the listen address.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `bind` is not a socket address.
    pub fn bind_addr(&self) -> ConfigResult<SocketAddr> {
        self.bind.parse().map_err(|e| ConfigError::ValidationError {
            field: "server.bind",
            message: format!("'{}' is not a socket address: {e}", self.bind),
        })
    }
}

/// Main application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path of the company identifier table.
    pub companies_path: PathBuf,
    /// Radio duty cycle.
    pub scan: ScanConfig,
    /// Registry aging and snapshots.
    pub tracking: TrackingConfig,
    /// Terminal display.
    pub display: DisplayConfig,
    /// HTTP status API.
    pub server: ServerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            companies_path: PathBuf::from("data/company_identifiers.toml"),
            scan: ScanConfig::default(),
            tracking: TrackingConfig::default(),
            display: DisplayConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with environment overrides.
    ///
    /// With an explicit `path` the file must exist. Without one the platform
    /// default location is used if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or the result
    /// fails validation.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut builder = config::Config::builder();
        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound(path.to_path_buf()));
                }
                builder = builder.add_source(File::from(path).format(FileFormat::Toml));
            }
            None => {
                if let Some(default_path) = Self::default_path() {
                    builder = builder.add_source(
                        File::from(default_path)
                            .format(FileFormat::Toml)
                            .required(false),
                    );
                }
            }
        }

        let config: Self = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string, without environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be parsed or fails validation.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: Self = config::Config::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Platform default configuration file location.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "tagwatch")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Check every field, reporting all violations at once.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError::ValidationError`] for a single violation or
    /// [`ConfigError::MultipleValidationErrors`] for several.
    pub fn validate(&self) -> ConfigResult<()> {
        let mut errors = Vec::new();
        let mut non_zero = |field: &'static str, value: u64| {
            if value == 0 {
                errors.push(ConfigError::ValidationError {
                    field,
                    message: "must be greater than zero".to_string(),
                });
            }
        };

        non_zero("scan.scan_rate_ms", self.scan.scan_rate_ms);
        non_zero("scan.scan_length_ms", self.scan.scan_length_ms);
        non_zero("scan.buffer_size", self.scan.buffer_size as u64);
        non_zero("tracking.trim_interval_ms", self.tracking.trim_interval_ms);
        non_zero("tracking.stale_after_secs", self.tracking.stale_after_secs);
        non_zero("tracking.snapshot_interval_ms", self.tracking.snapshot_interval_ms);
        non_zero("tracking.snapshot_buffer", self.tracking.snapshot_buffer as u64);

        if self.tracking.stale_after_secs > MAX_STALE_AFTER_SECS {
            errors.push(ConfigError::ValidationError {
                field: "tracking.stale_after_secs",
                message: format!("must be at most {MAX_STALE_AFTER_SECS} (30 days)"),
            });
        }
        if self.tracking.trim_interval_ms > self.tracking.stale_after_secs.saturating_mul(1_000) {
            errors.push(ConfigError::ValidationError {
                field: "tracking.trim_interval_ms",
                message: "must not exceed the staleness threshold".to_string(),
            });
        }
        if let Err(e) = self.server.bind_addr() {
            errors.push(e);
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ConfigError::MultipleValidationErrors(errors)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scan.scan_rate(), Duration::from_millis(50));
        assert_eq!(config.scan.scan_length(), Duration::from_millis(200));
        assert_eq!(config.tracking.stale_after(), chrono::Duration::hours(24));
        assert_eq!(config.tracking.snapshot_trigger, SnapshotTrigger::ScanWindow);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
[scan]
scan_length_ms = 500

[tracking]
snapshot_trigger = "interval"
"#,
        )
        .unwrap();

        assert_eq!(config.scan.scan_length_ms, 500);
        assert_eq!(config.scan.scan_rate_ms, 50);
        assert_eq!(config.tracking.snapshot_trigger, SnapshotTrigger::Interval);
        assert_eq!(config.tracking.snapshot_interval_ms, 10_000);
        assert!(!config.server.enabled);
    }

    #[test]
    fn test_single_validation_error() {
        let err = Config::from_toml_str("[scan]\nbuffer_size = 0\n").unwrap_err();
        match err {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, "scan.buffer_size"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_multiple_validation_errors() {
        let err = Config::from_toml_str(
            r#"
[scan]
scan_rate_ms = 0

[server]
bind = "not an address"
"#,
        )
        .unwrap_err();
        match err {
            ConfigError::MultipleValidationErrors(errors) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_stale_threshold_bounds() {
        let mut config = Config::default();
        config.tracking.stale_after_secs = MAX_STALE_AFTER_SECS + 1;
        assert!(config.validate().is_err());

        config.tracking.stale_after_secs = 1;
        config.tracking.trim_interval_ms = 5_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_trigger_rejected() {
        let err = Config::from_toml_str("[tracking]\nsnapshot_trigger = \"sometimes\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::LoadError(_)));
    }

    #[test]
    fn test_explicit_missing_file() {
        let err = Config::load(Some(Path::new("/nonexistent/tagwatch.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(b"companies_path = \"/tmp/companies.toml\"\n[display]\nrow_margin = 3\n")
            .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.companies_path, PathBuf::from("/tmp/companies.toml"));
        assert_eq!(config.display.row_margin, 3);
    }
}
