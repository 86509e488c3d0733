//! Unified error types for the tagwatch core library.
//!
//! Each module has its own specific error type ([`ConfigError`],
//! [`CompanyTableError`], [`BluetoothError`]); [`TagwatchError`] is what the
//! pipeline and the binaries deal in.
//!
//! Steady-state scan failures never surface here: the scan source logs them
//! and retries on the next window. What reaches a caller is a startup failure.
//!
//! [`ConfigError`]: crate::config::ConfigError
//! [`CompanyTableError`]: crate::companies::CompanyTableError
//! [`BluetoothError`]: crate::bluetooth::BluetoothError

use std::path::PathBuf;
use thiserror::Error;

/// The unified error type for all tagwatch operations.
#[derive(Debug, Error)]
pub enum TagwatchError {
    // =========================================================================
    // BLUETOOTH ERRORS
    // =========================================================================
    /// No Bluetooth adapter was found on this system.
    #[error(
        "No Bluetooth adapter found. Ensure Bluetooth hardware is present and drivers are loaded."
    )]
    BluetoothAdapterNotFound,

    /// The Bluetooth adapter exists but could not be powered on.
    #[error("Bluetooth adapter is powered off. Run 'bluetoothctl power on' to enable.")]
    BluetoothAdapterPoweredOff,

    /// Bluetooth scanning failed.
    #[error("Bluetooth scan failed: {0}")]
    BluetoothScanFailed(String),

    // =========================================================================
    // COMPANY TABLE ERRORS
    // =========================================================================
    /// The company identifier table was not found.
    #[error("Company identifier table not found at: {}", .0.display())]
    CompanyTableNotFound(PathBuf),

    /// The company identifier table could not be read, parsed, or was empty.
    #[error("Invalid company identifier table: {0}")]
    CompanyTableInvalid(String),

    // =========================================================================
    // CONFIGURATION ERRORS
    // =========================================================================
    /// The configuration file was not found at the expected path.
    #[error("Configuration file not found at: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// The configuration could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    ConfigParseError(String),

    /// The configuration was parsed but contains invalid values.
    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),
}

/// A specialized [`Result`] type for tagwatch operations.
pub type Result<T> = std::result::Result<T, TagwatchError>;

/// Short alias for [`TagwatchError`].
pub type Error = TagwatchError;

impl TagwatchError {
    /// Returns `true` if this error is related to Bluetooth operations.
    #[inline]
    #[must_use]
    pub const fn is_bluetooth_error(&self) -> bool {
        matches!(
            self,
            Self::BluetoothAdapterNotFound
                | Self::BluetoothAdapterPoweredOff
                | Self::BluetoothScanFailed(_)
        )
    }

    /// Returns `true` if this error is related to the company table.
    #[inline]
    #[must_use]
    pub const fn is_company_table_error(&self) -> bool {
        matches!(
            self,
            Self::CompanyTableNotFound(_) | Self::CompanyTableInvalid(_)
        )
    }

    /// Returns `true` if this error is related to configuration.
    #[inline]
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound(_) | Self::ConfigParseError(_) | Self::ConfigValidationError(_)
        )
    }

    /// Returns `true` if retrying later may succeed without user intervention.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::BluetoothScanFailed(_))
    }

    /// Returns a machine-readable error code.
    #[inline]
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::BluetoothAdapterNotFound => "BLUETOOTH_ADAPTER_NOT_FOUND",
            Self::BluetoothAdapterPoweredOff => "BLUETOOTH_ADAPTER_POWERED_OFF",
            Self::BluetoothScanFailed(_) => "BLUETOOTH_SCAN_FAILED",
            Self::CompanyTableNotFound(_) => "COMPANY_TABLE_NOT_FOUND",
            Self::CompanyTableInvalid(_) => "COMPANY_TABLE_INVALID",
            Self::ConfigNotFound(_) => "CONFIG_NOT_FOUND",
            Self::ConfigParseError(_) => "CONFIG_PARSE_ERROR",
            Self::ConfigValidationError(_) => "CONFIG_VALIDATION_ERROR",
        }
    }

    /// A one-line suggestion for the operator, logged next to a startup failure.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        if self.is_recoverable() {
            None
        } else if self.is_bluetooth_error() {
            Some("check the adapter with 'bluetoothctl show', or build without the `bluetooth` feature to replay demo data")
        } else if self.is_company_table_error() {
            Some("point `companies_path` (or TAGWATCH__COMPANIES_PATH) at a company identifier table")
        } else if self.is_config_error() {
            Some("fix the configuration file named by TAGWATCH_CONFIG or the TAGWATCH__* overrides")
        } else {
            None
        }
    }
}

// =============================================================================
// CONVERSIONS FROM MODULE-SPECIFIC ERRORS
// =============================================================================

impl From<crate::config::ConfigError> for TagwatchError {
    fn from(err: crate::config::ConfigError) -> Self {
        use crate::config::ConfigError;
        match err {
            ConfigError::NotFound(path) => Self::ConfigNotFound(path),
            ConfigError::LoadError(e) => Self::ConfigParseError(e.to_string()),
            e @ ConfigError::ValidationError { .. } => Self::ConfigValidationError(e.to_string()),
            ConfigError::MultipleValidationErrors(errors) => {
                let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
                Self::ConfigValidationError(messages.join("; "))
            }
        }
    }
}

impl From<crate::companies::CompanyTableError> for TagwatchError {
    fn from(err: crate::companies::CompanyTableError) -> Self {
        use crate::companies::CompanyTableError;
        match err {
            CompanyTableError::NotFound(path) => Self::CompanyTableNotFound(path),
            other => Self::CompanyTableInvalid(other.to_string()),
        }
    }
}

impl From<crate::bluetooth::BluetoothError> for TagwatchError {
    fn from(err: crate::bluetooth::BluetoothError) -> Self {
        use crate::bluetooth::BluetoothError;
        match err {
            BluetoothError::AdapterNotFound => Self::BluetoothAdapterNotFound,
            BluetoothError::AdapterPoweredOff => Self::BluetoothAdapterPoweredOff,
            BluetoothError::SessionInitFailed { message }
            | BluetoothError::DiscoveryFailed { message } => Self::BluetoothScanFailed(message),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bluetooth::BluetoothError;
    use crate::companies::CompanyTableError;
    use crate::config::ConfigError;

    #[test]
    fn test_bluetooth_error_classification() {
        assert!(TagwatchError::BluetoothAdapterNotFound.is_bluetooth_error());
        assert!(TagwatchError::BluetoothAdapterPoweredOff.is_bluetooth_error());
        assert!(TagwatchError::BluetoothScanFailed("test".into()).is_bluetooth_error());

        assert!(!TagwatchError::ConfigParseError("x".into()).is_bluetooth_error());
    }

    #[test]
    fn test_config_error_classification() {
        assert!(TagwatchError::ConfigNotFound(PathBuf::from("/test")).is_config_error());
        assert!(TagwatchError::ConfigParseError("syntax error".into()).is_config_error());
        assert!(TagwatchError::ConfigValidationError("invalid value".into()).is_config_error());

        assert!(!TagwatchError::BluetoothAdapterNotFound.is_config_error());
    }

    #[test]
    fn test_company_table_classification() {
        assert!(TagwatchError::CompanyTableNotFound(PathBuf::new()).is_company_table_error());
        assert!(TagwatchError::CompanyTableInvalid("empty".into()).is_company_table_error());
        assert!(!TagwatchError::ConfigNotFound(PathBuf::new()).is_company_table_error());
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(TagwatchError::BluetoothScanFailed("timeout".into()).is_recoverable());
        assert!(!TagwatchError::BluetoothAdapterNotFound.is_recoverable());
        assert!(!TagwatchError::CompanyTableNotFound(PathBuf::new()).is_recoverable());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            TagwatchError::BluetoothAdapterNotFound.error_code(),
            "BLUETOOTH_ADAPTER_NOT_FOUND"
        );
        assert_eq!(
            TagwatchError::CompanyTableInvalid(String::new()).error_code(),
            "COMPANY_TABLE_INVALID"
        );
        assert_eq!(
            TagwatchError::ConfigNotFound(PathBuf::new()).error_code(),
            "CONFIG_NOT_FOUND"
        );
    }

    #[test]
    fn test_from_config_error() {
        let err: TagwatchError = ConfigError::MultipleValidationErrors(vec![
            ConfigError::ValidationError {
                field: "scan.buffer_size",
                message: "must be greater than zero".into(),
            },
            ConfigError::ValidationError {
                field: "server.bind",
                message: "bad".into(),
            },
        ])
        .into();
        match err {
            TagwatchError::ConfigValidationError(msg) => {
                assert!(msg.contains("scan.buffer_size"));
                assert!(msg.contains("; server.bind"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_from_company_table_error() {
        let err: TagwatchError = CompanyTableError::NotFound(PathBuf::from("/x.toml")).into();
        assert!(matches!(err, TagwatchError::CompanyTableNotFound(_)));

        let err: TagwatchError = CompanyTableError::Empty(PathBuf::from("/x.toml")).into();
        assert!(matches!(err, TagwatchError::CompanyTableInvalid(_)));
    }

    #[test]
    fn test_from_bluetooth_error() {
        let err: TagwatchError = BluetoothError::AdapterPoweredOff.into();
        assert!(matches!(err, TagwatchError::BluetoothAdapterPoweredOff));

        let err: TagwatchError = BluetoothError::DiscoveryFailed {
            message: "busy".into(),
        }
        .into();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_hint_follows_error_category() {
        let hint = TagwatchError::BluetoothAdapterPoweredOff.hint().unwrap();
        assert!(hint.contains("bluetoothctl"));

        let hint = TagwatchError::CompanyTableNotFound(PathBuf::new()).hint().unwrap();
        assert!(hint.contains("companies_path"));

        let hint = TagwatchError::ConfigParseError("x".into()).hint().unwrap();
        assert!(hint.contains("TAGWATCH_CONFIG"));

        assert!(TagwatchError::BluetoothScanFailed("busy".into()).hint().is_none());
    }

    #[test]
    fn test_error_display_messages() {
        let err = TagwatchError::BluetoothAdapterNotFound;
        assert!(format!("{err}").contains("No Bluetooth adapter found"));

        let err = TagwatchError::CompanyTableNotFound(PathBuf::from("/etc/companies.toml"));
        assert!(format!("{err}").contains("/etc/companies.toml"));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<TagwatchError>();
        assert_sync::<TagwatchError>();
    }
}
