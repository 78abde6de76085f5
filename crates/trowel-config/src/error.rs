//! Error types for configuration loading.

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable was not set or was blank.
    #[error("missing required configuration variable {name}")]
    MissingVar {
        /// Name of the variable.
        name: &'static str,
    },
    /// A variable held a value that is not an absolute URL.
    #[error("invalid URL in {name}")]
    InvalidUrl {
        /// Name of the variable.
        name: &'static str,
        /// Offending value.
        value: String,
        /// Parser error detail.
        source: url::ParseError,
    },
    /// A variable held a value outside its accepted range or vocabulary.
    #[error("invalid configuration field {field}: {reason}")]
    InvalidField {
        /// Name of the variable.
        field: &'static str,
        /// Offending value.
        value: String,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// The process-wide configuration was installed twice.
    #[error("configuration already installed")]
    AlreadyInstalled,
    /// The process-wide configuration was read before installation.
    #[error("configuration not installed")]
    NotInstalled,
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;
