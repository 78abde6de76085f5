//! Environment loading and the process-wide configuration slot.
//!
//! # Design
//! - Loading goes through a key lookup closure so tests never touch the
//!   real process environment.
//! - The installed configuration is write-once; readers get a `'static`
//!   reference.

use once_cell::sync::OnceCell;
use tracing::info;
use url::Url;

use crate::defaults::{
    CONVERSION_UPLOAD_PATH, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_LOG_LEVEL, ENV_API_ENDPOINT,
    ENV_CONVERSION_ENDPOINT, ENV_DOMAIN_NAME, ENV_HTTP_TIMEOUT_SECS, ENV_LOG_FORMAT,
    ENV_LOG_LEVEL, ENV_REDIRECT_ENDPOINT,
};
use crate::error::{ConfigError, ConfigResult};
use crate::model::EnvConfig;
use crate::validate::{parse_http_url, parse_log_format, parse_timeout_secs, with_trailing_slash};

static INSTALLED: OnceCell<EnvConfig> = OnceCell::new();

impl EnvConfig {
    /// Load the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error when a required variable is missing or any value fails validation.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load the configuration through an arbitrary key lookup.
    ///
    /// Blank values are treated as unset.
    ///
    /// # Errors
    ///
    /// Returns an error when a required variable is missing or any value fails validation.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let api_endpoint = read(ENV_API_ENDPOINT).ok_or(ConfigError::MissingVar {
            name: ENV_API_ENDPOINT,
        })?;
        let api_endpoint = with_trailing_slash(parse_http_url(ENV_API_ENDPOINT, &api_endpoint)?);

        let domain_name = read(ENV_DOMAIN_NAME).ok_or(ConfigError::MissingVar {
            name: ENV_DOMAIN_NAME,
        })?;

        let conversion_endpoint = match read(ENV_CONVERSION_ENDPOINT) {
            Some(value) => parse_http_url(ENV_CONVERSION_ENDPOINT, &value)?,
            None => default_conversion_endpoint(&domain_name).ok_or_else(|| {
                ConfigError::InvalidField {
                    field: ENV_DOMAIN_NAME,
                    value: domain_name.clone(),
                    reason: "must be a bare host name",
                }
            })?,
        };

        let redirect_endpoint = read(ENV_REDIRECT_ENDPOINT)
            .map(|value| parse_http_url(ENV_REDIRECT_ENDPOINT, &value))
            .transpose()?;

        let http_timeout = match read(ENV_HTTP_TIMEOUT_SECS) {
            Some(value) => parse_timeout_secs(ENV_HTTP_TIMEOUT_SECS, &value)?,
            None => std::time::Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        };

        let log_level = read(ENV_LOG_LEVEL).unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
        let log_format = read(ENV_LOG_FORMAT)
            .map(|value| parse_log_format(ENV_LOG_FORMAT, &value))
            .transpose()?;

        Ok(Self {
            api_endpoint,
            domain_name,
            conversion_endpoint,
            redirect_endpoint,
            http_timeout,
            log_level,
            log_format,
        })
    }
}

pub(crate) fn default_conversion_endpoint(domain_name: &str) -> Option<Url> {
    Url::parse(&format!("https://{domain_name}/"))
        .ok()?
        .join(CONVERSION_UPLOAD_PATH)
        .ok()
}

/// Install the process-wide configuration.
///
/// # Errors
///
/// Returns [`ConfigError::AlreadyInstalled`] when called more than once.
pub fn install(config: EnvConfig) -> ConfigResult<&'static EnvConfig> {
    let api = config.api_endpoint.to_string();
    INSTALLED
        .set(config)
        .map_err(|_| ConfigError::AlreadyInstalled)?;
    info!(api_endpoint = %api, "environment configuration installed");
    current()
}

/// Access the installed configuration.
///
/// # Errors
///
/// Returns [`ConfigError::NotInstalled`] before [`install`] has run.
pub fn current() -> ConfigResult<&'static EnvConfig> {
    INSTALLED.get().ok_or(ConfigError::NotInstalled)
}

/// Access the installed configuration if present.
#[must_use]
pub fn try_current() -> Option<&'static EnvConfig> {
    INSTALLED.get()
}
