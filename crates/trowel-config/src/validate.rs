//! Validation and parsing helpers for environment values.

use std::time::Duration;

use url::Url;

use crate::error::{ConfigError, ConfigResult};

/// Parse an absolute `http`/`https` URL held by the named variable.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidUrl`] when the value does not parse and
/// [`ConfigError::InvalidField`] when the scheme is not HTTP(S).
pub fn parse_http_url(name: &'static str, value: &str) -> ConfigResult<Url> {
    let trimmed = value.trim();
    let url = Url::parse(trimmed).map_err(|source| ConfigError::InvalidUrl {
        name,
        value: trimmed.to_string(),
        source,
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidField {
            field: name,
            value: trimmed.to_string(),
            reason: "scheme must be http or https",
        });
    }
    Ok(url)
}

/// Ensure the URL path ends with `/` so resource paths can be appended verbatim.
#[must_use]
pub fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Parse a positive number of seconds.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for non-numeric or zero values.
pub fn parse_timeout_secs(name: &'static str, value: &str) -> ConfigResult<Duration> {
    let secs = value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|secs| *secs > 0)
        .ok_or_else(|| ConfigError::InvalidField {
            field: name,
            value: value.to_string(),
            reason: "must be a positive integer",
        })?;
    Ok(Duration::from_secs(secs))
}

/// Accept only the log formats the telemetry layer understands.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for anything other than `json` or `pretty`.
pub fn parse_log_format(name: &'static str, value: &str) -> ConfigResult<String> {
    let normalized = value.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "json" | "pretty" => Ok(normalized),
        _ => Err(ConfigError::InvalidField {
            field: name,
            value: value.to_string(),
            reason: "must be json or pretty",
        }),
    }
}
