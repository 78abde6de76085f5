//! Typed configuration model.

use std::time::Duration;

use url::Url;

/// Process-wide environment configuration read once at start-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    /// Root of the resource API; always ends with `/`.
    pub api_endpoint: Url,
    /// Public domain name of the deployment.
    pub domain_name: String,
    /// Upload endpoint of the file conversion service.
    pub conversion_endpoint: Url,
    /// Optional redirect/proxy endpoint for third-party URLs.
    pub redirect_endpoint: Option<Url>,
    /// Timeout applied to every HTTP request.
    pub http_timeout: Duration,
    /// Log level used when `RUST_LOG` is absent.
    pub log_level: String,
    /// Requested log format, if any (`json` or `pretty`).
    pub log_format: Option<String>,
}

impl EnvConfig {
    /// Build a configuration for the given API root with defaults elsewhere.
    ///
    /// Intended for hosts and tests that wire the client up explicitly.
    #[must_use]
    pub fn for_api(api_endpoint: Url, domain_name: impl Into<String>) -> Self {
        let domain_name = domain_name.into();
        let conversion_endpoint = crate::loader::default_conversion_endpoint(&domain_name)
            .unwrap_or_else(|| api_endpoint.clone());
        Self {
            api_endpoint: crate::validate::with_trailing_slash(api_endpoint),
            domain_name,
            conversion_endpoint,
            redirect_endpoint: None,
            http_timeout: Duration::from_secs(crate::defaults::DEFAULT_HTTP_TIMEOUT_SECS),
            log_level: crate::defaults::DEFAULT_LOG_LEVEL.to_string(),
            log_format: None,
        }
    }
}
