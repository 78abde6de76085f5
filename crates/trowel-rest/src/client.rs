//! HTTP client for the resource API.
//!
//! # Design
//! - Resource paths are appended verbatim to the API root, so callers may
//!   pass paths that already carry a PostgREST query string.
//! - Errors are logged once here and returned unmodified; callers decide how
//!   to present them.

use std::time::Duration;

use once_cell::sync::OnceCell;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Method, Response};
use serde_json::Value;
use tracing::{error, info};
use trowel_config::EnvConfig;
use trowel_telemetry::Metrics;
use url::Url;

use crate::error::{RestError, RestResult};
use crate::request::{Body, PREFER_HEADER, Prefer, RestRequest};

static SHARED: OnceCell<RestClient> = OnceCell::new();

/// Client bound to one API root.
#[derive(Clone)]
pub struct RestClient {
    http: Client,
    base_url: Url,
    metrics: Option<Metrics>,
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("RestClient")
            .field("base_url", &self.base_url.as_str())
            .field("metrics", &self.metrics.is_some())
            .finish_non_exhaustive()
    }
}

impl RestClient {
    /// Build a client for `base_url` with the given request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`RestError::BuildClient`] when the TLS backend cannot be initialised.
    pub fn new(base_url: Url, timeout: Duration) -> RestResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| RestError::BuildClient { source })?;
        Ok(Self::with_client(http, base_url))
    }

    /// Wrap an already configured `reqwest` client.
    #[must_use]
    pub fn with_client(http: Client, base_url: Url) -> Self {
        Self {
            http,
            base_url: trowel_config::validate::with_trailing_slash(base_url),
            metrics: None,
        }
    }

    /// Build a client from the environment configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RestError::BuildClient`] when the HTTP client cannot be built.
    pub fn from_config(config: &EnvConfig) -> RestResult<Self> {
        Self::new(config.api_endpoint.clone(), config.http_timeout)
    }

    /// Process-wide client built from the installed configuration on first use.
    ///
    /// # Errors
    ///
    /// Returns [`RestError::Config`] when no configuration has been installed.
    pub fn shared() -> RestResult<&'static Self> {
        SHARED.get_or_try_init(|| {
            let config = trowel_config::current().map_err(|source| RestError::Config { source })?;
            Self::from_config(config)
        })
    }

    /// Count every response in `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// API root this client talks to (always ends with `/`).
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) const fn http_client(&self) -> &Client {
        &self.http
    }

    /// Absolute URL for a resource path.
    ///
    /// # Errors
    ///
    /// Returns [`RestError::InvalidUrl`] when the joined string is not a URL.
    pub fn resource_url(&self, path: &str) -> RestResult<Url> {
        let joined = format!("{}{}", self.base_url, path.trim_start_matches('/'));
        Url::parse(&joined).map_err(|source| RestError::InvalidUrl {
            path: path.to_string(),
            source,
        })
    }

    /// Execute a request against the API root and decode the JSON response.
    ///
    /// An empty response body decodes to [`Value::Null`].
    ///
    /// # Errors
    ///
    /// Returns the transport, status, or decode failure unmodified.
    pub async fn execute(&self, request: RestRequest) -> RestResult<Value> {
        let url = self.resource_url(&request.path)?;
        self.send(url, request).await
    }

    /// Convenience form of [`RestClient::execute`] taking a method name.
    ///
    /// # Errors
    ///
    /// Returns [`RestError::InvalidMethod`] for an unknown method, otherwise
    /// whatever [`RestClient::execute`] returns.
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: impl Into<Body> + Send,
        prefer: Option<Prefer>,
    ) -> RestResult<Value> {
        let method = RestRequest::parse_method(method)?;
        let mut request = RestRequest::new(method, path).body(body);
        request.prefer = prefer;
        self.execute(request).await
    }

    /// Call an absolute URL outside the API root.
    ///
    /// # Errors
    ///
    /// Returns [`RestError::InvalidUrl`] when `url` is not absolute, otherwise
    /// the transport, status, or decode failure.
    pub async fn external(
        &self,
        method: &str,
        url: &str,
        body: impl Into<Body> + Send,
        headers: HeaderMap,
    ) -> RestResult<Value> {
        let parsed = Url::parse(url).map_err(|source| RestError::InvalidUrl {
            path: url.to_string(),
            source,
        })?;
        let mut request = RestRequest::new(RestRequest::parse_method(method)?, url).body(body);
        request.headers = headers;
        self.send(parsed, request).await
    }

    async fn send(&self, url: Url, request: RestRequest) -> RestResult<Value> {
        let RestRequest {
            method,
            body,
            prefer,
            headers,
            ..
        } = request;

        let mut builder = self.http.request(method.clone(), url.clone()).headers(headers);
        if let Some(prefer) = prefer {
            builder = builder.header(PREFER_HEADER, HeaderValue::from_static(prefer.header_value()));
        }
        if let Body::Json(value) = body {
            builder = builder.json(&value);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(source) => {
                error!(method = %method, url = %url, error = %source, "request failed");
                return Err(RestError::Transport {
                    method,
                    url: url.to_string(),
                    source,
                });
            }
        };

        self.finish(method, url, response).await
    }

    pub(crate) async fn finish(
        &self,
        method: Method,
        url: Url,
        response: Response,
    ) -> RestResult<Value> {
        let status = response.status();
        if let Some(metrics) = &self.metrics {
            metrics.inc_rest_request(method.as_str(), status.as_u16());
        }

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.contains("json"));
        let raw = match response.text().await {
            Ok(raw) => raw,
            Err(source) => {
                error!(method = %method, url = %url, error = %source, "failed to read response body");
                return Err(RestError::Transport {
                    method,
                    url: url.to_string(),
                    source,
                });
            }
        };

        if !status.is_success() {
            error!(method = %method, url = %url, status = status.as_u16(), body = %raw, "request failed");
            let body = serde_json::from_str::<Value>(&raw).ok();
            return Err(RestError::Status {
                method,
                url: url.to_string(),
                status,
                body,
                raw,
            });
        }

        info!("{} {}", status.as_u16(), url);
        if raw.trim().is_empty() {
            return Ok(Value::Null);
        }
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(value),
            Err(_) if !is_json => Ok(Value::String(raw)),
            Err(source) => {
                error!(url = %url, error = %source, "response body was not valid JSON");
                Err(RestError::Decode {
                    url: url.to_string(),
                    source,
                })
            }
        }
    }
}

/// Issue one request through the shared client.
///
/// # Errors
///
/// Returns [`RestError::Config`] when no configuration is installed, otherwise
/// whatever [`RestClient::request`] returns.
pub async fn make_request(
    method: &str,
    path: &str,
    body: impl Into<Body> + Send,
    prefer: Option<Prefer>,
) -> RestResult<Value> {
    RestClient::shared()?.request(method, path, body, prefer).await
}
