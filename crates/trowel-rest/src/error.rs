//! Error type for REST calls.

use reqwest::{Method, StatusCode};
use serde_json::Value;
use thiserror::Error;

/// Failure of a single REST call.
///
/// Errors are passed to callers unmodified; [`RestError::message`] and
/// [`RestError::response_message`] give the two strings user-facing
/// notifications are built from.
#[derive(Debug, Error)]
pub enum RestError {
    /// The method string is not a valid HTTP token.
    #[error("invalid HTTP method '{method}'")]
    InvalidMethod {
        /// Method string supplied by the caller.
        method: String,
    },
    /// The resource path could not be joined onto the API root.
    #[error("invalid request URL for '{path}'")]
    InvalidUrl {
        /// Path or URL supplied by the caller.
        path: String,
        /// Parser error detail.
        source: url::ParseError,
    },
    /// A value handed to the client does not have the expected shape.
    #[error("invalid {kind} '{value}'")]
    InvalidIdentifier {
        /// Kind of identifier (for example `ORCID iD`).
        kind: &'static str,
        /// Offending value.
        value: String,
    },
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client")]
    BuildClient {
        /// Underlying reqwest error.
        source: reqwest::Error,
    },
    /// No environment configuration has been installed.
    #[error("environment configuration unavailable")]
    Config {
        /// Underlying configuration error.
        source: trowel_config::ConfigError,
    },
    /// The request never produced a response (connect, timeout, body read).
    #[error("request to {url} failed")]
    Transport {
        /// HTTP method of the request.
        method: Method,
        /// Absolute URL of the request.
        url: String,
        /// Underlying reqwest error.
        source: reqwest::Error,
    },
    /// The server answered with a non-success status.
    #[error("request failed with status code {}", .status.as_u16())]
    Status {
        /// HTTP method of the request.
        method: Method,
        /// Absolute URL of the request.
        url: String,
        /// Response status.
        status: StatusCode,
        /// Response body decoded as JSON, when it was JSON.
        body: Option<Value>,
        /// Raw response body.
        raw: String,
    },
    /// A success response carried a body that is not JSON.
    #[error("response from {url} was not valid JSON")]
    Decode {
        /// Absolute URL of the request.
        url: String,
        /// Underlying serde error.
        source: serde_json::Error,
    },
    /// A multipart form part could not be built.
    #[error("invalid multipart field '{field}'")]
    Multipart {
        /// Name of the form field.
        field: &'static str,
        /// Underlying reqwest error.
        source: reqwest::Error,
    },
    /// A local file could not be read.
    #[error("failed to read {path}")]
    Io {
        /// Path of the file.
        path: String,
        /// Underlying IO error.
        source: std::io::Error,
    },
}

/// Result alias for REST calls.
pub type RestResult<T> = Result<T, RestError>;

impl RestError {
    /// Primary error text. Transport failures report the underlying cause.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Transport { source, .. } => format!("{self}: {source}"),
            _ => self.to_string(),
        }
    }

    /// The backend's own `message` field from an error response, if any.
    #[must_use]
    pub fn response_message(&self) -> Option<&str> {
        match self {
            Self::Status { body, .. } => body
                .as_ref()
                .and_then(|body| body.get("message"))
                .and_then(Value::as_str),
            _ => None,
        }
    }

    /// Response status, when the server answered.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
