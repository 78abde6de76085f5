//! Request description handed to [`crate::RestClient::execute`].

use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::{Map, Value};

use crate::error::{RestError, RestResult};

/// Name of the PostgREST preference header.
pub const PREFER_HEADER: &str = "Prefer";

/// PostgREST `Prefer` header values used by the record screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prefer {
    /// Return the affected rows in the response body.
    ReturnRepresentation,
    /// Upsert on key conflicts and return the affected rows.
    MergeDuplicates,
}

impl Prefer {
    /// Header value sent on the wire.
    #[must_use]
    pub const fn header_value(self) -> &'static str {
        match self {
            Self::ReturnRepresentation => "return=representation",
            Self::MergeDuplicates => "resolution=merge-duplicates,return=representation",
        }
    }
}

/// Request body.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Body {
    /// No body at all.
    #[default]
    Empty,
    /// A JSON document.
    Json(Value),
}

impl From<Value> for Body {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<Map<String, Value>> for Body {
    fn from(record: Map<String, Value>) -> Self {
        Self::Json(Value::Object(record))
    }
}

/// One call against the resource API: method, resource path (optionally with
/// a query string), body, and headers.
#[derive(Debug, Clone)]
pub struct RestRequest {
    /// HTTP method.
    pub method: Method,
    /// Resource path relative to the API root.
    pub path: String,
    /// Request body.
    pub body: Body,
    /// Optional `Prefer` header.
    pub prefer: Option<Prefer>,
    /// Additional headers.
    pub headers: HeaderMap,
}

impl RestRequest {
    /// Request with the given method and path and no body.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: Body::Empty,
            prefer: None,
            headers: HeaderMap::new(),
        }
    }

    /// Parse a method name case-insensitively (`get`, `PATCH`, ...).
    ///
    /// # Errors
    ///
    /// Returns [`RestError::InvalidMethod`] when the name is not an HTTP token.
    pub fn parse_method(method: &str) -> RestResult<Method> {
        let upper = method.trim().to_ascii_uppercase();
        if upper.is_empty() {
            return Err(RestError::InvalidMethod {
                method: method.to_string(),
            });
        }
        Method::from_bytes(upper.as_bytes()).map_err(|_| RestError::InvalidMethod {
            method: method.to_string(),
        })
    }

    /// `GET` request.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// `POST` request.
    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// `PATCH` request.
    #[must_use]
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    /// `DELETE` request.
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    /// Attach a `Prefer` header.
    #[must_use]
    pub const fn prefer(mut self, prefer: Prefer) -> Self {
        self.prefer = Some(prefer);
        self
    }

    /// Attach an arbitrary header.
    ///
    /// # Errors
    ///
    /// Returns [`RestError::InvalidIdentifier`] when the name or value is not a valid header.
    pub fn header(mut self, name: &str, value: &str) -> RestResult<Self> {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|_| RestError::InvalidIdentifier {
                kind: "header name",
                value: name.to_string(),
            })?;
        let header_value =
            HeaderValue::from_str(value).map_err(|_| RestError::InvalidIdentifier {
                kind: "header value",
                value: value.to_string(),
            })?;
        self.headers.insert(header_name, header_value);
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn methods_parse_case_insensitively() {
        assert_eq!(RestRequest::parse_method("get").ok(), Some(Method::GET));
        assert_eq!(RestRequest::parse_method("Patch").ok(), Some(Method::PATCH));
        assert!(RestRequest::parse_method("").is_err());
        assert!(RestRequest::parse_method("GE T").is_err());
    }

    #[test]
    fn prefer_values_match_postgrest_syntax() {
        assert_eq!(
            Prefer::ReturnRepresentation.header_value(),
            "return=representation"
        );
        assert_eq!(
            Prefer::MergeDuplicates.header_value(),
            "resolution=merge-duplicates,return=representation"
        );
    }

    #[test]
    fn builder_collects_parts() -> RestResult<()> {
        let request = RestRequest::patch("edit_find?uuid=eq.1")
            .body(json!({"title": "bowl"}))
            .prefer(Prefer::ReturnRepresentation)
            .header("Accept-Profile", "excavation")?;
        assert_eq!(request.method, Method::PATCH);
        assert_eq!(request.body, Body::Json(json!({"title": "bowl"})));
        assert_eq!(request.prefer, Some(Prefer::ReturnRepresentation));
        assert_eq!(
            request.headers.get("accept-profile").and_then(|v| v.to_str().ok()),
            Some("excavation")
        );
        assert!(RestRequest::get("x").header("bad header", "v").is_err());
        Ok(())
    }
}
