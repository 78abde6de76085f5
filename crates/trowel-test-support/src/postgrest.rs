//! `httpmock` server that answers like a PostgREST resource API.

use httpmock::prelude::*;
use httpmock::{Method, Mock};
use serde_json::{Value, json};
use url::Url;

/// Prefer header value for returning affected rows.
pub const RETURN_REPRESENTATION: &str = "return=representation";

/// Mock resource API with helpers for the requests record screens make.
pub struct PostgrestMock {
    server: MockServer,
}

impl PostgrestMock {
    /// Start a fresh mock server.
    pub async fn start() -> Self {
        Self {
            server: MockServer::start_async().await,
        }
    }

    /// Underlying server for custom expectations.
    #[must_use]
    pub const fn server(&self) -> &MockServer {
        &self.server
    }

    /// API root of the mock, ending with `/`.
    ///
    /// # Panics
    ///
    /// Panics if the mock server reports an unparsable base URL.
    #[must_use]
    pub fn api_url(&self) -> Url {
        let base = format!("{}/", self.server.base_url());
        Url::parse(&base).unwrap_or_else(|err| panic!("mock base url {base}: {err}"))
    }

    /// `GET /<path>?uuid=eq.<uuid>` answering with `rows`.
    pub fn expect_select(&self, path: &str, uuid: &str, rows: Value) -> Mock<'_> {
        let path = format!("/{path}");
        let filter = format!("eq.{uuid}");
        self.server.mock(|when, then| {
            when.method(GET).path(path).query_param("uuid", filter);
            then.status(200).json_body(rows);
        })
    }

    /// `GET /<path>` with any query answering with `rows`.
    pub fn expect_list(&self, path: &str, rows: Value) -> Mock<'_> {
        let path = format!("/{path}");
        self.server.mock(|when, then| {
            when.method(GET).path(path);
            then.status(200).json_body(rows);
        })
    }

    /// `POST /<path>` with `Prefer: return=representation` answering `201` with `rows`.
    pub fn expect_insert(&self, path: &str, rows: Value) -> Mock<'_> {
        let path = format!("/{path}");
        self.server.mock(|when, then| {
            when.method(POST)
                .path(path)
                .header("prefer", RETURN_REPRESENTATION);
            then.status(201).json_body(rows);
        })
    }

    /// `PATCH /<path>?uuid=eq.<uuid>` answering with `rows`.
    pub fn expect_update(&self, path: &str, uuid: &str, rows: Value) -> Mock<'_> {
        let path = format!("/{path}");
        let filter = format!("eq.{uuid}");
        self.server.mock(|when, then| {
            when.method(PATCH)
                .path(path)
                .query_param("uuid", filter)
                .header("prefer", RETURN_REPRESENTATION);
            then.status(200).json_body(rows);
        })
    }

    /// `DELETE /<path>?uuid=eq.<uuid>` answering with the deleted `rows`.
    pub fn expect_delete(&self, path: &str, uuid: &str, rows: Value) -> Mock<'_> {
        let path = format!("/{path}");
        let filter = format!("eq.{uuid}");
        self.server.mock(|when, then| {
            when.method(DELETE).path(path).query_param("uuid", filter);
            then.status(200).json_body(rows);
        })
    }

    /// Any `method` on `/<path>` failing with a PostgREST error body.
    pub fn expect_failure(
        &self,
        method: Method,
        path: &str,
        status: u16,
        message: &str,
    ) -> Mock<'_> {
        let path = format!("/{path}");
        let body = json!({
            "code": "P0001",
            "message": message,
            "details": null,
            "hint": null
        });
        self.server.mock(|when, then| {
            when.method(method).path(path);
            then.status(status).json_body(body);
        })
    }
}
