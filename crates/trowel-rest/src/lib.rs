#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![warn(unreachable_pub, clippy::all, clippy::pedantic, clippy::nursery)]

//! Thin REST client for PostgREST-style resource APIs.
//!
//! Layout:
//! - `client.rs`: `RestClient`, the shared instance, and `make_request`
//! - `request.rs`: request description (`RestRequest`, `Body`, `Prefer`)
//! - `filter.rs`: resource paths with PostgREST filters
//! - `external.rs`: third-party URLs (redirect proxy, ORCID public records)
//! - `upload.rs`: multipart media uploads for the conversion service
//! - `error.rs`: `RestError`

pub mod client;
pub mod error;
pub mod external;
pub mod filter;
pub mod request;
pub mod upload;

pub use client::{RestClient, make_request};
pub use error::{RestError, RestResult};
pub use external::{OrcidLookup, OrcidRecord, OrcidWebsite, OrcidWebsites, is_orcid, proxied_url};
pub use filter::{Filter, ResourcePath};
pub use request::{Body, Prefer, RestRequest};
pub use upload::{MediaUpload, UploadResponse};

pub use reqwest::{Method, StatusCode};
