//! Third-party resources: the redirect proxy and ORCID public records.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::client::RestClient;
use crate::error::{RestError, RestResult};
use crate::request::Body;

/// Public ORCID registry root.
pub const ORCID_PUBLIC_BASE: &str = "https://orcid.org/";

static ORCID_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{4}-\d{4}-\d{3}[\dX]$").ok());

/// Whether `value` is a bare ORCID iD (`0000-0002-1825-0097`).
#[must_use]
pub fn is_orcid(value: &str) -> bool {
    ORCID_PATTERN
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(value))
}

/// Route `target` through the redirect proxy as `<redirect>?url=<target>`.
#[must_use]
pub fn proxied_url(redirect: &Url, target: &str) -> Url {
    let mut url = redirect.clone();
    url.query_pairs_mut().clear().append_pair("url", target);
    url
}

/// Where ORCID public records are fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrcidLookup {
    base: Url,
    redirect: Option<Url>,
}

impl OrcidLookup {
    /// Lookup against the public ORCID registry.
    ///
    /// # Errors
    ///
    /// Never fails in practice; the constant root is parsed at runtime.
    pub fn public() -> RestResult<Self> {
        let base = Url::parse(ORCID_PUBLIC_BASE).map_err(|source| RestError::InvalidUrl {
            path: ORCID_PUBLIC_BASE.to_string(),
            source,
        })?;
        Ok(Self::with_base(base))
    }

    /// Lookup against another registry root (a sandbox or a mock server).
    #[must_use]
    pub fn with_base(base: Url) -> Self {
        Self {
            base: trowel_config::validate::with_trailing_slash(base),
            redirect: None,
        }
    }

    /// Fetch records through the redirect proxy.
    #[must_use]
    pub fn through_redirect(mut self, redirect: Option<Url>) -> Self {
        self.redirect = redirect;
        self
    }

    /// URL of the public record JSON for `orcid`.
    ///
    /// # Errors
    ///
    /// Returns [`RestError::InvalidIdentifier`] when `orcid` is not an ORCID iD.
    pub fn record_url(&self, orcid: &str) -> RestResult<Url> {
        if !is_orcid(orcid) {
            return Err(RestError::InvalidIdentifier {
                kind: "ORCID iD",
                value: orcid.to_string(),
            });
        }
        let path = format!("{orcid}/public-record.json");
        let direct = self
            .base
            .join(&path)
            .map_err(|source| RestError::InvalidUrl { path, source })?;
        Ok(match &self.redirect {
            Some(redirect) => proxied_url(redirect, direct.as_str()),
            None => direct,
        })
    }
}

/// The parts of an ORCID public record shown next to an actor.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrcidRecord {
    /// Name the researcher publishes.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Published websites.
    #[serde(default)]
    pub website: Option<OrcidWebsites>,
}

/// Website section of an ORCID record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrcidWebsites {
    /// Website entries in display order.
    #[serde(default)]
    pub websites: Vec<OrcidWebsite>,
}

/// One website entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrcidWebsite {
    /// Link text.
    #[serde(default)]
    pub url_name: Option<String>,
    /// Link target.
    #[serde(default)]
    pub url: Option<String>,
}

impl OrcidRecord {
    /// Label of the first published website.
    #[must_use]
    pub fn first_website(&self) -> Option<&str> {
        self.website
            .as_ref()
            .and_then(|section| section.websites.first())
            .and_then(|site| site.url_name.as_deref())
    }
}

impl RestClient {
    /// Fetch and decode the public ORCID record for `orcid`.
    ///
    /// # Errors
    ///
    /// Returns [`RestError::InvalidIdentifier`] for malformed iDs, otherwise the
    /// request or decode failure.
    pub async fn fetch_orcid_record(
        &self,
        lookup: &OrcidLookup,
        orcid: &str,
    ) -> RestResult<OrcidRecord> {
        let url = lookup.record_url(orcid)?;
        debug!(orcid, url = %url, "fetching ORCID record");
        let value = self
            .external("get", url.as_str(), Body::Empty, HeaderMap::new())
            .await?;
        serde_json::from_value(value).map_err(|source| RestError::Decode {
            url: url.to_string(),
            source,
        })
    }
}
