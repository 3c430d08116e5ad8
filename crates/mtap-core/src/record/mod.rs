//! Resource records and raw network observations.
//!
//! A [`ResourceRecord`] is what the cache stores and persists. An
//! [`Observation`] is what the network tap hands us; [`shape`] turns the
//! latter into the former once the admission filter has accepted it.

mod headers;
pub mod shape;

use std::collections::BTreeMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

pub use headers::{HeaderPair, RequestContext, ResponseSummary};

/// Identifier of a browsing context (conceptually a browser tab).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextId(pub i64);

impl ContextId {
    /// Sentinel for observations not attributed to any specific context.
    pub const UNKNOWN: ContextId = ContextId(-1);

    pub fn is_unknown(self) -> bool {
        self == Self::UNKNOWN
    }

    /// String form used as the key in the persisted mapping.
    pub fn to_key(self) -> String {
        self.0.to_string()
    }

    pub fn from_key(s: &str) -> Option<Self> {
        s.trim().parse::<i64>().ok().map(ContextId)
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ContextId {
    fn from(v: i64) -> Self {
        ContextId(v)
    }
}

/// Current time as unix milliseconds.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// One observed candidate media resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRecord {
    pub url: String,
    pub context_id: ContextId,
    #[serde(default)]
    pub name: String,
    /// Unknown size is `None`, never zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Unix milliseconds.
    pub detected_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_icon_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Came from pattern matching rather than a direct network observation.
    #[serde(default)]
    pub is_heuristic: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub request_headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie: Option<String>,
}

impl ResourceRecord {
    /// Minimal record for `url` in `context_id`, detected now.
    pub fn new(url: impl Into<String>, context_id: ContextId) -> Self {
        Self {
            url: url.into(),
            context_id,
            name: String::new(),
            size_bytes: None,
            extension: None,
            mime_type: None,
            detected_at: now_millis(),
            page_title: None,
            page_url: None,
            page_icon_url: None,
            referer: None,
            origin: None,
            request_id: None,
            is_heuristic: false,
            request_headers: BTreeMap::new(),
            cookie: None,
        }
    }

    pub fn with_extension(mut self, ext: impl Into<String>) -> Self {
        self.extension = Some(ext.into());
        self
    }

    pub fn with_mime_type(mut self, mime: impl Into<String>) -> Self {
        self.mime_type = Some(mime.into());
        self
    }

    /// A record is admissible only with a non-empty URL and at least one of
    /// extension / MIME type.
    pub fn is_valid(&self) -> bool {
        let has = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        !self.url.is_empty() && (has(&self.extension) || has(&self.mime_type))
    }

    /// Fill page context fields from a tab lookup. `referer` falls back to the
    /// page URL when the request carried none.
    pub fn enrich(&mut self, page: &crate::host::PageInfo) {
        self.page_title = page.title.clone();
        self.page_url = page.url.clone();
        self.page_icon_url = page.icon_url.clone();
        if self.referer.is_none() {
            self.referer = page.url.clone();
        }
    }
}

/// Raw observation from the network tap (or a heuristic matcher).
#[derive(Debug, Clone, Default)]
pub struct Observation {
    pub url: String,
    pub context_id: Option<ContextId>,
    pub request_id: Option<String>,
    pub response_headers: Vec<HeaderPair>,
    pub request_headers: Vec<HeaderPair>,
    /// Resource type reported by the tap (e.g. "media", "xmlhttprequest").
    pub resource_type: Option<String>,
    /// Page that initiated the request, if known.
    pub initiator: Option<String>,
    pub is_heuristic: bool,
    /// Extension forced by a heuristic rule.
    pub extra_extension: Option<String>,
    /// MIME type reported out-of-band (e.g. by a page script).
    pub mime_type: Option<String>,
}

impl Observation {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn in_context(mut self, id: ContextId) -> Self {
        self.context_id = Some(id);
        self
    }

    pub fn with_response_header(mut self, name: &str, value: &str) -> Self {
        self.response_headers.push(HeaderPair::new(name, value));
        self
    }

    pub fn with_request_header(mut self, name: &str, value: &str) -> Self {
        self.request_headers.push(HeaderPair::new(name, value));
        self
    }
}
