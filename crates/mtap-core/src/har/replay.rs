//! Turn a HAR file into observations plus a host that knows its pages.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use crate::error::CaptureError;
use crate::host::{LiveContexts, PageInfo, TabLookup};
use crate::record::{ContextId, HeaderPair, Observation};

use super::parse::{HarEntry, HarHeader, HarLog};

/// Observations from one HAR file and the pages they belong to.
#[derive(Debug, Default)]
pub struct HarCapture {
    pub observations: Vec<Observation>,
    pub host: HarHost,
}

/// Pages of a HAR file, served as tabs. Page `n` (1-based, file order) is
/// context `n`.
#[derive(Debug, Default, Clone)]
pub struct HarHost {
    pages: BTreeMap<ContextId, PageInfo>,
}

impl HarHost {
    pub fn contexts(&self) -> Vec<ContextId> {
        self.pages.keys().copied().collect()
    }

    pub fn page(&self, context: ContextId) -> Option<&PageInfo> {
        self.pages.get(&context)
    }
}

#[async_trait]
impl TabLookup for HarHost {
    async fn page_info(&self, context: ContextId) -> Result<PageInfo, CaptureError> {
        self.pages
            .get(&context)
            .cloned()
            .ok_or(CaptureError::EnrichmentLookupFailed { context })
    }
}

#[async_trait]
impl LiveContexts for HarHost {
    async fn live_contexts(&self) -> HashSet<ContextId> {
        self.pages.keys().copied().collect()
    }
}

/// Reads and converts a HAR file. Redirect responses are skipped; they never
/// carry the resource itself.
pub fn load_har(path: &Path) -> Result<HarCapture> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read HAR file: {}", path.display()))?;
    let har: HarLog = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse HAR JSON: {}", path.display()))?;

    let page_ids: HashMap<&str, ContextId> = har
        .log
        .pages
        .iter()
        .enumerate()
        .map(|(i, p)| (p.id.as_str(), ContextId(i as i64 + 1)))
        .collect();

    let mut pages: BTreeMap<ContextId, PageInfo> = BTreeMap::new();
    for (i, page) in har.log.pages.iter().enumerate() {
        let title = Some(page.title.clone()).filter(|t| !t.is_empty());
        let url = title.clone().filter(|t| t.starts_with("http"));
        pages.insert(
            ContextId(i as i64 + 1),
            PageInfo {
                title,
                url,
                icon_url: None,
            },
        );
    }

    let mut observations = Vec::with_capacity(har.log.entries.len());
    for entry in &har.log.entries {
        let context = entry
            .pageref
            .as_deref()
            .and_then(|id| page_ids.get(id).copied());

        // The main document gives the page its URL when the title did not.
        if entry.resource_type.as_deref() == Some("document") {
            if let Some(page) = context.and_then(|c| pages.get_mut(&c)) {
                if page.url.is_none() {
                    page.url = Some(entry.request.url.clone());
                }
            }
        }

        if (300..400).contains(&entry.response.status) {
            continue;
        }
        observations.push(to_observation(entry, context));
    }

    tracing::debug!(
        pages = pages.len(),
        observations = observations.len(),
        "loaded HAR {}",
        path.display()
    );
    Ok(HarCapture {
        observations,
        host: HarHost { pages },
    })
}

fn to_observation(entry: &HarEntry, context: Option<ContextId>) -> Observation {
    let mut response_headers = pairs(&entry.response.headers);
    let has_type = response_headers
        .iter()
        .any(|h| h.name.eq_ignore_ascii_case("content-type"));
    if !has_type {
        if let Some(mime) = entry
            .response
            .content
            .as_ref()
            .and_then(|c| c.mime_type.as_deref())
            .filter(|m| !m.is_empty())
        {
            response_headers.push(HeaderPair::new("Content-Type", mime));
        }
    }

    Observation {
        url: entry.request.url.clone(),
        context_id: Some(context.unwrap_or(ContextId::UNKNOWN)),
        response_headers,
        request_headers: pairs(&entry.request.headers),
        resource_type: entry.resource_type.clone(),
        ..Observation::default()
    }
}

fn pairs(headers: &[HarHeader]) -> Vec<HeaderPair> {
    headers
        .iter()
        .map(|h| HeaderPair::new(&h.name, &h.value))
        .collect()
}
