//! Host-platform collaborators: tab lookup, live-context enumeration, badge.
//!
//! The capture service only talks to the host through these traits so it can
//! run against a real browser bridge, a HAR replay, or test doubles.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::CaptureError;
use crate::record::ContextId;

/// Page context used to enrich a record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageInfo {
    pub title: Option<String>,
    pub url: Option<String>,
    pub icon_url: Option<String>,
}

/// Resolves a context id to its page details. Fails when the context is gone.
#[async_trait]
pub trait TabLookup: Send + Sync {
    async fn page_info(&self, context: ContextId) -> Result<PageInfo, CaptureError>;
}

/// Enumerates the contexts the host currently considers live.
#[async_trait]
pub trait LiveContexts: Send + Sync {
    async fn live_contexts(&self) -> HashSet<ContextId>;
}

/// Receives per-context resource counts. Fire-and-forget.
pub trait BadgeSink: Send + Sync {
    fn notify(&self, context: ContextId, count: usize);
}

/// Badge label for a count: empty for zero, capped at `999+`.
pub fn badge_text(count: usize) -> String {
    match count {
        0 => String::new(),
        n if n > 999 => "999+".to_string(),
        n => n.to_string(),
    }
}

/// Badge sink that only logs.
#[derive(Debug, Default)]
pub struct TracingBadge;

impl BadgeSink for TracingBadge {
    fn notify(&self, context: ContextId, count: usize) {
        tracing::debug!(context = %context, badge = %badge_text(count), "badge update");
    }
}

/// Host with no tabs: every lookup fails and nothing is live.
#[derive(Debug, Default)]
pub struct DetachedHost;

#[async_trait]
impl TabLookup for DetachedHost {
    async fn page_info(&self, context: ContextId) -> Result<PageInfo, CaptureError> {
        Err(CaptureError::EnrichmentLookupFailed { context })
    }
}

#[async_trait]
impl LiveContexts for DetachedHost {
    async fn live_contexts(&self) -> HashSet<ContextId> {
        HashSet::new()
    }
}

/// In-process host backed by a map of open tabs. Used by embedders that keep
/// their own tab table, and by tests.
#[derive(Debug, Default)]
pub struct StaticHost {
    tabs: Mutex<HashMap<ContextId, PageInfo>>,
}

impl StaticHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self, context: ContextId, page: PageInfo) {
        self.tabs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(context, page);
    }

    pub fn close(&self, context: ContextId) {
        self.tabs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&context);
    }
}

#[async_trait]
impl TabLookup for StaticHost {
    async fn page_info(&self, context: ContextId) -> Result<PageInfo, CaptureError> {
        self.tabs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&context)
            .cloned()
            .ok_or(CaptureError::EnrichmentLookupFailed { context })
    }
}

#[async_trait]
impl LiveContexts for StaticHost {
    async fn live_contexts(&self) -> HashSet<ContextId> {
        self.tabs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .copied()
            .collect()
    }
}

/// Badge sink that records the last count per context.
#[derive(Debug, Default)]
pub struct RecordingBadge {
    counts: Mutex<HashMap<ContextId, usize>>,
}

impl RecordingBadge {
    pub fn last(&self, context: ContextId) -> Option<usize> {
        self.counts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&context)
            .copied()
    }
}

impl BadgeSink for RecordingBadge {
    fn notify(&self, context: ContextId, count: usize) {
        self.counts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(context, count);
    }
}
