//! The capture service: the single owner of configuration and cache state.
//!
//! Admissions flow gate → dedup → enrichment → store → save scheduler. All
//! mutable state sits behind one `std::sync::Mutex` that is only held between
//! awaits; storage writes are serialized by a separate async lock.

mod admit;
mod flush;
mod reconcile;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::cache::{CacheStore, PersistedCache};
use crate::config::CaptureConfig;
use crate::dedup::DedupEngine;
use crate::error::CaptureError;
use crate::filter::{AdmissionFilter, BlockList};
use crate::gate::{ConfigLoad, ReadinessGate};
use crate::host::{BadgeSink, DetachedHost, LiveContexts, TabLookup, TracingBadge};
use crate::persist::{MemoryStorage, SavePolicy, Storage};
use crate::record::{ContextId, ResourceRecord};

/// Point-in-time counters for operators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CaptureStats {
    pub total_count: usize,
    pub context_count: usize,
    /// Number of contexts holding a fingerprint set.
    pub dedup_set_size: usize,
    pub fingerprint_count: usize,
    /// Admissions parked behind the readiness gate.
    pub pending_admissions: usize,
    /// Seconds the oldest parked admission has waited.
    pub pending_wait_secs: Option<u64>,
    /// Contexts whose current page matched the block list.
    pub flagged_contexts: usize,
    pub ready: bool,
}

/// An admission waiting for the gate, with the channel its caller awaits.
/// `runtime` is the runtime the caller was awaiting on; the drain is spawned
/// there even when the gate is opened from a thread outside it.
pub(crate) struct Parked {
    record: ResourceRecord,
    reply: oneshot::Sender<bool>,
    runtime: Handle,
}

pub(crate) struct State {
    config: CaptureConfig,
    filter: AdmissionFilter,
    blocks: BlockList,
    gate: ReadinessGate<Parked>,
    dedup: DedupEngine,
    store: CacheStore,
    policy: SavePolicy,
    /// The single pending save timer, if armed.
    timer: Option<JoinHandle<()>>,
}

struct Inner {
    state: Mutex<State>,
    write_lock: tokio::sync::Mutex<()>,
    storage: Arc<dyn Storage>,
    tabs: Arc<dyn TabLookup>,
    live: Arc<dyn LiveContexts>,
    badge: Arc<dyn BadgeSink>,
}

/// Cheap to clone; clones share the same cache.
#[derive(Clone)]
pub struct CaptureService {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for CaptureService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureService").finish_non_exhaustive()
    }
}

pub struct CaptureServiceBuilder {
    config: CaptureConfig,
    storage: Arc<dyn Storage>,
    tabs: Arc<dyn TabLookup>,
    live: Arc<dyn LiveContexts>,
    badge: Arc<dyn BadgeSink>,
}

impl CaptureServiceBuilder {
    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = storage;
        self
    }

    pub fn tabs(mut self, tabs: Arc<dyn TabLookup>) -> Self {
        self.tabs = tabs;
        self
    }

    pub fn live_contexts(mut self, live: Arc<dyn LiveContexts>) -> Self {
        self.live = live;
        self
    }

    pub fn badge(mut self, badge: Arc<dyn BadgeSink>) -> Self {
        self.badge = badge;
        self
    }

    pub fn build(self) -> CaptureService {
        let cfg = self.config;
        let state = State {
            filter: AdmissionFilter::new(&cfg.filter),
            blocks: BlockList::new(&cfg.filter),
            gate: ReadinessGate::new(),
            dedup: DedupEngine::new(cfg.cache.check_duplicates, cfg.cache.cleanup_threshold),
            store: CacheStore::new(cfg.cache.max_length),
            policy: SavePolicy::new(&cfg.persist),
            timer: None,
            config: cfg,
        };
        CaptureService {
            inner: Arc::new(Inner {
                state: Mutex::new(state),
                write_lock: tokio::sync::Mutex::new(()),
                storage: self.storage,
                tabs: self.tabs,
                live: self.live,
                badge: self.badge,
            }),
        }
    }
}

impl CaptureService {
    /// Builder with in-memory storage, a detached host and a logging badge.
    pub fn builder(config: CaptureConfig) -> CaptureServiceBuilder {
        CaptureServiceBuilder {
            config,
            storage: Arc::new(MemoryStorage::new()),
            tabs: Arc::new(DetachedHost),
            live: Arc::new(DetachedHost),
            badge: Arc::new(TracingBadge),
        }
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, State> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn config(&self) -> CaptureConfig {
        self.state().config.clone()
    }

    pub fn is_ready(&self) -> bool {
        self.state().gate.is_ready()
    }

    pub fn active_context(&self) -> Option<ContextId> {
        self.state().gate.active_context()
    }

    /// Load the durable payload into the store, then signal the local load.
    ///
    /// Anything unusable in storage leaves the store empty. A read error is
    /// logged and treated the same way.
    pub async fn restore(&self) {
        let key = self.state().config.persist.storage_key.clone();
        let restored = match self.inner.storage.get(&key).await {
            Ok(Some(value)) => PersistedCache::decode(value).unwrap_or_default(),
            Ok(None) => {
                tracing::debug!(key = %key, "no stored cache");
                BTreeMap::new()
            }
            Err(e) => {
                tracing::warn!("reading stored cache failed, starting empty: {:#}", e);
                BTreeMap::new()
            }
        };
        let released = {
            let mut st = self.state();
            st.store.restore(restored);
            tracing::info!(
                contexts = st.store.context_count(),
                records = st.store.total_count(),
                "cache restored"
            );
            st.gate.complete(ConfigLoad::Local)
        };
        self.release(released);
    }

    /// Apply synced preferences and signal the sync load.
    pub fn complete_sync_load(&self, config: CaptureConfig) {
        let released = {
            let mut st = self.state();
            st.apply(config);
            st.gate.complete(ConfigLoad::Sync)
        };
        self.release(released);
    }

    /// Replace the live configuration. Takes effect for the next admission.
    pub fn apply_config(&self, config: CaptureConfig) {
        self.state().apply(config);
    }

    /// Host reports the focused context. Also refreshes its badge.
    pub fn set_active_context(&self, context: ContextId) {
        let (released, count) = {
            let mut st = self.state();
            let released = st.gate.set_active(context);
            (released, st.store.len(context))
        };
        if !context.is_unknown() {
            self.inner.badge.notify(context, count);
        }
        self.release(released);
    }

    /// Records of one context, oldest first. Empty if unknown.
    pub fn get_context(&self, context: ContextId) -> Vec<ResourceRecord> {
        self.state().store.records(context).to_vec()
    }

    pub fn get_all(&self) -> BTreeMap<ContextId, Vec<ResourceRecord>> {
        self.state().store.to_map()
    }

    pub fn get_stats(&self) -> CaptureStats {
        let st = self.state();
        CaptureStats {
            total_count: st.store.total_count(),
            context_count: st.store.context_count(),
            dedup_set_size: st.dedup.context_count(),
            fingerprint_count: st.dedup.fingerprint_count(),
            pending_admissions: st.gate.pending_len(),
            pending_wait_secs: st.gate.waiting_since().map(|t| t.elapsed().as_secs()),
            flagged_contexts: st.blocks.flagged_count(),
            ready: st.gate.is_ready(),
        }
    }
}

impl State {
    fn apply(&mut self, config: CaptureConfig) {
        self.filter = AdmissionFilter::new(&config.filter);
        self.blocks.reconfigure(&config.filter);
        self.dedup
            .reconfigure(config.cache.check_duplicates, config.cache.cleanup_threshold);
        self.store.set_max_length(config.cache.max_length);
        self.policy.reconfigure(&config.persist);
        self.config = config;
    }
}

/// Map a storage failure into the domain error, logging it once.
fn write_failed(err: anyhow::Error) -> CaptureError {
    tracing::warn!("persisting cache failed, memory stays authoritative: {:#}", err);
    CaptureError::PersistenceWriteFailed(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::RecordingBadge;
    use serde_json::json;

    #[tokio::test]
    async fn restore_loads_stored_payload_and_signals_local() {
        let storage = Arc::new(MemoryStorage::with_value(
            "MediaData",
            json!({
                "version": 1,
                "contexts": { "3": [{ "url": "https://a/v.mp4", "contextId": 3, "extension": "mp4", "detectedAt": 1 }] }
            }),
        ));
        let svc = CaptureService::builder(CaptureConfig::default())
            .storage(storage)
            .build();
        svc.restore().await;
        assert_eq!(svc.get_context(ContextId(3)).len(), 1);
        assert!(!svc.is_ready());
        svc.complete_sync_load(CaptureConfig::default());
        svc.set_active_context(ContextId(3));
        assert!(svc.is_ready());
    }

    #[tokio::test]
    async fn restore_from_garbage_starts_empty() {
        let storage = Arc::new(MemoryStorage::with_value("MediaData", json!("garbage")));
        let svc = CaptureService::builder(CaptureConfig::default())
            .storage(storage)
            .build();
        svc.restore().await;
        assert!(svc.get_all().is_empty());
        assert_eq!(svc.get_stats().context_count, 0);
    }

    #[tokio::test]
    async fn set_active_context_refreshes_badge() {
        let badge = Arc::new(RecordingBadge::default());
        let svc = CaptureService::builder(CaptureConfig::default())
            .badge(badge.clone())
            .build();
        svc.set_active_context(ContextId(8));
        assert_eq!(badge.last(ContextId(8)), Some(0));
        assert_eq!(svc.active_context(), Some(ContextId(8)));
    }

    #[test]
    fn apply_config_reaches_components() {
        let svc = CaptureService::builder(CaptureConfig::default()).build();
        let mut cfg = CaptureConfig::default();
        cfg.cache.max_length = 3;
        cfg.enabled = false;
        svc.apply_config(cfg);
        assert_eq!(svc.state().store.max_length(), 3);
        assert!(!svc.config().enabled);
    }
}
