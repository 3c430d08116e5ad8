use std::collections::HashSet;
use std::time::Duration;

use crate::config::AutoClear;
use crate::error::CaptureError;
use crate::record::{now_millis, ContextId};

use super::CaptureService;

impl CaptureService {
    /// Evict every context not in `live` and persist once if anything went.
    ///
    /// An unrestored store is left alone so a reconcile racing the restore
    /// cannot wipe data that is about to be loaded. Fingerprint sets are
    /// pruned either way. Returns the number of contexts removed, or the
    /// write error if the eviction could not be persisted.
    pub async fn reconcile(&self, live: &HashSet<ContextId>) -> Result<usize, CaptureError> {
        let removed = {
            let mut st = self.state();
            st.dedup.retain(|context| live.contains(&context));
            st.blocks.retain(|context| live.contains(&context));
            if st.store.is_init() {
                tracing::debug!("store not restored yet, skipping eviction");
                0
            } else {
                st.store.retain_live(live)
            }
        };
        if removed > 0 {
            tracing::info!(removed, live = live.len(), "evicted closed contexts");
            self.flush_for(None).await?;
        }
        Ok(removed)
    }

    /// [`reconcile`](Self::reconcile) against the host's current live set.
    pub async fn reconcile_with_host(&self) -> Result<usize, CaptureError> {
        let live = self.inner.live.live_contexts().await;
        self.reconcile(&live).await
    }

    /// Drop one context's records and fingerprints, then persist.
    pub async fn clear_context(&self, context: ContextId) -> Result<(), CaptureError> {
        let existed = {
            let mut st = self.state();
            st.dedup.forget(context);
            st.store.remove(context)
        };
        if !existed {
            return Err(CaptureError::ContextNotFound(context));
        }
        self.inner.badge.notify(context, 0);
        self.flush_for(None).await
    }

    /// Drop every context except `keep`, then persist. Returns how many were
    /// removed.
    pub async fn clear_others(&self, keep: ContextId) -> Result<usize, CaptureError> {
        let removed: Vec<ContextId> = {
            let mut st = self.state();
            let removed = st
                .store
                .context_ids()
                .into_iter()
                .filter(|context| *context != keep)
                .collect();
            st.store.retain_only(keep);
            st.dedup.retain(|context| context == keep);
            removed
        };
        for context in &removed {
            self.inner.badge.notify(*context, 0);
        }
        self.flush_for(None).await?;
        Ok(removed.len())
    }

    /// The host navigated `context` to `url`. The page is checked against the
    /// block list, and with auto-clear on navigation the context starts over.
    /// Returns whether it was cleared.
    pub async fn context_navigated(&self, context: ContextId, url: &str) -> bool {
        let cleared = {
            let mut st = self.state();
            st.blocks.navigated(context, url);
            if st.config.cache.auto_clear == AutoClear::Navigate {
                st.dedup.forget(context);
                st.store.remove(context);
                true
            } else {
                false
            }
        };
        if cleared {
            tracing::debug!(context = %context, "cleared on navigation");
            self.inner.badge.notify(context, 0);
            self.request_save(context).await;
        }
        cleared
    }

    /// Drop records detected more than `max_age` ago, and empty contexts idle
    /// that long, then persist once if anything went. Returns the number of
    /// records removed.
    pub async fn sweep_expired(&self, max_age: Duration) -> Result<usize, CaptureError> {
        let cutoff = now_millis().saturating_sub(max_age.as_millis() as u64);
        let (removed, changed) = {
            let mut st = self.state();
            let contexts = st.store.context_count();
            let removed = st.store.drop_older_than(cutoff);
            let remaining: HashSet<ContextId> = st.store.context_ids().into_iter().collect();
            st.dedup.retain(|context| remaining.contains(&context));
            (removed, removed > 0 || remaining.len() != contexts)
        };
        if changed {
            tracing::info!(removed, "swept expired records");
            self.flush_for(None).await?;
        }
        Ok(removed)
    }
}
