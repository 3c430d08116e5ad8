use tokio::time::Instant;

use crate::cache::PersistedCache;
use crate::error::CaptureError;
use crate::persist::SaveAction;
use crate::record::ContextId;

use super::{write_failed, CaptureService};

impl CaptureService {
    /// Ask for the cache to be persisted after a change to `context`.
    ///
    /// Only one timer is ever pending; each request cancels it and decides
    /// afresh, either re-arming it or writing immediately.
    pub async fn request_save(&self, context: ContextId) {
        let action = {
            let mut st = self.state();
            let len = st.store.len(context);
            let action = st.policy.decide(len, Instant::now());
            if let SaveAction::Arm(delay) = action {
                if let Some(pending) = st.timer.take() {
                    pending.abort();
                }
                tracing::trace!(
                    context = %context,
                    delay_ms = delay.as_millis() as u64,
                    state = ?st.policy.state(),
                    "save deferred"
                );
                let svc = self.clone();
                st.timer = Some(tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    svc.fire_timer(context).await;
                }));
            }
            action
        };
        if action == SaveAction::FlushNow {
            let _ = self.flush_for(Some(context)).await;
        }
    }

    /// Write the whole cache now, cancelling any pending timer.
    pub async fn flush(&self) -> Result<(), CaptureError> {
        self.flush_for(None).await
    }

    async fn fire_timer(&self, context: ContextId) {
        // Once fired the timer is no longer cancellable.
        drop(self.state().timer.take());
        let _ = self.flush_for(Some(context)).await;
    }

    /// Full-state write. The snapshot is taken under the write lock, so of
    /// two overlapping flushes the later one always carries the newer state.
    /// `trigger` gets a badge update from the committed length.
    pub(super) async fn flush_for(&self, trigger: Option<ContextId>) -> Result<(), CaptureError> {
        {
            let mut st = self.state();
            if let Some(pending) = st.timer.take() {
                pending.abort();
            }
            st.policy.mark_flushed(Instant::now());
        }

        let _write = self.inner.write_lock.lock().await;
        let (key, payload, committed) = {
            let st = self.state();
            let payload = serde_json::to_value(PersistedCache::from_store(&st.store));
            let committed = trigger.map(|context| (context, st.store.len(context)));
            (st.config.persist.storage_key.clone(), payload, committed)
        };
        let payload = payload.map_err(|e| write_failed(e.into()))?;
        self.inner
            .storage
            .set(&key, payload)
            .await
            .map_err(write_failed)?;
        tracing::trace!(key = %key, "cache persisted");

        if let Some((context, count)) = committed {
            self.inner.badge.notify(context, count);
        }
        Ok(())
    }
}
