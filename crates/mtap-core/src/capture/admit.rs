use tokio::runtime::Handle;
use tokio::sync::oneshot;

use crate::cache::AppendOutcome;
use crate::error::CaptureError;
use crate::record::shape::shape_record;
use crate::record::{ContextId, Observation, ResourceRecord, ResponseSummary};

use super::{CaptureService, Parked};

enum Route {
    Now(ResourceRecord),
    Queued(oneshot::Receiver<bool>),
    Refused,
}

enum Step {
    Proceed(ContextId),
    Blocked(ContextId),
    Duplicate,
    Overflow(ContextId),
}

impl CaptureService {
    /// Run a raw network observation through the admission filter and, if it
    /// is accepted, shape it into a record and admit it.
    pub async fn observe(&self, obs: Observation) -> bool {
        let summary = ResponseSummary::from_headers(&obs.response_headers);
        let verdict = self.state().filter.evaluate(&obs, &summary);
        if !verdict.is_accept() {
            tracing::trace!(url = %obs.url, ?verdict, "observation filtered");
            return false;
        }
        let context = obs.context_id.unwrap_or(ContextId::UNKNOWN);
        self.admit(shape_record(&obs, &summary, context)).await
    }

    /// Admit a record into its context's cache.
    ///
    /// Returns `false` for invalid records, duplicates, and records that hit
    /// the per-context ceiling. Before the gate opens the call waits until
    /// the queued admission has been processed.
    pub async fn admit(&self, record: ResourceRecord) -> bool {
        if !record.is_valid() {
            tracing::debug!(url = %record.url, "{}", CaptureError::InvalidRecord);
            return false;
        }
        let route = {
            let mut st = self.state();
            if !st.config.enabled {
                Route::Refused
            } else if st.gate.is_ready() {
                Route::Now(record)
            } else if let Ok(runtime) = Handle::try_current() {
                let (reply, rx) = oneshot::channel();
                let waiting = st.gate.park(Parked {
                    record,
                    reply,
                    runtime,
                });
                let threshold = st.config.gate.pending_warn_threshold;
                if threshold > 0 && waiting % threshold == 0 {
                    tracing::warn!(
                        waiting,
                        loads_outstanding = st.gate.outstanding_loads(),
                        active = ?st.gate.active_context(),
                        "admissions piling up behind readiness gate"
                    );
                } else {
                    tracing::trace!(waiting, "{}, queued", CaptureError::NotReady);
                }
                Route::Queued(rx)
            } else {
                tracing::warn!(url = %record.url, "{} and no runtime to wait on", CaptureError::NotReady);
                Route::Refused
            }
        };
        match route {
            Route::Refused => false,
            Route::Now(record) => self.admit_ready(record).await,
            Route::Queued(rx) => rx.await.unwrap_or(false),
        }
    }

    /// Hand parked admissions back for processing once the gate has opened.
    ///
    /// Safe to call from any thread: the drain runs on the runtime the first
    /// parked caller is waiting on.
    pub(super) fn release(&self, released: Option<Vec<Parked>>) {
        let Some(parked) = released else {
            return;
        };
        tracing::info!(queued = parked.len(), "readiness gate open");
        let Some(runtime) = parked.first().map(|p| p.runtime.clone()) else {
            return;
        };
        let svc = self.clone();
        runtime.spawn(async move {
            for Parked { record, reply, .. } in parked {
                let admitted = svc.admit_ready(record).await;
                let _ = reply.send(admitted);
            }
        });
    }

    async fn admit_ready(&self, mut record: ResourceRecord) -> bool {
        let step = {
            let mut st = self.state();
            let context = if record.context_id.is_unknown() {
                st.gate.active_context().unwrap_or(ContextId::UNKNOWN)
            } else {
                record.context_id
            };
            let len = st.store.len(context);
            if !st.blocks.allows(context) {
                Step::Blocked(context)
            } else if st.store.is_full(context) {
                let limit = st.store.max_length();
                st.store.reset(context);
                tracing::warn!("{}", CaptureError::CapacityOverflow { context, limit });
                Step::Overflow(context)
            } else if !st.dedup.should_admit(context, &record.url, len) {
                Step::Duplicate
            } else {
                Step::Proceed(context)
            }
        };
        let context = match step {
            Step::Proceed(context) => context,
            Step::Blocked(context) => {
                tracing::trace!(url = %record.url, context = %context, "page on block list");
                return false;
            }
            Step::Duplicate => {
                tracing::trace!(url = %record.url, "duplicate");
                return false;
            }
            Step::Overflow(context) => {
                let _ = self.flush_for(Some(context)).await;
                return false;
            }
        };

        record.context_id = context;
        match self.inner.tabs.page_info(context).await {
            Ok(page) => record.enrich(&page),
            Err(e) => tracing::debug!("{}, storing unenriched", e),
        }

        let outcome = self.state().store.append(context, record);
        match outcome {
            AppendOutcome::Appended(count) => {
                self.inner.badge.notify(context, count);
                self.request_save(context).await;
                true
            }
            AppendOutcome::Reset => {
                // Filled up while the lookup was in flight.
                let limit = self.state().store.max_length();
                tracing::warn!("{}", CaptureError::CapacityOverflow { context, limit });
                let _ = self.flush_for(Some(context)).await;
                false
            }
        }
    }
}
