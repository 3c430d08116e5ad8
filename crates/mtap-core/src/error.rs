//! Error taxonomy for the capture subsystem.
//!
//! None of these reach end users directly; admission reports a plain `bool`
//! and the variants below are what gets logged or returned by collaborators.

use thiserror::Error;

use crate::record::ContextId;

#[derive(Debug, Error)]
pub enum CaptureError {
    /// Admission attempted before the readiness gate opened. Recovered by queueing.
    #[error("capture subsystem not ready")]
    NotReady,

    /// Missing URL, or missing both extension and MIME type.
    #[error("invalid resource record")]
    InvalidRecord,

    /// Tab lookup failed (context closed mid-flight). Record is stored unenriched.
    #[error("page lookup failed for context {context}")]
    EnrichmentLookupFailed { context: ContextId },

    /// Per-context sequence hit its ceiling; the context was reset.
    #[error("context {context} reached {limit} records and was reset")]
    CapacityOverflow { context: ContextId, limit: usize },

    /// Durable storage rejected a write. Memory stays authoritative.
    #[error("persisting cache failed: {0:#}")]
    PersistenceWriteFailed(anyhow::Error),

    #[error("context {0} not found")]
    ContextNotFound(ContextId),
}
