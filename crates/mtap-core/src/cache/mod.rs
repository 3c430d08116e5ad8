//! In-memory cache of admitted records, keyed by context.
//!
//! The store is the only writer of context state. It knows nothing about
//! readiness, dedup, or persistence timing; the capture service drives it.

mod snapshot;
mod store;

pub use snapshot::{PersistedCache, SNAPSHOT_VERSION};
pub use store::{AppendOutcome, CacheStore, ContextState};
