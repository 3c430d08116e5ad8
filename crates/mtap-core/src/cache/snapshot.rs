//! Durable payload for the cache and its conversions.
//!
//! Two shapes are written: the bare `{"init": true}` placeholder when the
//! store was never restored, and `{"version": 1, "contexts": {...}}`.
//! Anything we cannot read back is treated as an empty cache.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::record::{ContextId, ResourceRecord};

use super::CacheStore;

pub const SNAPSHOT_VERSION: u8 = 1;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedCache {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub init: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u8>,
    /// Keys are context ids as decimal strings.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub contexts: BTreeMap<String, Vec<ResourceRecord>>,
}

impl PersistedCache {
    pub fn placeholder() -> Self {
        Self {
            init: true,
            version: None,
            contexts: BTreeMap::new(),
        }
    }

    pub fn from_store(store: &CacheStore) -> Self {
        if store.is_init() {
            return Self::placeholder();
        }
        let contexts = store
            .contexts()
            .map(|c| (c.context_id.to_key(), c.records.clone()))
            .collect();
        Self {
            init: false,
            version: Some(SNAPSHOT_VERSION),
            contexts,
        }
    }

    /// Decode a stored JSON value. `None` means "start empty": nothing usable
    /// was stored (placeholder, unknown version, or unparseable shape).
    pub fn decode(value: serde_json::Value) -> Option<BTreeMap<ContextId, Vec<ResourceRecord>>> {
        let parsed: PersistedCache = match serde_json::from_value(value) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!("stored cache unreadable, starting empty: {}", e);
                return None;
            }
        };
        if parsed.init {
            return None;
        }
        if parsed.version != Some(SNAPSHOT_VERSION) {
            tracing::warn!(version = ?parsed.version, "stored cache has unknown version, starting empty");
            return None;
        }
        let contexts = parsed
            .contexts
            .into_iter()
            .filter_map(|(key, records)| match ContextId::from_key(&key) {
                Some(id) => Some((id, records)),
                None => {
                    tracing::debug!(key = %key, "skipping non-numeric context key");
                    None
                }
            })
            .collect();
        Some(contexts)
    }
}
