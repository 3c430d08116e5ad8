//! Per-context URL fingerprints for duplicate suppression.
//!
//! Each context keeps a set of URLs it has admitted. The set is capped at the
//! cleanup threshold and cleared wholesale when it gets there, so a busy
//! context trades perfect dedup for bounded memory.

use std::collections::{HashMap, HashSet};

use crate::record::ContextId;

#[derive(Debug, Clone)]
pub struct DedupEngine {
    enabled: bool,
    cleanup_threshold: usize,
    fingerprints: HashMap<ContextId, HashSet<String>>,
}

impl DedupEngine {
    pub fn new(enabled: bool, cleanup_threshold: usize) -> Self {
        Self {
            enabled,
            cleanup_threshold: cleanup_threshold.max(1),
            fingerprints: HashMap::new(),
        }
    }

    /// Re-apply limits after a configuration change. Existing sets are kept.
    pub fn reconfigure(&mut self, enabled: bool, cleanup_threshold: usize) {
        self.enabled = enabled;
        self.cleanup_threshold = cleanup_threshold.max(1);
    }

    /// Decide whether `url` may be admitted into `context`, whose sequence
    /// currently holds `current_len` records. Records the fingerprint on admit.
    pub fn should_admit(&mut self, context: ContextId, url: &str, current_len: usize) -> bool {
        if !self.enabled || current_len > self.cleanup_threshold {
            return true;
        }
        let set = self.fingerprints.entry(context).or_default();
        if set.contains(url) {
            return false;
        }
        set.insert(url.to_string());
        if set.len() >= self.cleanup_threshold {
            tracing::debug!(context = %context, size = set.len(), "fingerprint set full, clearing");
            set.clear();
        }
        true
    }

    /// Fingerprints currently held for `context`.
    pub fn set_len(&self, context: ContextId) -> usize {
        self.fingerprints.get(&context).map_or(0, HashSet::len)
    }

    /// Number of contexts with a fingerprint set.
    pub fn context_count(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn fingerprint_count(&self) -> usize {
        self.fingerprints.values().map(HashSet::len).sum()
    }

    pub fn forget(&mut self, context: ContextId) {
        self.fingerprints.remove(&context);
    }

    /// Drop every set whose context fails `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(ContextId) -> bool) {
        self.fingerprints.retain(|ctx, _| keep(*ctx));
    }
}
