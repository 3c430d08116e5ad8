use std::collections::{BTreeMap, HashSet};

use crate::record::{now_millis, ContextId, ResourceRecord};

/// Records captured for one context, in admission order.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextState {
    pub context_id: ContextId,
    pub records: Vec<ResourceRecord>,
    /// Unix millis of the last append or reset.
    pub last_activity: u64,
}

impl ContextState {
    fn new(context_id: ContextId) -> Self {
        Self {
            context_id,
            records: Vec::new(),
            last_activity: now_millis(),
        }
    }
}

/// Result of [`CacheStore::append`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Appended; the context now holds this many records.
    Appended(usize),
    /// The context was already at its ceiling and has been cleared. The record
    /// was dropped.
    Reset,
}

/// Context id → ordered records, plus the `init` marker.
///
/// `init` is true from construction until a restore has run, which separates
/// "not restored yet" from "restored and empty".
#[derive(Debug, Clone)]
pub struct CacheStore {
    contexts: BTreeMap<ContextId, ContextState>,
    init: bool,
    max_length: usize,
}

impl CacheStore {
    pub fn new(max_length: usize) -> Self {
        Self {
            contexts: BTreeMap::new(),
            init: true,
            max_length: max_length.max(1),
        }
    }

    pub fn is_init(&self) -> bool {
        self.init
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn set_max_length(&mut self, max_length: usize) {
        self.max_length = max_length.max(1);
    }

    /// Replace contents with restored data and clear the `init` marker.
    pub fn restore(&mut self, contexts: BTreeMap<ContextId, Vec<ResourceRecord>>) {
        let now = now_millis();
        self.contexts = contexts
            .into_iter()
            .map(|(id, records)| {
                let last_activity = records.iter().map(|r| r.detected_at).max().unwrap_or(now);
                (
                    id,
                    ContextState {
                        context_id: id,
                        records,
                        last_activity,
                    },
                )
            })
            .collect();
        self.init = false;
    }

    /// Number of records held for `context` (0 if absent).
    pub fn len(&self, context: ContextId) -> usize {
        self.contexts.get(&context).map_or(0, |c| c.records.len())
    }

    pub fn is_full(&self, context: ContextId) -> bool {
        self.len(context) >= self.max_length
    }

    /// Append `record` to `context`, or reset the context if it is full.
    pub fn append(&mut self, context: ContextId, mut record: ResourceRecord) -> AppendOutcome {
        if self.is_full(context) {
            self.reset(context);
            return AppendOutcome::Reset;
        }
        record.context_id = context;
        let state = self
            .contexts
            .entry(context)
            .or_insert_with(|| ContextState::new(context));
        state.records.push(record);
        state.last_activity = now_millis();
        AppendOutcome::Appended(state.records.len())
    }

    /// Clear a context's records, keeping its (now empty) entry.
    pub fn reset(&mut self, context: ContextId) {
        let state = self
            .contexts
            .entry(context)
            .or_insert_with(|| ContextState::new(context));
        state.records.clear();
        state.last_activity = now_millis();
    }

    pub fn records(&self, context: ContextId) -> &[ResourceRecord] {
        self.contexts
            .get(&context)
            .map_or(&[][..], |c| c.records.as_slice())
    }

    pub fn contexts(&self) -> impl Iterator<Item = &ContextState> {
        self.contexts.values()
    }

    pub fn context_ids(&self) -> Vec<ContextId> {
        self.contexts.keys().copied().collect()
    }

    /// Full mapping, cloned.
    pub fn to_map(&self) -> BTreeMap<ContextId, Vec<ResourceRecord>> {
        self.contexts
            .iter()
            .map(|(id, c)| (*id, c.records.clone()))
            .collect()
    }

    pub fn remove(&mut self, context: ContextId) -> bool {
        self.contexts.remove(&context).is_some()
    }

    /// Remove every context not in `live`. Returns how many were removed.
    pub fn retain_live(&mut self, live: &HashSet<ContextId>) -> usize {
        let before = self.contexts.len();
        self.contexts.retain(|id, _| live.contains(id));
        before - self.contexts.len()
    }

    /// Remove every context except `keep`. Returns how many were removed.
    pub fn retain_only(&mut self, keep: ContextId) -> usize {
        let before = self.contexts.len();
        self.contexts.retain(|id, _| *id == keep);
        before - self.contexts.len()
    }

    /// Drop records detected before `cutoff_millis`. Contexts emptied here
    /// go too, as do empty contexts idle since before the cutoff; a context
    /// reset more recently keeps its empty entry. Returns the number of
    /// records removed.
    pub fn drop_older_than(&mut self, cutoff_millis: u64) -> usize {
        let mut removed = 0;
        self.contexts.retain(|_, state| {
            let before = state.records.len();
            state.records.retain(|r| r.detected_at >= cutoff_millis);
            removed += before - state.records.len();
            if before == 0 {
                state.last_activity >= cutoff_millis
            } else {
                !state.records.is_empty()
            }
        });
        removed
    }

    pub fn total_count(&self) -> usize {
        self.contexts.values().map(|c| c.records.len()).sum()
    }

    pub fn context_count(&self) -> usize {
        self.contexts.len()
    }
}
