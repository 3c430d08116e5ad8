//! Three-tier save debounce: long delay under load, short delay on the hot
//! path, otherwise write now.

use std::time::Duration;

use tokio::time::Instant;

use crate::config::PersistConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveState {
    Idle,
    PendingShort,
    PendingLong,
}

/// What the caller should do with a save request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveAction {
    /// Write the snapshot now; any pending timer must be cancelled.
    FlushNow,
    /// (Re)arm the single pending timer for this delay.
    Arm(Duration),
}

#[derive(Debug, Clone)]
pub struct SavePolicy {
    heavy_load_threshold: usize,
    heavy_retry_limit: u32,
    long_delay: Duration,
    hot_interval: Duration,
    short_delay: Duration,
    state: SaveState,
    escalations: u32,
    last_flush: Option<Instant>,
}

impl SavePolicy {
    pub fn new(cfg: &PersistConfig) -> Self {
        Self {
            heavy_load_threshold: cfg.heavy_load_threshold,
            heavy_retry_limit: cfg.heavy_retry_limit,
            long_delay: cfg.long_delay(),
            hot_interval: cfg.hot_interval(),
            short_delay: cfg.short_delay(),
            state: SaveState::Idle,
            escalations: 0,
            last_flush: None,
        }
    }

    /// Swap in new tunables; state and counters carry over.
    pub fn reconfigure(&mut self, cfg: &PersistConfig) {
        self.heavy_load_threshold = cfg.heavy_load_threshold;
        self.heavy_retry_limit = cfg.heavy_retry_limit;
        self.long_delay = cfg.long_delay();
        self.hot_interval = cfg.hot_interval();
        self.short_delay = cfg.short_delay();
    }

    pub fn state(&self) -> SaveState {
        self.state
    }

    pub fn escalations(&self) -> u32 {
        self.escalations
    }

    /// Classify a save request for a context holding `context_len` records.
    ///
    /// The hot window is measured from the last flush and is not refreshed by
    /// requests, so a steady stream still flushes every `short_delay` or so.
    pub fn decide(&mut self, context_len: usize, now: Instant) -> SaveAction {
        if context_len >= self.heavy_load_threshold && self.escalations < self.heavy_retry_limit {
            self.escalations += 1;
            self.state = SaveState::PendingLong;
            return SaveAction::Arm(self.long_delay);
        }
        let hot = self
            .last_flush
            .is_some_and(|at| now.saturating_duration_since(at) < self.hot_interval);
        if hot {
            self.state = SaveState::PendingShort;
            return SaveAction::Arm(self.short_delay);
        }
        SaveAction::FlushNow
    }

    /// Back to `Idle` after a write has been started.
    pub fn mark_flushed(&mut self, now: Instant) {
        self.state = SaveState::Idle;
        self.escalations = 0;
        self.last_flush = Some(now);
    }
}
