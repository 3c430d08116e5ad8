//! Readiness gate: nothing is admitted until configuration is loaded and an
//! active context is known.
//!
//! The gate is a two-phase state machine (`Uninitialized → Ready`). Entering
//! `Ready` needs both configuration loads to have signalled (a counting
//! barrier) and an active context. Work arriving earlier is parked in a FIFO
//! queue and handed back exactly once, on the transition.

use std::collections::VecDeque;
use std::time::Instant;

use crate::record::ContextId;

/// The two independent configuration loads the gate waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLoad {
    /// Synchronised preferences (rules, limits).
    Sync,
    /// Local state, including the restored cache.
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatePhase {
    Uninitialized,
    Ready,
}

#[derive(Debug)]
pub struct ReadinessGate<T> {
    phase: GatePhase,
    sync_done: bool,
    local_done: bool,
    active: Option<ContextId>,
    pending: VecDeque<T>,
    waiting_since: Option<Instant>,
}

impl<T> Default for ReadinessGate<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ReadinessGate<T> {
    pub fn new() -> Self {
        Self {
            phase: GatePhase::Uninitialized,
            sync_done: false,
            local_done: false,
            active: None,
            pending: VecDeque::new(),
            waiting_since: None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.phase == GatePhase::Ready
    }

    pub fn phase(&self) -> GatePhase {
        self.phase
    }

    /// Loads still outstanding (0, 1 or 2).
    pub fn outstanding_loads(&self) -> usize {
        usize::from(!self.sync_done) + usize::from(!self.local_done)
    }

    pub fn active_context(&self) -> Option<ContextId> {
        self.active
    }

    /// Number of parked items.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// When the oldest parked item arrived, if any are parked.
    pub fn waiting_since(&self) -> Option<Instant> {
        self.waiting_since
    }

    /// Park an item until the gate opens. Returns the new queue length.
    pub fn park(&mut self, item: T) -> usize {
        if self.pending.is_empty() {
            self.waiting_since = Some(Instant::now());
        }
        self.pending.push_back(item);
        self.pending.len()
    }

    /// Mark one load complete. Returns the parked items if this opened the gate.
    pub fn complete(&mut self, load: ConfigLoad) -> Option<Vec<T>> {
        match load {
            ConfigLoad::Sync => self.sync_done = true,
            ConfigLoad::Local => self.local_done = true,
        }
        self.try_open()
    }

    /// Record the active context. Returns the parked items if this opened the gate.
    ///
    /// The unknown-context sentinel is not a usable active context.
    pub fn set_active(&mut self, context: ContextId) -> Option<Vec<T>> {
        if context.is_unknown() {
            return None;
        }
        self.active = Some(context);
        self.try_open()
    }

    fn try_open(&mut self) -> Option<Vec<T>> {
        if self.phase == GatePhase::Ready {
            return None;
        }
        if self.outstanding_loads() > 0 || self.active.is_none() {
            return None;
        }
        self.phase = GatePhase::Ready;
        self.waiting_since = None;
        Some(self.pending.drain(..).collect())
    }
}
