use super::state::StateKind;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Counters for one rover's kernel. Cheap to clone; clones share counters.
#[derive(Clone, Default)]
pub struct KernelMetrics {
    /// Operations that reached a state, legal or not
    dispatched: Arc<AtomicU64>,

    /// Operations refused by the current state
    rejected: Arc<AtomicU64>,

    transitions: Arc<AtomicU64>,

    /// Reports handed to the transmission boundary
    reports: Arc<AtomicU64>,

    /// Received messages that did not decode
    decode_failures: Arc<AtomicU64>,

    /// Photo query, transmitter and other boundary failures
    external_failures: Arc<AtomicU64>,

    /// Times each state was entered
    entries: Arc<RwLock<BTreeMap<StateKind, u64>>>,
}

impl KernelMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_dispatch(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejection(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_transition(&self, to: StateKind) {
        self.transitions.fetch_add(1, Ordering::Relaxed);
        self.record_entry(to);
    }

    /// Counts an entry without a transition, e.g. the initial state.
    pub fn record_entry(&self, state: StateKind) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        *entries.entry(state).or_insert(0) += 1;
    }

    pub fn record_report(&self) {
        self.reports.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_external_failure(&self) {
        self.external_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    pub fn transitions(&self) -> u64 {
        self.transitions.load(Ordering::Relaxed)
    }

    pub fn entries_of(&self, state: StateKind) -> u64 {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(&state).copied().unwrap_or(0)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        MetricsSnapshot {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            rejected: self.rejected(),
            transitions: self.transitions(),
            reports: self.reports.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            external_failures: self.external_failures.load(Ordering::Relaxed),
            state_entries: entries.clone(),
        }
    }
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub dispatched: u64,
    pub rejected: u64,
    pub transitions: u64,
    pub reports: u64,
    pub decode_failures: u64,
    pub external_failures: u64,
    pub state_entries: BTreeMap<StateKind, u64>,
}
