//! Deterministic cooperative scheduler.
//!
//! The engine is single-threaded: all logical time is advanced explicitly
//! by the caller through [`crate::FormEngine::advance`]. The scheduler
//! tracks per-node debounce deadlines (one timer per node, re-scheduling
//! replaces the old deadline, which is what collapses rapid value changes
//! into a single run) and the set of nodes whose aggregate validity needs
//! recomputing on the next tick.

use std::collections::{BTreeMap, BTreeSet};

use formtree_model::NodeId;

/// Identifies a parked, deferred validation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DeferredHandle(pub(crate) u64);

#[derive(Debug, Default)]
pub struct Scheduler {
    now_ms: u64,
    /// Pending debounce deadline per node, coalesced by node.
    timers: BTreeMap<NodeId, u64>,
    /// Nodes marked for aggregate-validity recomputation.
    validity_dirty: BTreeSet<NodeId>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> u64 {
        self.now_ms
    }

    /// (Re-)schedule a node's validation run `delay_ms` from now. A later
    /// call within the window replaces the deadline.
    pub fn schedule(&mut self, node: NodeId, delay_ms: u64) {
        self.timers.insert(node, self.now_ms + delay_ms);
    }

    pub fn cancel(&mut self, node: NodeId) {
        self.timers.remove(&node);
    }

    pub fn has_timer(&self, node: NodeId) -> bool {
        self.timers.contains_key(&node)
    }

    /// Earliest pending deadline, if any.
    pub fn next_deadline(&self) -> Option<u64> {
        self.timers.values().min().copied()
    }

    pub fn advance_by(&mut self, ms: u64) {
        self.now_ms += ms;
    }

    /// Remove and return all timers due at the current time, ordered by
    /// deadline then node id for determinism.
    pub fn take_due(&mut self) -> Vec<NodeId> {
        let due: Vec<(u64, NodeId)> = self
            .timers
            .iter()
            .filter(|(_, deadline)| **deadline <= self.now_ms)
            .map(|(node, deadline)| (*deadline, *node))
            .collect();
        let mut due = due;
        due.sort_unstable();
        for (_, node) in &due {
            self.timers.remove(node);
        }
        due.into_iter().map(|(_, node)| node).collect()
    }

    pub fn mark_validity(&mut self, node: NodeId) {
        self.validity_dirty.insert(node);
    }

    pub fn take_validity_dirty(&mut self) -> BTreeSet<NodeId> {
        std::mem::take(&mut self.validity_dirty)
    }
}
