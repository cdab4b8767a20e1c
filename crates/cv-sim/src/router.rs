//! Links between segments and the routing decision made after `Process`.

use std::collections::HashMap;

use cv_core::{Load, SegmentId};
use cv_transfer::Port;

/// A directed connection: loads leave `from` through `tx` and enter `to`
/// through `rx`.
#[derive(Clone, Debug, PartialEq)]
pub struct Link {
    pub from: SegmentId,
    pub to:   SegmentId,
    pub tx:   Port,
    pub rx:   Port,
}

/// Chooses where a load goes once it has been processed.
pub trait Router {
    /// Pick one of `candidates` (the outgoing links of `from`, in layout
    /// order) by index.  `None` makes `from` act as a sink for this load.
    fn route(&mut self, from: SegmentId, load: &Load, candidates: &[&Link]) -> Option<usize>;
}

// ── FirstLink ─────────────────────────────────────────────────────────────────

/// Always takes the first outgoing link.  A segment without one is a sink.
#[derive(Clone, Copy, Debug, Default)]
pub struct FirstLink;

impl Router for FirstLink {
    fn route(&mut self, _from: SegmentId, _load: &Load, candidates: &[&Link]) -> Option<usize> {
        (!candidates.is_empty()).then_some(0)
    }
}

// ── RoundRobin ────────────────────────────────────────────────────────────────

/// Cycles through the outgoing links of each segment in turn.
#[derive(Clone, Debug, Default)]
pub struct RoundRobin {
    next: HashMap<SegmentId, usize>,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Router for RoundRobin {
    fn route(&mut self, from: SegmentId, _load: &Load, candidates: &[&Link]) -> Option<usize> {
        if candidates.is_empty() {
            return None;
        }
        let slot = self.next.entry(from).or_default();
        let pick = *slot % candidates.len();
        *slot = pick + 1;
        Some(pick)
    }
}
