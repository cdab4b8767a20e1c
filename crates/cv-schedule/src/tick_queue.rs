//! `TickQueue` — sparse tick-keyed queue.
//!
//! Backs both the scheduler's timers and the engine's scheduled load
//! arrivals.  Entries pushed for the same tick come out in push order, which
//! keeps runs deterministic.
//!
//! `BTreeMap` gives O(log W) insert and pop where W = number of distinct
//! ticks currently enqueued.

use std::collections::BTreeMap;

use cv_core::Tick;

/// A priority queue mapping ticks → items due at that tick.
#[derive(Debug)]
pub struct TickQueue<T> {
    inner: BTreeMap<Tick, Vec<T>>,
    /// Cached total item count for O(1) `len()`.
    total: usize,
}

impl<T> Default for TickQueue<T> {
    fn default() -> Self {
        Self {
            inner: BTreeMap::new(),
            total: 0,
        }
    }
}

impl<T> TickQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `item` at `tick`.
    pub fn push(&mut self, tick: Tick, item: T) {
        self.inner.entry(tick).or_default().push(item);
        self.total += 1;
    }

    /// Remove and return all items scheduled for exactly `tick`.
    ///
    /// Returns `None` if nothing is queued for that tick.
    pub fn drain_tick(&mut self, tick: Tick) -> Option<Vec<T>> {
        let items = self.inner.remove(&tick)?;
        self.total -= items.len();
        Some(items)
    }

    /// Remove and return every item due at or before `tick`, earliest first.
    pub fn drain_through(&mut self, tick: Tick) -> Vec<T> {
        let mut out = Vec::new();
        while let Some(next) = self.next_tick() {
            if next > tick {
                break;
            }
            if let Some(items) = self.drain_tick(next) {
                out.extend(items);
            }
        }
        out
    }

    /// Items queued for the earliest tick, without removing them.
    pub fn peek_next(&self) -> Option<(Tick, &[T])> {
        self.inner.iter().next().map(|(t, v)| (*t, v.as_slice()))
    }

    /// The earliest tick with at least one queued item, or `None` if empty.
    pub fn next_tick(&self) -> Option<Tick> {
        self.inner.keys().next().copied()
    }

    /// Total number of queued items across all ticks.
    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Number of distinct ticks that have at least one queued item.
    pub fn tick_count(&self) -> usize {
        self.inner.len()
    }
}
