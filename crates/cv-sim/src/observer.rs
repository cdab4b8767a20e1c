//! Simulation observer trait for progress reporting and data collection.

use cv_core::{LoadId, SegmentId, Tick};
use cv_transfer::{SegmentEvent, TransferPhase};

/// Callbacks invoked by [`Sim::run`][crate::Sim::run] as the line runs.
///
/// All methods have default no-op implementations so implementors only need to
/// override what they care about.
///
/// # Example — train counter
///
/// ```rust,ignore
/// struct TrainCounter(usize);
///
/// impl SimObserver for TrainCounter {
///     fn on_segment_event(&mut self, _t: Tick, _s: SegmentId, event: &SegmentEvent) {
///         if matches!(event, SegmentEvent::TrainReleased { .. }) {
///             self.0 += 1;
///         }
///     }
/// }
/// ```
pub trait SimObserver {
    /// Simulated time jumped forward to `tick`.
    fn on_time_advance(&mut self, _tick: Tick) {}

    /// The transfer of `load` on `segment` entered `phase`.
    fn on_phase(&mut self, _tick: Tick, _segment: SegmentId, _load: LoadId, _phase: TransferPhase) {}

    /// A handler reported something (train release, door motion, warning…).
    fn on_segment_event(&mut self, _tick: Tick, _segment: SegmentId, _event: &SegmentEvent) {}

    /// A motor on `segment` was switched on or off.
    fn on_motor(&mut self, _tick: Tick, _segment: SegmentId, _on: bool) {}

    /// The admission gate of `segment` opened or closed.
    fn on_gate(&mut self, _tick: Tick, _segment: SegmentId, _open: bool) {}

    /// A handler asked the host to retry admitting queued loads.
    fn on_dispatch_request(&mut self, _tick: Tick, _segment: SegmentId) {}

    /// An injected load was admitted onto its first segment.
    fn on_load_arrived(&mut self, _tick: Tick, _segment: SegmentId, _load: LoadId) {}

    /// A load left the line through a sink segment.
    fn on_load_consumed(&mut self, _tick: Tick, _segment: SegmentId, _load: LoadId) {}

    /// Called once when `run` returns.
    fn on_sim_end(&mut self, _final_tick: Tick) {}
}

/// A [`SimObserver`] that does nothing.  Use when you need to call `run` but
/// don't want callbacks.
pub struct NoopObserver;

impl SimObserver for NoopObserver {}
