//! `PhaseContext` — what a phase body may see and do beyond its own segment.

use cv_core::{LoadId, LoadStore, SegmentId, SignalId, SimClock, Tick};
use cv_schedule::Wait;

use crate::{Routine, SegmentEvent, Step};

/// The receiving segment of an outbound transfer, as seen by the sender.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Peer {
    /// Rated speed of the motor that will take the load (m/s).
    pub intake_speed:    f64,
    /// Whether the receiver forms trains (keeps train metadata).
    pub supports_trains: bool,
}

/// Where loads physically are, for diagnostics.  Phase logic never depends
/// on it: hosts without a physical model provide none.
pub trait LoadPositions {
    /// Front-edge position (m) of `load` along the segment it is on.
    fn front(&self, load: LoadId) -> Option<f64>;
}

/// Side effects a phase body requests; applied by the engine after the body
/// returns, in order.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    /// Wake every task waiting on the signal.
    Raise(SignalId),
    /// Ask the host to retry admitting queued loads into this segment.
    DispatchIn,
    /// Start a background routine on this segment.
    Spawn(Routine),
    Event(SegmentEvent),
}

/// Per-resumption view handed to a phase body.
pub struct PhaseContext<'a> {
    /// The segment whose handler is running.
    pub segment:   SegmentId,
    pub now:       Tick,
    pub clock:     SimClock,
    pub loads:     &'a mut LoadStore,
    /// Another transfer on this segment is in `RxBefore`/`Rx`.
    pub receiving: bool,
    /// The receiver of the current transfer, once one is chosen.
    pub peer:      Option<Peer>,
    positions:     Option<&'a dyn LoadPositions>,
    effects:       Vec<Effect>,
}

impl<'a> PhaseContext<'a> {
    pub fn new(segment: SegmentId, now: Tick, clock: SimClock, loads: &'a mut LoadStore) -> Self {
        Self {
            segment,
            now,
            clock,
            loads,
            receiving: false,
            peer: None,
            positions: None,
            effects: Vec::new(),
        }
    }

    pub fn with_receiving(mut self, receiving: bool) -> Self {
        self.receiving = receiving;
        self
    }

    pub fn with_peer(mut self, peer: Option<Peer>) -> Self {
        self.peer = peer;
        self
    }

    pub fn with_positions(mut self, positions: Option<&'a dyn LoadPositions>) -> Self {
        self.positions = positions;
        self
    }

    /// Front-edge position of `load`, when the host tracks positions.
    pub fn front(&self, load: LoadId) -> Option<f64> {
        self.positions.and_then(|p| p.front(load))
    }

    pub fn now_secs(&self) -> f64 {
        self.clock.secs(self.now)
    }

    pub fn raise(&mut self, signal: SignalId) {
        self.effects.push(Effect::Raise(signal));
    }

    pub fn dispatch_in(&mut self) {
        self.effects.push(Effect::DispatchIn);
    }

    pub fn spawn(&mut self, routine: Routine) {
        self.effects.push(Effect::Spawn(routine));
    }

    pub fn emit(&mut self, event: SegmentEvent) {
        self.effects.push(Effect::Event(event));
    }

    /// A timed wait of `secs` seconds.  Negative durations wait zero ticks.
    pub fn wait_secs(&self, secs: f64) -> Step {
        Step::Wait(Wait::Ticks(self.clock.ticks_for_secs(secs)))
    }

    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }
}
