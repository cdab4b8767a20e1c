//! The physical stand-in: where loads are, and which sensors they block.
//!
//! Handlers only ever see sensor states and edges.  A `Plant` produces them.
//! Three are provided:
//!
//! | Plant           | Sensor edges come from                                  |
//! |-----------------|---------------------------------------------------------|
//! | `NullPlant`     | nowhere; callers use `Sim::sensor_edge`                 |
//! | `ScriptedPlant` | a timed list given up front                             |
//! | `BeltPlant`     | loads advancing at motor speed over the sensor positions |

use std::collections::BTreeMap;

use cv_core::{LoadId, LoadStore, SegmentId, SimClock, Tick};
use cv_equipment::{Rig, Sensor};
use cv_schedule::TickQueue;
use cv_transfer::LoadPositions;

/// Desired state of one sensor.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Edge {
    Blocked(LoadId),
    Cleared,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SensorEdge {
    pub segment: SegmentId,
    /// Index into the segment's rig sensors.
    pub sensor:  usize,
    pub edge:    Edge,
}

/// Read-only view of the line handed to a plant.
pub struct PlantView<'a> {
    pub clock: SimClock,
    /// Rigs indexed by `SegmentId`.
    pub rigs:  &'a [&'a Rig],
    pub loads: &'a LoadStore,
}

/// Physics stand-in driven by the engine.
///
/// The engine applies every reported edge that changes a sensor's state and
/// raises the matching signal; reporting an unchanged state is harmless.
pub trait Plant {
    /// `load` was put at the entry of `segment`.
    fn place(&mut self, _load: LoadId, _segment: SegmentId) {}

    /// `load` left the segment it was on.
    fn remove(&mut self, _load: LoadId) {}

    /// Bring the physical state up to `now` and report sensor states.
    fn advance(&mut self, now: Tick, view: &PlantView<'_>) -> Vec<SensorEdge>;

    /// Earliest tick after `now` at which `advance` would report a new edge,
    /// assuming no motor changes state in between.
    fn next_edge(&self, now: Tick, view: &PlantView<'_>) -> Option<Tick>;

    /// Load positions for segment diagnostics, if this plant tracks them.
    fn positions(&self) -> Option<&dyn LoadPositions> {
        None
    }

    fn reset(&mut self) {}
}

// ── NullPlant ─────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Default)]
pub struct NullPlant;

impl Plant for NullPlant {
    fn advance(&mut self, _now: Tick, _view: &PlantView<'_>) -> Vec<SensorEdge> {
        Vec::new()
    }

    fn next_edge(&self, _now: Tick, _view: &PlantView<'_>) -> Option<Tick> {
        None
    }
}

// ── ScriptedPlant ─────────────────────────────────────────────────────────────

/// Replays sensor edges at fixed ticks, regardless of motors.
#[derive(Debug, Default)]
pub struct ScriptedPlant {
    edges: TickQueue<SensorEdge>,
}

impl ScriptedPlant {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`push`](Self::push).
    pub fn at(mut self, tick: Tick, segment: SegmentId, sensor: usize, edge: Edge) -> Self {
        self.push(tick, segment, sensor, edge);
        self
    }

    pub fn push(&mut self, tick: Tick, segment: SegmentId, sensor: usize, edge: Edge) {
        self.edges.push(tick, SensorEdge { segment, sensor, edge });
    }

    pub fn remaining(&self) -> usize {
        self.edges.len()
    }
}

impl Plant for ScriptedPlant {
    fn advance(&mut self, now: Tick, _view: &PlantView<'_>) -> Vec<SensorEdge> {
        self.edges.drain_through(now)
    }

    fn next_edge(&self, _now: Tick, _view: &PlantView<'_>) -> Option<Tick> {
        self.edges.next_tick()
    }
}

// ── BeltPlant ─────────────────────────────────────────────────────────────────

/// Positions closer than this count as equal.
const EPS: f64 = 1e-9;

/// Loads ride their segment at the running motor's speed and stop dead when
/// it stops.  On a zoned segment each load follows the zone under its
/// front.  A sensor is blocked by the front-most load whose body spans it.
/// Loads do not collide; a load stuck to its segment does not move.
///
/// A load enters a segment with its front edge at position 0.
#[derive(Clone, Debug, Default)]
pub struct BeltPlant {
    /// Front-edge position of every load on the line.
    placed: BTreeMap<LoadId, (SegmentId, f64)>,
    last:   Option<Tick>,
}

impl BeltPlant {
    pub fn new() -> Self {
        Self::default()
    }

    /// Segment and front-edge position of `load`, if it is on the line.
    pub fn position(&self, load: LoadId) -> Option<(SegmentId, f64)> {
        self.placed.get(&load).copied()
    }

    fn length(view: &PlantView<'_>, load: LoadId) -> f64 {
        view.loads.get(load).map_or(0.0, |l| l.length)
    }

    /// Belt speed under `load`, or `None` if it is not moving.  On a zoned
    /// segment the zone under the load's front drives it.
    fn speed(view: &PlantView<'_>, load: LoadId, segment: SegmentId, front: f64) -> Option<f64> {
        let rig = view.rigs.get(segment.index())?;
        let stuck = view.loads.get(load).is_ok_and(|l| l.stuck_to.is_some());
        let speed = rig.speed_at(front)?;
        (!stuck && speed > 0.0).then_some(speed)
    }

    /// The load blocking a sensor at `at` on `segment`.
    fn covering(&self, view: &PlantView<'_>, segment: SegmentId, at: f64) -> Option<LoadId> {
        self.placed
            .iter()
            .filter(|(_, (seg, _))| *seg == segment)
            .filter(|(load, (_, front))| {
                let rear = front - Self::length(view, **load);
                *front >= at - EPS && rear < at - EPS
            })
            .max_by(|a, b| a.1.1.total_cmp(&b.1.1))
            .map(|(load, _)| *load)
    }
}

impl LoadPositions for BeltPlant {
    fn front(&self, load: LoadId) -> Option<f64> {
        self.position(load).map(|(_, front)| front)
    }
}

impl Plant for BeltPlant {
    fn positions(&self) -> Option<&dyn LoadPositions> {
        Some(self)
    }

    fn place(&mut self, load: LoadId, segment: SegmentId) {
        self.placed.insert(load, (segment, 0.0));
    }

    fn remove(&mut self, load: LoadId) {
        self.placed.remove(&load);
    }

    fn advance(&mut self, now: Tick, view: &PlantView<'_>) -> Vec<SensorEdge> {
        let dt = self.last.map_or(0.0, |last| view.clock.secs(Tick(now - last)));
        self.last = Some(now);
        if dt > 0.0 {
            for (load, (segment, front)) in self.placed.iter_mut() {
                if let Some(v) = Self::speed(view, *load, *segment, *front) {
                    *front += v * dt;
                }
            }
        }

        let mut edges = Vec::new();
        for (index, rig) in view.rigs.iter().enumerate() {
            let segment = SegmentId(index as u32);
            for (sensor, eye) in rig.sensors.iter().enumerate() {
                let blocking = if eye.is_enabled() {
                    self.covering(view, segment, eye.position())
                } else {
                    None
                };
                let edge = blocking.map_or(Edge::Cleared, Edge::Blocked);
                edges.push(SensorEdge { segment, sensor, edge });
            }
        }
        edges
    }

    fn next_edge(&self, now: Tick, view: &PlantView<'_>) -> Option<Tick> {
        let mut soonest: Option<f64> = None;
        for (load, (segment, front)) in &self.placed {
            let Some(v) = Self::speed(view, *load, *segment, *front) else {
                continue;
            };
            let Some(rig) = view.rigs.get(segment.index()) else {
                continue;
            };
            let length = Self::length(view, *load);
            let mut targets = Vec::new();
            for eye in rig.sensors.iter().filter(|e| e.is_enabled()) {
                // Front reaches the beam, then the rear leaves it.
                targets.extend([eye.position() - EPS, eye.position() + length - EPS]);
            }
            // Crossing into the next zone may change the speed.
            targets.extend((1..rig.zone_count()).map(|k| k as f64 * rig.zone_length + EPS));
            for target in targets {
                let d = target - front;
                if d > 0.0 {
                    let secs = d / v;
                    soonest = Some(soonest.map_or(secs, |s| s.min(secs)));
                }
            }
        }
        let secs = soonest?;
        let ticks = (secs * view.clock.ticks_per_sec as f64).ceil().max(1.0) as u64;
        Some(now.offset(ticks))
    }

    fn reset(&mut self) {
        self.placed.clear();
        self.last = None;
    }
}
