//! Positional actuators: turntables, chain lifts, airlock doors.
//!
//! A mechanism does not move by itself.  The owning handler calls
//! [`Mechanism::begin`], waits the returned travel time, then calls
//! [`Mechanism::arrive`].  Once started, a motion always runs to completion.

use cv_core::SignalId;
use cv_schedule::SignalBoard;

/// Two positions closer than this are considered equal (degrees for
/// turntables, metres for lifts).
pub const ANGLE_TOLERANCE: f64 = 0.01;

/// Number of sections an airlock door is raised or lowered in.
pub const DOOR_SECTIONS: u32 = 10;

// ── Mechanism ─────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub struct Mechanism {
    position:      f64,
    target:        f64,
    /// Travel time per unit of position (s/°, s per full lift, …).
    secs_per_unit: f64,
    moving:        bool,
    finished:      SignalId,
}

impl Mechanism {
    /// A mechanism at rest at `position`.  Allocates `"{owner}.{name}.finished"`.
    pub fn new(
        owner:         &str,
        name:          &str,
        position:      f64,
        secs_per_unit: f64,
        signals:       &mut SignalBoard,
    ) -> Self {
        Self {
            position,
            target: position,
            secs_per_unit,
            moving: false,
            finished: signals.allocate(format!("{owner}.{name}.finished")),
        }
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn is_moving(&self) -> bool {
        self.moving
    }

    /// Raised by the owner when a motion completes.
    pub fn finished(&self) -> SignalId {
        self.finished
    }

    pub fn set_secs_per_unit(&mut self, secs_per_unit: f64) {
        self.secs_per_unit = secs_per_unit;
    }

    /// Start moving to `target`.  Returns the travel time in seconds, or 0
    /// if the mechanism is already within `tolerance` of it (it snaps there).
    pub fn begin(&mut self, target: f64, tolerance: f64) -> f64 {
        let diff = (target - self.position).abs();
        self.target = target;
        if diff <= tolerance {
            self.position = target;
            self.moving = false;
            return 0.0;
        }
        self.moving = true;
        diff * self.secs_per_unit
    }

    /// The motion has completed.  Returns the `finished` signal to raise.
    pub fn arrive(&mut self) -> SignalId {
        self.position = self.target;
        self.moving = false;
        self.finished
    }

    /// Put the mechanism at rest at `position` (reset).
    pub fn place(&mut self, position: f64) {
        self.position = position;
        self.target = position;
        self.moving = false;
    }
}

// ── Door ──────────────────────────────────────────────────────────────────────

/// An airlock door that rises or lowers one section at a time.
///
/// Position counts open sections, `0` (closed) to `DOOR_SECTIONS` (open).
/// The `closed` flag flips only when a motion ends, so a door that is still
/// opening reports closed.
#[derive(Clone, Debug, PartialEq)]
pub struct Door {
    mech:   Mechanism,
    goal:   f64,
    closed: bool,
}

impl Door {
    /// A closed door whose full travel takes `duration_secs`.
    pub fn new(owner: &str, name: &str, duration_secs: f64, signals: &mut SignalBoard) -> Self {
        Self {
            mech:   Mechanism::new(owner, name, 0.0, section_secs(duration_secs), signals),
            goal:   0.0,
            closed: true,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn is_moving(&self) -> bool {
        self.mech.is_moving() || (self.mech.position() - self.goal).abs() >= 0.5
    }

    pub fn open_sections(&self) -> u32 {
        self.mech.position().round() as u32
    }

    pub fn finished(&self) -> SignalId {
        self.mech.finished()
    }

    pub fn set_duration(&mut self, duration_secs: f64) {
        self.mech.set_secs_per_unit(section_secs(duration_secs));
    }

    /// Aim the door fully open (`true`) or fully closed (`false`).
    pub fn begin(&mut self, open: bool) {
        self.goal = if open { f64::from(DOOR_SECTIONS) } else { 0.0 };
    }

    /// Advance the motion by one section.
    ///
    /// Returns `Some(secs)` when another section started moving, or `None`
    /// once the goal is reached (and the closed flag is updated).
    pub fn step(&mut self) -> Option<f64> {
        if self.mech.is_moving() {
            self.mech.arrive();
        }
        let pos = self.mech.position();
        if (pos - self.goal).abs() < 0.5 {
            self.closed = self.goal == 0.0;
            return None;
        }
        let next = if self.goal > pos { pos + 1.0 } else { pos - 1.0 };
        Some(self.mech.begin(next, 0.0))
    }

    /// Snap back to closed (reset).
    pub fn reset(&mut self) {
        self.mech.place(0.0);
        self.goal = 0.0;
        self.closed = true;
    }
}

fn section_secs(duration_secs: f64) -> f64 {
    duration_secs / f64::from(DOOR_SECTIONS)
}
