//! Simulation time model.
//!
//! # Design
//!
//! Time is represented as a monotonically increasing `Tick` counter.  The
//! mapping to simulated seconds is held in `SimClock`:
//!
//!   secs = tick / ticks_per_sec
//!
//! Using an integer tick as the canonical time unit means timer ordering is
//! exact and two waits that end "at the same time" really do coincide.  The
//! default resolution is 1 ms (1000 ticks per second), fine enough for motor
//! stop times and door sections while keeping test arithmetic readable.

use std::fmt;

// ── Tick ─────────────────────────────────────────────────────────────────────

/// An absolute simulation tick counter.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tick(pub u64);

impl Tick {
    pub const ZERO: Tick = Tick(0);
    pub const MAX: Tick = Tick(u64::MAX);

    /// Return the tick `n` steps after `self`, saturating at `Tick::MAX`.
    #[inline]
    pub fn offset(self, n: u64) -> Tick {
        Tick(self.0.saturating_add(n))
    }

    /// Ticks elapsed from `earlier` to `self`; zero if `earlier` is later.
    #[inline]
    pub fn since(self, earlier: Tick) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl std::ops::Add<u64> for Tick {
    type Output = Tick;
    #[inline]
    fn add(self, rhs: u64) -> Tick {
        self.offset(rhs)
    }
}

impl std::ops::Sub for Tick {
    type Output = u64;
    #[inline]
    fn sub(self, rhs: Tick) -> u64 {
        self.since(rhs)
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

// ── SimClock ──────────────────────────────────────────────────────────────────

/// Converts between tick counts and simulated seconds and tracks "now".
///
/// `SimClock` is cheap to copy and holds no heap data.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimClock {
    /// Resolution: ticks per simulated second.  Default: 1000.
    pub ticks_per_sec: u64,
    /// The current tick, moved forward by the engine with [`advance_to`](Self::advance_to).
    pub current_tick: Tick,
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new(1_000)
    }
}

impl SimClock {
    /// Create a clock at tick 0 with the given resolution (clamped to ≥ 1).
    pub fn new(ticks_per_sec: u64) -> Self {
        Self {
            ticks_per_sec: ticks_per_sec.max(1),
            current_tick:  Tick::ZERO,
        }
    }

    /// Move the clock to `tick`.  Time never runs backwards.
    #[inline]
    pub fn advance_to(&mut self, tick: Tick) {
        if tick > self.current_tick {
            self.current_tick = tick;
        }
    }

    /// Simulated seconds represented by `tick`.
    #[inline]
    pub fn secs(&self, tick: Tick) -> f64 {
        tick.0 as f64 / self.ticks_per_sec as f64
    }

    /// Simulated seconds elapsed since tick 0.
    #[inline]
    pub fn elapsed_secs(&self) -> f64 {
        self.secs(self.current_tick)
    }

    // ── Tick-count helpers ────────────────────────────────────────────────

    /// How many ticks span `secs` seconds?  Rounds to the nearest tick.
    ///
    /// Negative, zero, and NaN durations all map to 0: a computed wait that
    /// comes out negative means "do not wait".
    #[inline]
    pub fn ticks_for_secs(&self, secs: f64) -> u64 {
        if secs.is_nan() || secs <= 0.0 {
            return 0;
        }
        let ticks = (secs * self.ticks_per_sec as f64).round();
        if ticks >= u64::MAX as f64 { u64::MAX } else { ticks as u64 }
    }

    /// The tick `secs` seconds after `from`.
    #[inline]
    pub fn after_secs(&self, from: Tick, secs: f64) -> Tick {
        from.offset(self.ticks_for_secs(secs))
    }
}

impl fmt::Display for SimClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.3} s)", self.current_tick, self.elapsed_secs())
    }
}

// ── SimConfig ─────────────────────────────────────────────────────────────────

/// Top-level simulation configuration.
///
/// Typically read from the `[sim]` table of a layout file and passed to the
/// engine builder.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SimConfig {
    /// Clock resolution.  Default: 1000 (1 ms ticks).
    pub ticks_per_sec: u64,

    /// Stop the run after this many simulated seconds.  `None` runs until the
    /// line is idle (no timers, no pending sensor edges, no arrivals).
    pub end_secs: Option<f64>,

    /// Upper bound on task resumptions within a single instant.  Exceeding it
    /// means some handler is spinning without letting time advance.
    pub max_steps_per_instant: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            ticks_per_sec:         1_000,
            end_secs:              None,
            max_steps_per_instant: 100_000,
        }
    }
}

impl SimConfig {
    /// Construct a `SimClock` pre-configured for this run.
    pub fn make_clock(&self) -> SimClock {
        SimClock::new(self.ticks_per_sec)
    }

    /// The tick at which the run ends, or `Tick::MAX` for "until idle".
    pub fn end_tick(&self) -> Tick {
        match self.end_secs {
            Some(secs) => Tick(self.make_clock().ticks_for_secs(secs)),
            None       => Tick::MAX,
        }
    }
}
