//! Train formation: accumulate loads on a segment and release them together.
//!
//! A segment that forms trains holds each admitted load in
//! `RxTransferComplete` until one of:
//!
//! - the segment is full (`count >= capacity`),
//! - an arriving load carried the "last of an incomplete train" marker, which
//!   forces whatever is queued to leave,
//! - the waiting window closes.  Every admission reopens the window at
//!   `now + max_waiting_time`, so the window is measured from the most recent
//!   arrival.
//!
//! The first load of the queue then tags every load with the train's size,
//! completeness and 1-based position.

use serde::Deserialize;

use cv_core::{CvResult, LoadId, LoadStore, PropertyOutcome, SignalId, SimClock, Tick, TrainTag};
use cv_schedule::{SignalBoard, Wait};

/// Remaining windows at or below this many seconds count as elapsed.
pub const WAIT_EPSILON_SECS: f64 = 1e-4;

// ── TrainSettings ─────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrainSettings {
    pub create_train:     bool,
    /// Loads per train.  `1` turns batching into pass-through.
    pub capacity:         u32,
    /// Seconds to wait for the next load before releasing an incomplete train.
    pub max_waiting_time: f64,
}

impl Default for TrainSettings {
    fn default() -> Self {
        Self {
            create_train:     false,
            capacity:         1,
            max_waiting_time: 10.0,
        }
    }
}

/// A train that was just released.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainRelease {
    pub size:     u32,
    pub complete: bool,
    pub forced:   bool,
    pub loads:    Vec<LoadId>,
}

// ── TrainCoordinator ──────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct TrainCoordinator {
    settings: TrainSettings,
    /// Loads on the segment in arrival order, until each starts leaving.
    loads:    Vec<LoadId>,
    /// Loads counted onto the segment and not yet fully departed.
    count:    u32,
    forced:   bool,
    /// The current train has been tagged and is leaving.
    released: bool,
    window:   Option<(Tick, Tick)>,
    arrival:  SignalId,
}

impl TrainCoordinator {
    pub fn new(settings: TrainSettings, owner: &str, signals: &mut SignalBoard) -> Self {
        Self {
            settings,
            loads:   Vec::new(),
            count:   0,
            forced:  false,
            released: false,
            window:  None,
            arrival: signals.allocate(format!("{owner}.load_arrived")),
        }
    }

    // ── Settings ──────────────────────────────────────────────────────────

    pub fn settings(&self) -> &TrainSettings {
        &self.settings
    }

    pub fn enabled(&self) -> bool {
        self.settings.create_train
    }

    pub fn capacity(&self) -> u32 {
        self.settings.capacity
    }

    /// Put back settings saved before a failed reconfiguration.
    pub fn restore_settings(&mut self, settings: TrainSettings) {
        self.settings = settings;
    }

    /// Turning train creation off drops the capacity back to 1.
    pub fn set_create_train(&mut self, create: bool) {
        self.settings.create_train = create;
        if !create {
            self.settings.capacity = 1;
        }
    }

    /// Capacities below 1 are rejected and the previous value kept.
    pub fn set_capacity(&mut self, capacity: i64) -> PropertyOutcome {
        if capacity < 1 {
            return PropertyOutcome::Reverted {
                reason: format!(
                    "train capacity has to be >= 1, kept {}",
                    self.settings.capacity
                ),
            };
        }
        self.settings.capacity = u32::try_from(capacity).unwrap_or(u32::MAX);
        PropertyOutcome::Applied
    }

    pub fn set_max_waiting_time(&mut self, secs: f64) -> PropertyOutcome {
        if !(secs.is_finite() && secs >= 0.0) {
            return PropertyOutcome::Reverted {
                reason: format!(
                    "max waiting time has to be >= 0 s, kept {}",
                    self.settings.max_waiting_time
                ),
            };
        }
        self.settings.max_waiting_time = secs;
        PropertyOutcome::Applied
    }

    // ── State ─────────────────────────────────────────────────────────────

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn current_loads(&self) -> &[LoadId] {
        &self.loads
    }

    pub fn is_forced(&self) -> bool {
        self.forced
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Loads are still being collected: something is held and the train has
    /// not been released yet.
    pub fn is_forming(&self) -> bool {
        self.count > 0 && !self.released
    }

    pub fn is_full(&self) -> bool {
        self.count >= self.settings.capacity
    }

    /// Raised on every admission.
    pub fn arrival(&self) -> SignalId {
        self.arrival
    }

    pub fn window(&self) -> Option<(Tick, Tick)> {
        self.window
    }

    /// `true` if `load` heads the queue and so releases the train.
    pub fn is_first(&self, load: LoadId) -> bool {
        self.loads.first() == Some(&load)
    }

    // ── Transitions ───────────────────────────────────────────────────────

    /// Count `load` onto the segment.  `tag` is the train metadata the load
    /// carries from upstream.  Returns the arrival signal to raise.
    pub fn admit(&mut self, load: LoadId, tag: Option<TrainTag>) -> SignalId {
        self.count += 1;
        self.loads.push(load);
        if tag.is_some_and(|t| t.forces_release()) {
            self.forced = true;
        }
        self.arrival
    }

    /// Admission gate value right after an admission.
    pub fn admits_more(&self) -> bool {
        self.enabled() && !self.is_full()
    }

    /// (Re)open the waiting window at `now`.
    pub fn open_window(&mut self, now: Tick, clock: &SimClock) {
        let end = clock.after_secs(now, self.settings.max_waiting_time);
        self.window = Some((now, end));
    }

    /// Ticks left to wait for more loads, or `None` if the train should go.
    pub fn remaining(&self, now: Tick, clock: &SimClock) -> Option<u64> {
        if self.is_full() || self.forced {
            return None;
        }
        let (_, end) = self.window?;
        let remaining = end - now;
        if remaining == 0 || clock.secs(Tick(remaining)) <= WAIT_EPSILON_SECS {
            return None;
        }
        Some(remaining)
    }

    /// The wait a held load suspends on: the next arrival or the end of the
    /// window, whichever comes first.  `None` means release now.
    pub fn wait(&self, now: Tick, clock: &SimClock) -> Option<Wait> {
        self.remaining(now, clock)
            .map(|ticks| Wait::signal_or_ticks(self.arrival, ticks))
    }

    /// Tag every queued load and report the train.
    pub fn release(&mut self, loads: &mut LoadStore) -> CvResult<TrainRelease> {
        let size = self.count;
        let complete = size == self.settings.capacity;
        for (i, id) in self.loads.iter().enumerate() {
            loads.get_mut(*id)?.train = Some(TrainTag {
                size,
                complete,
                index: i as u32 + 1,
            });
        }
        self.released = true;
        tracing::info!(size, complete, forced = self.forced, "train released");
        Ok(TrainRelease {
            size,
            complete,
            forced: self.forced,
            loads: self.loads.clone(),
        })
    }

    /// `load` starts leaving; it no longer takes part in train indexing.
    pub fn depart(&mut self, load: LoadId) {
        self.loads.retain(|l| *l != load);
    }

    /// A load has fully left.  Returns `true` if the segment is now empty, in
    /// which case the forced flag and window are cleared.
    pub fn finish(&mut self) -> bool {
        self.count = self.count.saturating_sub(1);
        if self.count > 0 {
            return false;
        }
        self.forced = false;
        self.released = false;
        self.window = None;
        true
    }

    pub fn reset(&mut self) {
        self.loads.clear();
        self.count = 0;
        self.forced = false;
        self.released = false;
        self.window = None;
    }
}
