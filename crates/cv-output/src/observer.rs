//! `SimOutputObserver<W>` — bridges `SimObserver` to an `OutputWriter`.

use cv_core::{LoadId, SegmentId, SimClock, Tick};
use cv_sim::{Plant, Router, Sim, SimObserver};
use cv_transfer::{SegmentEvent, TransferPhase};

use crate::row::{EventRow, TrainRow};
use crate::writer::OutputWriter;
use crate::{OutputError, OutputResult};

/// A [`SimObserver`] that writes every event and train release to any
/// [`OutputWriter`] backend (CSV, SQLite, …).
///
/// Events are buffered per instant and written in one batch when time
/// advances.  Errors from the writer are stored internally because
/// `SimObserver` methods have no return value.  After `sim.run()` returns,
/// check for errors with [`take_error`][Self::take_error].
pub struct SimOutputObserver<W: OutputWriter> {
    writer:     W,
    clock:      SimClock,
    /// Segment names indexed by `SegmentId`.
    names:      Vec<String>,
    pending:    Vec<EventRow>,
    last_error: Option<OutputError>,
}

impl<W: OutputWriter> SimOutputObserver<W> {
    /// Create an observer backed by `writer`.  `names` maps segment ids to
    /// the names written out.
    pub fn new(writer: W, names: Vec<String>, clock: SimClock) -> Self {
        Self {
            writer,
            clock,
            names,
            pending:    Vec::new(),
            last_error: None,
        }
    }

    /// Create an observer naming segments as `sim` does.
    pub fn for_sim<P: Plant, R: Router>(writer: W, sim: &Sim<P, R>) -> Self {
        let names = sim.segments().iter().map(|s| s.name().to_owned()).collect();
        Self::new(writer, names, sim.clock)
    }

    /// Take the stored write error (if any) after `sim.run()` returns.
    ///
    /// Returns `None` if all writes succeeded.
    pub fn take_error(&mut self) -> Option<OutputError> {
        self.last_error.take()
    }

    /// Unwrap the inner writer (e.g. to inspect files after the run).
    pub fn into_writer(self) -> W {
        self.writer
    }

    fn name(&self, segment: SegmentId) -> String {
        self.names
            .get(segment.index())
            .cloned()
            .unwrap_or_else(|| segment.to_string())
    }

    fn push(&mut self, tick: Tick, segment: SegmentId, load: Option<LoadId>, event: &str, detail: String) {
        self.pending.push(EventRow {
            tick:      tick.0,
            time_secs: self.clock.secs(tick),
            segment:   self.name(segment),
            load:      load.map(|l| l.0),
            event:     event.to_owned(),
            detail,
        });
    }

    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let rows = std::mem::take(&mut self.pending);
        let result = self.writer.write_events(&rows);
        self.store_err(result);
    }

    fn store_err(&mut self, result: OutputResult<()>) {
        if let Err(e) = result {
            // Keep only the first error.
            if self.last_error.is_none() {
                tracing::warn!(error = %e, "output write failed");
                self.last_error = Some(e);
            }
        }
    }
}

/// Load and detail columns for a handler event.
fn describe(event: &SegmentEvent) -> (Option<LoadId>, String) {
    match event {
        SegmentEvent::LoadAdmitted { load, count } => (Some(*load), format!("count={count}")),
        SegmentEvent::TrainReleased { size, complete, forced, .. } => {
            (None, format!("size={size} complete={complete} forced={forced}"))
        }
        SegmentEvent::TrainGap { distance } => (None, format!("distance={distance:.3}")),
        SegmentEvent::TrainTagStripped { load } => (Some(*load), String::new()),
        SegmentEvent::MechanismMoved { mechanism, position } => (None, format!("{mechanism}={position}")),
        SegmentEvent::SpeedMatched { speed } => (None, format!("speed={speed}")),
        SegmentEvent::Warning(reason) => (None, reason.clone()),
    }
}

impl<W: OutputWriter> SimObserver for SimOutputObserver<W> {
    fn on_time_advance(&mut self, _tick: Tick) {
        self.flush();
    }

    fn on_phase(&mut self, tick: Tick, segment: SegmentId, load: LoadId, phase: TransferPhase) {
        self.push(tick, segment, Some(load), phase.as_str(), String::new());
    }

    fn on_segment_event(&mut self, tick: Tick, segment: SegmentId, event: &SegmentEvent) {
        let (load, detail) = describe(event);
        self.push(tick, segment, load, event.kind(), detail);

        if let SegmentEvent::TrainReleased { size, complete, forced, loads } = event {
            let row = TrainRow {
                tick:      tick.0,
                time_secs: self.clock.secs(tick),
                segment:   self.name(segment),
                size:      *size,
                complete:  *complete,
                forced:    *forced,
                loads:     loads.iter().map(|l| l.0).collect(),
            };
            let result = self.writer.write_train(&row);
            self.store_err(result);
        }
    }

    fn on_motor(&mut self, tick: Tick, segment: SegmentId, on: bool) {
        let event = if on { "motor_on" } else { "motor_off" };
        self.push(tick, segment, None, event, String::new());
    }

    fn on_gate(&mut self, tick: Tick, segment: SegmentId, open: bool) {
        let event = if open { "gate_open" } else { "gate_closed" };
        self.push(tick, segment, None, event, String::new());
    }

    fn on_dispatch_request(&mut self, tick: Tick, segment: SegmentId) {
        self.push(tick, segment, None, "dispatch_in", String::new());
    }

    fn on_load_arrived(&mut self, tick: Tick, segment: SegmentId, load: LoadId) {
        self.push(tick, segment, Some(load), "load_arrived", String::new());
    }

    fn on_load_consumed(&mut self, tick: Tick, segment: SegmentId, load: LoadId) {
        self.push(tick, segment, Some(load), "load_consumed", String::new());
    }

    fn on_sim_end(&mut self, _final_tick: Tick) {
        self.flush();
        let result = self.writer.finish();
        self.store_err(result);
    }
}
