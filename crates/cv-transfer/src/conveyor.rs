//! Straight roller conveyor, optionally closed off by airlock doors.
//!
//! Sensor layout: `START` near the entry, used only while trains are formed
//! or Rx is confirmed early (otherwise disabled), and `END` placed so that a
//! load stopping on it comes to rest at the segment end.
//!
//! Without trains every load is admitted alone and runs to the end sensor in
//! `RxTransfer`.  With trains, loads stop at the start sensor, wait in
//! `RxTransferComplete` until the train is released, and the first load of
//! the train tags the lot and restarts the motor in `Process`.

use cv_core::{CvError, CvResult, PropertyOutcome, PropertyValue};
use cv_equipment::{Door, Motor, PhotoEye, Rig, Sensor, SimMotor};
use cv_schedule::SignalBoard;

use crate::common::{apply_rig_property, full_stop_secs, match_outbound_speed, reverted, wait_blocked};
use crate::{
    AdmissionGate, ConveyorConfig, Cursor, DoorsAt, PhaseContext, Routine, SegmentEvent,
    SegmentKind, Step, TrainCoordinator, Transfer, TransferPhaseHandler, config::resolve_profile,
};

pub const START: usize = 0;
pub const END: usize = 1;

/// Position of a disabled start sensor.
const PARKED_SENSOR: f64 = 0.01;

// ── Airlock doors ─────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
struct Airlock {
    at:    DoorsAt,
    start: Door,
    end:   Door,
}

/// Outcome of one door step.
enum DoorStep {
    Moving(Step),
    Arrived,
}

// ── ConveyorHandler ───────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct ConveyorHandler {
    config:    ConveyorConfig,
    rig:       Rig,
    train:     TrainCoordinator,
    gate:      AdmissionGate,
    airlock:   Option<Airlock>,
    /// Last reported gap between the first two loads of a train.
    train_gap: Option<f64>,
}

impl ConveyorHandler {
    /// Build a conveyor; `with_doors` makes it an airlock.
    pub fn new(config: ConveyorConfig, with_doors: bool, signals: &mut SignalBoard) -> CvResult<Self> {
        let name = config.name.as_str();
        let profile = resolve_profile(config.performance.as_deref(), config.speed)?;
        let rig = Rig::new(config.length, config.width, SimMotor::new(profile))
            .with_sensor(PhotoEye::new(name, "start", config.start_sensor_position, signals))
            .with_sensor(PhotoEye::new(name, "end", config.length, signals));
        let airlock = with_doors.then(|| Airlock {
            at:    config.airlock.doors,
            start: Door::new(name, "start_door", config.airlock.moving_doors_duration, signals),
            end:   Door::new(name, "end_door", config.airlock.moving_doors_duration, signals),
        });
        let mut train = TrainCoordinator::new(config.train.clone(), name, signals);
        if !config.train.create_train {
            train.set_create_train(false);
        }
        let mut handler = Self {
            config,
            rig,
            train,
            gate: AdmissionGate::default(),
            airlock,
            train_gap: None,
        };
        if handler.train.enabled() {
            handler.config.confirm_rx_at_start_sensor = false;
        }
        Ok(handler)
    }

    pub fn config(&self) -> &ConveyorConfig {
        &self.config
    }

    pub fn train(&self) -> &TrainCoordinator {
        &self.train
    }

    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    pub fn train_gap(&self) -> Option<f64> {
        self.train_gap
    }

    pub fn start_door_closed(&self) -> Option<bool> {
        self.airlock.as_ref().map(|a| a.start.is_closed())
    }

    pub fn end_door_closed(&self) -> Option<bool> {
        self.airlock.as_ref().map(|a| a.end.is_closed())
    }

    fn uses_start_sensor(&self) -> bool {
        self.train.enabled() || self.config.confirm_rx_at_start_sensor
    }

    /// Free space between the head of the train and the load behind it:
    /// rear edge of the first minus front edge of the second.
    fn report_train_gap(&mut self, ctx: &mut PhaseContext<'_>) -> CvResult<()> {
        let [first, second, ..] = *self.train.current_loads() else {
            return Ok(());
        };
        let (Some(head), Some(next)) = (ctx.front(first), ctx.front(second)) else {
            return Ok(());
        };
        let distance = head - ctx.loads.get(first)?.length - next;
        tracing::debug!(segment = %ctx.segment, distance, "distance between loads");
        self.train_gap = Some(distance);
        ctx.emit(SegmentEvent::TrainGap { distance });
        Ok(())
    }

    fn doors_at_start(&self) -> bool {
        self.airlock.as_ref().is_some_and(|a| a.at.at_start())
    }

    fn doors_at_end(&self) -> bool {
        self.airlock.as_ref().is_some_and(|a| a.at.at_end())
    }

    /// Place the end sensor for the current length and speed, and park or
    /// enable the start sensor.
    fn configure_sensors(&mut self) -> CvResult<()> {
        let offset = self
            .config
            .stop_offset
            .unwrap_or_else(|| self.rig.motor.profile().stop_distance());
        self.rig.place_end_sensor(END, offset)?;

        let use_start = self.uses_start_sensor();
        let position = if use_start { self.config.start_sensor_position } else { PARKED_SENSOR };
        if let Some(start) = self.rig.sensor_mut(START) {
            start.set_enabled(use_start);
            start.set_position(position);
        }
        Ok(())
    }

    /// Count the load onto the segment and set the gate accordingly.
    fn admit(&mut self, t: &Transfer, ctx: &mut PhaseContext<'_>) -> CvResult<()> {
        let tag = ctx.loads.train_tag(t.load)?;
        let arrival = self.train.admit(t.load, tag);
        ctx.raise(arrival);
        self.gate.set(self.train.admits_more());
        ctx.emit(SegmentEvent::LoadAdmitted { load: t.load, count: self.train.count() });
        tracing::debug!(
            segment = %ctx.segment,
            load = %t.load,
            count = self.train.count(),
            forced = self.train.is_forced(),
            "load admitted",
        );
        Ok(())
    }

    /// Advance a door motion by one section.  The gate is held closed for
    /// the whole motion and restored when it ends.
    fn step_door(&mut self, start_side: bool, ctx: &mut PhaseContext<'_>) -> DoorStep {
        let Some(airlock) = self.airlock.as_mut() else {
            return DoorStep::Arrived;
        };
        let (door, label) = if start_side {
            (&mut airlock.start, "start_door")
        } else {
            (&mut airlock.end, "end_door")
        };
        match door.step() {
            Some(secs) => DoorStep::Moving(ctx.wait_secs(secs)),
            None => {
                ctx.raise(door.finished());
                ctx.emit(SegmentEvent::MechanismMoved {
                    mechanism: label,
                    position:  f64::from(door.open_sections()),
                });
                if self.gate.release() {
                    ctx.dispatch_in();
                }
                DoorStep::Arrived
            }
        }
    }

    fn begin_door(&mut self, start_side: bool, open: bool) {
        if let Some(airlock) = self.airlock.as_mut() {
            self.gate.hold();
            let door = if start_side { &mut airlock.start } else { &mut airlock.end };
            door.begin(open);
        }
    }

    fn set_train_property(&mut self, name: &str, value: &PropertyValue) -> CvResult<Option<PropertyOutcome>> {
        let outcome = match name {
            "create_train" => {
                let on = value.as_bool(name)?;
                self.train.set_create_train(on);
                if on {
                    self.config.confirm_rx_at_start_sensor = false;
                }
                PropertyOutcome::Applied
            }
            "train_capacity" => match self.train.set_capacity(value.as_int(name)?) {
                PropertyOutcome::Reverted { reason } => reverted(&self.config.name, reason),
                applied => applied,
            },
            "max_waiting_time" => match self.train.set_max_waiting_time(value.as_float(name)?) {
                PropertyOutcome::Reverted { reason } => reverted(&self.config.name, reason),
                applied => applied,
            },
            "confirm_rx_at_start_sensor" => {
                if self.train.enabled() {
                    reverted(&self.config.name, "early Rx confirmation is unavailable while trains are created".into())
                } else {
                    self.config.confirm_rx_at_start_sensor = value.as_bool(name)?;
                    PropertyOutcome::Applied
                }
            }
            "start_sensor_position" => {
                let v = value.as_float(name)?;
                if v < 0.0 || v > self.rig.length {
                    reverted(&self.config.name, format!("start sensor has to lie on the segment, kept {}", self.config.start_sensor_position))
                } else {
                    self.config.start_sensor_position = v;
                    PropertyOutcome::Applied
                }
            }
            "find_distance_between_loads" => {
                self.config.find_distance_between_loads = value.as_bool(name)?;
                PropertyOutcome::Applied
            }
            "stop_offset" => {
                let v = value.as_float(name)?;
                self.config.stop_offset = Some(v);
                PropertyOutcome::Applied
            }
            "moving_doors_duration" => {
                let v = value.as_float(name)?;
                match self.airlock.as_mut() {
                    Some(_) if v <= 0.0 => reverted(&self.config.name, format!("door duration has to be > 0 s, kept {}", self.config.airlock.moving_doors_duration)),
                    Some(airlock) => {
                        airlock.start.set_duration(v);
                        airlock.end.set_duration(v);
                        self.config.airlock.moving_doors_duration = v;
                        PropertyOutcome::Applied
                    }
                    None => return Ok(None),
                }
            }
            "doors" => {
                let text = value.as_text(name)?;
                match (self.airlock.as_mut(), DoorsAt::parse(text)) {
                    (Some(airlock), Some(at)) => {
                        airlock.at = at;
                        self.config.airlock.doors = at;
                        PropertyOutcome::Applied
                    }
                    (Some(_), None) => reverted(&self.config.name, format!("unknown door placement {text:?}")),
                    (None, _) => return Ok(None),
                }
            }
            _ => return Ok(None),
        };
        Ok(Some(outcome))
    }
}

impl TransferPhaseHandler for ConveyorHandler {
    fn kind(&self) -> SegmentKind {
        if self.airlock.is_some() { SegmentKind::Airlock } else { SegmentKind::Conveyor }
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    fn rig(&self) -> &Rig {
        &self.rig
    }

    fn rig_mut(&mut self) -> &mut Rig {
        &mut self.rig
    }

    fn ready_for_incoming(&self) -> bool {
        self.gate.is_open()
    }

    fn occupancy(&self) -> u32 {
        self.train.count()
    }

    fn capacity(&self) -> u32 {
        self.train.capacity()
    }

    fn supports_trains(&self) -> bool {
        self.train.enabled()
    }

    fn on_reset(&mut self) {
        self.train.reset();
        self.train_gap = None;
        self.gate.reset();
        self.rig.all_off();
        self.rig.reset_speeds();
        if let Some(airlock) = self.airlock.as_mut() {
            airlock.start.reset();
            airlock.end.reset();
        }
    }

    fn on_initialize(&mut self) -> CvResult<()> {
        self.configure_sensors()?;
        self.gate.set(true);
        Ok(())
    }

    fn set_property(&mut self, name: &str, value: &PropertyValue) -> CvResult<PropertyOutcome> {
        let before_rig = self.rig.clone();
        let before_config = self.config.clone();
        let before_train = self.train.settings().clone();

        let outcome = match apply_rig_property(&self.config.name, &mut self.rig, name, value)? {
            Some(outcome) => outcome,
            None => match self.set_train_property(name, value)? {
                Some(outcome) => outcome,
                None => return Err(CvError::UnknownProperty(name.to_owned())),
            },
        };

        if outcome == PropertyOutcome::Applied {
            self.config.length = self.rig.length;
            self.config.width = self.rig.width;
            if let Err(e) = self.configure_sensors() {
                self.rig = before_rig;
                self.config = before_config;
                self.train.restore_settings(before_train);
                return Err(e);
            }
            if self.train.is_forming() {
                self.gate.reassess(self.train.admits_more());
            }
        }
        Ok(outcome)
    }

    fn on_property_changed(&mut self, ctx: &mut PhaseContext<'_>) -> CvResult<()> {
        // Held loads re-check capacity and window against the new settings.
        if self.train.is_forming() {
            ctx.raise(self.train.arrival());
        }
        Ok(())
    }

    // ── Phases ────────────────────────────────────────────────────────────

    fn rx_before(&mut self, t: &mut Transfer, cur: &mut Cursor, ctx: &mut PhaseContext<'_>) -> CvResult<Step> {
        if self.airlock.is_none() {
            return Ok(Step::Done);
        }
        loop {
            match cur.stage() {
                0 => {
                    let closed = self.airlock.as_ref().is_some_and(|a| a.start.is_closed());
                    if self.train.count() == 0 && self.doors_at_start() && closed {
                        self.begin_door(true, true);
                        cur.goto(1);
                    } else {
                        cur.goto(2);
                    }
                }
                1 => match self.step_door(true, ctx) {
                    DoorStep::Moving(step) => return Ok(step),
                    DoorStep::Arrived => cur.goto(2),
                },
                _ => {
                    self.admit(t, ctx)?;
                    return Ok(Step::Done);
                }
            }
        }
    }

    fn rx(&mut self, t: &mut Transfer, cur: &mut Cursor, ctx: &mut PhaseContext<'_>) -> CvResult<Step> {
        if cur.stage() == 0 {
            if self.airlock.is_none() {
                self.admit(t, ctx)?;
            }
            self.rig.motor.motor_on();
            cur.goto(1);
        }
        let sensor = if self.uses_start_sensor() { START } else { END };
        Ok(wait_blocked(&self.rig, sensor, t.load).unwrap_or(Step::Done))
    }

    fn rx_complete(&mut self, _t: &mut Transfer, cur: &mut Cursor, ctx: &mut PhaseContext<'_>) -> CvResult<Step> {
        if !self.train.enabled() {
            if !self.config.confirm_rx_at_start_sensor {
                self.rig.motor.motor_off();
            }
            return Ok(Step::Done);
        }
        if cur.stage() == 0 {
            self.train.open_window(ctx.now, &ctx.clock);
            if !self.train.is_forced() && !self.train.is_full() && !ctx.receiving {
                self.rig.motor.motor_off();
            }
            cur.goto(1);
        }
        Ok(match self.train.wait(ctx.now, &ctx.clock) {
            Some(wait) => Step::Wait(wait),
            None => Step::Done,
        })
    }

    fn process(&mut self, t: &mut Transfer, cur: &mut Cursor, ctx: &mut PhaseContext<'_>) -> CvResult<Step> {
        loop {
            match cur.stage() {
                0 => {
                    if self.train.enabled() {
                        self.gate.set(false);
                        if self.train.is_first(t.load) {
                            let release = self.train.release(ctx.loads)?;
                            ctx.emit(SegmentEvent::TrainReleased {
                                size:     release.size,
                                complete: release.complete,
                                forced:   release.forced,
                                loads:    release.loads,
                            });
                            self.rig.motor.motor_on();
                        }
                    }
                    cur.goto(1);
                }
                1 => {
                    let runs_to_end = self.train.enabled()
                        || self.config.confirm_rx_at_start_sensor
                        || self.airlock.is_some();
                    if runs_to_end {
                        if let Some(wait) = wait_blocked(&self.rig, END, t.load) {
                            return Ok(wait);
                        }
                        if self.train.enabled() && self.config.find_distance_between_loads {
                            self.report_train_gap(ctx)?;
                        }
                        self.rig.motor.motor_off();
                    }
                    cur.goto(2);
                }
                2 => {
                    let start_open = self.airlock.as_ref().is_some_and(|a| !a.start.is_closed());
                    if !(self.doors_at_start() && start_open) {
                        return Ok(Step::Done);
                    }
                    // Let the load come to a standstill before the door drops.
                    cur.goto(3);
                    return Ok(ctx.wait_secs(full_stop_secs(&self.rig.motor)));
                }
                3 => {
                    self.begin_door(true, false);
                    cur.goto(4);
                }
                _ => {
                    return Ok(match self.step_door(true, ctx) {
                        DoorStep::Moving(step) => step,
                        DoorStep::Arrived => Step::Done,
                    });
                }
            }
        }
    }

    fn tx_before(&mut self, _t: &mut Transfer, cur: &mut Cursor, ctx: &mut PhaseContext<'_>) -> CvResult<Step> {
        if cur.stage() == 0 {
            let end_closed = self.airlock.as_ref().is_some_and(|a| a.end.is_closed());
            if !(self.doors_at_end() && end_closed) {
                return Ok(Step::Done);
            }
            self.begin_door(false, true);
            cur.goto(1);
        }
        Ok(match self.step_door(false, ctx) {
            DoorStep::Moving(step) => step,
            DoorStep::Arrived => Step::Done,
        })
    }

    fn tx(&mut self, t: &mut Transfer, cur: &mut Cursor, ctx: &mut PhaseContext<'_>) -> CvResult<Step> {
        if cur.stage() == 0 {
            cur.goto(1);
            if let Some(wait) = match_outbound_speed(&mut self.rig.motor, ctx) {
                return Ok(wait);
            }
        }
        // Leaves the train queue now so the remaining loads keep their indices.
        self.train.depart(t.load);
        self.rig.motor.motor_on();
        Ok(Step::Done)
    }

    // TxTransferComplete leaves the gate as it is: it stays closed until the
    // last load has left.

    fn tx_after(&mut self, t: &mut Transfer, _cur: &mut Cursor, ctx: &mut PhaseContext<'_>) -> CvResult<Step> {
        let keeps_tag = ctx.peer.is_some_and(|p| p.supports_trains);
        if !keeps_tag {
            let load = ctx.loads.get_mut(t.load)?;
            if load.train.take().is_some() {
                ctx.emit(SegmentEvent::TrainTagStripped { load: t.load });
            }
        }

        if !self.train.finish() {
            return Ok(Step::Done);
        }
        self.rig.motor.motor_off();
        self.rig.motor.reset_speed();
        if self.doors_at_end() {
            self.gate.hold_then_open();
            ctx.spawn(Routine::CloseEndDoor);
        } else {
            self.gate.set(true);
            ctx.dispatch_in();
        }
        Ok(Step::Done)
    }

    fn resume_routine(&mut self, routine: &Routine, cur: &mut Cursor, ctx: &mut PhaseContext<'_>) -> CvResult<Step> {
        if *routine != Routine::CloseEndDoor {
            return Ok(Step::Done);
        }
        if cur.stage() == 0 {
            if let Some(airlock) = self.airlock.as_mut() {
                airlock.end.begin(false);
            }
            cur.goto(1);
        }
        Ok(match self.step_door(false, ctx) {
            DoorStep::Moving(step) => step,
            DoorStep::Arrived => Step::Done,
        })
    }
}
