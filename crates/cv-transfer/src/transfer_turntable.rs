//! Transfer turntable: a rotating platform carrying rollers and a chain
//! lift.
//!
//! A port flagged as side is engaged through the chain: the platform turns
//! a further 90° so the chain faces the connector, and the lift is raised
//! before the chain runs.  Every other port is served by the rollers with
//! the lift down.  The platform always turns to face the peer, so both
//! motors only ever run forward.
//!
//! Sensors: `ROLLER` and `CHAIN`, both at the centre.

use cv_core::{CvError, CvResult, LoadId, PropertyOutcome, PropertyValue, mid_stop_wait};
use cv_equipment::{ANGLE_TOLERANCE, Mechanism, Motor, PhotoEye, Rig, Sensor, SimMotor};
use cv_schedule::{SignalBoard, Wait};

use crate::common::{apply_rig_property, full_stop_secs, match_outbound_speed, reverted, wait_blocked};
use crate::rotation::{normalize, rotation_needed, target_angle};
use crate::{
    AdmissionGate, Cursor, PhaseContext, Port, Routine, SegmentEvent, SegmentKind, Step, Transfer,
    TransferPhaseHandler, TransferTurntableConfig, config::resolve_profile,
};

pub const ROLLER: usize = 0;
pub const CHAIN: usize = 1;

const LIFT_DOWN: f64 = 0.0;
const LIFT_UP: f64 = 1.0;

const HOME: &str = "Start";

#[derive(Debug)]
pub struct TransferTurntableHandler {
    config:   TransferTurntableConfig,
    rig:      Rig,
    gate:     AdmissionGate,
    rotation: Mechanism,
    lift:     Mechanism,
    holding:  Option<LoadId>,
    side_in:  bool,
    side_out: bool,
}

impl TransferTurntableHandler {
    pub fn new(config: TransferTurntableConfig, signals: &mut SignalBoard) -> CvResult<Self> {
        let name = config.name.as_str();
        if !(config.rotate_90.is_finite() && config.rotate_90 > 0.0) {
            return Err(CvError::Config(format!(
                "{name}: rotate_90 must be positive, got {}",
                config.rotate_90
            )));
        }
        if !(config.lifting_time.is_finite() && config.lifting_time > 0.0) {
            return Err(CvError::Config(format!(
                "{name}: lifting_time must be positive, got {}",
                config.lifting_time
            )));
        }
        let roller = resolve_profile(config.performance.as_deref(), config.speed)?;
        let chain = resolve_profile(None, config.chain_speed)?;
        let centre = config.length / 2.0;
        let rig = Rig::new(config.length, config.width, SimMotor::new(roller))
            .with_chain(SimMotor::new(chain))
            .with_sensor(PhotoEye::new(name, "roller", centre, signals))
            .with_sensor(PhotoEye::new(name, "chain", centre, signals));
        let rotation = Mechanism::new(name, "rotation", 0.0, config.rotate_90 / 90.0, signals);
        let lift = Mechanism::new(name, "lift", LIFT_DOWN, config.lifting_time, signals);
        Ok(Self {
            config,
            rig,
            gate: AdmissionGate::default(),
            rotation,
            lift,
            holding: None,
            side_in: false,
            side_out: false,
        })
    }

    pub fn config(&self) -> &TransferTurntableConfig {
        &self.config
    }

    pub fn angle(&self) -> f64 {
        self.rotation.position()
    }

    pub fn lift_position(&self) -> f64 {
        self.lift.position()
    }

    fn configure(&mut self) {
        let centre = self.rig.length / 2.0;
        for index in [ROLLER, CHAIN] {
            if let Some(sensor) = self.rig.sensor_mut(index) {
                sensor.set_position(centre);
            }
        }
        self.rotation.set_secs_per_unit(self.config.rotate_90 / 90.0);
        self.lift.set_secs_per_unit(self.config.lifting_time);
    }

    fn active_sensor(side: bool) -> usize {
        if side { CHAIN } else { ROLLER }
    }

    fn enable_sensors(&mut self, side: bool) {
        let active = Self::active_sensor(side);
        for (index, sensor) in self.rig.sensors.iter_mut().enumerate() {
            sensor.set_enabled(index == active);
        }
    }

    fn begin_rotation(&mut self, port: &Port, outgoing: bool) -> Option<f64> {
        let target = target_angle(&port.connector, outgoing, port.side, false);
        let current = self.rotation.position();
        let diff = rotation_needed(current, target, self.config.symmetric)?;
        Some(self.rotation.begin(current + diff, ANGLE_TOLERANCE))
    }

    fn finish_rotation(&mut self, ctx: &mut PhaseContext<'_>) {
        if !self.rotation.is_moving() {
            return;
        }
        let signal = self.rotation.arrive();
        let angle = normalize(self.rotation.position());
        self.rotation.place(angle);
        ctx.raise(signal);
        ctx.emit(SegmentEvent::MechanismMoved { mechanism: "rotation", position: angle });
        tracing::debug!(segment = %ctx.segment, angle, "transfer turntable rotated");
    }

    fn begin_lift(&mut self, up: bool) -> Option<f64> {
        let target = if up { LIFT_UP } else { LIFT_DOWN };
        let secs = self.lift.begin(target, ANGLE_TOLERANCE);
        self.lift.is_moving().then_some(secs)
    }

    fn finish_lift(&mut self, ctx: &mut PhaseContext<'_>) {
        if !self.lift.is_moving() {
            return;
        }
        let signal = self.lift.arrive();
        ctx.raise(signal);
        ctx.emit(SegmentEvent::MechanismMoved { mechanism: "lift", position: self.lift.position() });
    }

    /// Wait out whichever motion is still running.
    fn wait_for_motion(&self) -> Option<Step> {
        if self.rotation.is_moving() {
            return Some(Step::Wait(Wait::Signal(self.rotation.finished())));
        }
        self.lift
            .is_moving()
            .then(|| Step::Wait(Wait::Signal(self.lift.finished())))
    }

    /// Seconds to keep running after the centre sensor: the chain carries
    /// loads across, so it centres on their width.
    fn centring_secs(&self, load: LoadId, ctx: &PhaseContext<'_>) -> CvResult<f64> {
        let l = ctx.loads.get(load)?;
        let dim = if self.side_in { l.width } else { l.length };
        let profile = *self.rig.active_motor(self.side_in).profile();
        Ok(mid_stop_wait(dim, profile.max, profile.dec))
    }

    fn turn_home(&mut self, cur: &mut Cursor, ctx: &mut PhaseContext<'_>) -> Step {
        if cur.stage() == 0 {
            if let Some(wait) = self.wait_for_motion() {
                return wait;
            }
            cur.goto(1);
            let rotate = self.begin_rotation(&Port::new(HOME), false).unwrap_or(0.0);
            let lower = self.begin_lift(false).unwrap_or(0.0);
            if rotate > 0.0 || lower > 0.0 {
                return ctx.wait_secs(rotate.max(lower));
            }
        }
        self.finish_rotation(ctx);
        self.finish_lift(ctx);
        if self.gate.release() {
            ctx.dispatch_in();
        }
        Step::Done
    }
}

impl TransferPhaseHandler for TransferTurntableHandler {
    fn kind(&self) -> SegmentKind {
        SegmentKind::TransferTurntable
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
        u32::from(self.holding.is_some())
    }

    fn intake_speed(&self, rx: Option<&Port>) -> f64 {
        let side = rx.is_some_and(|p| p.side);
        self.rig.active_motor(side).rated_speed()
    }

    fn on_reset(&mut self) {
        self.gate.reset();
        self.rig.all_off();
        self.rig.reset_speeds();
        self.rotation.place(0.0);
        self.lift.place(LIFT_DOWN);
        self.holding = None;
        self.side_in = false;
        self.side_out = false;
    }

    fn on_initialize(&mut self) -> CvResult<()> {
        self.configure();
        self.gate.set(true);
        Ok(())
    }

    fn set_property(&mut self, name: &str, value: &PropertyValue) -> CvResult<PropertyOutcome> {
        if let Some(outcome) = apply_rig_property(&self.config.name, &mut self.rig, name, value)? {
            self.config.length = self.rig.length;
            self.config.width = self.rig.width;
            self.configure();
            return Ok(outcome);
        }
        let outcome = match name {
            "rotate_90" => {
                let secs = value.as_float(name)?;
                if secs.is_finite() && secs > 0.0 {
                    self.config.rotate_90 = secs;
                    self.rotation.set_secs_per_unit(secs / 90.0);
                    PropertyOutcome::Applied
                } else {
                    reverted(&self.config.name, format!("rotate_90 has to be > 0 s, kept {}", self.config.rotate_90))
                }
            }
            "lifting_time" => {
                let v = value.as_float(name)?;
                if v.is_finite() && v > 0.0 {
                    self.config.lifting_time = v;
                    self.lift.set_secs_per_unit(v);
                    PropertyOutcome::Applied
                } else {
                    reverted(&self.config.name, format!("lifting time has to be > 0 s, kept {}", self.config.lifting_time))
                }
            }
            "chain_speed" => {
                let v = value.as_float(name)?;
                let Some(chain) = self.rig.chain.as_mut() else {
                    return Err(CvError::UnknownProperty(name.to_owned()));
                };
                let mut profile = *chain.profile();
                profile.max = v;
                if profile.is_valid() {
                    chain.set_profile(profile);
                    self.config.chain_speed = profile;
                    PropertyOutcome::Applied
                } else {
                    reverted(&self.config.name, "chain speed has to be > 0".into())
                }
            }
            "auto_home" => {
                self.config.auto_home = value.as_bool(name)?;
                PropertyOutcome::Applied
            }
            "symmetric" => {
                self.config.symmetric = value.as_bool(name)?;
                PropertyOutcome::Applied
            }
            _ => return Err(CvError::UnknownProperty(name.to_owned())),
        };
        Ok(outcome)
    }

    // ── Phases ────────────────────────────────────────────────────────────

    fn rx_before(&mut self, t: &mut Transfer, cur: &mut Cursor, ctx: &mut PhaseContext<'_>) -> CvResult<Step> {
        loop {
            match cur.stage() {
                0 => {
                    self.gate.set(false);
                    self.holding = Some(t.load);
                    self.side_in = t.rx.as_ref().is_some_and(|p| p.side);
                    ctx.emit(SegmentEvent::LoadAdmitted { load: t.load, count: 1 });
                    cur.goto(1);
                }
                1 => {
                    if let Some(wait) = self.wait_for_motion() {
                        return Ok(wait);
                    }
                    cur.goto(2);
                    let rotate = t.rx.clone().and_then(|port| self.begin_rotation(&port, false)).unwrap_or(0.0);
                    let lift = self.begin_lift(self.side_in).unwrap_or(0.0);
                    if rotate > 0.0 || lift > 0.0 {
                        return Ok(ctx.wait_secs(rotate.max(lift)));
                    }
                }
                _ => {
                    self.finish_rotation(ctx);
                    self.finish_lift(ctx);
                    return Ok(Step::Done);
                }
            }
        }
    }

    fn rx(&mut self, t: &mut Transfer, cur: &mut Cursor, ctx: &mut PhaseContext<'_>) -> CvResult<Step> {
        loop {
            match cur.stage() {
                0 => {
                    self.enable_sensors(self.side_in);
                    self.rig.active_motor_mut(self.side_in).motor_on();
                    cur.goto(1);
                }
                1 => {
                    if let Some(wait) = wait_blocked(&self.rig, Self::active_sensor(self.side_in), t.load) {
                        return Ok(wait);
                    }
                    cur.goto(2);
                    return Ok(ctx.wait_secs(self.centring_secs(t.load, ctx)?));
                }
                2 => {
                    self.rig.all_off();
                    cur.goto(3);
                    return Ok(ctx.wait_secs(full_stop_secs(self.rig.active_motor(self.side_in))));
                }
                _ => return Ok(Step::Done),
            }
        }
    }

    fn tx_before(&mut self, t: &mut Transfer, cur: &mut Cursor, ctx: &mut PhaseContext<'_>) -> CvResult<Step> {
        loop {
            match cur.stage() {
                0 => {
                    let Some(port) = t.tx.clone() else {
                        return Ok(Step::Done);
                    };
                    self.side_out = port.side;
                    ctx.loads.get_mut(t.load)?.stuck_to = Some(ctx.segment);
                    cur.goto(1);
                    // Rotation and lift run together; the load is stuck to the platform.
                    let rotate = self.begin_rotation(&port, true).unwrap_or(0.0);
                    let lift = self.begin_lift(self.side_out).unwrap_or(0.0);
                    if rotate > 0.0 || lift > 0.0 {
                        return Ok(ctx.wait_secs(rotate.max(lift)));
                    }
                }
                _ => {
                    self.finish_rotation(ctx);
                    self.finish_lift(ctx);
                    ctx.loads.get_mut(t.load)?.stuck_to = None;
                    self.enable_sensors(self.side_out);
                    return Ok(Step::Done);
                }
            }
        }
    }

    fn tx(&mut self, _t: &mut Transfer, cur: &mut Cursor, ctx: &mut PhaseContext<'_>) -> CvResult<Step> {
        let side = self.side_out;
        if cur.stage() == 0 {
            cur.goto(1);
            if let Some(wait) = match_outbound_speed(self.rig.active_motor_mut(side), ctx) {
                return Ok(wait);
            }
        }
        self.rig.active_motor_mut(side).motor_on();
        Ok(Step::Done)
    }

    fn tx_complete(&mut self, _t: &mut Transfer, _cur: &mut Cursor, ctx: &mut PhaseContext<'_>) -> CvResult<Step> {
        if self.config.auto_home {
            self.gate.hold_then_open();
            ctx.spawn(Routine::TurnHome);
        } else {
            self.gate.set(true);
            ctx.dispatch_in();
        }
        Ok(Step::Done)
    }

    fn tx_after(&mut self, _t: &mut Transfer, _cur: &mut Cursor, _ctx: &mut PhaseContext<'_>) -> CvResult<Step> {
        self.rig.all_off();
        self.rig.reset_speeds();
        self.holding = None;
        Ok(Step::Done)
    }

    fn resume_routine(&mut self, routine: &Routine, cur: &mut Cursor, ctx: &mut PhaseContext<'_>) -> CvResult<Step> {
        if *routine != Routine::TurnHome {
            return Ok(Step::Done);
        }
        Ok(self.turn_home(cur, ctx))
    }
}
