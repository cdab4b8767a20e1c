//! Transfer unit: a roller conveyor with a chain lift for side moves.
//!
//! Loads enter and leave either straight, on the rollers, or from the side,
//! on the raised chain.  Which one is decided by the connector: a connector
//! named in the chain rule table is a side connector.
//!
//! Sensors: `ROLLER` and `CHAIN` at the centre, `START` near the roller
//! entry for early Rx confirmation.  Only the sensor for the active motion
//! is enabled.

use cv_core::{CvError, CvResult, LoadId, PropertyOutcome, PropertyValue, SignalId, mid_stop_wait};
use cv_equipment::{ANGLE_TOLERANCE, Mechanism, Motor, PhotoEye, Rig, Sensor, SimMotor};
use cv_schedule::{SignalBoard, Wait};

use crate::common::{apply_rig_property, full_stop_secs, match_outbound_speed, reverted, wait_blocked};
use crate::{
    AdmissionGate, Cursor, PhaseContext, Port, Routine, SegmentEvent, SegmentKind, Step, Transfer,
    TransferPhaseHandler, TransferUnitConfig, config::resolve_profile,
};

pub const ROLLER: usize = 0;
pub const CHAIN: usize = 1;
pub const START: usize = 2;

const LIFT_DOWN: f64 = 0.0;
const LIFT_UP: f64 = 1.0;

#[derive(Debug)]
pub struct TransferUnitHandler {
    config:       TransferUnitConfig,
    rig:          Rig,
    gate:         AdmissionGate,
    lift:         Mechanism,
    holding:      Option<LoadId>,
    side_in:      bool,
    side_out:     bool,
    /// Set while `PrepareTx` runs; `TxBeforeTransfer` waits for it to clear.
    preparing:    bool,
    ready_for_tx: SignalId,
}

impl TransferUnitHandler {
    pub fn new(config: TransferUnitConfig, signals: &mut SignalBoard) -> CvResult<Self> {
        let name = config.name.as_str();
        let roller = resolve_profile(config.performance.as_deref(), config.speed)?;
        let chain = resolve_profile(None, config.chain_speed)?;
        let centre = config.length / 2.0;
        let rig = Rig::new(config.length, config.width, SimMotor::new(roller))
            .with_chain(SimMotor::new(chain))
            .with_sensor(PhotoEye::new(name, "roller", centre, signals))
            .with_sensor(PhotoEye::new(name, "chain", centre, signals))
            .with_sensor(PhotoEye::new(name, "start", config.start_sensor_position, signals));
        let lift = Mechanism::new(name, "lift", LIFT_DOWN, config.lifting_time, signals);
        let ready_for_tx = signals.allocate(format!("{name}.ready_for_tx"));
        Ok(Self {
            config,
            rig,
            gate: AdmissionGate::default(),
            lift,
            holding: None,
            side_in: false,
            side_out: false,
            preparing: false,
            ready_for_tx,
        })
    }

    pub fn config(&self) -> &TransferUnitConfig {
        &self.config
    }

    pub fn lift_position(&self) -> f64 {
        self.lift.position()
    }

    pub fn is_preparing(&self) -> bool {
        self.preparing
    }

    fn is_side(&self, connector: &str) -> bool {
        self.config.chain_rules.covers(connector)
    }

    fn configure(&mut self) {
        let centre = self.rig.length / 2.0;
        for index in [ROLLER, CHAIN] {
            if let Some(sensor) = self.rig.sensor_mut(index) {
                sensor.set_position(centre);
            }
        }
        let start = self.config.start_sensor_position;
        if let Some(sensor) = self.rig.sensor_mut(START) {
            sensor.set_position(start);
        }
        self.lift.set_secs_per_unit(self.config.lifting_time);
    }

    /// Enable only the sensors the coming motion needs.
    fn enable_sensors(&mut self, side: bool, early_confirm: bool) {
        let active = if side { CHAIN } else { ROLLER };
        for (index, sensor) in self.rig.sensors.iter_mut().enumerate() {
            let on = index == active || (index == START && early_confirm);
            sensor.set_enabled(on);
        }
    }

    fn early_confirm(&self) -> bool {
        self.config.confirm_rx_at_start_sensor && !self.side_in
    }

    fn active_sensor(&self, side: bool) -> usize {
        if side { CHAIN } else { ROLLER }
    }

    /// Seconds to keep running after the centre sensor so the load stops
    /// centred: the chain moves loads across, so it measures their width.
    fn centring_secs(&self, load: LoadId, ctx: &PhaseContext<'_>) -> CvResult<f64> {
        let l = ctx.loads.get(load)?;
        let dim = if self.side_in { l.width } else { l.length };
        let profile = *self.rig.active_motor(self.side_in).profile();
        Ok(mid_stop_wait(dim, profile.max, profile.dec))
    }

    /// Start moving the lift.  Returns the travel time if it has to move.
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

    fn wait_for_lift(&self) -> Option<Step> {
        self.lift
            .is_moving()
            .then(|| Step::Wait(Wait::Signal(self.lift.finished())))
    }

    fn prepare_tx(&mut self, connector: &str, cur: &mut Cursor, ctx: &mut PhaseContext<'_>) -> CvResult<Step> {
        loop {
            match cur.stage() {
                0 => {
                    self.side_out = self.is_side(connector);
                    cur.goto(1);
                    if self.side_out != self.side_in {
                        // Switching between rollers and chain: let the load settle first.
                        let motor = self.rig.active_motor(self.side_in);
                        return Ok(ctx.wait_secs(full_stop_secs(motor)));
                    }
                }
                1 => {
                    if let Some(wait) = self.wait_for_lift() {
                        return Ok(wait);
                    }
                    if self.side_out {
                        let dir = self.config.chain_rules.outgoing(connector, "chain")?;
                        self.rig.active_motor_mut(true).set_direction(dir);
                    } else {
                        let dir = self.config.roller_rules.outgoing(connector, "roller")?;
                        self.rig.motor.set_direction(dir);
                    }
                    cur.goto(2);
                    if let Some(secs) = self.begin_lift(self.side_out) {
                        return Ok(ctx.wait_secs(secs));
                    }
                }
                _ => {
                    self.finish_lift(ctx);
                    self.preparing = false;
                    ctx.raise(self.ready_for_tx);
                    return Ok(Step::Done);
                }
            }
        }
    }

    fn finish_tx(&mut self, cur: &mut Cursor, ctx: &mut PhaseContext<'_>) -> CvResult<Step> {
        loop {
            match cur.stage() {
                0 => {
                    cur.goto(1);
                    return Ok(ctx.wait_secs(full_stop_secs(&self.rig.motor)));
                }
                1 => {
                    cur.goto(2);
                    if self.config.auto_home {
                        if let Some(secs) = self.begin_lift(false) {
                            return Ok(ctx.wait_secs(secs));
                        }
                    }
                }
                _ => {
                    self.finish_lift(ctx);
                    self.gate.set(true);
                    ctx.dispatch_in();
                    return Ok(Step::Done);
                }
            }
        }
    }
}

impl TransferPhaseHandler for TransferUnitHandler {
    fn kind(&self) -> SegmentKind {
        SegmentKind::TransferUnit
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

    /// A load entering from the side is taken by the chain.
    fn intake_speed(&self, rx: Option<&Port>) -> f64 {
        let side = rx.is_some_and(|p| self.is_side(&p.connector));
        self.rig.active_motor(side).rated_speed()
    }

    fn on_reset(&mut self) {
        self.gate.reset();
        self.rig.all_off();
        self.rig.reset_speeds();
        self.lift.place(LIFT_DOWN);
        self.holding = None;
        self.side_in = false;
        self.side_out = false;
        self.preparing = false;
    }

    fn on_initialize(&mut self) -> CvResult<()> {
        self.configure();
        self.gate.set(true);
        Ok(())
    }

    fn on_transfer_created(&mut self, t: &Transfer, ctx: &mut PhaseContext<'_>) -> CvResult<()> {
        let Some(connector) = t.tx_connector() else {
            return Ok(());
        };
        self.preparing = true;
        ctx.spawn(Routine::PrepareTx { tx_connector: connector.to_owned() });
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
            "confirm_rx_at_start_sensor" => {
                self.config.confirm_rx_at_start_sensor = value.as_bool(name)?;
                PropertyOutcome::Applied
            }
            "start_sensor_position" => {
                let v = value.as_float(name)?;
                if v < 0.0 || v > self.rig.length {
                    reverted(&self.config.name, format!("start sensor has to lie on the segment, kept {}", self.config.start_sensor_position))
                } else {
                    self.config.start_sensor_position = v;
                    self.configure();
                    PropertyOutcome::Applied
                }
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
                    ctx.emit(SegmentEvent::LoadAdmitted { load: t.load, count: 1 });
                    cur.goto(1);
                }
                1 => {
                    if let Some(wait) = self.wait_for_lift() {
                        return Ok(wait);
                    }
                    self.side_in = t.rx_connector().is_some_and(|c| self.is_side(c));
                    if let Some(connector) = t.rx_connector() {
                        if self.side_in {
                            let dir = self.config.chain_rules.incoming(connector, "chain")?;
                            self.rig.active_motor_mut(true).set_direction(dir);
                        } else {
                            let dir = self.config.roller_rules.incoming(connector, "roller")?;
                            self.rig.motor.set_direction(dir);
                        }
                    }
                    cur.goto(2);
                    if let Some(secs) = self.begin_lift(self.side_in) {
                        return Ok(ctx.wait_secs(secs));
                    }
                }
                _ => {
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
                    let early = self.early_confirm();
                    self.enable_sensors(self.side_in, early);
                    self.rig.active_motor_mut(self.side_in).motor_on();
                    cur.goto(1);
                }
                1 => {
                    if self.early_confirm() {
                        // Process finishes the centring.
                        return Ok(wait_blocked(&self.rig, START, t.load).unwrap_or(Step::Done));
                    }
                    if let Some(wait) = wait_blocked(&self.rig, self.active_sensor(self.side_in), t.load) {
                        return Ok(wait);
                    }
                    cur.goto(2);
                    return Ok(ctx.wait_secs(self.centring_secs(t.load, ctx)?));
                }
                _ => {
                    self.rig.all_off();
                    return Ok(Step::Done);
                }
            }
        }
    }

    fn process(&mut self, t: &mut Transfer, cur: &mut Cursor, ctx: &mut PhaseContext<'_>) -> CvResult<Step> {
        if !self.early_confirm() {
            return Ok(Step::Done);
        }
        if cur.stage() == 0 {
            if let Some(wait) = wait_blocked(&self.rig, ROLLER, t.load) {
                return Ok(wait);
            }
            cur.goto(1);
            return Ok(ctx.wait_secs(self.centring_secs(t.load, ctx)?));
        }
        self.rig.all_off();
        Ok(Step::Done)
    }

    fn tx_before(&mut self, t: &mut Transfer, _cur: &mut Cursor, ctx: &mut PhaseContext<'_>) -> CvResult<Step> {
        if self.preparing {
            return Ok(Step::Wait(Wait::Signal(self.ready_for_tx)));
        }
        ctx.loads.get_mut(t.load)?.stuck_to = Some(ctx.segment);
        let active = self.active_sensor(self.side_out);
        self.enable_sensors(self.side_out, false);
        tracing::trace!(segment = %ctx.segment, active, "exit prepared");
        Ok(Step::Done)
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

    fn tx_complete(&mut self, t: &mut Transfer, _cur: &mut Cursor, ctx: &mut PhaseContext<'_>) -> CvResult<Step> {
        ctx.loads.get_mut(t.load)?.stuck_to = None;
        self.rig.all_off();
        self.rig.reset_speeds();
        self.holding = None;
        self.gate.set(false);
        ctx.spawn(Routine::FinishTx);
        Ok(Step::Done)
    }

    fn resume_routine(&mut self, routine: &Routine, cur: &mut Cursor, ctx: &mut PhaseContext<'_>) -> CvResult<Step> {
        match routine {
            Routine::PrepareTx { tx_connector } => self.prepare_tx(tx_connector, cur, ctx),
            Routine::FinishTx => self.finish_tx(cur, ctx),
            _ => Ok(Step::Done),
        }
    }
}
