//! Turntable: a short conveyor on a rotating platform.
//!
//! One load at a time.  The platform turns to face the incoming connector
//! before the load enters, centres the load on a single sensor, then turns
//! to face the exit.

use cv_core::{CvError, CvResult, LoadId, PropertyOutcome, PropertyValue, mid_stop_wait};
use cv_equipment::{ANGLE_TOLERANCE, Direction, Mechanism, Motor, PhotoEye, Rig, Sensor, SimMotor};
use cv_schedule::{SignalBoard, Wait};

use crate::common::{apply_rig_property, full_stop_secs, match_outbound_speed, reverted, wait_blocked};
use crate::rotation::{normalize, rotation_needed, target_angle};
use crate::{
    AdmissionGate, Cursor, PhaseContext, Port, Routine, SegmentEvent, SegmentKind, Step, Transfer,
    TransferPhaseHandler, TurntableConfig, config::resolve_profile,
};

pub const CENTRE: usize = 0;

/// Connector the platform returns to when homing.
const HOME: &str = "Start";

#[derive(Debug)]
pub struct TurntableHandler {
    config:   TurntableConfig,
    rig:      Rig,
    gate:     AdmissionGate,
    rotation: Mechanism,
    holding:  Option<LoadId>,
}

impl TurntableHandler {
    pub fn new(config: TurntableConfig, signals: &mut SignalBoard) -> CvResult<Self> {
        let name = config.name.as_str();
        let profile = resolve_profile(config.performance.as_deref(), config.speed)?;
        if !(config.rotate_90.is_finite() && config.rotate_90 > 0.0) {
            return Err(CvError::Config(format!(
                "{name}: rotate_90 must be positive, got {}",
                config.rotate_90
            )));
        }
        let rig = Rig::new(config.length, config.width, SimMotor::new(profile))
            .with_sensor(PhotoEye::new(name, "centre", config.length / 2.0, signals));
        let rotation = Mechanism::new(name, "rotation", 0.0, config.rotate_90 / 90.0, signals);
        Ok(Self {
            config,
            rig,
            gate: AdmissionGate::default(),
            rotation,
            holding: None,
        })
    }

    pub fn angle(&self) -> f64 {
        self.rotation.position()
    }

    pub fn config(&self) -> &TurntableConfig {
        &self.config
    }

    /// Centre the sensor and derive the rotation speed.
    fn configure(&mut self) {
        let centre = self.rig.length / 2.0;
        if let Some(sensor) = self.rig.sensor_mut(CENTRE) {
            sensor.set_position(centre);
        }
        self.rotation.set_secs_per_unit(self.config.rotate_90 / 90.0);
    }

    /// Start turning to face `port`.  Returns the travel time, or `None` if
    /// the platform already faces it.
    fn begin_rotation(&mut self, port: &Port, outgoing: bool) -> Option<f64> {
        let reversed = self.rig.motor.direction() == Direction::Reverse;
        let target = target_angle(&port.connector, outgoing, port.side, reversed);
        let current = self.rotation.position();
        let diff = rotation_needed(current, target, self.config.symmetric)?;
        Some(self.rotation.begin(current + diff, ANGLE_TOLERANCE))
    }

    /// The rotation has ended: settle the angle into `[0, 360)` and tell
    /// anyone waiting.
    fn finish_rotation(&mut self, ctx: &mut PhaseContext<'_>) {
        if !self.rotation.is_moving() {
            return;
        }
        let signal = self.rotation.arrive();
        let angle = normalize(self.rotation.position());
        self.rotation.place(angle);
        ctx.raise(signal);
        ctx.emit(SegmentEvent::MechanismMoved { mechanism: "rotation", position: angle });
        tracing::debug!(segment = %ctx.segment, angle, "turntable rotated");
    }

    /// A motion that is already running has to finish before a new one starts.
    fn wait_for_rotation(&self) -> Option<Step> {
        self.rotation
            .is_moving()
            .then(|| Step::Wait(Wait::Signal(self.rotation.finished())))
    }
}

impl TransferPhaseHandler for TurntableHandler {
    fn kind(&self) -> SegmentKind {
        SegmentKind::Turntable
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

    fn on_reset(&mut self) {
        self.gate.reset();
        self.rig.all_off();
        self.rig.reset_speeds();
        self.rotation.place(0.0);
        self.holding = None;
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
            "rotate_90" | "rotate_90_performance" => {
                let secs = if name == "rotate_90" {
                    value.as_float(name)?
                } else {
                    let text = value.as_text(name)?;
                    match text.trim_end_matches('s').trim().parse::<f64>() {
                        Ok(secs) => secs,
                        Err(_) => {
                            let reason = format!("{text:?} is not a rotation time, kept {}", self.config.rotate_90);
                            return Ok(reverted(&self.config.name, reason));
                        }
                    }
                };
                if secs.is_finite() && secs > 0.0 {
                    self.config.rotate_90 = secs;
                    self.rotation.set_secs_per_unit(secs / 90.0);
                    PropertyOutcome::Applied
                } else {
                    reverted(&self.config.name, format!("rotate_90 has to be > 0 s, kept {}", self.config.rotate_90))
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
        if cur.stage() == 0 {
            self.gate.set(false);
            self.holding = Some(t.load);
            ctx.emit(SegmentEvent::LoadAdmitted { load: t.load, count: 1 });
            cur.goto(1);
        }
        if cur.stage() == 1 {
            if let Some(wait) = self.wait_for_rotation() {
                return Ok(wait);
            }
            cur.goto(2);
            if let Some(secs) = t.rx.as_ref().and_then(|port| self.begin_rotation(port, false)) {
                return Ok(ctx.wait_secs(secs));
            }
        }
        self.finish_rotation(ctx);
        Ok(Step::Done)
    }

    fn rx(&mut self, t: &mut Transfer, cur: &mut Cursor, ctx: &mut PhaseContext<'_>) -> CvResult<Step> {
        loop {
            match cur.stage() {
                0 => {
                    self.rig.motor.motor_on();
                    cur.goto(1);
                }
                1 => {
                    if let Some(wait) = wait_blocked(&self.rig, CENTRE, t.load) {
                        return Ok(wait);
                    }
                    let profile = *self.rig.motor.profile();
                    let length = ctx.loads.get(t.load)?.length;
                    cur.goto(2);
                    return Ok(ctx.wait_secs(mid_stop_wait(length, profile.max, profile.dec)));
                }
                2 => {
                    self.rig.motor.motor_off();
                    cur.goto(3);
                    return Ok(ctx.wait_secs(full_stop_secs(&self.rig.motor)));
                }
                _ => return Ok(Step::Done),
            }
        }
    }

    fn tx_before(&mut self, t: &mut Transfer, cur: &mut Cursor, ctx: &mut PhaseContext<'_>) -> CvResult<Step> {
        if cur.stage() == 0 {
            let Some(port) = t.tx.clone() else {
                return Ok(Step::Done);
            };
            ctx.loads.get_mut(t.load)?.stuck_to = Some(ctx.segment);
            cur.goto(1);
            if let Some(secs) = self.begin_rotation(&port, true) {
                return Ok(ctx.wait_secs(secs));
            }
        }
        self.finish_rotation(ctx);
        ctx.loads.get_mut(t.load)?.stuck_to = None;
        Ok(Step::Done)
    }

    fn tx(&mut self, _t: &mut Transfer, cur: &mut Cursor, ctx: &mut PhaseContext<'_>) -> CvResult<Step> {
        if cur.stage() == 0 {
            cur.goto(1);
            if let Some(wait) = match_outbound_speed(&mut self.rig.motor, ctx) {
                return Ok(wait);
            }
        }
        self.rig.motor.motor_on();
        Ok(Step::Done)
    }

    fn tx_complete(&mut self, _t: &mut Transfer, _cur: &mut Cursor, ctx: &mut PhaseContext<'_>) -> CvResult<Step> {
        if self.config.auto_home {
            // No new load until the platform is back home.
            self.gate.hold_then_open();
            ctx.spawn(Routine::TurnHome);
        } else {
            self.gate.set(true);
            ctx.dispatch_in();
        }
        Ok(Step::Done)
    }

    fn tx_after(&mut self, _t: &mut Transfer, _cur: &mut Cursor, _ctx: &mut PhaseContext<'_>) -> CvResult<Step> {
        self.rig.motor.motor_off();
        self.rig.motor.reset_speed();
        self.holding = None;
        Ok(Step::Done)
    }

    fn resume_routine(&mut self, routine: &Routine, cur: &mut Cursor, ctx: &mut PhaseContext<'_>) -> CvResult<Step> {
        if *routine != Routine::TurnHome {
            return Ok(Step::Done);
        }
        if cur.stage() == 0 {
            if let Some(wait) = self.wait_for_rotation() {
                return Ok(wait);
            }
            cur.goto(1);
            if let Some(secs) = self.begin_rotation(&Port::new(HOME), false) {
                return Ok(ctx.wait_secs(secs));
            }
        }
        self.finish_rotation(ctx);
        if self.gate.release() {
            ctx.dispatch_in();
        }
        Ok(Step::Done)
    }
}
