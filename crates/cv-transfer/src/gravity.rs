//! Gravity conveyor: an accumulating line of equal zones, one load each.
//!
//! Zone `z` has its own motor and a stop sensor near its far end.  A load
//! enters zone 0, then walks forward zone by zone until the zone ahead is
//! its final slot: the head of the queue goes to the last zone, the load
//! behind it to the one before, and so on.  Whenever the head leaves, every
//! waiting load advances one slot.
//!
//! Admission is delayed: after a load has moved on, the gate reopens only
//! once the entry zone's sensor is clear again.

use cv_core::{CvError, CvResult, LoadId, PropertyOutcome, PropertyValue, SignalId, place_end_sensor};
use cv_equipment::{Motor, PhotoEye, Rig, Sensor, SimMotor};
use cv_schedule::{SignalBoard, Wait};

use crate::common::{apply_rig_property, match_outbound_speed, reverted, wait_blocked};
use crate::{
    AdmissionGate, Cursor, GravityConfig, PhaseContext, Routine, SegmentEvent, SegmentKind, Step,
    Transfer, TransferPhaseHandler,
};

/// Distance the stop sensors sit before the stopping point.
const SENSOR_OVERHANG: f64 = 0.01;

const MIN_ZONE_LENGTH: f64 = 0.5;
const MIN_WIDTH: f64 = 0.5;
const MIN_SPEED: f64 = 0.01;

#[derive(Debug)]
pub struct GravityHandler {
    config:   GravityConfig,
    rig:      Rig,
    gate:     AdmissionGate,
    /// Loads on the conveyor, head first.
    loads:    Vec<LoadId>,
    /// Raised each time the head leaves.
    advanced: SignalId,
}

fn check(config: &GravityConfig) -> CvResult<()> {
    let name = config.name.as_str();
    if config.positions < 1 {
        return Err(CvError::Config(format!("{name}: there has to be at least 1 position")));
    }
    if config.length_per_position < MIN_ZONE_LENGTH {
        return Err(CvError::Config(format!(
            "{name}: length per position has to be at least {MIN_ZONE_LENGTH} m, got {}",
            config.length_per_position
        )));
    }
    if config.width < MIN_WIDTH {
        return Err(CvError::Config(format!(
            "{name}: width has to be at least {MIN_WIDTH} m, got {}",
            config.width
        )));
    }
    if config.speed.max < MIN_SPEED {
        return Err(CvError::Config(format!(
            "{name}: speed has to be at least {MIN_SPEED} m/s, got {}",
            config.speed.max
        )));
    }
    Ok(())
}

impl GravityHandler {
    pub fn new(config: GravityConfig, signals: &mut SignalBoard) -> CvResult<Self> {
        check(&config)?;
        let name = config.name.as_str();
        let zones = config.positions as usize;
        let zone_length = config.length_per_position;
        let mut rig = Rig::new(zone_length * zones as f64, config.width, SimMotor::new(config.speed))
            .with_zones(zones, zone_length);
        for z in 0..zones {
            let owner = format!("{name}.zone{}", z + 1);
            rig = rig.with_sensor(PhotoEye::new(&owner, "stop", (z as f64 + 1.0) * zone_length, signals));
        }
        let advanced = signals.allocate(format!("{name}.advanced"));
        Ok(Self {
            config,
            rig,
            gate: AdmissionGate::default(),
            loads: Vec::new(),
            advanced,
        })
    }

    pub fn config(&self) -> &GravityConfig {
        &self.config
    }

    pub fn positions(&self) -> usize {
        self.config.positions as usize
    }

    /// Loads on the conveyor, head first.
    pub fn loads(&self) -> &[LoadId] {
        &self.loads
    }

    /// Put every zone's stop sensor where a load braking on it comes to
    /// rest just short of the next zone.
    fn configure_sensors(&mut self) -> CvResult<()> {
        let zone_length = self.config.length_per_position;
        let placement = place_end_sensor(zone_length, self.rig.motor.profile(), SENSOR_OVERHANG)?;
        if placement.tight {
            tracing::warn!(
                segment = self.config.name.as_str(),
                zone_length,
                "zone may be too short to stop a load",
            );
        }
        for (z, sensor) in self.rig.sensors.iter_mut().enumerate() {
            sensor.set_position(z as f64 * zone_length + placement.position);
        }
        Ok(())
    }

    /// Copy zone 0's profile to every other zone.
    fn sync_zone_profiles(&mut self) {
        let profile = *self.rig.motor.profile();
        for zone in &mut self.rig.zones {
            zone.set_profile(profile);
        }
        self.config.speed = profile;
    }

    /// `load` is in its final slot while it sits in `zone` and is not the
    /// head: its slot is `positions - 1 - index`.
    fn must_hold(&self, load: LoadId, zone: usize) -> bool {
        match self.loads.iter().position(|&l| l == load) {
            Some(0) | None => false,
            Some(index) => self.positions() - index == zone + 1,
        }
    }

    fn zone_on(&mut self, zone: usize) {
        if let Some(motor) = self.rig.zone_mut(zone) {
            motor.motor_on();
        }
    }

    fn zone_off(&mut self, zone: usize) {
        if let Some(motor) = self.rig.zone_mut(zone) {
            motor.motor_off();
        }
    }

    fn last_zone(&self) -> usize {
        self.positions() - 1
    }

    /// Stage layout of `process`: stage 0 holds at the entry, stages
    /// `2z - 1` and `2z` drive into zone `z` and hold there.
    fn advance(&mut self, load: LoadId, cur: &mut Cursor, ctx: &mut PhaseContext<'_>) -> CvResult<Step> {
        loop {
            let stage = cur.stage();
            if stage == 0 {
                if self.must_hold(load, 0) {
                    return Ok(Step::Wait(Wait::Signal(self.advanced)));
                }
                ctx.spawn(Routine::ClearEntry);
                self.zone_on(0);
                cur.goto(1);
                continue;
            }
            let zone = usize::from((stage + 1) / 2);
            if zone > self.last_zone() {
                return Ok(Step::Done);
            }
            if stage % 2 == 1 {
                self.zone_on(zone);
                if let Some(wait) = wait_blocked(&self.rig, zone, load) {
                    return Ok(wait);
                }
                self.zone_off(zone);
                tracing::trace!(segment = %ctx.segment, %load, zone, "load reached zone");
                if zone == self.last_zone() {
                    return Ok(Step::Done);
                }
                cur.goto(stage + 1);
            } else {
                if self.must_hold(load, zone) {
                    return Ok(Step::Wait(Wait::Signal(self.advanced)));
                }
                self.zone_on(zone);
                cur.goto(stage + 1);
            }
        }
    }

    fn clear_entry(&mut self, ctx: &mut PhaseContext<'_>) -> Step {
        if let Some(sensor) = self.rig.sensor(0) {
            if sensor.is_blocked() {
                return Step::Wait(Wait::Signal(sensor.on_cleared()));
            }
        }
        self.gate.set(true);
        ctx.dispatch_in();
        Step::Done
    }
}

impl TransferPhaseHandler for GravityHandler {
    fn kind(&self) -> SegmentKind {
        SegmentKind::Gravity
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
        self.gate.is_open() && self.loads.len() < self.positions()
    }

    fn occupancy(&self) -> u32 {
        self.loads.len() as u32
    }

    fn capacity(&self) -> u32 {
        self.config.positions
    }

    fn on_reset(&mut self) {
        self.gate.reset();
        self.rig.all_off();
        self.rig.reset_speeds();
        self.loads.clear();
    }

    fn on_initialize(&mut self) -> CvResult<()> {
        self.configure_sensors()?;
        self.gate.set(true);
        Ok(())
    }

    fn set_property(&mut self, name: &str, value: &PropertyValue) -> CvResult<PropertyOutcome> {
        let before_rig = self.rig.clone();
        let before_config = self.config.clone();

        let outcome = match name {
            "positions" => {
                // Zones and their sensors are wired when the segment is built.
                let v = value.as_int(name)?;
                let reason = if v < 1 {
                    format!("there have to be at least 1 position, kept {}", self.config.positions)
                } else {
                    format!("positions are fixed once built, kept {}", self.config.positions)
                };
                return Ok(reverted(&self.config.name, reason));
            }
            "length" => {
                let reason = format!(
                    "length follows positions x length_per_position, kept {}",
                    self.rig.length
                );
                return Ok(reverted(&self.config.name, reason));
            }
            "length_per_position" => {
                let v = value.as_float(name)?;
                if v < MIN_ZONE_LENGTH {
                    return Ok(reverted(
                        &self.config.name,
                        format!("length per position has to be at least {MIN_ZONE_LENGTH} m, kept {}", self.config.length_per_position),
                    ));
                }
                self.config.length_per_position = v;
                self.rig.zone_length = v;
                self.rig.length = v * self.positions() as f64;
                PropertyOutcome::Applied
            }
            "width" => {
                let v = value.as_float(name)?;
                if v < MIN_WIDTH {
                    return Ok(reverted(
                        &self.config.name,
                        format!("width has to be at least {MIN_WIDTH} m, kept {}", self.rig.width),
                    ));
                }
                self.rig.width = v;
                self.config.width = v;
                PropertyOutcome::Applied
            }
            "speed" if value.as_float(name)? < MIN_SPEED => {
                return Ok(reverted(
                    &self.config.name,
                    format!("speed has to be at least {MIN_SPEED} m/s, kept {}", self.rig.motor.profile().max),
                ));
            }
            _ => match apply_rig_property(&self.config.name, &mut self.rig, name, value)? {
                Some(outcome) => outcome,
                None => return Err(CvError::UnknownProperty(name.to_owned())),
            },
        };

        if outcome == PropertyOutcome::Applied {
            self.sync_zone_profiles();
            if let Err(e) = self.configure_sensors() {
                self.rig = before_rig;
                self.config = before_config;
                return Err(e);
            }
        }
        Ok(outcome)
    }

    // ── Phases ────────────────────────────────────────────────────────────

    fn rx_before(&mut self, t: &mut Transfer, _cur: &mut Cursor, ctx: &mut PhaseContext<'_>) -> CvResult<Step> {
        self.loads.push(t.load);
        self.gate.set(false);
        let count = self.loads.len() as u32;
        ctx.emit(SegmentEvent::LoadAdmitted { load: t.load, count });
        tracing::debug!(segment = %ctx.segment, load = %t.load, count, "load admitted");
        Ok(Step::Done)
    }

    fn rx(&mut self, t: &mut Transfer, cur: &mut Cursor, _ctx: &mut PhaseContext<'_>) -> CvResult<Step> {
        if cur.stage() == 0 {
            self.zone_on(0);
            cur.goto(1);
        }
        if let Some(wait) = wait_blocked(&self.rig, 0, t.load) {
            return Ok(wait);
        }
        self.zone_off(0);
        Ok(Step::Done)
    }

    fn process(&mut self, t: &mut Transfer, cur: &mut Cursor, ctx: &mut PhaseContext<'_>) -> CvResult<Step> {
        self.advance(t.load, cur, ctx)
    }

    fn tx(&mut self, t: &mut Transfer, cur: &mut Cursor, ctx: &mut PhaseContext<'_>) -> CvResult<Step> {
        let last = self.last_zone();
        if cur.stage() == 0 {
            cur.goto(1);
            if let Some(motor) = self.rig.zone_mut(last) {
                if let Some(wait) = match_outbound_speed(motor, ctx) {
                    return Ok(wait);
                }
            }
        }
        self.loads.retain(|&l| l != t.load);
        self.zone_on(last);
        ctx.raise(self.advanced);
        ctx.dispatch_in();
        Ok(Step::Done)
    }

    fn tx_after(&mut self, _t: &mut Transfer, _cur: &mut Cursor, _ctx: &mut PhaseContext<'_>) -> CvResult<Step> {
        if let Some(motor) = self.rig.zone_mut(self.last_zone()) {
            motor.reset_speed();
        }
        if self.loads.is_empty() {
            self.rig.all_off();
        }
        Ok(Step::Done)
    }

    fn resume_routine(&mut self, routine: &Routine, _cur: &mut Cursor, ctx: &mut PhaseContext<'_>) -> CvResult<Step> {
        if *routine != Routine::ClearEntry {
            return Ok(Step::Done);
        }
        Ok(self.clear_entry(ctx))
    }
}
