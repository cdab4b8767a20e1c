//! Segment geometry plus the motors and sensors mounted on it.

use cv_core::{CvError, CvResult, SensorPlacement, place_end_sensor};

use crate::{Motor, PhotoEye, Sensor, SimMotor};

/// The physical surface of one segment.
///
/// `motor` drives straight (roller) travel.  `chain` is present only on
/// equipment that can also move loads sideways.  Sensor indices are fixed
/// per segment kind; see each handler for its layout.
///
/// An accumulating segment is split into equal zones along its length, each
/// with its own motor: `motor` drives the first zone and `zones` the rest.
#[derive(Clone, Debug)]
pub struct Rig {
    pub length:      f64,
    pub width:       f64,
    pub motor:       SimMotor,
    pub chain:       Option<SimMotor>,
    pub zones:       Vec<SimMotor>,
    pub zone_length: f64,
    pub sensors:     Vec<PhotoEye>,
}

impl Rig {
    pub fn new(length: f64, width: f64, motor: SimMotor) -> Self {
        Self {
            length,
            width,
            motor,
            chain: None,
            zones: Vec::new(),
            zone_length: length,
            sensors: Vec::new(),
        }
    }

    /// Split the rig into `count` zones of `zone_length`, every extra zone
    /// getting a copy of the first zone's motor.
    pub fn with_zones(mut self, count: usize, zone_length: f64) -> Self {
        self.zones = vec![self.motor.clone(); count.saturating_sub(1)];
        self.zone_length = zone_length;
        self
    }

    pub fn zone_count(&self) -> usize {
        self.zones.len() + 1
    }

    /// Motor of zone `index`; zone 0 is `motor`.
    pub fn zone(&self, index: usize) -> Option<&SimMotor> {
        match index {
            0 => Some(&self.motor),
            i => self.zones.get(i - 1),
        }
    }

    pub fn zone_mut(&mut self, index: usize) -> Option<&mut SimMotor> {
        match index {
            0 => Some(&mut self.motor),
            i => self.zones.get_mut(i - 1),
        }
    }

    /// Zone under a point `at` metres along the rig.  Points before the
    /// start belong to the first zone, points past the end to the last.
    pub fn zone_at(&self, at: f64) -> usize {
        if self.zones.is_empty() || !(self.zone_length > 0.0) || at <= 0.0 {
            return 0;
        }
        ((at / self.zone_length) as usize).min(self.zones.len())
    }

    /// Speed a load whose front is at `front` moves with, or `None` when
    /// nothing under it runs.
    pub fn speed_at(&self, front: f64) -> Option<f64> {
        if self.zones.is_empty() {
            return self.any_motor_on().then(|| self.active_speed());
        }
        let motor = self.zone(self.zone_at(front))?;
        motor.is_on().then(|| motor.speed())
    }

    pub fn with_chain(mut self, chain: SimMotor) -> Self {
        self.chain = Some(chain);
        self
    }

    pub fn with_sensor(mut self, sensor: PhotoEye) -> Self {
        self.sensors.push(sensor);
        self
    }

    pub fn sensor(&self, index: usize) -> Option<&PhotoEye> {
        self.sensors.get(index)
    }

    pub fn sensor_mut(&mut self, index: usize) -> Option<&mut PhotoEye> {
        self.sensors.get_mut(index)
    }

    /// Straight motor, or the chain motor when `side` is set and one is fitted.
    pub fn active_motor(&self, side: bool) -> &SimMotor {
        match (&self.chain, side) {
            (Some(chain), true) => chain,
            _ => &self.motor,
        }
    }

    pub fn active_motor_mut(&mut self, side: bool) -> &mut SimMotor {
        match (&mut self.chain, side) {
            (Some(chain), true) => chain,
            _ => &mut self.motor,
        }
    }

    pub fn any_motor_on(&self) -> bool {
        self.motor.is_on()
            || self.chain.as_ref().is_some_and(Motor::is_on)
            || self.zones.iter().any(Motor::is_on)
    }

    pub fn all_off(&mut self) {
        self.motor.motor_off();
        for motor in self.chain.iter_mut().chain(self.zones.iter_mut()) {
            motor.motor_off();
        }
    }

    pub fn reset_speeds(&mut self) {
        self.motor.reset_speed();
        for motor in self.chain.iter_mut().chain(self.zones.iter_mut()) {
            motor.reset_speed();
        }
    }

    /// Commanded speed of whichever motor is running (straight first).
    pub fn active_speed(&self) -> f64 {
        match &self.chain {
            Some(chain) if chain.is_on() && !self.motor.is_on() => chain.speed(),
            _ => self.motor.speed(),
        }
    }

    /// Move sensor `index` to the stopping point for the straight motor.
    ///
    /// The sensor is only moved if the placement is physically possible; a
    /// failing placement leaves every field untouched.
    pub fn place_end_sensor(&mut self, index: usize, offset: f64) -> CvResult<SensorPlacement> {
        let placement = place_end_sensor(self.length, self.motor.profile(), offset)?;
        let sensor = self
            .sensors
            .get_mut(index)
            .ok_or_else(|| CvError::Config(format!("no sensor at index {index}")))?;
        sensor.set_position(placement.position);
        if placement.tight {
            tracing::warn!(
                sensor = sensor.name(),
                position = placement.position,
                "end sensor is very close to the segment start",
            );
        }
        Ok(placement)
    }
}
