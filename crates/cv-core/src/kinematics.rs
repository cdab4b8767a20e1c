//! Closed-form stopping kinematics.
//!
//! Pure functions, no state.  Motors decelerate linearly, so a load running
//! at `v_max` needs `v_max / dec` seconds and `½·dec·t²` metres to stop.  The
//! end sensor of a conveyor is placed that far (plus a configurable offset)
//! before the end so that a load stopping on it comes to rest at the end.

use crate::{CvError, CvResult};

/// End-sensor positions closer than this to the segment start get a warning.
pub const SENSOR_MARGIN_WARN: f64 = 0.4;

// ── SpeedProfile ──────────────────────────────────────────────────────────────

/// Motor speed limits: top speed (m/s), acceleration and deceleration (m/s²).
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SpeedProfile {
    pub max: f64,
    pub acc: f64,
    pub dec: f64,
}

impl Default for SpeedProfile {
    fn default() -> Self {
        Self::STANDARD
    }
}

impl SpeedProfile {
    /// The "0.2 m/s" standard performance.
    pub const SLOW: SpeedProfile = SpeedProfile { max: 0.2, acc: 0.4, dec: 0.4 };

    /// The "0.35 m/s" standard performance.
    pub const STANDARD: SpeedProfile = SpeedProfile { max: 0.35, acc: 0.4, dec: 0.4 };

    /// Look up a named standard performance (`"0.2 m/s"`, `"0.35 m/s"`).
    pub fn from_performance(name: &str) -> Option<SpeedProfile> {
        match name.trim() {
            "0.2 m/s"  => Some(Self::SLOW),
            "0.35 m/s" => Some(Self::STANDARD),
            _          => None,
        }
    }

    /// Seconds to slow from `max` down to `target`.
    #[inline]
    pub fn stop_time(&self, target: f64) -> f64 {
        stop_time(self.max, self.dec, target)
    }

    /// Metres travelled while stopping from `max`.
    #[inline]
    pub fn stop_distance(&self) -> f64 {
        stop_distance(self.max, self.dec)
    }

    /// Seconds to reach `max` from standstill.
    #[inline]
    pub fn acc_time(&self) -> f64 {
        self.max / self.acc
    }

    /// `true` if every component is finite and strictly positive.
    pub fn is_valid(&self) -> bool {
        [self.max, self.acc, self.dec]
            .iter()
            .all(|v| v.is_finite() && *v > 0.0)
    }
}

// ── Free functions ────────────────────────────────────────────────────────────

/// `stopTime = (v_max − target) / dec`.
#[inline]
pub fn stop_time(v_max: f64, dec: f64, target: f64) -> f64 {
    (v_max - target) / dec
}

/// `stopDistance = ½ · dec · stopTime(v_max, dec, 0)²`.
#[inline]
pub fn stop_distance(v_max: f64, dec: f64) -> f64 {
    let t = stop_time(v_max, dec, 0.0);
    0.5 * dec * t * t
}

/// Seconds a load must keep running after its front blocks a centre sensor
/// so that it comes to rest centred: `(load_len/2 − stopDistance) / v_max`.
///
/// May be negative for loads shorter than twice the stop distance; the
/// clock treats negative waits as zero.
#[inline]
pub fn mid_stop_wait(load_len: f64, v_max: f64, dec: f64) -> f64 {
    (load_len / 2.0 - stop_distance(v_max, dec)) / v_max
}

/// Result of placing an end sensor.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SensorPlacement {
    /// Distance of the sensor from the segment start.
    pub position: f64,
    /// `position < SENSOR_MARGIN_WARN`: plausible but tight.
    pub tight: bool,
}

/// `sensorPosition = length − stopDistance − offset`.
///
/// Fails with [`CvError::Config`] if the sensor would sit before the start
/// of the segment, or if the profile cannot stop at all.  Nothing is mutated;
/// callers apply the placement only on success.
pub fn place_end_sensor(
    length:  f64,
    profile: &SpeedProfile,
    offset:  f64,
) -> CvResult<SensorPlacement> {
    if !(profile.dec.is_finite() && profile.dec > 0.0) {
        return Err(CvError::Config(format!(
            "deceleration must be positive, got {}",
            profile.dec
        )));
    }
    let position = length - profile.stop_distance() - offset;
    if position < 0.0 {
        return Err(CvError::Config(format!(
            "check length ({length} m), v_max ({} m/s), deceleration ({} m/s²) and \
             stop offset ({offset} m): the end sensor would be located {:.3} m before the segment",
            profile.max,
            profile.dec,
            -position,
        )));
    }
    Ok(SensorPlacement {
        position,
        tight: position < SENSOR_MARGIN_WARN,
    })
}
