//! Building blocks shared by the segment variants.

use cv_core::{
    CvResult, LoadId, PropertyOutcome, PropertyValue, SpeedProfile, stop_time,
};
use cv_equipment::{Motor, Rig, Sensor, SimMotor};
use cv_schedule::Wait;

use crate::{PhaseContext, SegmentEvent, Step, config::resolve_profile};

/// Suspend on sensor `index` until `load` blocks it.  `None` once it does.
pub(crate) fn wait_blocked(rig: &Rig, index: usize, load: LoadId) -> Option<Step> {
    let sensor = rig.sensor(index)?;
    if sensor.blocking_load() == Some(load) {
        None
    } else {
        Some(Step::Wait(Wait::Signal(sensor.on_blocked())))
    }
}

/// Slow `motor` to the receiver's intake speed if that is lower.
///
/// Returns the wait for the load to decelerate when the motor is running,
/// `None` when the caller may start the motor straight away.
pub(crate) fn match_outbound_speed(motor: &mut SimMotor, ctx: &mut PhaseContext<'_>) -> Option<Step> {
    let peer = ctx.peer?;
    if peer.intake_speed >= motor.speed() {
        return None;
    }
    motor.set_speed(peer.intake_speed);
    ctx.emit(SegmentEvent::SpeedMatched { speed: peer.intake_speed });
    tracing::debug!(segment = %ctx.segment, speed = peer.intake_speed, "outbound speed matched");
    if !motor.is_on() {
        return None;
    }
    let secs = stop_time(motor.rated_speed(), motor.deceleration(), peer.intake_speed);
    Some(ctx.wait_secs(secs))
}

/// Time for `motor` to come to a standstill from its top speed.
pub(crate) fn full_stop_secs(motor: &SimMotor) -> f64 {
    motor.profile().stop_time(0.0)
}

/// Log a soft violation and build the outcome.
pub(crate) fn reverted(segment: &str, reason: String) -> PropertyOutcome {
    tracing::warn!(segment, %reason, "property change reverted");
    PropertyOutcome::Reverted { reason }
}

/// Apply one of the properties every segment shares: dimensions and motor
/// performance.  `Ok(None)` means `name` is not one of them.
///
/// Geometry is not re-derived here; callers re-run their sensor placement
/// and roll the rig back if that fails.
pub(crate) fn apply_rig_property(
    segment: &str,
    rig:     &mut Rig,
    name:    &str,
    value:   &PropertyValue,
) -> CvResult<Option<PropertyOutcome>> {
    let outcome = match name {
        "length" => {
            let v = value.as_float(name)?;
            if v <= 0.0 {
                reverted(segment, format!("length has to be > 0 m, kept {}", rig.length))
            } else {
                rig.length = v;
                PropertyOutcome::Applied
            }
        }
        "width" => {
            let v = value.as_float(name)?;
            if v <= 0.0 {
                reverted(segment, format!("width has to be > 0 m, kept {}", rig.width))
            } else {
                rig.width = v;
                PropertyOutcome::Applied
            }
        }
        "performance" => {
            let text = value.as_text(name)?;
            match resolve_profile(Some(text), *rig.motor.profile()) {
                Ok(profile) => {
                    rig.motor.set_profile(profile);
                    PropertyOutcome::Applied
                }
                Err(e) => reverted(segment, e.to_string()),
            }
        }
        "speed" | "acceleration" | "deceleration" => {
            let v = value.as_float(name)?;
            let mut profile: SpeedProfile = *rig.motor.profile();
            match name {
                "speed"        => profile.max = v,
                "acceleration" => profile.acc = v,
                _              => profile.dec = v,
            }
            if profile.is_valid() {
                rig.motor.set_profile(profile);
                PropertyOutcome::Applied
            } else {
                reverted(segment, format!("{name} has to be > 0, kept the previous value"))
            }
        }
        _ => return Ok(None),
    };
    Ok(Some(outcome))
}
