//! Turntable angles.
//!
//! Connectors around a turntable are named by their angle: `Start` is 0°,
//! `End` 180°, and `C15` … `C345` sit at 15° steps in between.

use cv_equipment::ANGLE_TOLERANCE;

/// Angle of a named connector in degrees, or `None` for an unknown name.
pub fn connector_angle(name: &str) -> Option<f64> {
    match name {
        "Start" => Some(0.0),
        "End"   => Some(180.0),
        _ => {
            let deg: u32 = name.strip_prefix('C')?.parse().ok()?;
            (deg % 15 == 0 && deg > 0 && deg < 360 && deg != 180).then_some(f64::from(deg))
        }
    }
}

/// Normalise to `[0, 360)`.
pub fn normalize(deg: f64) -> f64 {
    let d = deg.rem_euclid(360.0);
    if d >= 360.0 - ANGLE_TOLERANCE / 2.0 { 0.0 } else { d }
}

/// Platform angle that lines the table up with `connector`.
///
/// An outgoing load leaves over the far end of the platform (+180°), a side
/// mechanism sits at +90°, and a reversed motor flips everything by 180°.
/// Unknown connector names resolve to 0° with a warning.
pub fn target_angle(connector: &str, outgoing: bool, side: bool, reversed: bool) -> f64 {
    let base = connector_angle(connector).unwrap_or_else(|| {
        tracing::warn!(connector, "unknown turntable connector, using 0°");
        0.0
    });
    let mut angle = base;
    if outgoing {
        angle += 180.0;
    }
    if side {
        angle += 90.0;
    }
    if reversed {
        angle += 180.0;
    }
    normalize(angle)
}

/// Signed shortest rotation from `current` to `target`, in `(-180, 180]`,
/// or `None` if no motion is needed.
///
/// A symmetric platform looks the same after half a turn, so a 180°
/// difference needs no motion either.
pub fn rotation_needed(current: f64, target: f64, symmetric: bool) -> Option<f64> {
    let mut diff = normalize(target) - normalize(current);
    if diff > 180.0 {
        diff -= 360.0;
    } else if diff <= -180.0 {
        diff += 360.0;
    }
    if diff.abs() <= ANGLE_TOLERANCE {
        return None;
    }
    if symmetric && (diff.abs() - 180.0).abs() <= ANGLE_TOLERANCE {
        return None;
    }
    Some(diff)
}
