//! `cv-equipment` — the physical surface a segment drives.
//!
//! The engine never simulates physics itself: it issues motor commands and
//! consumes sensor edges.  This crate models exactly that surface.
//!
//! | Module          | Contents                                                  |
//! |-----------------|-----------------------------------------------------------|
//! | [`motor`]       | `Motor` trait, `SimMotor`, `Direction`                    |
//! | [`sensor`]      | `Sensor` trait, `PhotoEye`                                |
//! | [`mechanism`]   | `Mechanism` (turntable, chain lift), `Door` (airlock)     |
//! | [`rig`]         | `Rig` — length, width, motors, sensors; sensor placement  |
//! | [`direction`]   | `DirectionRules` — connector → motor direction tables     |

pub mod direction;
pub mod mechanism;
pub mod motor;
pub mod rig;
pub mod sensor;


pub use direction::DirectionRules;
pub use mechanism::{ANGLE_TOLERANCE, DOOR_SECTIONS, Door, Mechanism};
pub use motor::{Direction, Motor, SimMotor};
pub use rig::Rig;
pub use sensor::{PhotoEye, Sensor};
