//! `cv-core` — foundational types for the conveyor transfer engine.
//!
//! This crate is a dependency of every other `cv-*` crate.  It has no `cv-*`
//! dependencies and minimal external ones (only `thiserror`, plus optional
//! `serde`).
//!
//! # What lives here
//!
//! | Module          | Contents                                                  |
//! |-----------------|-----------------------------------------------------------|
//! | [`ids`]         | `SegmentId`, `LoadId`, `TaskId`, `SignalId`               |
//! | [`time`]        | `Tick`, `SimClock`, `SimConfig`                           |
//! | [`load`]        | `Load`, `TrainTag`, `LoadStore`                           |
//! | [`kinematics`]  | `SpeedProfile`, stop time / stop distance / sensor maths  |
//! | [`property`]    | `PropertyValue`, `PropertyOutcome`                        |
//! | [`error`]       | `CvError`, `CvResult`                                     |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to ids, ticks, `SimConfig`. |

pub mod error;
pub mod ids;
pub mod kinematics;
pub mod load;
pub mod property;
pub mod time;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{CvError, CvResult};
pub use ids::{LoadId, SegmentId, SignalId, TaskId};
pub use kinematics::{
    SensorPlacement, SpeedProfile, mid_stop_wait, place_end_sensor, stop_distance, stop_time,
    SENSOR_MARGIN_WARN,
};
pub use load::{Load, LoadStore, TrainTag};
pub use property::{PropertyOutcome, PropertyValue};
pub use time::{SimClock, SimConfig, Tick};
