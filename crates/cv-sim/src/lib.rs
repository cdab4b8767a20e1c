//! `cv-sim` — discrete-event host for the conveyor transfer engine.
//!
//! # Event loop
//!
//! ```text
//! loop:
//!   settle the current instant:
//!     ① Plant     — sensor edges up to now; changed sensors raise signals.
//!     ② Timers    — due timed waits wake their tasks.
//!     ③ Arrivals  — scheduled loads join their segment's queue.
//!     ④ Run       — ready tasks resume (FIFO) until none is ready.
//!                   Done phases advance: handoff barrier, routing, landing.
//!     ⑤ Dispatch  — per segment in id order, admit the oldest queued load
//!                   if the gate is open and nothing is being received.
//!   jump to min(next timer, next arrival, next plant edge)
//! ```
//!
//! # Modules
//!
//! | Module     | Contents                                              |
//! |------------|-------------------------------------------------------|
//! | `builder`  | `SimBuilder`: validates names and links, builds handlers |
//! | `layout`   | `Layout`, `LinkConfig`: TOML line descriptions        |
//! | `plant`    | `Plant` trait, `NullPlant`, `ScriptedPlant`, `BeltPlant` |
//! | `router`   | `Link`, `Router` trait, `FirstLink`, `RoundRobin`     |
//! | `observer` | `SimObserver` callbacks, `NoopObserver`               |
//! | `sim`      | `Sim`: the loop itself                                |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use cv_sim::{BeltPlant, FirstLink, Layout, NoopObserver};
//!
//! let layout = Layout::load("line.toml".as_ref())?;
//! let mut sim = layout.into_builder(BeltPlant::new(), FirstLink).build()?;
//! let infeed = sim.segment_id("infeed").unwrap();
//! sim.inject(infeed, 1.2, 0.8)?;
//! sim.run(&mut NoopObserver)?;
//! ```

pub mod builder;
pub mod error;
pub mod layout;
pub mod observer;
pub mod plant;
pub mod router;
pub mod sim;

#[cfg(test)]
mod tests;

pub use builder::SimBuilder;
pub use error::{SimError, SimResult};
pub use layout::{Layout, LinkConfig};
pub use observer::{NoopObserver, SimObserver};
pub use plant::{BeltPlant, Edge, NullPlant, Plant, PlantView, ScriptedPlant, SensorEdge};
pub use router::{FirstLink, Link, Router, RoundRobin};
pub use sim::{Segment, Sim};
