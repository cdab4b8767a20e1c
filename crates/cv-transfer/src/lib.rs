//! `cv-transfer` — the transfer phase state machine and the segment variants
//! that implement it.
//!
//! | Module                 | Contents                                                   |
//! |------------------------|------------------------------------------------------------|
//! | [`phase`]              | `TransferPhase` — the eight phases in order                |
//! | [`step`]               | `Step`, `Cursor` — resumable phase bodies                  |
//! | [`context`]            | `PhaseContext`, `Effect`, `Peer`                           |
//! | [`transfer`]           | `Transfer`, `Port`                                         |
//! | [`handler`]            | `TransferPhaseHandler` trait                               |
//! | [`train`]              | `TrainCoordinator`, `TrainSettings` — train formation      |
//! | [`gate`]               | `AdmissionGate`                                            |
//! | [`rotation`]           | turntable connector angles                                 |
//! | [`routine`]            | `Routine` — background motions outliving a phase           |
//! | [`event`]              | `SegmentEvent`                                             |
//! | [`config`]             | `SegmentConfig` and per-kind configuration                 |
//! | [`conveyor`]           | `ConveyorHandler` (plain conveyor and airlock)             |
//! | [`turntable`]          | `TurntableHandler`                                         |
//! | [`transfer_unit`]      | `TransferUnitHandler`                                      |
//! | [`transfer_turntable`] | `TransferTurntableHandler` (rollers, chain lift, rotation) |
//! | [`gravity`]            | `GravityHandler` (zoned accumulation)                      |
//! | [`jack`]               | `JackHandler` (single-load pickup station)                 |
//!
//! # Execution model
//!
//! A phase body never blocks.  It mutates its segment, queues effects on the
//! `PhaseContext` (raise a signal, request dispatch-in, start a routine,
//! report an event) and returns either `Step::Done` or `Step::Wait`.  The
//! engine applies the effects, suspends the task on the wait, and calls the
//! same phase again when the wait resolves.  Everything between two waits
//! runs to completion, so phase bodies of one segment never interleave
//! mid-mutation.

mod common;

pub mod config;
pub mod context;
pub mod conveyor;
pub mod event;
pub mod gate;
pub mod gravity;
pub mod handler;
pub mod jack;
pub mod phase;
pub mod rotation;
pub mod routine;
pub mod step;
pub mod train;
pub mod transfer;
pub mod transfer_turntable;
pub mod transfer_unit;
pub mod turntable;


pub use config::{
    AirlockSettings, ConveyorConfig, DoorsAt, GravityConfig, JackConfig, SegmentConfig,
    SegmentKind, TransferTurntableConfig, TransferUnitConfig, TurntableConfig, resolve_profile,
};
pub use context::{Effect, LoadPositions, PhaseContext, Peer};
pub use conveyor::ConveyorHandler;
pub use event::SegmentEvent;
pub use gate::AdmissionGate;
pub use gravity::GravityHandler;
pub use handler::TransferPhaseHandler;
pub use jack::JackHandler;
pub use phase::TransferPhase;
pub use routine::Routine;
pub use step::{Cursor, Step};
pub use train::{TrainCoordinator, TrainRelease, TrainSettings, WAIT_EPSILON_SECS};
pub use transfer::{Port, Transfer};
pub use transfer_turntable::TransferTurntableHandler;
pub use transfer_unit::TransferUnitHandler;
pub use turntable::TurntableHandler;
