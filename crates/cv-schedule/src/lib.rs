//! `cv-schedule` — cooperative suspension for transfer tasks.
//!
//! # Crate layout
//!
//! | Module          | Contents                                                   |
//! |-----------------|------------------------------------------------------------|
//! | [`wait`]        | `Wait` descriptors: signal, duration, first-of-several     |
//! | [`signal`]      | `SignalBoard` — allocates and names `SignalId`s            |
//! | [`tick_queue`]  | `TickQueue<T>` (`BTreeMap<Tick, Vec<T>>`)                  |
//! | [`scheduler`]   | `Scheduler` — suspend, raise, fire timers, ready FIFO      |
//! | [`loader`]      | `load_arrivals_csv`, `load_arrivals_reader`                |
//! | [`error`]       | `ScheduleError`, `ScheduleResult<T>`                       |
//!
//! # Suspension model (summary)
//!
//! ```text
//! task yields Wait ──► Scheduler::suspend(task, wait, now)
//!                        Signal(s)   → waiters[s]
//!                        Ticks(n)    → timers[now + n]
//!                        Any([..])   → every branch, one shared token
//! raise(s) / fire_timers(now) ──► first live branch wins → ready FIFO
//! engine pops ready tasks and resumes them until none are left
//! ```
//!
//! Only one branch of an `Any` can wake a task: the token is consumed by the
//! first wake, and the remaining registrations are dropped as stale when
//! they are reached.

pub mod error;
pub mod loader;
pub mod scheduler;
pub mod signal;
pub mod tick_queue;
pub mod wait;

#[cfg(test)]
mod tests;

pub use error::{ScheduleError, ScheduleResult};
pub use loader::{ArrivalRecord, load_arrivals_csv, load_arrivals_reader};
pub use scheduler::Scheduler;
pub use signal::SignalBoard;
pub use tick_queue::TickQueue;
pub use wait::Wait;
