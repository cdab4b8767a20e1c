//! Resumable phase bodies.
//!
//! A phase body is an ordinary method that runs until it either finishes or
//! has to wait.  Before returning `Step::Wait` it records in its `Cursor`
//! where to pick up; the engine hands the same cursor back on resumption and
//! resets it when the phase changes.

use cv_schedule::Wait;

/// Outcome of running a phase body (or a background routine) once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    /// The phase is complete; move on.
    Done,
    /// Suspend until the wait resolves, then call the same phase again.
    Wait(Wait),
}

impl Step {
    pub fn is_done(&self) -> bool {
        matches!(self, Step::Done)
    }
}

/// Resumption point inside a phase body.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Cursor {
    stage: u16,
}

impl Cursor {
    pub fn stage(&self) -> u16 {
        self.stage
    }

    pub fn goto(&mut self, stage: u16) {
        self.stage = stage;
    }

    pub fn reset(&mut self) {
        self.stage = 0;
    }
}
