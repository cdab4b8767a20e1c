//! Background routines a segment starts without a transfer attached.
//!
//! A routine runs as its own task.  It owns no load; it finishes a motion
//! that outlives the transfer that triggered it.

/// Work a handler spawns to run after (or alongside) a transfer phase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Routine {
    /// Airlock: lower the end door after the last load left, then reopen
    /// admission.
    CloseEndDoor,
    /// Turntable: rotate back to the home connector, then reopen admission.
    TurnHome,
    /// Transfer unit: set up direction and lift for the chosen exit.
    PrepareTx {
        tx_connector: String,
    },
    /// Transfer unit: wait for the platform to stop, return home, reopen.
    FinishTx,
    /// Gravity conveyor: reopen admission once the entry zone is clear.
    ClearEntry,
}

impl Routine {
    pub fn name(&self) -> &'static str {
        match self {
            Routine::CloseEndDoor   => "close_end_door",
            Routine::TurnHome       => "turn_home",
            Routine::PrepareTx { .. } => "prepare_tx",
            Routine::FinishTx       => "finish_tx",
            Routine::ClearEntry     => "clear_entry",
        }
    }
}
