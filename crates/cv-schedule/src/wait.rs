//! Wait descriptors yielded by suspended tasks.

use cv_core::SignalId;

/// What a suspended task is waiting for.
///
/// "Wait until a predicate holds" is not a separate variant: the task checks
/// its predicate when resumed and suspends again on the signal that can
/// change it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Wait {
    /// The next time the signal is raised.
    Signal(SignalId),
    /// A fixed number of ticks.  `Ticks(0)` resumes in the same instant.
    Ticks(u64),
    /// Whichever branch fires first.  An empty list resumes immediately.
    Any(Vec<Wait>),
}

impl Wait {
    /// Signal-or-timeout race.
    pub fn signal_or_ticks(signal: SignalId, ticks: u64) -> Wait {
        Wait::Any(vec![Wait::Signal(signal), Wait::Ticks(ticks)])
    }
}
