use cv_core::{CvError, Tick};
use cv_schedule::ScheduleError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("simulation configuration error: {0}")]
    Config(String),

    #[error("duplicate segment name {0:?}")]
    DuplicateSegment(String),

    #[error("unknown segment {0:?}")]
    UnknownSegment(String),

    /// A handler failed; the phase was aborted and the run stops.
    #[error("segment {segment}: {source}")]
    Segment {
        segment: String,
        #[source]
        source:  CvError,
    },

    #[error("no progress at {tick}: {steps} task steps without time advancing")]
    Stalled {
        tick:  Tick,
        steps: usize,
    },

    #[error("layout parse error: {0}")]
    Layout(#[from] toml::de::Error),

    #[error("arrival schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SimResult<T> = Result<T, SimError>;
