//! Notable things a segment reports while running phases.

use cv_core::LoadId;

/// Emitted by handlers through `PhaseContext::emit` and forwarded to
/// observers by the engine.
#[derive(Clone, Debug, PartialEq)]
pub enum SegmentEvent {
    /// A load was counted onto the segment.
    LoadAdmitted { load: LoadId, count: u32 },
    /// A train was tagged and set moving.
    TrainReleased {
        size:     u32,
        complete: bool,
        forced:   bool,
        loads:    Vec<LoadId>,
    },
    /// Free space (m) between the first two loads of a train once the head
    /// reached the end sensor.  Negative means they overlap.
    TrainGap { distance: f64 },
    /// Train metadata was removed because the receiver does not form trains.
    TrainTagStripped { load: LoadId },
    /// A mechanism finished a motion.
    MechanismMoved {
        mechanism: &'static str,
        position:  f64,
    },
    /// The motor was slowed to the receiver's rated speed.
    SpeedMatched { speed: f64 },
    /// A configuration warning; the offending value was reverted.
    Warning(String),
}

impl SegmentEvent {
    /// Short machine-friendly tag, used as the event column in output files.
    pub fn kind(&self) -> &'static str {
        match self {
            SegmentEvent::LoadAdmitted { .. }     => "load_admitted",
            SegmentEvent::TrainReleased { .. }    => "train_released",
            SegmentEvent::TrainGap { .. }         => "train_gap",
            SegmentEvent::TrainTagStripped { .. } => "train_tag_stripped",
            SegmentEvent::MechanismMoved { .. }   => "mechanism_moved",
            SegmentEvent::SpeedMatched { .. }     => "speed_matched",
            SegmentEvent::Warning(_)              => "warning",
        }
    }
}
