//! Photo-eye sensors.

use cv_core::{LoadId, SignalId};
use cv_schedule::SignalBoard;

/// What a phase handler may ask of a boundary sensor.
///
/// `on_blocked`/`on_cleared` are the signals raised on each edge; the host
/// side (the plant) reports edges and the engine raises them.
pub trait Sensor {
    fn is_blocked(&self) -> bool {
        self.blocking_load().is_some()
    }
    fn blocking_load(&self) -> Option<LoadId>;
    fn on_blocked(&self) -> SignalId;
    fn on_cleared(&self) -> SignalId;
    fn position(&self) -> f64;
    fn set_position(&mut self, position: f64);
    fn is_enabled(&self) -> bool;
    fn set_enabled(&mut self, enabled: bool);
}

/// A binary blocked/clear detector at a distance along its segment.
#[derive(Clone, Debug, PartialEq)]
pub struct PhotoEye {
    name:     &'static str,
    position: f64,
    enabled:  bool,
    blocking: Option<LoadId>,
    blocked:  SignalId,
    cleared:  SignalId,
}

impl PhotoEye {
    /// Create an enabled, clear sensor and allocate its two edge signals,
    /// named `"{owner}.{name}.blocked"` / `".cleared"`.
    pub fn new(owner: &str, name: &'static str, position: f64, signals: &mut SignalBoard) -> Self {
        Self {
            name,
            position,
            enabled:  true,
            blocking: None,
            blocked:  signals.allocate(format!("{owner}.{name}.blocked")),
            cleared:  signals.allocate(format!("{owner}.{name}.cleared")),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Host side: `load` now blocks the beam.  Returns the signal to raise.
    pub fn block(&mut self, load: LoadId) -> SignalId {
        self.blocking = Some(load);
        self.blocked
    }

    /// Host side: the beam is clear again.  Returns the signal to raise.
    pub fn clear(&mut self) -> SignalId {
        self.blocking = None;
        self.cleared
    }
}

impl Sensor for PhotoEye {
    fn blocking_load(&self) -> Option<LoadId> {
        self.blocking
    }

    fn on_blocked(&self) -> SignalId {
        self.blocked
    }

    fn on_cleared(&self) -> SignalId {
        self.cleared
    }

    fn position(&self) -> f64 {
        self.position
    }

    fn set_position(&mut self, position: f64) {
        self.position = position;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}
