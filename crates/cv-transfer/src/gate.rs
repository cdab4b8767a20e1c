//! The admission gate ("ready for incoming").

/// Whether a segment accepts a new transfer.
///
/// Phase handlers set the gate directly.  A mechanism that physically blocks
/// the entry (a moving door) instead *holds* it: the gate reads closed, and
/// when the hold ends it takes the value captured at the start of the hold.
/// Values set while held are discarded.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AdmissionGate {
    open:     bool,
    captured: Option<bool>,
}

impl Default for AdmissionGate {
    fn default() -> Self {
        Self { open: true, captured: None }
    }
}

impl AdmissionGate {
    pub fn is_open(&self) -> bool {
        self.open && self.captured.is_none()
    }

    pub fn is_held(&self) -> bool {
        self.captured.is_some()
    }

    pub fn set(&mut self, open: bool) {
        self.open = open;
    }

    /// Re-derive the gate after a setting changed.  While held, the new value
    /// replaces the captured one so the hold ends on it.
    pub fn reassess(&mut self, open: bool) {
        match self.captured.as_mut() {
            Some(captured) => *captured = open,
            None => self.open = open,
        }
    }

    /// Close the gate for the duration of a motion, remembering its value.
    /// A nested hold keeps the first captured value.
    pub fn hold(&mut self) {
        if self.captured.is_none() {
            self.captured = Some(self.open);
        }
    }

    /// Close the gate for a motion, and have it reopen when the motion ends.
    pub fn hold_then_open(&mut self) {
        self.captured = Some(true);
    }

    /// End the hold.  Returns the restored value; callers dispatch in when it
    /// is open.
    pub fn release(&mut self) -> bool {
        if let Some(value) = self.captured.take() {
            self.open = value;
        }
        self.open
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
