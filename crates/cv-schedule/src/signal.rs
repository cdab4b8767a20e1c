//! Signal allocation.

use cv_core::SignalId;

/// Hands out `SignalId`s and remembers a name for each, for log output.
///
/// Sensors get one signal per edge (`blocked`, `cleared`), mechanisms one
/// `finished` signal, train coordinators one `arrival` signal.
#[derive(Debug, Default)]
pub struct SignalBoard {
    names: Vec<String>,
}

impl SignalBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh signal.
    pub fn allocate(&mut self, name: impl Into<String>) -> SignalId {
        let id = SignalId(self.names.len() as u32);
        self.names.push(name.into());
        id
    }

    pub fn name(&self, id: SignalId) -> Option<&str> {
        self.names.get(id.index()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
