//! The transfer record shared by both sides of a handoff.

use cv_core::LoadId;

/// One end of a link: the connector a load passes through on a segment, and
/// whether that connector is engaged through the side mechanism.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Port {
    pub connector: String,
    pub side:      bool,
}

impl Port {
    pub fn new(connector: impl Into<String>) -> Self {
        Self { connector: connector.into(), side: false }
    }

    pub fn side(connector: impl Into<String>) -> Self {
        Self { connector: connector.into(), side: true }
    }
}

/// One load's visit to one segment.
///
/// `rx` is how the load enters (`None` for loads injected straight onto the
/// segment); `tx` is filled in once the router has chosen an exit and stays
/// `None` on a sink.
#[derive(Clone, Debug, PartialEq)]
pub struct Transfer {
    pub load: LoadId,
    pub rx:   Option<Port>,
    pub tx:   Option<Port>,
}

impl Transfer {
    pub fn new(load: LoadId, rx: Option<Port>) -> Self {
        Self { load, rx, tx: None }
    }

    pub fn rx_connector(&self) -> Option<&str> {
        self.rx.as_ref().map(|p| p.connector.as_str())
    }

    pub fn tx_connector(&self) -> Option<&str> {
        self.tx.as_ref().map(|p| p.connector.as_str())
    }
}
