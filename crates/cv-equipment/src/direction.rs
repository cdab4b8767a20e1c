//! Connector → motor-direction tables.
//!
//! Different equipment decides motor direction from the connector a load
//! uses in slightly different ways.  Rather than unify them, each piece of
//! equipment carries its own table as configuration data.

use std::collections::BTreeMap;

use serde::Deserialize;

use cv_core::{CvError, CvResult};

use crate::Direction;

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct DirectionRules {
    /// Direction to run when a load enters through the named connector.
    pub incoming: BTreeMap<String, Direction>,
    /// Direction to run when a load leaves through the named connector.
    pub outgoing: BTreeMap<String, Direction>,
}

impl DirectionRules {
    /// Straight rollers: in at `Start` runs forward, in at `End` reverse, and
    /// the opposite for outgoing loads.
    pub fn roller() -> Self {
        Self::pair("Start", "End")
    }

    /// Side chains: in at `Left` runs forward, in at `Right` reverse, and the
    /// opposite for outgoing loads.
    pub fn chain() -> Self {
        Self::pair("Left", "Right")
    }

    fn pair(forward_in: &str, reverse_in: &str) -> Self {
        let incoming = BTreeMap::from([
            (forward_in.to_owned(), Direction::Forward),
            (reverse_in.to_owned(), Direction::Reverse),
        ]);
        let outgoing = BTreeMap::from([
            (forward_in.to_owned(), Direction::Reverse),
            (reverse_in.to_owned(), Direction::Forward),
        ]);
        Self { incoming, outgoing }
    }

    /// Direction for a load entering via `connector`.
    ///
    /// A connector missing from the table is a fatal configuration error.
    pub fn incoming(&self, connector: &str, rule: &'static str) -> CvResult<Direction> {
        lookup(&self.incoming, connector, rule)
    }

    /// Direction for a load leaving via `connector`.
    pub fn outgoing(&self, connector: &str, rule: &'static str) -> CvResult<Direction> {
        lookup(&self.outgoing, connector, rule)
    }

    /// `true` if the table mentions `connector` in either direction.
    pub fn covers(&self, connector: &str) -> bool {
        self.incoming.contains_key(connector) || self.outgoing.contains_key(connector)
    }
}

fn lookup(table: &BTreeMap<String, Direction>, connector: &str, rule: &'static str) -> CvResult<Direction> {
    table
        .get(connector)
        .copied()
        .ok_or_else(|| CvError::UnknownConnector { name: connector.to_owned(), rule })
}
