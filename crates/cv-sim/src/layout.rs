//! TOML line layouts.
//!
//! ```toml
//! [sim]
//! end_secs = 120.0
//!
//! [[segment]]
//! kind   = "conveyor"
//! name   = "infeed"
//! length = 2.0
//!
//! [[segment]]
//! kind = "turntable"
//! name = "tt1"
//!
//! [[link]]
//! from = "infeed"
//! to   = "tt1"
//! rx   = "Start"
//! ```

use std::path::Path;

use serde::Deserialize;

use cv_core::SimConfig;
use cv_transfer::SegmentConfig;

use crate::{Plant, Router, SimBuilder, SimResult};

fn default_tx() -> String {
    "End".to_owned()
}

fn default_rx() -> String {
    "Start".to_owned()
}

/// One `[[link]]` table.  Connectors default to leaving through `End` and
/// entering through `Start`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct LinkConfig {
    pub from:    String,
    pub to:      String,
    #[serde(default = "default_tx")]
    pub tx:      String,
    #[serde(default = "default_rx")]
    pub rx:      String,
    /// The exit is taken through the side mechanism (chain) of `from`.
    #[serde(default)]
    pub tx_side: bool,
    #[serde(default)]
    pub rx_side: bool,
}

impl LinkConfig {
    /// `End` of `from` to `Start` of `to`.
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from:    from.into(),
            to:      to.into(),
            tx:      default_tx(),
            rx:      default_rx(),
            tx_side: false,
            rx_side: false,
        }
    }

    pub fn via(mut self, tx: impl Into<String>, rx: impl Into<String>) -> Self {
        self.tx = tx.into();
        self.rx = rx.into();
        self
    }
}

/// A whole line: run settings, segments in id order, and links.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Layout {
    #[serde(default)]
    pub sim:      SimConfig,
    #[serde(default, rename = "segment")]
    pub segments: Vec<SegmentConfig>,
    #[serde(default, rename = "link")]
    pub links:    Vec<LinkConfig>,
}

impl Layout {
    pub fn from_toml_str(text: &str) -> SimResult<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> SimResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let layout = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), segments = layout.segments.len(), "layout loaded");
        Ok(layout)
    }

    /// A builder pre-filled with this layout.
    pub fn into_builder<P: Plant, R: Router>(self, plant: P, router: R) -> SimBuilder<P, R> {
        SimBuilder::new(self.sim, plant, router)
            .segments(self.segments)
            .links(self.links)
    }
}
