//! Loads (pallets, boxes) and the train metadata they carry between segments.

use crate::{CvError, CvResult, LoadId, SegmentId};

// ── TrainTag ──────────────────────────────────────────────────────────────────

/// Train metadata attached to a load when a segment releases a train.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrainTag {
    /// Number of loads in the train.
    pub size:     u32,
    /// `true` if the train reached the releasing segment's capacity.
    pub complete: bool,
    /// 1-based position of this load in the train, in arrival order.
    pub index:    u32,
}

impl TrainTag {
    /// The last load of an incomplete train forces the next segment to
    /// release whatever it has queued.
    #[inline]
    pub fn forces_release(&self) -> bool {
        !self.complete && self.index == self.size
    }
}

// ── Load ──────────────────────────────────────────────────────────────────────

/// A transportable unit.  Segments reference loads by id; the store owns them.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Load {
    pub id:       LoadId,
    /// Extent along the direction of straight travel (m).
    pub length:   f64,
    /// Extent across straight travel, i.e. along a side transfer (m).
    pub width:    f64,
    pub train:    Option<TrainTag>,
    /// Segment whose moving platform the load is currently stuck to.
    pub stuck_to: Option<SegmentId>,
}

// ── LoadStore ─────────────────────────────────────────────────────────────────

/// Dense load storage indexed by `LoadId`.
#[derive(Clone, Debug, Default)]
pub struct LoadStore {
    loads: Vec<Load>,
}

impl LoadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a load and return its id.
    pub fn spawn(&mut self, length: f64, width: f64) -> LoadId {
        let id = LoadId(self.loads.len() as u32);
        self.loads.push(Load {
            id,
            length,
            width,
            train:    None,
            stuck_to: None,
        });
        id
    }

    pub fn get(&self, id: LoadId) -> CvResult<&Load> {
        self.loads.get(id.index()).ok_or(CvError::LoadNotFound(id))
    }

    pub fn get_mut(&mut self, id: LoadId) -> CvResult<&mut Load> {
        self.loads.get_mut(id.index()).ok_or(CvError::LoadNotFound(id))
    }

    /// Train metadata currently carried by `id`.
    pub fn train_tag(&self, id: LoadId) -> CvResult<Option<TrainTag>> {
        Ok(self.get(id)?.train)
    }

    pub fn len(&self) -> usize {
        self.loads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loads.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Load> {
        self.loads.iter()
    }
}
