//! Error type shared by the equipment and transfer crates.
//!
//! Sub-crates with their own failure modes (`cv-schedule`, `cv-sim`,
//! `cv-output`) define separate enums and wrap `CvError` as one variant.

use thiserror::Error;

use crate::{LoadId, SegmentId};

/// Errors raised by phase handlers and equipment configuration.
///
/// `Config` is always fatal: it means the layout is physically inconsistent
/// (e.g. the deceleration distance exceeds the segment length) and must be
/// fixed by whoever designed it.  Soft violations are not errors; they are
/// reverted and logged as warnings instead.
#[derive(Debug, Error)]
pub enum CvError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("connector {name:?} has no {rule} motor-direction rule")]
    UnknownConnector {
        name: String,
        rule: &'static str,
    },

    #[error("load {0} not found")]
    LoadNotFound(LoadId),

    #[error("segment {0} not found")]
    SegmentNotFound(SegmentId),

    #[error("unknown property {0:?}")]
    UnknownProperty(String),

    #[error("property {name:?} expects {expected}")]
    PropertyType {
        name:     String,
        expected: &'static str,
    },
}

/// Shorthand result type for the `cv-*` equipment and transfer crates.
pub type CvResult<T> = Result<T, CvError>;
