//! Segment configuration, as read from a layout file.
//!
//! Every struct is `#[serde(default)]`: a layout only needs to name what
//! differs from the standard equipment.

use std::fmt;

use serde::Deserialize;

use cv_core::{CvError, CvResult, SpeedProfile};
use cv_equipment::DirectionRules;
use cv_schedule::SignalBoard;

use crate::{
    ConveyorHandler, GravityHandler, JackHandler, TrainSettings, TransferPhaseHandler,
    TransferTurntableHandler, TransferUnitHandler, TurntableHandler,
};

/// Performance name meaning "run with `speed` exactly as configured".
pub const PERFORMANCE_OTHER: &str = "Other";

// ── SegmentKind ───────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    Conveyor,
    Airlock,
    Turntable,
    TransferUnit,
    TransferTurntable,
    Gravity,
    Jack,
}

impl SegmentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SegmentKind::Conveyor          => "conveyor",
            SegmentKind::Airlock           => "airlock",
            SegmentKind::Turntable         => "turntable",
            SegmentKind::TransferUnit      => "transfer_unit",
            SegmentKind::TransferTurntable => "transfer_turntable",
            SegmentKind::Gravity           => "gravity",
            SegmentKind::Jack              => "jack",
        }
    }
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Conveyor / airlock ────────────────────────────────────────────────────────

/// Which ends of an airlock carry a door.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoorsAt {
    #[default]
    Both,
    Start,
    End,
    None,
}

impl DoorsAt {
    pub fn at_start(self) -> bool {
        matches!(self, DoorsAt::Both | DoorsAt::Start)
    }

    pub fn at_end(self) -> bool {
        matches!(self, DoorsAt::Both | DoorsAt::End)
    }

    pub fn parse(s: &str) -> Option<DoorsAt> {
        match s {
            "both"  => Some(DoorsAt::Both),
            "start" => Some(DoorsAt::Start),
            "end"   => Some(DoorsAt::End),
            "none"  => Some(DoorsAt::None),
            _       => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct AirlockSettings {
    pub doors:                 DoorsAt,
    /// Seconds for a door to fully open or close.
    pub moving_doors_duration: f64,
}

impl Default for AirlockSettings {
    fn default() -> Self {
        Self { doors: DoorsAt::Both, moving_doors_duration: 4.0 }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConveyorConfig {
    pub name:                        String,
    pub length:                      f64,
    pub width:                       f64,
    /// `"0.2 m/s"`, `"0.35 m/s"`, or `"Other"` to use `speed` as given.
    pub performance:                 Option<String>,
    pub speed:                       SpeedProfile,
    /// Distance between the end sensor's stopping point and the segment end.
    /// `None` uses the stop distance itself.
    pub stop_offset:                 Option<f64>,
    pub start_sensor_position:       f64,
    /// Confirm Rx at the start sensor instead of the end sensor.  Ignored
    /// (forced off) while trains are created.
    pub confirm_rx_at_start_sensor:  bool,
    pub train:                       TrainSettings,
    /// Report the gap between the first two loads of each train, to tune
    /// `start_sensor_position`.
    pub find_distance_between_loads: bool,
    /// Used only by `kind = "airlock"`.
    pub airlock:                     AirlockSettings,
}

impl Default for ConveyorConfig {
    fn default() -> Self {
        Self {
            name:                        String::new(),
            length:                      2.0,
            width:                       0.975,
            performance:                 None,
            speed:                       SpeedProfile::STANDARD,
            stop_offset:                 None,
            start_sensor_position:       0.2,
            confirm_rx_at_start_sensor:  false,
            train:                       TrainSettings::default(),
            find_distance_between_loads: false,
            airlock:                     AirlockSettings::default(),
        }
    }
}

// ── Turntable ─────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct TurntableConfig {
    pub name:        String,
    pub length:      f64,
    pub width:       f64,
    pub performance: Option<String>,
    pub speed:       SpeedProfile,
    /// Seconds per quarter turn.
    pub rotate_90:   f64,
    /// Rotate back to `Start` after every transfer.
    pub auto_home:   bool,
    /// The platform looks the same after half a turn.
    pub symmetric:   bool,
}

impl Default for TurntableConfig {
    fn default() -> Self {
        Self {
            name:        String::new(),
            length:      1.5,
            width:       0.975,
            performance: None,
            speed:       SpeedProfile::STANDARD,
            rotate_90:   4.0,
            auto_home:   false,
            symmetric:   false,
        }
    }
}

// ── Transfer unit ─────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct TransferUnitConfig {
    pub name:                       String,
    pub length:                     f64,
    pub width:                      f64,
    pub performance:                Option<String>,
    /// Roller (straight) motor.
    pub speed:                      SpeedProfile,
    /// Chain (side) motor.
    pub chain_speed:                SpeedProfile,
    /// Seconds to raise or lower the chain.
    pub lifting_time:               f64,
    /// Lower the chain after every transfer.
    pub auto_home:                  bool,
    pub confirm_rx_at_start_sensor: bool,
    pub start_sensor_position:      f64,
    pub roller_rules:               DirectionRules,
    pub chain_rules:                DirectionRules,
}

impl Default for TransferUnitConfig {
    fn default() -> Self {
        Self {
            name:                       String::new(),
            length:                     1.3,
            width:                      1.1,
            performance:                None,
            speed:                      SpeedProfile::STANDARD,
            chain_speed:                SpeedProfile::STANDARD,
            lifting_time:               1.0,
            auto_home:                  false,
            confirm_rx_at_start_sensor: false,
            start_sensor_position:      0.2,
            roller_rules:               DirectionRules::roller(),
            chain_rules:                DirectionRules::chain(),
        }
    }
}

// ── Transfer turntable ────────────────────────────────────────────────────────

/// A turntable carrying both rollers and a chain lift.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct TransferTurntableConfig {
    pub name:         String,
    pub length:       f64,
    pub width:        f64,
    pub performance:  Option<String>,
    pub speed:        SpeedProfile,
    pub chain_speed:  SpeedProfile,
    pub lifting_time: f64,
    pub rotate_90:    f64,
    pub auto_home:    bool,
    pub symmetric:    bool,
}

impl Default for TransferTurntableConfig {
    fn default() -> Self {
        Self {
            name:         String::new(),
            length:       1.8,
            width:        0.9,
            performance:  None,
            speed:        SpeedProfile::STANDARD,
            chain_speed:  SpeedProfile::STANDARD,
            lifting_time: 1.0,
            rotate_90:    4.0,
            auto_home:    false,
            symmetric:    false,
        }
    }
}

// ── Gravity conveyor ──────────────────────────────────────────────────────────

/// An accumulating conveyor of `positions` equal zones, one load per zone.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct GravityConfig {
    pub name:                String,
    pub positions:           u32,
    pub length_per_position: f64,
    pub width:               f64,
    pub speed:               SpeedProfile,
}

impl Default for GravityConfig {
    fn default() -> Self {
        Self {
            name:                String::new(),
            positions:           3,
            length_per_position: 1.5,
            width:               1.0,
            speed:               SpeedProfile::SLOW,
        }
    }
}

// ── Jack conveyor ─────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct JackConfig {
    pub name:        String,
    pub length:      f64,
    pub width:       f64,
    pub performance: Option<String>,
    pub speed:       SpeedProfile,
    /// As for conveyors: `None` backs off by the stop distance.
    pub stop_offset: Option<f64>,
}

impl Default for JackConfig {
    fn default() -> Self {
        Self {
            name:        String::new(),
            length:      2.0,
            width:       0.9,
            performance: None,
            speed:       SpeedProfile::STANDARD,
            stop_offset: None,
        }
    }
}

// ── SegmentConfig ─────────────────────────────────────────────────────────────

/// One `[[segment]]` table, tagged by `kind`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SegmentConfig {
    Conveyor(ConveyorConfig),
    Airlock(ConveyorConfig),
    Turntable(TurntableConfig),
    TransferUnit(TransferUnitConfig),
    TransferTurntable(TransferTurntableConfig),
    Gravity(GravityConfig),
    Jack(JackConfig),
}

impl SegmentConfig {
    pub fn name(&self) -> &str {
        match self {
            SegmentConfig::Conveyor(c) | SegmentConfig::Airlock(c) => &c.name,
            SegmentConfig::Turntable(c)         => &c.name,
            SegmentConfig::TransferUnit(c)      => &c.name,
            SegmentConfig::TransferTurntable(c) => &c.name,
            SegmentConfig::Gravity(c)           => &c.name,
            SegmentConfig::Jack(c)              => &c.name,
        }
    }

    pub fn kind(&self) -> SegmentKind {
        match self {
            SegmentConfig::Conveyor(_)          => SegmentKind::Conveyor,
            SegmentConfig::Airlock(_)           => SegmentKind::Airlock,
            SegmentConfig::Turntable(_)         => SegmentKind::Turntable,
            SegmentConfig::TransferUnit(_)      => SegmentKind::TransferUnit,
            SegmentConfig::TransferTurntable(_) => SegmentKind::TransferTurntable,
            SegmentConfig::Gravity(_)           => SegmentKind::Gravity,
            SegmentConfig::Jack(_)              => SegmentKind::Jack,
        }
    }

    /// Construct the handler, allocating its signals, and initialize it.
    ///
    /// Fails with `CvError::Config` if the geometry is physically impossible.
    pub fn build(&self, signals: &mut SignalBoard) -> CvResult<Box<dyn TransferPhaseHandler>> {
        let mut handler: Box<dyn TransferPhaseHandler> = match self {
            SegmentConfig::Conveyor(c)          => Box::new(ConveyorHandler::new(c.clone(), false, signals)?),
            SegmentConfig::Airlock(c)           => Box::new(ConveyorHandler::new(c.clone(), true, signals)?),
            SegmentConfig::Turntable(c)         => Box::new(TurntableHandler::new(c.clone(), signals)?),
            SegmentConfig::TransferUnit(c)      => Box::new(TransferUnitHandler::new(c.clone(), signals)?),
            SegmentConfig::TransferTurntable(c) => Box::new(TransferTurntableHandler::new(c.clone(), signals)?),
            SegmentConfig::Gravity(c)           => Box::new(GravityHandler::new(c.clone(), signals)?),
            SegmentConfig::Jack(c)              => Box::new(JackHandler::new(c.clone(), signals)?),
        };
        handler.on_initialize()?;
        Ok(handler)
    }
}

/// The speed profile a segment runs with.
pub fn resolve_profile(performance: Option<&str>, custom: SpeedProfile) -> CvResult<SpeedProfile> {
    let profile = match performance {
        None | Some(PERFORMANCE_OTHER) => custom,
        Some(name) => SpeedProfile::from_performance(name)
            .ok_or_else(|| CvError::Config(format!("unknown performance {name:?}")))?,
    };
    if !profile.is_valid() {
        return Err(CvError::Config(format!(
            "speed profile must be positive, got max {} acc {} dec {}",
            profile.max, profile.acc, profile.dec
        )));
    }
    Ok(profile)
}
