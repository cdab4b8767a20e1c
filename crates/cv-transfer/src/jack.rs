//! Jack conveyor: a pickup station for one load at a time.
//!
//! A single `END` sensor stops the load short of the far end.  Admission
//! stays closed from the moment a load enters until it has fully left.

use cv_core::{CvError, CvResult, LoadId, PropertyOutcome, PropertyValue};
use cv_equipment::{Motor, PhotoEye, Rig, SimMotor};
use cv_schedule::SignalBoard;

use crate::common::{apply_rig_property, match_outbound_speed, reverted, wait_blocked};
use crate::{
    AdmissionGate, Cursor, JackConfig, PhaseContext, SegmentEvent, SegmentKind, Step, Transfer,
    TransferPhaseHandler, config::resolve_profile,
};

pub const END: usize = 0;

/// Frame widths the station is built in (m).
pub const WIDTHS: [f64; 3] = [0.9, 1.1, 1.3];

fn is_catalogue_width(width: f64) -> bool {
    WIDTHS.iter().any(|w| (w - width).abs() < 1e-9)
}

#[derive(Debug)]
pub struct JackHandler {
    config:  JackConfig,
    rig:     Rig,
    gate:    AdmissionGate,
    holding: Option<LoadId>,
}

impl JackHandler {
    pub fn new(config: JackConfig, signals: &mut SignalBoard) -> CvResult<Self> {
        let name = config.name.as_str();
        if !is_catalogue_width(config.width) {
            return Err(CvError::Config(format!(
                "{name}: width {} is not one of {WIDTHS:?}",
                config.width
            )));
        }
        let profile = resolve_profile(config.performance.as_deref(), config.speed)?;
        let rig = Rig::new(config.length, config.width, SimMotor::new(profile))
            .with_sensor(PhotoEye::new(name, "end", config.length, signals));
        Ok(Self {
            config,
            rig,
            gate: AdmissionGate::default(),
            holding: None,
        })
    }

    pub fn config(&self) -> &JackConfig {
        &self.config
    }

    fn configure_sensor(&mut self) -> CvResult<()> {
        let offset = self
            .config
            .stop_offset
            .unwrap_or_else(|| self.rig.motor.profile().stop_distance());
        self.rig.place_end_sensor(END, offset)?;
        Ok(())
    }
}

impl TransferPhaseHandler for JackHandler {
    fn kind(&self) -> SegmentKind {
        SegmentKind::Jack
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    fn rig(&self) -> &Rig {
        &self.rig
    }

    fn rig_mut(&mut self) -> &mut Rig {
        &mut self.rig
    }

    fn ready_for_incoming(&self) -> bool {
        self.gate.is_open()
    }

    fn occupancy(&self) -> u32 {
        u32::from(self.holding.is_some())
    }

    fn on_reset(&mut self) {
        self.gate.reset();
        self.rig.all_off();
        self.rig.reset_speeds();
        self.holding = None;
    }

    fn on_initialize(&mut self) -> CvResult<()> {
        self.configure_sensor()?;
        self.gate.set(true);
        Ok(())
    }

    fn set_property(&mut self, name: &str, value: &PropertyValue) -> CvResult<PropertyOutcome> {
        let before_rig = self.rig.clone();
        let before_config = self.config.clone();

        let outcome = match name {
            "width" => {
                let v = value.as_float(name)?;
                if is_catalogue_width(v) {
                    self.rig.width = v;
                    PropertyOutcome::Applied
                } else {
                    reverted(&self.config.name, format!("width {v} is not one of {WIDTHS:?}, kept {}", self.rig.width))
                }
            }
            "stop_offset" => {
                let v = value.as_float(name)?;
                if v < 0.0 {
                    reverted(&self.config.name, "stop offset has to be >= 0 m".into())
                } else {
                    self.config.stop_offset = Some(v);
                    PropertyOutcome::Applied
                }
            }
            _ => match apply_rig_property(&self.config.name, &mut self.rig, name, value)? {
                Some(outcome) => outcome,
                None => return Err(CvError::UnknownProperty(name.to_owned())),
            },
        };

        if outcome == PropertyOutcome::Applied {
            self.config.length = self.rig.length;
            self.config.width = self.rig.width;
            if let Err(e) = self.configure_sensor() {
                self.rig = before_rig;
                self.config = before_config;
                return Err(e);
            }
        }
        Ok(outcome)
    }

    // ── Phases ────────────────────────────────────────────────────────────

    fn rx(&mut self, t: &mut Transfer, cur: &mut Cursor, ctx: &mut PhaseContext<'_>) -> CvResult<Step> {
        if cur.stage() == 0 {
            self.gate.set(false);
            self.holding = Some(t.load);
            ctx.emit(SegmentEvent::LoadAdmitted { load: t.load, count: 1 });
            self.rig.motor.motor_on();
            cur.goto(1);
        }
        if let Some(wait) = wait_blocked(&self.rig, END, t.load) {
            return Ok(wait);
        }
        self.rig.motor.motor_off();
        Ok(Step::Done)
    }

    fn tx(&mut self, _t: &mut Transfer, cur: &mut Cursor, ctx: &mut PhaseContext<'_>) -> CvResult<Step> {
        if cur.stage() == 0 {
            cur.goto(1);
            if let Some(wait) = match_outbound_speed(&mut self.rig.motor, ctx) {
                return Ok(wait);
            }
        }
        self.rig.motor.motor_on();
        Ok(Step::Done)
    }

    fn tx_complete(&mut self, _t: &mut Transfer, _cur: &mut Cursor, ctx: &mut PhaseContext<'_>) -> CvResult<Step> {
        self.rig.motor.motor_off();
        self.rig.motor.reset_speed();
        self.holding = None;
        self.gate.set(true);
        ctx.dispatch_in();
        Ok(Step::Done)
    }
}
