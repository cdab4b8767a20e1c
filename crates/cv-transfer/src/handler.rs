//! `TransferPhaseHandler` — the per-segment-kind behavior the engine drives.

use std::fmt;

use cv_core::{CvResult, PropertyOutcome, PropertyValue};
use cv_equipment::{Motor, Rig};

use crate::{Cursor, PhaseContext, Port, Routine, SegmentKind, Step, Transfer, TransferPhase};

/// One method per transfer phase, plus lifecycle and configuration hooks.
///
/// Phase methods are resumable: each returns `Step::Wait` to suspend and is
/// called again, with the same `Cursor`, once the wait resolves.  All state
/// a phase mutates lives on `self`; the engine guarantees that no two phase
/// bodies of the same segment run at the same time.
///
/// Every phase defaults to finishing immediately.
pub trait TransferPhaseHandler: fmt::Debug {
    fn kind(&self) -> SegmentKind;
    fn name(&self) -> &str;

    fn rig(&self) -> &Rig;
    fn rig_mut(&mut self) -> &mut Rig;

    // ── Admission ─────────────────────────────────────────────────────────

    /// The admission gate.
    fn ready_for_incoming(&self) -> bool;

    /// Loads currently counted onto the segment.
    fn occupancy(&self) -> u32;

    fn capacity(&self) -> u32 {
        1
    }

    /// Whether loads keep their train metadata when entering this segment.
    fn supports_trains(&self) -> bool {
        false
    }

    /// Rated speed of the motor that takes a load entering through `rx`.
    fn intake_speed(&self, _rx: Option<&Port>) -> f64 {
        self.rig().motor.rated_speed()
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────

    /// Drop all transient state and return to rest.
    fn on_reset(&mut self);

    /// Derive geometry from configuration and open the gate.
    fn on_initialize(&mut self) -> CvResult<()>;

    /// An outbound transfer from this segment was just created (the exit is
    /// known, the receiver has not admitted the load yet).
    fn on_transfer_created(&mut self, _t: &Transfer, _ctx: &mut PhaseContext<'_>) -> CvResult<()> {
        Ok(())
    }

    /// Reconfigure at runtime.  Soft violations come back as
    /// `PropertyOutcome::Reverted`; physically impossible geometry is an
    /// error and leaves the segment untouched.
    fn set_property(&mut self, name: &str, value: &PropertyValue) -> CvResult<PropertyOutcome>;

    /// Runs after a property was applied, with the segment's context, so
    /// suspended loads can be woken to re-evaluate.
    fn on_property_changed(&mut self, _ctx: &mut PhaseContext<'_>) -> CvResult<()> {
        Ok(())
    }

    // ── Phases ────────────────────────────────────────────────────────────

    fn rx_before(&mut self, _t: &mut Transfer, _cur: &mut Cursor, _ctx: &mut PhaseContext<'_>) -> CvResult<Step> {
        Ok(Step::Done)
    }

    fn rx(&mut self, _t: &mut Transfer, _cur: &mut Cursor, _ctx: &mut PhaseContext<'_>) -> CvResult<Step> {
        Ok(Step::Done)
    }

    fn rx_complete(&mut self, _t: &mut Transfer, _cur: &mut Cursor, _ctx: &mut PhaseContext<'_>) -> CvResult<Step> {
        Ok(Step::Done)
    }

    fn process(&mut self, _t: &mut Transfer, _cur: &mut Cursor, _ctx: &mut PhaseContext<'_>) -> CvResult<Step> {
        Ok(Step::Done)
    }

    fn tx_before(&mut self, _t: &mut Transfer, _cur: &mut Cursor, _ctx: &mut PhaseContext<'_>) -> CvResult<Step> {
        Ok(Step::Done)
    }

    fn tx(&mut self, _t: &mut Transfer, _cur: &mut Cursor, _ctx: &mut PhaseContext<'_>) -> CvResult<Step> {
        Ok(Step::Done)
    }

    fn tx_complete(&mut self, _t: &mut Transfer, _cur: &mut Cursor, _ctx: &mut PhaseContext<'_>) -> CvResult<Step> {
        Ok(Step::Done)
    }

    fn tx_after(&mut self, _t: &mut Transfer, _cur: &mut Cursor, _ctx: &mut PhaseContext<'_>) -> CvResult<Step> {
        Ok(Step::Done)
    }

    /// Run `phase` once.
    fn resume(
        &mut self,
        phase: TransferPhase,
        t:     &mut Transfer,
        cur:   &mut Cursor,
        ctx:   &mut PhaseContext<'_>,
    ) -> CvResult<Step> {
        match phase {
            TransferPhase::RxBeforeTransfer   => self.rx_before(t, cur, ctx),
            TransferPhase::RxTransfer         => self.rx(t, cur, ctx),
            TransferPhase::RxTransferComplete => self.rx_complete(t, cur, ctx),
            TransferPhase::Process            => self.process(t, cur, ctx),
            TransferPhase::TxBeforeTransfer   => self.tx_before(t, cur, ctx),
            TransferPhase::TxTransfer         => self.tx(t, cur, ctx),
            TransferPhase::TxTransferComplete => self.tx_complete(t, cur, ctx),
            TransferPhase::TxAfterTransfer    => self.tx_after(t, cur, ctx),
            TransferPhase::Done               => Ok(Step::Done),
        }
    }

    /// Run a background routine once.
    fn resume_routine(
        &mut self,
        _routine: &Routine,
        _cur:     &mut Cursor,
        _ctx:     &mut PhaseContext<'_>,
    ) -> CvResult<Step> {
        Ok(Step::Done)
    }
}
