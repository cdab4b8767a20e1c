//! The `Sim` struct and its event loop.

use std::collections::{BTreeMap, VecDeque};

use cv_core::{
    CvResult, LoadId, LoadStore, PropertyOutcome, PropertyValue, SegmentId, SimClock, SimConfig,
    TaskId, Tick,
};
use cv_equipment::{Rig, Sensor};
use cv_schedule::{ArrivalRecord, Scheduler, SignalBoard, TickQueue};
use cv_transfer::{
    Cursor, Effect, Peer, PhaseContext, Port, Routine, SegmentEvent, Step, Transfer, TransferPhase,
    TransferPhaseHandler,
};

use crate::plant::{Edge, Plant, PlantView, SensorEdge};
use crate::{Link, Router, SimError, SimObserver, SimResult};

// ── Segments ──────────────────────────────────────────────────────────────────

/// A load waiting to enter a segment.
#[derive(Clone, Debug)]
struct Pending {
    load:   LoadId,
    rx:     Option<Port>,
    /// The upstream transfer handing the load over; `None` for injected loads.
    sender: Option<TaskId>,
}

/// One segment of the line: its handler plus the engine's bookkeeping.
#[derive(Debug)]
pub struct Segment {
    pub id:      SegmentId,
    pub handler: Box<dyn TransferPhaseHandler>,
    /// Loads waiting for admission, oldest first.
    queue:       VecDeque<Pending>,
    /// Indices into the link table.
    outgoing:    Vec<usize>,
}

impl Segment {
    pub fn name(&self) -> &str {
        self.handler.name()
    }

    /// Loads waiting to be admitted.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn outgoing(&self) -> &[usize] {
        &self.outgoing
    }
}

// ── Tasks ─────────────────────────────────────────────────────────────────────

/// Why a transfer task is neither running nor suspended in the scheduler.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Hold {
    /// Ready or suspended on a wait.
    Running,
    /// Processed and routed; the receiver has not admitted the load yet.
    Admission,
    /// Finished its side of the handoff preparation; the other side hasn't.
    Barrier,
    /// Finished `TxTransfer`; the load has not landed downstream yet.
    Landing,
}

#[derive(Debug)]
struct TransferTask {
    transfer: Transfer,
    phase:    TransferPhase,
    /// Outbound link, once routed.
    link:     Option<usize>,
    sender:   Option<TaskId>,
    receiver: Option<TaskId>,
    hold:     Hold,
}

#[derive(Debug)]
enum Body {
    Transfer(TransferTask),
    Routine(Routine),
}

#[derive(Debug)]
struct Task {
    segment: SegmentId,
    cursor:  Cursor,
    body:    Body,
}

impl Task {
    fn transfer(&self) -> Option<&TransferTask> {
        match &self.body {
            Body::Transfer(tt) => Some(tt),
            Body::Routine(_) => None,
        }
    }

    fn transfer_mut(&mut self) -> Option<&mut TransferTask> {
        match &mut self.body {
            Body::Transfer(tt) => Some(tt),
            Body::Routine(_) => None,
        }
    }
}

/// A load due to appear at a segment entry.
#[derive(Clone, Debug)]
struct Arrival {
    segment: SegmentId,
    length:  f64,
    width:   f64,
}

// ── Sim ───────────────────────────────────────────────────────────────────────

/// The discrete-event host.
///
/// Every load's visit to a segment runs as a task through the eight transfer
/// phases.  Within one instant the loop works to quiescence:
///
/// 1. **Plant**: sensor edges up to now are applied and their signals raised.
/// 2. **Timers**: due timed waits wake their tasks.
/// 3. **Arrivals**: scheduled loads join the queue of their segment.
/// 4. **Run**: ready tasks are resumed in FIFO order until none is left.
/// 5. **Dispatch-in**: segments are examined in ascending id order and the
///    oldest queued load is admitted where the gate is open and the segment
///    is not already receiving.
///
/// Then time jumps to the earliest of the next timer, arrival and plant edge.
///
/// Create via [`SimBuilder`][crate::SimBuilder].
pub struct Sim<P: Plant, R: Router> {
    pub config:  SimConfig,
    pub clock:   SimClock,
    pub loads:   LoadStore,
    pub signals: SignalBoard,
    pub plant:   P,
    pub router:  R,

    segments:  Vec<Segment>,
    links:     Vec<Link>,
    scheduler: Scheduler,
    tasks:     BTreeMap<TaskId, Task>,
    next_task: u64,
    arrivals:  TickQueue<Arrival>,
}

impl<P: Plant, R: Router> Sim<P, R> {
    pub(crate) fn assemble(
        config:   SimConfig,
        signals:  SignalBoard,
        handlers: Vec<Box<dyn TransferPhaseHandler>>,
        links:    Vec<Link>,
        plant:    P,
        router:   R,
    ) -> Self {
        let mut segments: Vec<Segment> = handlers
            .into_iter()
            .enumerate()
            .map(|(i, handler)| Segment {
                id: SegmentId(i as u32),
                handler,
                queue: VecDeque::new(),
                outgoing: Vec::new(),
            })
            .collect();
        for (index, link) in links.iter().enumerate() {
            if let Some(seg) = segments.get_mut(link.from.index()) {
                seg.outgoing.push(index);
            }
        }
        Self {
            clock: config.make_clock(),
            config,
            loads: LoadStore::new(),
            signals,
            plant,
            router,
            segments,
            links,
            scheduler: Scheduler::new(),
            tasks: BTreeMap::new(),
            next_task: 0,
            arrivals: TickQueue::new(),
        }
    }

    // ── Public API ────────────────────────────────────────────────────────

    /// Run until `config.end_secs`, or until the line is idle when no end is
    /// configured.
    pub fn run<O: SimObserver>(&mut self, observer: &mut O) -> SimResult<()> {
        let end = self.config.end_tick();
        self.run_until(end, observer)?;
        observer.on_sim_end(self.clock.current_tick);
        Ok(())
    }

    /// Run up to and including `end`.  The clock is left at `end` (or at the
    /// last event if the line went idle and `end` is `Tick::MAX`).
    ///
    /// Useful for tests and incremental stepping.
    pub fn run_until<O: SimObserver>(&mut self, end: Tick, observer: &mut O) -> SimResult<()> {
        loop {
            self.settle(observer)?;
            match self.next_event() {
                Some(next) if next <= end => self.advance_clock(next, observer),
                _ => {
                    if end != Tick::MAX && self.clock.current_tick < end {
                        self.advance_clock(end, observer);
                        self.settle(observer)?;
                    }
                    return Ok(());
                }
            }
        }
    }

    /// Reset every segment: `on_reset` then `on_initialize`, clear sensors,
    /// drop all running transfers and queued loads.  Time and scheduled
    /// arrivals are kept.
    pub fn reset(&mut self) -> SimResult<()> {
        self.tasks.clear();
        self.scheduler = Scheduler::new();
        self.plant.reset();
        for seg in &mut self.segments {
            seg.queue.clear();
            for eye in &mut seg.handler.rig_mut().sensors {
                eye.clear();
            }
            seg.handler.on_reset();
            seg.handler.on_initialize().map_err(|source| SimError::Segment {
                segment: seg.handler.name().to_owned(),
                source,
            })?;
        }
        tracing::debug!(tick = %self.clock.current_tick, "line reset");
        Ok(())
    }

    /// Put a new load in front of `segment` now.  It is admitted at the next
    /// dispatch-in.
    pub fn inject(&mut self, segment: SegmentId, length: f64, width: f64) -> SimResult<LoadId> {
        self.check_segment(segment)?;
        let load = self.loads.spawn(length, width);
        self.segments[segment.index()].queue.push_back(Pending { load, rx: None, sender: None });
        Ok(load)
    }

    /// Inject a load at `at`.
    pub fn schedule_arrival(&mut self, at: Tick, segment: SegmentId, length: f64, width: f64) -> SimResult<()> {
        self.check_segment(segment)?;
        self.arrivals.push(at, Arrival { segment, length, width });
        Ok(())
    }

    /// Schedule every record of an arrival file.  Returns how many were added.
    pub fn schedule_arrivals(&mut self, records: &[ArrivalRecord]) -> SimResult<usize> {
        for rec in records {
            let segment = self
                .segment_id(&rec.segment)
                .ok_or_else(|| SimError::UnknownSegment(rec.segment.clone()))?;
            let at = Tick(self.clock.ticks_for_secs(rec.time_secs));
            self.arrivals.push(at, Arrival { segment, length: rec.length, width: rec.width });
        }
        Ok(records.len())
    }

    /// Reconfigure a segment at runtime.  A reverted change is reported to
    /// the observer as a warning.
    pub fn set_property<O: SimObserver>(
        &mut self,
        segment:  SegmentId,
        name:     &str,
        value:    &PropertyValue,
        observer: &mut O,
    ) -> SimResult<PropertyOutcome> {
        let outcome = self.with_handler(segment, false, None, observer, |handler, ctx| {
            let outcome = handler.set_property(name, value)?;
            if outcome == PropertyOutcome::Applied {
                handler.on_property_changed(ctx)?;
            }
            Ok(outcome)
        })?;
        if let PropertyOutcome::Reverted { reason } = &outcome {
            let event = SegmentEvent::Warning(reason.clone());
            observer.on_segment_event(self.clock.current_tick, segment, &event);
        }
        Ok(outcome)
    }

    /// Report a sensor edge directly, as a host without a plant would.
    pub fn sensor_edge(&mut self, segment: SegmentId, sensor: usize, edge: Edge) -> SimResult<()> {
        self.check_segment(segment)?;
        if self.segments[segment.index()].handler.rig().sensor(sensor).is_none() {
            return Err(SimError::Config(format!("{segment} has no sensor {sensor}")));
        }
        self.apply_edges(vec![SensorEdge { segment, sensor, edge }]);
        Ok(())
    }

    pub fn segment_id(&self, name: &str) -> Option<SegmentId> {
        self.segments.iter().find(|s| s.name() == name).map(|s| s.id)
    }

    pub fn segment(&self, id: SegmentId) -> Option<&Segment> {
        self.segments.get(id.index())
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn now(&self) -> Tick {
        self.clock.current_tick
    }

    /// Transfers still in progress (routines excluded).
    pub fn active_transfers(&self) -> usize {
        self.tasks.values().filter(|t| t.transfer().is_some()).count()
    }

    // ── Event loop ────────────────────────────────────────────────────────

    fn settle<O: SimObserver>(&mut self, obs: &mut O) -> SimResult<()> {
        let now = self.clock.current_tick;
        let mut steps = 0usize;
        loop {
            let edges = self.plant_edges();
            self.apply_edges(edges);
            self.scheduler.fire_timers(now);
            self.release_arrivals(now);

            if self.scheduler.has_ready() {
                while let Some(task) = self.scheduler.pop_ready() {
                    steps += 1;
                    if steps > self.config.max_steps_per_instant {
                        return Err(SimError::Stalled { tick: now, steps });
                    }
                    self.step(task, obs)?;
                }
                continue;
            }
            if !self.dispatch(obs) {
                return Ok(());
            }
        }
    }

    fn next_event(&mut self) -> Option<Tick> {
        let now = self.clock.current_tick;
        let rigs: Vec<&Rig> = self.segments.iter().map(|s| s.handler.rig()).collect();
        let view = PlantView { clock: self.clock, rigs: &rigs, loads: &self.loads };
        [
            self.scheduler.next_timer(),
            self.arrivals.next_tick(),
            self.plant.next_edge(now, &view),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    fn advance_clock<O: SimObserver>(&mut self, to: Tick, obs: &mut O) {
        self.clock.advance_to(to);
        tracing::trace!(tick = %to, "time advanced");
        obs.on_time_advance(to);
    }

    fn plant_edges(&mut self) -> Vec<SensorEdge> {
        let rigs: Vec<&Rig> = self.segments.iter().map(|s| s.handler.rig()).collect();
        let view = PlantView { clock: self.clock, rigs: &rigs, loads: &self.loads };
        self.plant.advance(self.clock.current_tick, &view)
    }

    /// Set sensor states and raise the signals of those that changed.
    fn apply_edges(&mut self, edges: Vec<SensorEdge>) {
        let mut raised = Vec::new();
        for e in edges {
            let Some(eye) = self
                .segments
                .get_mut(e.segment.index())
                .and_then(|s| s.handler.rig_mut().sensor_mut(e.sensor))
            else {
                continue;
            };
            match e.edge {
                Edge::Blocked(load) if eye.blocking_load() != Some(load) => {
                    if eye.is_blocked() {
                        raised.push(eye.clear());
                    }
                    raised.push(eye.block(load));
                }
                Edge::Cleared if eye.is_blocked() => raised.push(eye.clear()),
                _ => continue,
            }
            tracing::trace!(segment = %e.segment, sensor = eye.name(), edge = ?e.edge, "sensor edge");
        }
        for signal in raised {
            self.scheduler.raise(signal);
        }
    }

    fn release_arrivals(&mut self, now: Tick) {
        for a in self.arrivals.drain_through(now) {
            let load = self.loads.spawn(a.length, a.width);
            if let Some(seg) = self.segments.get_mut(a.segment.index()) {
                seg.queue.push_back(Pending { load, rx: None, sender: None });
            }
        }
    }

    /// One dispatch-in sweep.  Returns `true` if any load was admitted.
    fn dispatch<O: SimObserver>(&mut self, obs: &mut O) -> bool {
        let mut admitted = false;
        for index in 0..self.segments.len() {
            let segment = SegmentId(index as u32);
            let seg = &self.segments[index];
            if seg.queue.is_empty() || !seg.handler.ready_for_incoming() || self.is_receiving(segment) {
                continue;
            }
            if let Some(pending) = self.segments[index].queue.pop_front() {
                self.admit(segment, pending, obs);
                admitted = true;
            }
        }
        admitted
    }

    fn admit<O: SimObserver>(&mut self, segment: SegmentId, pending: Pending, obs: &mut O) {
        let now = self.clock.current_tick;
        let id = self.new_task_id();
        tracing::debug!(%segment, load = %pending.load, task = %id, "load admitted for transfer");

        if pending.sender.is_none() {
            self.plant.place(pending.load, segment);
            obs.on_load_arrived(now, segment, pending.load);
        }
        self.tasks.insert(id, Task {
            segment,
            cursor: Cursor::default(),
            body: Body::Transfer(TransferTask {
                transfer: Transfer::new(pending.load, pending.rx),
                phase:    TransferPhase::RxBeforeTransfer,
                link:     None,
                sender:   pending.sender,
                receiver: None,
                hold:     Hold::Running,
            }),
        });
        self.enter(id, TransferPhase::RxBeforeTransfer, obs);

        if let Some(up) = pending.sender {
            if let Some(tt) = self.tasks.get_mut(&up).and_then(Task::transfer_mut) {
                tt.receiver = Some(id);
            }
            self.enter(up, TransferPhase::TxBeforeTransfer, obs);
        }
    }

    // ── Task execution ────────────────────────────────────────────────────

    fn step<O: SimObserver>(&mut self, id: TaskId, obs: &mut O) -> SimResult<()> {
        let Some(mut task) = self.tasks.remove(&id) else {
            return Ok(());
        };
        let segment = task.segment;
        let receiving = self.is_receiving(segment);
        let peer = task.transfer().and_then(|tt| tt.link).and_then(|l| self.peer(l));

        let Task { cursor, body, .. } = &mut task;
        let result = self.with_handler(segment, receiving, peer, obs, |h, ctx| match body {
            Body::Transfer(tt) => h.resume(tt.phase, &mut tt.transfer, cursor, ctx),
            Body::Routine(r) => h.resume_routine(r, cursor, ctx),
        });
        self.tasks.insert(id, task);

        match result? {
            Step::Wait(wait) => self.scheduler.suspend(id, &wait, self.clock.current_tick),
            Step::Done => self.phase_done(id, obs)?,
        }
        Ok(())
    }

    /// Run `f` against a segment handler with a fresh context, then apply the
    /// effects it queued and report motor and gate changes.
    fn with_handler<O, T>(
        &mut self,
        segment:   SegmentId,
        receiving: bool,
        peer:      Option<Peer>,
        obs:       &mut O,
        f:         impl FnOnce(&mut dyn TransferPhaseHandler, &mut PhaseContext<'_>) -> CvResult<T>,
    ) -> SimResult<T>
    where
        O: SimObserver,
    {
        let now = self.clock.current_tick;
        self.check_segment(segment)?;
        let handler = self.segments[segment.index()].handler.as_mut();
        let motor_before = handler.rig().any_motor_on();
        let gate_before = handler.ready_for_incoming();

        let (result, effects) = {
            let mut ctx = PhaseContext::new(segment, now, self.clock, &mut self.loads)
                .with_receiving(receiving)
                .with_peer(peer)
                .with_positions(self.plant.positions());
            let result = f(&mut *handler, &mut ctx);
            (result, ctx.take_effects())
        };

        let motor_after = handler.rig().any_motor_on();
        let gate_after = handler.ready_for_incoming();
        if motor_after != motor_before {
            obs.on_motor(now, segment, motor_after);
        }
        if gate_after != gate_before {
            obs.on_gate(now, segment, gate_after);
        }
        self.apply_effects(segment, effects, obs);
        result.map_err(|source| SimError::Segment {
            segment: self.segments[segment.index()].name().to_owned(),
            source,
        })
    }

    fn apply_effects<O: SimObserver>(&mut self, segment: SegmentId, effects: Vec<Effect>, obs: &mut O) {
        let now = self.clock.current_tick;
        for effect in effects {
            match effect {
                Effect::Raise(signal) => {
                    self.scheduler.raise(signal);
                }
                Effect::DispatchIn => {
                    tracing::debug!(%segment, "dispatch-in requested");
                    obs.on_dispatch_request(now, segment);
                }
                Effect::Spawn(routine) => {
                    let id = self.new_task_id();
                    tracing::debug!(%segment, task = %id, routine = routine.name(), "routine started");
                    self.tasks.insert(id, Task {
                        segment,
                        cursor: Cursor::default(),
                        body: Body::Routine(routine),
                    });
                    self.scheduler.make_ready(id);
                }
                Effect::Event(event) => obs.on_segment_event(now, segment, &event),
            }
        }
    }

    /// A phase body (or routine) returned `Done`: move the task on.
    fn phase_done<O: SimObserver>(&mut self, id: TaskId, obs: &mut O) -> SimResult<()> {
        use TransferPhase::*;

        let Some(task) = self.tasks.get(&id) else {
            return Ok(());
        };
        let Some(tt) = task.transfer() else {
            tracing::debug!(segment = %task.segment, task = %id, "routine finished");
            self.tasks.remove(&id);
            return Ok(());
        };
        let (phase, sender, receiver) = (tt.phase, tt.sender, tt.receiver);

        match phase {
            RxBeforeTransfer => match sender {
                Some(up) if self.hold(up) == Some(Hold::Barrier) => self.handoff(id, up, obs),
                Some(_) => self.set_hold(id, Hold::Barrier),
                None => self.enter(id, RxTransfer, obs),
            },
            RxTransfer => {
                self.enter(id, RxTransferComplete, obs);
                if let Some(up) = sender {
                    if self.hold(up) == Some(Hold::Landing) {
                        self.enter(up, TxTransferComplete, obs);
                    }
                }
            }
            RxTransferComplete => self.enter(id, Process, obs),
            Process => self.route(id, obs)?,
            TxBeforeTransfer => match receiver {
                Some(down) if self.hold(down) == Some(Hold::Barrier) => self.handoff(down, id, obs),
                Some(_) => self.set_hold(id, Hold::Barrier),
                None => self.enter(id, TxTransfer, obs),
            },
            TxTransfer => match receiver {
                Some(down) if self.has_landed(down) => self.enter(id, TxTransferComplete, obs),
                Some(_) => self.set_hold(id, Hold::Landing),
                None => {
                    self.consume(id, obs);
                    self.enter(id, TxTransferComplete, obs);
                }
            },
            TxTransferComplete => self.enter(id, TxAfterTransfer, obs),
            TxAfterTransfer => self.enter(id, Done, obs),
            Done => {
                self.tasks.remove(&id);
            }
        }
        Ok(())
    }

    /// Move a transfer task into `phase` and make it ready.  Entering `Done`
    /// retires the task.
    fn enter<O: SimObserver>(&mut self, id: TaskId, phase: TransferPhase, obs: &mut O) {
        let now = self.clock.current_tick;
        let Some(task) = self.tasks.get_mut(&id) else {
            return;
        };
        let segment = task.segment;
        task.cursor.reset();
        let Some(tt) = task.transfer_mut() else {
            return;
        };
        tt.phase = phase;
        tt.hold = Hold::Running;
        let load = tt.transfer.load;
        tracing::debug!(%segment, %load, %phase, "phase entered");
        obs.on_phase(now, segment, load, phase);

        if phase == TransferPhase::Done {
            self.tasks.remove(&id);
        } else {
            self.scheduler.make_ready(id);
        }
    }

    /// Both sides are prepared: the load changes segment, the receiver starts
    /// `RxTransfer` and the sender `TxTransfer`.
    fn handoff<O: SimObserver>(&mut self, down: TaskId, up: TaskId, obs: &mut O) {
        let Some(task) = self.tasks.get(&down) else {
            return;
        };
        let to = task.segment;
        if let Some(load) = task.transfer().map(|tt| tt.transfer.load) {
            self.plant.remove(load);
            self.plant.place(load, to);
            tracing::debug!(%load, %to, "handoff");
        }
        self.enter(down, TransferPhase::RxTransfer, obs);
        self.enter(up, TransferPhase::TxTransfer, obs);
    }

    /// Ask the router for an exit.  With one, the load queues at the
    /// receiver and the task parks until admitted; without, the segment is
    /// a sink and the task carries straight on.
    fn route<O: SimObserver>(&mut self, id: TaskId, obs: &mut O) -> SimResult<()> {
        let Some((segment, load)) = self
            .tasks
            .get(&id)
            .and_then(|t| t.transfer().map(|tt| (t.segment, tt.transfer.load)))
        else {
            return Ok(());
        };

        let outgoing = &self.segments[segment.index()].outgoing;
        let candidates: Vec<&Link> = outgoing.iter().filter_map(|&i| self.links.get(i)).collect();
        let load_ref = self.loads.get(load).map_err(|source| SimError::Segment {
            segment: self.segments[segment.index()].name().to_owned(),
            source,
        })?;
        let choice = self
            .router
            .route(segment, load_ref, &candidates)
            .and_then(|i| outgoing.get(i).copied());

        let Some(link_index) = choice else {
            tracing::debug!(%segment, %load, "no exit, consumed at this segment");
            self.enter(id, TransferPhase::TxBeforeTransfer, obs);
            return Ok(());
        };
        let link = self.links[link_index].clone();

        let Some(tt) = self.tasks.get_mut(&id).and_then(Task::transfer_mut) else {
            return Ok(());
        };
        tt.link = Some(link_index);
        tt.transfer.tx = Some(link.tx.clone());
        tt.hold = Hold::Admission;
        let transfer = tt.transfer.clone();

        let receiving = self.is_receiving(segment);
        let peer = self.peer(link_index);
        self.with_handler(segment, receiving, peer, obs, |h, ctx| h.on_transfer_created(&transfer, ctx))?;

        tracing::debug!(%load, from = %segment, to = %link.to, "routed");
        self.segments[link.to.index()].queue.push_back(Pending {
            load,
            rx: Some(link.rx),
            sender: Some(id),
        });
        Ok(())
    }

    /// The load leaves the line at a sink.
    fn consume<O: SimObserver>(&mut self, id: TaskId, obs: &mut O) {
        let Some((segment, load)) = self
            .tasks
            .get(&id)
            .and_then(|t| t.transfer().map(|tt| (t.segment, tt.transfer.load)))
        else {
            return;
        };
        self.plant.remove(load);
        tracing::debug!(%segment, %load, "load consumed");
        obs.on_load_consumed(self.clock.current_tick, segment, load);
    }

    // ── Helpers ───────────────────────────────────────────────────────────

    fn new_task_id(&mut self) -> TaskId {
        let id = TaskId(self.next_task);
        self.next_task += 1;
        id
    }

    fn check_segment(&self, segment: SegmentId) -> SimResult<()> {
        if segment.index() < self.segments.len() {
            Ok(())
        } else {
            Err(SimError::UnknownSegment(segment.to_string()))
        }
    }

    /// `true` if a transfer on `segment` is in `RxBeforeTransfer` or
    /// `RxTransfer`.
    fn is_receiving(&self, segment: SegmentId) -> bool {
        self.tasks.values().any(|t| {
            t.segment == segment && t.transfer().is_some_and(|tt| tt.phase.is_receiving())
        })
    }

    /// The receiver of `link` as the sender sees it.
    fn peer(&self, link: usize) -> Option<Peer> {
        let link = self.links.get(link)?;
        let down = &self.segments.get(link.to.index())?.handler;
        Some(Peer {
            intake_speed:    down.intake_speed(Some(&link.rx)),
            supports_trains: down.supports_trains(),
        })
    }

    fn hold(&self, id: TaskId) -> Option<Hold> {
        self.tasks.get(&id).and_then(Task::transfer).map(|tt| tt.hold)
    }

    fn set_hold(&mut self, id: TaskId, hold: Hold) {
        if let Some(tt) = self.tasks.get_mut(&id).and_then(Task::transfer_mut) {
            tt.hold = hold;
        }
    }

    /// The receiving task has finished `RxTransfer` (or is gone).
    fn has_landed(&self, down: TaskId) -> bool {
        self.tasks
            .get(&down)
            .and_then(Task::transfer)
            .is_none_or(|tt| tt.phase > TransferPhase::RxTransfer)
    }
}
