//! Integration tests for the event loop, handoff, dispatch-in and layouts.

#[cfg(test)]
mod helpers {
    use cv_core::{LoadId, SegmentId, Tick};
    use cv_transfer::{ConveyorConfig, SegmentConfig, SegmentEvent, TrainSettings, TransferPhase};

    use crate::SimObserver;

    pub fn conveyor(name: &str) -> ConveyorConfig {
        ConveyorConfig { name: name.into(), ..ConveyorConfig::default() }
    }

    pub fn train_conveyor(name: &str, capacity: u32, wait: f64) -> SegmentConfig {
        let mut c = conveyor(name);
        c.train = TrainSettings { create_train: true, capacity, max_waiting_time: wait };
        SegmentConfig::Conveyor(c)
    }

    pub fn plain_conveyor(name: &str) -> SegmentConfig {
        SegmentConfig::Conveyor(conveyor(name))
    }

    #[derive(Clone, Debug, PartialEq)]
    pub struct Released {
        pub tick:     Tick,
        pub size:     u32,
        pub complete: bool,
        pub forced:   bool,
        pub loads:    Vec<LoadId>,
    }

    #[derive(Default)]
    pub struct Recorder {
        pub trains:   Vec<Released>,
        pub consumed: Vec<(Tick, SegmentId, LoadId)>,
        pub arrived:  Vec<(Tick, SegmentId, LoadId)>,
        pub phases:   Vec<(SegmentId, LoadId, TransferPhase)>,
        pub warnings: Vec<String>,
        pub gaps:     Vec<f64>,
        pub ended:    Option<Tick>,
    }

    impl SimObserver for Recorder {
        fn on_phase(&mut self, _t: Tick, segment: SegmentId, load: LoadId, phase: TransferPhase) {
            self.phases.push((segment, load, phase));
        }

        fn on_segment_event(&mut self, tick: Tick, _s: SegmentId, event: &SegmentEvent) {
            match event {
                SegmentEvent::TrainReleased { size, complete, forced, loads } => {
                    self.trains.push(Released {
                        tick,
                        size:     *size,
                        complete: *complete,
                        forced:   *forced,
                        loads:    loads.clone(),
                    });
                }
                SegmentEvent::Warning(reason) => self.warnings.push(reason.clone()),
                SegmentEvent::TrainGap { distance } => self.gaps.push(*distance),
                _ => {}
            }
        }

        fn on_load_arrived(&mut self, tick: Tick, segment: SegmentId, load: LoadId) {
            self.arrived.push((tick, segment, load));
        }

        fn on_load_consumed(&mut self, tick: Tick, segment: SegmentId, load: LoadId) {
            self.consumed.push((tick, segment, load));
        }

        fn on_sim_end(&mut self, final_tick: Tick) {
            self.ended = Some(final_tick);
        }
    }
}

// ── Train formation through the engine ────────────────────────────────────────

#[cfg(test)]
mod trains {
    use cv_core::{LoadId, SegmentId, SimConfig, Tick, TrainTag};
    use cv_transfer::conveyor::START;

    use super::helpers::{Recorder, Released, train_conveyor};
    use crate::{Edge, FirstLink, NullPlant, ScriptedPlant, SimBuilder};

    const C: SegmentId = SegmentId(0);

    #[test]
    fn full_train_released_on_third_arrival() {
        let plant = ScriptedPlant::new()
            .at(Tick(0), C, START, Edge::Blocked(LoadId(0)))
            .at(Tick(3_000), C, START, Edge::Blocked(LoadId(1)))
            .at(Tick(6_000), C, START, Edge::Blocked(LoadId(2)));
        let mut sim = SimBuilder::new(SimConfig::default(), plant, FirstLink)
            .segment(train_conveyor("c", 3, 10.0))
            .build()
            .unwrap();
        for at in [0, 3_000, 6_000] {
            sim.schedule_arrival(Tick(at), C, 1.2, 0.8).unwrap();
        }

        let mut rec = Recorder::default();
        sim.run_until(Tick(7_000), &mut rec).unwrap();

        assert_eq!(rec.trains, vec![Released {
            tick:     Tick(6_000),
            size:     3,
            complete: true,
            forced:   false,
            loads:    vec![LoadId(0), LoadId(1), LoadId(2)],
        }]);
        for (i, load) in sim.loads.iter().enumerate() {
            assert_eq!(load.train, Some(TrainTag { size: 3, complete: true, index: i as u32 + 1 }));
        }
        assert!(!sim.segment(C).unwrap().handler.ready_for_incoming());
        assert_eq!(sim.now(), Tick(7_000));
    }

    #[test]
    fn lone_load_released_when_window_closes() {
        let plant = ScriptedPlant::new().at(Tick(0), C, START, Edge::Blocked(LoadId(0)));
        let mut sim = SimBuilder::new(SimConfig::default(), plant, FirstLink)
            .segment(train_conveyor("c", 3, 5.0))
            .build()
            .unwrap();
        sim.schedule_arrival(Tick(0), C, 1.2, 0.8).unwrap();

        let mut rec = Recorder::default();
        sim.run_until(Tick(4_999), &mut rec).unwrap();
        assert!(rec.trains.is_empty());

        sim.run_until(Tick(6_000), &mut rec).unwrap();
        assert_eq!(rec.trains.len(), 1);
        let train = &rec.trains[0];
        assert_eq!((train.tick, train.size, train.complete, train.forced), (Tick(5_000), 1, false, false));
        assert_eq!(
            sim.loads.get(LoadId(0)).unwrap().train,
            Some(TrainTag { size: 1, complete: false, index: 1 })
        );
    }

    #[test]
    fn tail_of_incomplete_train_forces_release() {
        let mut sim = SimBuilder::new(SimConfig::default(), NullPlant, FirstLink)
            .segment(train_conveyor("c", 3, 10.0))
            .build()
            .unwrap();
        let mut rec = Recorder::default();

        let first = sim.inject(C, 1.2, 0.8).unwrap();
        sim.sensor_edge(C, START, Edge::Blocked(first)).unwrap();
        sim.run_until(Tick(1_000), &mut rec).unwrap();
        assert!(rec.trains.is_empty());

        let tail = sim.inject(C, 1.2, 0.8).unwrap();
        sim.loads.get_mut(tail).unwrap().train = Some(TrainTag { size: 2, complete: false, index: 2 });
        sim.sensor_edge(C, START, Edge::Blocked(tail)).unwrap();
        sim.run_until(Tick(1_000), &mut rec).unwrap();

        assert_eq!(rec.trains, vec![Released {
            tick:     Tick(1_000),
            size:     2,
            complete: false,
            forced:   true,
            loads:    vec![first, tail],
        }]);
    }

    #[test]
    fn lowered_capacity_releases_what_is_held() {
        let mut sim = SimBuilder::new(SimConfig::default(), NullPlant, FirstLink)
            .segment(train_conveyor("c", 3, 10.0))
            .build()
            .unwrap();
        let mut rec = Recorder::default();

        let first = sim.inject(C, 1.2, 0.8).unwrap();
        sim.sensor_edge(C, START, Edge::Blocked(first)).unwrap();
        sim.run_until(Tick(1_000), &mut rec).unwrap();
        assert!(sim.segment(C).unwrap().handler.ready_for_incoming());

        let outcome = sim.set_property(C, "train_capacity", &1i64.into(), &mut rec).unwrap();
        assert_eq!(outcome, cv_core::PropertyOutcome::Applied);
        let handler = &sim.segment(C).unwrap().handler;
        assert!(!handler.ready_for_incoming());
        assert_eq!(handler.capacity(), 1);

        // The held load goes now, not when the 10 s window would have closed.
        sim.run_until(Tick(1_000), &mut rec).unwrap();
        assert_eq!(rec.trains, vec![Released {
            tick:     Tick(1_000),
            size:     1,
            complete: true,
            forced:   false,
            loads:    vec![first],
        }]);

        let second = sim.inject(C, 1.2, 0.8).unwrap();
        sim.run_until(Tick(5_000), &mut rec).unwrap();
        let segment = sim.segment(C).unwrap();
        assert!(segment.handler.occupancy() <= segment.handler.capacity());
        assert_eq!(segment.queued(), 1);
        assert_eq!(sim.loads.get(second).unwrap().train, None);
    }

    #[test]
    fn switching_trains_off_lets_the_held_load_through() {
        let mut sim = SimBuilder::new(SimConfig::default(), NullPlant, FirstLink)
            .segment(train_conveyor("c", 3, 10.0))
            .build()
            .unwrap();
        let mut rec = Recorder::default();

        let first = sim.inject(C, 1.2, 0.8).unwrap();
        sim.sensor_edge(C, START, Edge::Blocked(first)).unwrap();
        sim.run_until(Tick(1_000), &mut rec).unwrap();

        sim.set_property(C, "create_train", &false.into(), &mut rec).unwrap();
        assert!(!sim.segment(C).unwrap().handler.ready_for_incoming());

        sim.run_until(Tick(1_000), &mut rec).unwrap();
        assert!(rec.phases.contains(&(C, first, cv_transfer::TransferPhase::Process)));
        assert!(rec.trains.is_empty());
    }

    #[test]
    fn reverted_capacity_is_reported_as_warning() {
        let mut sim = SimBuilder::new(SimConfig::default(), NullPlant, FirstLink)
            .segment(train_conveyor("c", 3, 10.0))
            .build()
            .unwrap();
        let mut rec = Recorder::default();

        let outcome = sim.set_property(C, "train_capacity", &0i64.into(), &mut rec).unwrap();
        assert!(matches!(outcome, cv_core::PropertyOutcome::Reverted { .. }));
        assert_eq!(rec.warnings.len(), 1);
        assert_eq!(sim.segment(C).unwrap().handler.capacity(), 3);
    }
}

// ── Handoff between segments ──────────────────────────────────────────────────

#[cfg(test)]
mod line {
    use cv_core::{LoadId, SegmentId, SimConfig, Tick};
    use cv_transfer::TransferPhase;

    use super::helpers::{Recorder, conveyor, plain_conveyor, train_conveyor};
    use crate::{BeltPlant, FirstLink, LinkConfig, SimBuilder};

    const C1: SegmentId = SegmentId(0);
    const C2: SegmentId = SegmentId(1);

    #[test]
    fn loads_cross_two_conveyors_through_every_phase() {
        let mut sim = SimBuilder::new(SimConfig::default(), BeltPlant::new(), FirstLink)
            .segment(plain_conveyor("c1"))
            .segment(plain_conveyor("c2"))
            .link(LinkConfig::new("c1", "c2"))
            .build()
            .unwrap();
        let load = sim.inject(C1, 1.2, 0.8).unwrap();

        let mut rec = Recorder::default();
        sim.run(&mut rec).unwrap();

        assert_eq!(rec.consumed.len(), 1);
        assert_eq!((rec.consumed[0].1, rec.consumed[0].2), (C2, load));
        assert_eq!(rec.arrived, vec![(Tick(0), C1, load)]);
        for seg in [C1, C2] {
            let seen: Vec<TransferPhase> = rec
                .phases
                .iter()
                .filter(|(s, l, _)| *s == seg && *l == load)
                .map(|(_, _, p)| *p)
                .collect();
            assert_eq!(seen, TransferPhase::ALL, "phases on {seg}");
        }
        assert_eq!(sim.active_transfers(), 0);
        assert_eq!(rec.ended, Some(sim.now()));
        assert!(sim.segments().iter().all(|s| s.handler.ready_for_incoming()));
    }

    #[test]
    fn receiver_enters_before_sender_leaves() {
        let mut sim = SimBuilder::new(SimConfig::default(), BeltPlant::new(), FirstLink)
            .segment(plain_conveyor("c1"))
            .segment(plain_conveyor("c2"))
            .link(LinkConfig::new("c1", "c2"))
            .build()
            .unwrap();
        sim.inject(C1, 1.2, 0.8).unwrap();
        let mut rec = Recorder::default();
        sim.run(&mut rec).unwrap();

        let at = |seg: SegmentId, phase: TransferPhase| {
            rec.phases.iter().position(|e| *e == (seg, LoadId(0), phase)).unwrap()
        };
        assert!(at(C2, TransferPhase::RxBeforeTransfer) < at(C1, TransferPhase::TxBeforeTransfer));
        assert!(at(C2, TransferPhase::RxTransfer) < at(C1, TransferPhase::TxTransfer));
        assert!(at(C2, TransferPhase::RxTransferComplete) < at(C1, TransferPhase::TxTransferComplete));
    }

    #[test]
    fn full_segment_never_reads_ready() {
        let mut sim = SimBuilder::new(SimConfig::default(), BeltPlant::new(), FirstLink)
            .segment(plain_conveyor("c1"))
            .segment(train_conveyor("c2", 2, 10.0))
            .link(LinkConfig::new("c1", "c2"))
            .build()
            .unwrap();
        for _ in 0..3 {
            sim.inject(C1, 1.2, 0.8).unwrap();
        }

        let mut rec = Recorder::default();
        for step in 1..=120u64 {
            sim.run_until(Tick(step * 500), &mut rec).unwrap();
            for seg in sim.segments() {
                let h = &seg.handler;
                assert!(
                    !(h.occupancy() >= h.capacity() && h.ready_for_incoming()),
                    "{} full but ready at {}",
                    seg.name(),
                    sim.now()
                );
            }
        }
        sim.run(&mut rec).unwrap();

        let order: Vec<LoadId> = rec.consumed.iter().map(|c| c.2).collect();
        assert_eq!(order, [LoadId(0), LoadId(1), LoadId(2)]);
        assert!(rec.consumed.iter().all(|c| c.1 == C2));
        assert_eq!(rec.trains.len(), 2);
        assert_eq!((rec.trains[0].size, rec.trains[0].complete), (2, true));
        assert_eq!((rec.trains[1].size, rec.trains[1].complete), (1, false));
    }

    #[test]
    fn belt_reports_gap_between_train_loads() {
        let mut c = conveyor("c");
        c.length = 5.0;
        c.train = cv_transfer::TrainSettings { create_train: true, capacity: 2, max_waiting_time: 10.0 };
        c.find_distance_between_loads = true;
        let mut sim = SimBuilder::new(SimConfig::default(), BeltPlant::new(), FirstLink)
            .segment(cv_transfer::SegmentConfig::Conveyor(c))
            .build()
            .unwrap();
        sim.inject(C1, 1.2, 0.8).unwrap();
        sim.inject(C1, 1.2, 0.8).unwrap();

        let mut rec = Recorder::default();
        sim.run(&mut rec).unwrap();

        // The second load enters as the first stops on the start sensor
        // (0.2 m in), so the two overlap by one length less 0.2 m.
        assert_eq!(rec.trains.len(), 1);
        assert_eq!(rec.gaps.len(), 1, "only the head of the train reports");
        assert!((rec.gaps[0] + 1.0).abs() < 1e-3, "{}", rec.gaps[0]);
        assert_eq!(rec.consumed.len(), 2);
    }

    #[test]
    fn gravity_buffer_fills_behind_a_slow_station() {
        use cv_core::SpeedProfile;
        use cv_transfer::{GravityConfig, JackConfig, SegmentConfig};

        let gravity = GravityConfig { name: "g".into(), positions: 3, ..GravityConfig::default() };
        let jack = JackConfig {
            name: "j".into(),
            speed: SpeedProfile { max: 0.05, acc: 0.4, dec: 0.4 },
            ..JackConfig::default()
        };
        let mut sim = SimBuilder::new(SimConfig::default(), BeltPlant::new(), FirstLink)
            .segment(SegmentConfig::Gravity(gravity))
            .segment(SegmentConfig::Jack(jack))
            .link(LinkConfig::new("g", "j"))
            .build()
            .unwrap();
        for _ in 0..5 {
            sim.inject(C1, 1.2, 0.8).unwrap();
        }

        let mut rec = Recorder::default();
        let mut most = 0;
        for step in 1..=600u64 {
            sim.run_until(Tick(step * 500), &mut rec).unwrap();
            let g = &sim.segment(C1).unwrap().handler;
            assert!(g.occupancy() <= 3);
            assert!(!(g.occupancy() == 3 && g.ready_for_incoming()), "full but ready at {}", sim.now());
            most = most.max(g.occupancy());
        }
        sim.run(&mut rec).unwrap();
        assert_eq!(most, 3, "the buffer never filled");

        // The second load is admitted once the first has cleared the entry
        // sensor: 1.44 m to the sensor plus its own 1.2 m, at 0.2 m/s.
        let second = rec.arrived.iter().find(|a| a.2 == LoadId(1)).unwrap().0;
        assert!((13_200..=13_250).contains(&second.0), "admitted at {second}");

        let order: Vec<LoadId> = rec.consumed.iter().map(|c| c.2).collect();
        assert_eq!(order, (0..5).map(LoadId).collect::<Vec<_>>());
        assert!(rec.consumed.iter().all(|c| c.1 == C2));
    }
}

// ── Engine guards and lifecycle ───────────────────────────────────────────────

#[cfg(test)]
mod engine {
    use cv_core::{CvError, SegmentId, SimConfig, Tick};
    use cv_transfer::{ConveyorConfig, SegmentConfig, conveyor::END};

    use super::helpers::{Recorder, plain_conveyor, train_conveyor};
    use crate::{Edge, FirstLink, LinkConfig, NoopObserver, NullPlant, SimBuilder, SimError};

    const C: SegmentId = SegmentId(0);

    #[test]
    fn stall_guard_stops_a_busy_instant() {
        let config = SimConfig { max_steps_per_instant: 2, ..SimConfig::default() };
        let mut sim = SimBuilder::new(config, NullPlant, FirstLink)
            .segment(plain_conveyor("c"))
            .build()
            .unwrap();
        let load = sim.inject(C, 1.2, 0.8).unwrap();
        sim.sensor_edge(C, END, Edge::Blocked(load)).unwrap();

        let err = sim.run(&mut NoopObserver).unwrap_err();
        assert!(matches!(err, SimError::Stalled { tick: Tick(0), steps: 3 }), "{err}");
    }

    #[rstest::rstest]
    #[case::zero_resolution(SimConfig { ticks_per_sec: 0, ..SimConfig::default() })]
    #[case::negative_end(SimConfig { end_secs: Some(-1.0), ..SimConfig::default() })]
    #[case::nan_end(SimConfig { end_secs: Some(f64::NAN), ..SimConfig::default() })]
    fn bad_run_settings_are_config_errors(#[case] config: SimConfig) {
        let err = SimBuilder::new(config, NullPlant, FirstLink)
            .segment(plain_conveyor("c"))
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, SimError::Config(_)), "{err}");
    }

    #[test]
    fn impossible_geometry_fails_the_build() {
        let short = ConveyorConfig { name: "short".into(), length: 0.1, ..ConveyorConfig::default() };
        let err = SimBuilder::new(SimConfig::default(), NullPlant, FirstLink)
            .segment(SegmentConfig::Conveyor(short))
            .build()
            .err()
            .unwrap();
        match err {
            SimError::Segment { segment, source: CvError::Config(_) } => assert_eq!(segment, "short"),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn duplicate_and_unknown_names_are_rejected() {
        let dup = SimBuilder::new(SimConfig::default(), NullPlant, FirstLink)
            .segment(plain_conveyor("c"))
            .segment(plain_conveyor("c"))
            .build()
            .err()
            .unwrap();
        assert!(matches!(dup, SimError::DuplicateSegment(name) if name == "c"));

        let unknown = SimBuilder::new(SimConfig::default(), NullPlant, FirstLink)
            .segment(plain_conveyor("c"))
            .link(LinkConfig::new("c", "nowhere"))
            .build()
            .err()
            .unwrap();
        assert!(matches!(unknown, SimError::UnknownSegment(name) if name == "nowhere"));

        let looped = SimBuilder::new(SimConfig::default(), NullPlant, FirstLink)
            .segment(plain_conveyor("c"))
            .link(LinkConfig::new("c", "c"))
            .build()
            .err()
            .unwrap();
        assert!(matches!(looped, SimError::Config(_)));
    }

    #[test]
    fn arrivals_name_known_segments() {
        let mut sim = SimBuilder::new(SimConfig::default(), NullPlant, FirstLink)
            .segment(plain_conveyor("infeed"))
            .build()
            .unwrap();
        let csv = "time_secs,segment,length,width\n1.5,infeed,1.2,0.8\n0.5,infeed,1.0,0.8\n";
        let records = cv_schedule::load_arrivals_reader(csv.as_bytes()).unwrap();
        assert_eq!(sim.schedule_arrivals(&records).unwrap(), 2);

        let mut rec = Recorder::default();
        sim.run_until(Tick(2_000), &mut rec).unwrap();
        assert_eq!(rec.arrived.len(), 1, "the second load waits behind the first");
        assert_eq!(rec.arrived[0].0, Tick(500));
        assert_eq!(sim.segment(C).unwrap().queued(), 1);

        let bad = [cv_schedule::ArrivalRecord {
            time_secs: 0.0,
            segment:   "outfeed".into(),
            length:    1.0,
            width:     1.0,
        }];
        assert!(matches!(sim.schedule_arrivals(&bad), Err(SimError::UnknownSegment(_))));
    }

    #[test]
    fn reset_drops_transfers_and_reopens_gates() {
        let mut sim = SimBuilder::new(SimConfig::default(), NullPlant, FirstLink)
            .segment(train_conveyor("c", 2, 10.0))
            .build()
            .unwrap();
        sim.inject(C, 1.2, 0.8).unwrap();
        sim.inject(C, 1.2, 0.8).unwrap();
        sim.run_until(Tick(100), &mut NoopObserver).unwrap();
        assert_eq!(sim.active_transfers(), 1);
        assert_eq!(sim.segment(C).unwrap().queued(), 1);

        sim.reset().unwrap();
        assert_eq!(sim.active_transfers(), 0);
        assert_eq!(sim.segment(C).unwrap().queued(), 0);
        let seg = sim.segment(C).unwrap();
        assert!(seg.handler.ready_for_incoming());
        assert_eq!(seg.handler.occupancy(), 0);
    }

    #[test]
    fn idle_line_runs_to_configured_end() {
        let config = SimConfig { end_secs: Some(2.5), ..SimConfig::default() };
        let mut sim = SimBuilder::new(config, NullPlant, FirstLink)
            .segment(plain_conveyor("c"))
            .build()
            .unwrap();
        let mut rec = Recorder::default();
        sim.run(&mut rec).unwrap();
        assert_eq!(rec.ended, Some(Tick(2_500)));
    }
}

// ── Routing ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod routing {
    use cv_core::{LoadStore, SegmentId};
    use cv_transfer::Port;

    use crate::{FirstLink, Link, RoundRobin, Router};

    fn link(to: u32) -> Link {
        Link { from: SegmentId(0), to: SegmentId(to), tx: Port::new("End"), rx: Port::new("Start") }
    }

    #[test]
    fn round_robin_cycles_per_segment() {
        let mut loads = LoadStore::new();
        let id = loads.spawn(1.0, 1.0);
        let load = loads.get(id).unwrap();
        let (a, b) = (link(1), link(2));
        let candidates = [&a, &b];

        let mut rr = RoundRobin::new();
        let picks: Vec<_> = (0..5).map(|_| rr.route(SegmentId(0), load, &candidates)).collect();
        assert_eq!(picks, [Some(0), Some(1), Some(0), Some(1), Some(0)]);
        assert_eq!(rr.route(SegmentId(3), load, &candidates), Some(0));
        assert_eq!(rr.route(SegmentId(4), load, &[]), None);
    }

    proptest::proptest! {
        #[test]
        fn round_robin_visits_every_exit_in_turn(exits in 1u32..6, picks in 1usize..20) {
            let mut loads = LoadStore::new();
            let id = loads.spawn(1.0, 1.0);
            let load = loads.get(id).unwrap();
            let links: Vec<Link> = (1..=exits).map(link).collect();
            let candidates: Vec<&Link> = links.iter().collect();

            let mut rr = RoundRobin::new();
            for i in 0..picks {
                let pick = rr.route(SegmentId(0), load, &candidates);
                proptest::prop_assert_eq!(pick, Some(i % exits as usize));
            }
        }
    }

    #[test]
    fn first_link_makes_leaf_a_sink() {
        let mut loads = LoadStore::new();
        let id = loads.spawn(1.0, 1.0);
        let load = loads.get(id).unwrap();
        let a = link(1);
        assert_eq!(FirstLink.route(SegmentId(0), load, &[&a]), Some(0));
        assert_eq!(FirstLink.route(SegmentId(0), load, &[]), None);
    }
}

// ── Plants ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod plants {
    use cv_core::{LoadStore, SegmentId, SimClock, SpeedProfile, Tick};
    use cv_equipment::{Motor, PhotoEye, Rig, SimMotor};
    use cv_schedule::SignalBoard;

    use crate::{BeltPlant, Edge, Plant, PlantView, SensorEdge};

    fn rig(signals: &mut SignalBoard) -> Rig {
        Rig::new(2.0, 1.0, SimMotor::new(SpeedProfile::STANDARD))
            .with_sensor(PhotoEye::new("c", "end", 1.0, signals))
    }

    #[test]
    fn belt_blocks_and_clears_sensor_at_motor_speed() {
        let mut signals = SignalBoard::new();
        let mut r = rig(&mut signals);
        r.motor.motor_on();
        let mut loads = LoadStore::new();
        let load = loads.spawn(0.7, 0.5);
        let clock = SimClock::default();

        let mut plant = BeltPlant::new();
        plant.place(load, SegmentId(0));
        let rigs = [&r];
        let view = PlantView { clock, rigs: &rigs, loads: &loads };

        let edges = plant.advance(Tick(0), &view);
        assert_eq!(edges, [SensorEdge { segment: SegmentId(0), sensor: 0, edge: Edge::Cleared }]);
        let blocked_at = plant.next_edge(Tick(0), &view).unwrap();
        assert_eq!(blocked_at, Tick(2_858));

        let edges = plant.advance(blocked_at, &view);
        assert_eq!(edges[0].edge, Edge::Blocked(load));

        // Rear passes the beam after another 0.7 m.
        let cleared_at = plant.next_edge(blocked_at, &view).unwrap();
        assert_eq!(cleared_at, Tick(4_858));
        assert_eq!(plant.advance(cleared_at, &view)[0].edge, Edge::Cleared);
    }

    #[test]
    fn stopped_motor_holds_loads() {
        let mut signals = SignalBoard::new();
        let r = rig(&mut signals);
        let mut loads = LoadStore::new();
        let load = loads.spawn(0.7, 0.5);
        let clock = SimClock::default();
        let mut plant = BeltPlant::new();
        plant.place(load, SegmentId(0));
        let rigs = [&r];
        let view = PlantView { clock, rigs: &rigs, loads: &loads };

        plant.advance(Tick(0), &view);
        assert_eq!(plant.next_edge(Tick(0), &view), None);
        plant.advance(Tick(10_000), &view);
        assert_eq!(plant.position(load), Some((SegmentId(0), 0.0)));
    }
}

// ── Layout files ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod layout {
    use cv_core::SegmentId;
    use cv_transfer::SegmentKind;

    use crate::{FirstLink, Layout, NullPlant, SimError};

    const LINE: &str = r#"
        [sim]
        end_secs = 60.0

        [[segment]]
        kind   = "conveyor"
        name   = "infeed"
        length = 2.5

        [segment.train]
        create_train     = true
        capacity         = 2
        max_waiting_time = 5.0

        [[segment]]
        kind      = "turntable"
        name      = "tt"
        rotate_90 = 3.0

        [[segment]]
        kind = "airlock"
        name = "lock"

        [[link]]
        from = "infeed"
        to   = "tt"

        [[link]]
        from = "tt"
        to   = "lock"
        tx   = "Right"
    "#;

    #[test]
    fn layout_builds_a_line() {
        let layout = Layout::from_toml_str(LINE).unwrap();
        assert_eq!(layout.sim.end_secs, Some(60.0));
        assert_eq!(layout.segments.len(), 3);
        assert_eq!(layout.links[0].tx, "End");
        assert_eq!(layout.links[1].rx, "Start");

        let sim = layout.into_builder(NullPlant, FirstLink).build().unwrap();
        assert_eq!(sim.segment_id("tt"), Some(SegmentId(1)));
        let kinds: Vec<SegmentKind> = sim.segments().iter().map(|s| s.handler.kind()).collect();
        assert_eq!(kinds, [SegmentKind::Conveyor, SegmentKind::Turntable, SegmentKind::Airlock]);
        assert_eq!(sim.segment(SegmentId(1)).unwrap().outgoing(), [1]);
        assert_eq!(sim.links()[1].tx.connector, "Right");
        assert!(sim.segment(SegmentId(0)).unwrap().handler.supports_trains());
    }

    #[test]
    fn unknown_kind_is_a_layout_error() {
        let err = Layout::from_toml_str("[[segment]]\nkind = \"crane\"\nname = \"x\"\n").unwrap_err();
        assert!(matches!(err, SimError::Layout(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Layout::load("/nonexistent/line.toml".as_ref()).unwrap_err();
        assert!(matches!(err, SimError::Io(_)));
    }
}
