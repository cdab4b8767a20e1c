//! Unit tests for cv-core primitives.

#[cfg(test)]
mod ids {
    use crate::{LoadId, SegmentId, SignalId, TaskId};

    #[test]
    fn index_roundtrip() {
        let id = SegmentId(42);
        assert_eq!(id.index(), 42);
        assert_eq!(SegmentId::try_from(42usize).unwrap(), id);
    }

    #[test]
    fn invalid_sentinels_are_max() {
        assert_eq!(LoadId::INVALID.0, u32::MAX);
        assert_eq!(TaskId::INVALID.0, u64::MAX);
        assert_eq!(SignalId::default(), SignalId::INVALID);
    }

    #[test]
    fn display() {
        assert_eq!(LoadId(7).to_string(), "LoadId(7)");
    }
}

#[cfg(test)]
mod time {
    use rstest::rstest;

    use crate::{SimClock, SimConfig, Tick};

    #[test]
    fn tick_arithmetic_saturates() {
        assert_eq!(Tick(10) + 5, Tick(15));
        assert_eq!(Tick(15) - Tick(10), 5);
        assert_eq!(Tick(10) - Tick(15), 0);
        assert_eq!(Tick::MAX.offset(1), Tick::MAX);
    }

    #[rstest]
    #[case(0.875, 875)]
    #[case(10.0, 10_000)]
    #[case(0.0001, 0)]
    #[case(0.0005, 1)]
    #[case(-2.0, 0)]
    #[case(f64::NAN, 0)]
    fn secs_to_ticks(#[case] secs: f64, #[case] ticks: u64) {
        assert_eq!(SimClock::new(1_000).ticks_for_secs(secs), ticks);
    }

    #[test]
    fn clock_never_runs_backwards() {
        let mut clock = SimClock::new(1_000);
        clock.advance_to(Tick(500));
        clock.advance_to(Tick(100));
        assert_eq!(clock.current_tick, Tick(500));
        assert!((clock.elapsed_secs() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn zero_resolution_is_clamped() {
        assert_eq!(SimClock::new(0).ticks_per_sec, 1);
    }

    #[test]
    fn end_tick_defaults_to_idle() {
        assert_eq!(SimConfig::default().end_tick(), Tick::MAX);
        let cfg = SimConfig { end_secs: Some(60.0), ..SimConfig::default() };
        assert_eq!(cfg.end_tick(), Tick(60_000));
    }
}

#[cfg(test)]
mod kinematics {
    use proptest::prelude::*;
    use rstest::rstest;

    use crate::{CvError, SpeedProfile, mid_stop_wait, place_end_sensor, stop_distance, stop_time};

    #[test]
    fn five_metre_standard_conveyor() {
        let p = SpeedProfile::STANDARD;
        assert!((stop_time(p.max, p.dec, 0.0) - 0.875).abs() < 1e-12);
        assert!((stop_distance(p.max, p.dec) - 0.153_125).abs() < 1e-12);

        let placed = place_end_sensor(5.0, &p, 0.0).unwrap();
        assert!((placed.position - 4.846_875).abs() < 1e-12);
        assert!(!placed.tight);
    }

    #[rstest]
    #[case("0.2 m/s", 0.2)]
    #[case("0.35 m/s", 0.35)]
    fn named_performances(#[case] name: &str, #[case] max: f64) {
        let p = SpeedProfile::from_performance(name).unwrap();
        assert_eq!(p.max, max);
        assert_eq!(p.acc, 0.4);
        assert_eq!(p.dec, 0.4);
    }

    #[test]
    fn unknown_performance_is_none() {
        assert!(SpeedProfile::from_performance("1 m/s").is_none());
    }

    #[test]
    fn stop_time_to_partial_speed() {
        // Slowing 0.35 → 0.2 at 0.4 m/s² takes 0.375 s.
        assert!((SpeedProfile::STANDARD.stop_time(0.2) - 0.375).abs() < 1e-12);
    }

    #[test]
    fn tight_sensor_is_flagged_not_rejected() {
        let placed = place_end_sensor(0.5, &SpeedProfile::STANDARD, 0.0).unwrap();
        assert!(placed.tight);
        assert!(placed.position > 0.0);
    }

    #[test]
    fn negative_sensor_position_is_config_error() {
        let err = place_end_sensor(0.1, &SpeedProfile::STANDARD, 0.0).unwrap_err();
        assert!(matches!(err, CvError::Config(_)));

        let err = place_end_sensor(5.0, &SpeedProfile::STANDARD, 4.9).unwrap_err();
        assert!(matches!(err, CvError::Config(_)));
    }

    #[test]
    fn zero_deceleration_is_config_error() {
        let p = SpeedProfile { dec: 0.0, ..SpeedProfile::STANDARD };
        assert!(matches!(place_end_sensor(5.0, &p, 0.0), Err(CvError::Config(_))));
        assert!(!p.is_valid());
    }

    #[test]
    fn mid_stop_wait_for_1200mm_pallet() {
        // (0.6 − 0.153125) / 0.35
        let w = mid_stop_wait(1.2, 0.35, 0.4);
        assert!((w - 0.446_875 / 0.35).abs() < 1e-12);
        assert!(mid_stop_wait(0.2, 0.35, 0.4) < 0.0);
    }

    proptest! {
        #[test]
        fn placement_round_trip(
            length in 1.0f64..50.0,
            v_max in 0.05f64..2.0,
            dec in 0.1f64..3.0,
            offset in 0.0f64..0.5,
        ) {
            let p = SpeedProfile { max: v_max, acc: 0.4, dec };
            match place_end_sensor(length, &p, offset) {
                Ok(placed) => {
                    let sd = length - placed.position - offset;
                    prop_assert!((sd - stop_distance(v_max, dec)).abs() < 1e-9);
                    prop_assert!(placed.position >= 0.0);
                }
                Err(_) => prop_assert!(length - stop_distance(v_max, dec) - offset < 0.0),
            }
        }
    }
}

#[cfg(test)]
mod loads {
    use crate::{CvError, LoadId, LoadStore, TrainTag};

    #[test]
    fn spawn_assigns_dense_ids() {
        let mut store = LoadStore::new();
        let a = store.spawn(1.2, 0.8);
        let b = store.spawn(1.2, 1.0);
        assert_eq!((a, b), (LoadId(0), LoadId(1)));
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(b).unwrap().width, 1.0);
    }

    #[test]
    fn missing_load_errors() {
        let store = LoadStore::new();
        assert!(matches!(store.get(LoadId(3)), Err(CvError::LoadNotFound(LoadId(3)))));
    }

    #[test]
    fn last_of_incomplete_train_forces_release() {
        assert!(TrainTag { size: 2, complete: false, index: 2 }.forces_release());
        assert!(!TrainTag { size: 2, complete: false, index: 1 }.forces_release());
        assert!(!TrainTag { size: 3, complete: true, index: 3 }.forces_release());
    }
}

#[cfg(test)]
mod property {
    use crate::{CvError, PropertyValue};

    #[test]
    fn int_widens_to_float() {
        assert_eq!(PropertyValue::Int(3).as_float("length").unwrap(), 3.0);
    }

    #[test]
    fn wrong_type_names_the_property() {
        let err = PropertyValue::from("x").as_int("train_capacity").unwrap_err();
        match err {
            CvError::PropertyType { name, .. } => assert_eq!(name, "train_capacity"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
