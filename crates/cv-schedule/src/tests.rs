//! Unit tests for cv-schedule.

use cv_core::{SignalId, TaskId, Tick};

use crate::{Scheduler, SignalBoard, TickQueue, Wait};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn drain(s: &mut Scheduler) -> Vec<TaskId> {
    std::iter::from_fn(|| s.pop_ready()).collect()
}

// ── TickQueue ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tick_queue {
    use super::*;

    #[test]
    fn push_and_drain() {
        let mut q = TickQueue::new();
        q.push(Tick(5), 'a');
        q.push(Tick(5), 'b');
        q.push(Tick(10), 'c');
        assert_eq!(q.len(), 3);
        assert_eq!(q.tick_count(), 2);
        assert_eq!(q.next_tick(), Some(Tick(5)));

        assert_eq!(q.drain_tick(Tick(5)), Some(vec!['a', 'b']));
        assert_eq!(q.len(), 1);
        assert_eq!(q.drain_tick(Tick(5)), None);
    }

    #[test]
    fn drain_through_is_ordered_and_inclusive() {
        let mut q = TickQueue::new();
        q.push(Tick(7), 3);
        q.push(Tick(2), 1);
        q.push(Tick(5), 2);
        q.push(Tick(8), 4);
        assert_eq!(q.drain_through(Tick(7)), vec![1, 2, 3]);
        assert_eq!(q.next_tick(), Some(Tick(8)));
    }

    #[test]
    fn empty_queue() {
        let q: TickQueue<u8> = TickQueue::new();
        assert!(q.is_empty());
        assert!(q.next_tick().is_none());
        assert!(q.peek_next().is_none());
    }
}

// ── Scheduler ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod scheduler {
    use super::*;

    const A: TaskId = TaskId(1);
    const B: TaskId = TaskId(2);
    const S: SignalId = SignalId(0);

    #[test]
    fn signal_wakes_waiters_in_suspend_order() {
        let mut s = Scheduler::new();
        s.suspend(B, &Wait::Signal(S), Tick(0));
        s.suspend(A, &Wait::Signal(S), Tick(0));
        assert!(!s.has_ready());
        assert_eq!(s.raise(S), 2);
        assert_eq!(drain(&mut s), vec![B, A]);
    }

    #[test]
    fn raise_without_waiters_is_lost() {
        let mut s = Scheduler::new();
        assert_eq!(s.raise(S), 0);
        s.suspend(A, &Wait::Signal(S), Tick(0));
        assert!(s.is_suspended(A));
    }

    #[test]
    fn timer_fires_at_due_tick() {
        let mut s = Scheduler::new();
        s.suspend(A, &Wait::Ticks(875), Tick(100));
        assert_eq!(s.next_timer(), Some(Tick(975)));
        assert_eq!(s.fire_timers(Tick(974)), 0);
        assert_eq!(s.fire_timers(Tick(975)), 1);
        assert_eq!(drain(&mut s), vec![A]);
    }

    #[test]
    fn zero_ticks_is_immediately_ready() {
        let mut s = Scheduler::new();
        s.suspend(A, &Wait::Ticks(0), Tick(3));
        assert_eq!(drain(&mut s), vec![A]);
        assert_eq!(s.next_timer(), None);
    }

    #[test]
    fn any_signal_first_discards_timer() {
        let mut s = Scheduler::new();
        s.suspend(A, &Wait::signal_or_ticks(S, 5_000), Tick(0));
        assert_eq!(s.raise(S), 1);
        assert_eq!(drain(&mut s), vec![A]);
        // The losing timer is stale: no wake, and next_timer prunes it.
        assert_eq!(s.next_timer(), None);
        assert_eq!(s.fire_timers(Tick(5_000)), 0);
    }

    #[test]
    fn any_timer_first_discards_signal() {
        let mut s = Scheduler::new();
        s.suspend(A, &Wait::signal_or_ticks(S, 10), Tick(0));
        assert_eq!(s.fire_timers(Tick(10)), 1);
        assert_eq!(drain(&mut s), vec![A]);
        assert_eq!(s.raise(S), 0);
    }

    #[test]
    fn resuspension_invalidates_old_timer() {
        let mut s = Scheduler::new();
        s.suspend(A, &Wait::Ticks(100), Tick(0));
        s.suspend(A, &Wait::Ticks(50), Tick(0));
        assert_eq!(s.fire_timers(Tick(50)), 1);
        assert_eq!(drain(&mut s), vec![A]);
        assert_eq!(s.fire_timers(Tick(100)), 0);
    }

    #[test]
    fn cancel_forgets_task() {
        let mut s = Scheduler::new();
        s.suspend(A, &Wait::Signal(S), Tick(0));
        s.cancel(A);
        assert!(!s.is_suspended(A));
        assert_eq!(s.raise(S), 0);
    }

    #[test]
    fn make_ready_overrides_suspension() {
        let mut s = Scheduler::new();
        s.suspend(A, &Wait::Ticks(10), Tick(0));
        s.make_ready(A);
        assert_eq!(drain(&mut s), vec![A]);
        assert_eq!(s.fire_timers(Tick(10)), 0);
        assert_eq!(s.suspended_count(), 0);
    }

    #[test]
    fn empty_any_is_immediate() {
        let mut s = Scheduler::new();
        s.suspend(A, &Wait::Any(vec![]), Tick(0));
        assert_eq!(drain(&mut s), vec![A]);
    }

    proptest::proptest! {
        #[test]
        fn every_task_wakes_exactly_once(delays in proptest::collection::vec(0u64..50, 1..20)) {
            let mut s = Scheduler::new();
            for (i, d) in delays.iter().enumerate() {
                s.suspend(TaskId(i as u64), &Wait::signal_or_ticks(S, *d), Tick(0));
            }
            s.raise(S);
            s.fire_timers(Tick(100));
            let mut woken = drain(&mut s);
            woken.sort();
            let expected: Vec<TaskId> = (0..delays.len() as u64).map(TaskId).collect();
            proptest::prop_assert_eq!(woken, expected);
        }
    }
}

// ── SignalBoard ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod signals {
    use super::*;

    #[test]
    fn allocate_is_dense_and_named() {
        let mut b = SignalBoard::new();
        let x = b.allocate("infeed.end.blocked");
        let y = b.allocate("infeed.arrival");
        assert_eq!((x, y), (SignalId(0), SignalId(1)));
        assert_eq!(b.name(y), Some("infeed.arrival"));
        assert_eq!(b.len(), 2);
    }
}

// ── Loader ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod loader {
    use std::io::Cursor;

    use crate::{ScheduleError, load_arrivals_reader};

    #[test]
    fn rows_sorted_by_time() {
        let csv = "time_secs,segment,length,width\n6.0,infeed,1.2,0.8\n0.0,infeed,1.2,0.8\n3.0,infeed,1.2,1.0\n";
        let rows = load_arrivals_reader(Cursor::new(csv)).unwrap();
        let times: Vec<f64> = rows.iter().map(|r| r.time_secs).collect();
        assert_eq!(times, vec![0.0, 3.0, 6.0]);
        assert_eq!(rows[1].width, 1.0);
    }

    #[test]
    fn negative_time_rejected() {
        let csv = "time_secs,segment,length,width\n-1.0,infeed,1.2,0.8\n";
        assert!(matches!(load_arrivals_reader(Cursor::new(csv)), Err(ScheduleError::Parse(_))));
    }

    #[test]
    fn zero_length_rejected() {
        let csv = "time_secs,segment,length,width\n1.0,infeed,0.0,0.8\n";
        assert!(matches!(load_arrivals_reader(Cursor::new(csv)), Err(ScheduleError::Parse(_))));
    }

    #[test]
    fn malformed_row_rejected() {
        let csv = "time_secs,segment,length,width\nsoon,infeed,1.2,0.8\n";
        assert!(matches!(load_arrivals_reader(Cursor::new(csv)), Err(ScheduleError::Parse(_))));
    }
}
