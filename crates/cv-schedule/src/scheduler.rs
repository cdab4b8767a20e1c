//! `Scheduler` — the timed-wait scheduler driving suspended tasks.
//!
//! Tasks are identified by `TaskId`; the scheduler never sees what a task
//! does, only what it waits for.  Every suspension is stamped with a fresh
//! token.  A wake (signal raise or timer) is honoured only if the token it
//! carries is still the task's live token, so:
//!
//! - the losing branches of a `Wait::Any` are ignored,
//! - a task re-suspended since a timer was armed ignores that old timer,
//! - `cancel` simply forgets the token.

use std::collections::{HashMap, VecDeque};

use cv_core::{SignalId, TaskId, Tick};

use crate::{TickQueue, Wait};

/// Registration of one suspended task: `(task, token)`.
type Entry = (TaskId, u64);

#[derive(Debug, Default)]
pub struct Scheduler {
    timers:     TickQueue<Entry>,
    waiters:    HashMap<SignalId, Vec<Entry>>,
    /// Live token per suspended task.
    pending:    HashMap<TaskId, u64>,
    /// Tasks ready to resume, in wake order.
    ready:      VecDeque<TaskId>,
    next_token: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Suspension ────────────────────────────────────────────────────────

    /// Suspend `task` until `wait` is satisfied.  Replaces any earlier
    /// suspension of the same task.
    pub fn suspend(&mut self, task: TaskId, wait: &Wait, now: Tick) {
        let token = self.next_token;
        self.next_token += 1;
        self.pending.insert(task, token);

        let mut immediate = false;
        self.register(task, token, wait, now, &mut immediate);
        if immediate {
            self.wake((task, token));
        }
        tracing::trace!(%task, token, ?wait, "suspended");
    }

    fn register(&mut self, task: TaskId, token: u64, wait: &Wait, now: Tick, immediate: &mut bool) {
        match wait {
            Wait::Signal(signal) => {
                self.waiters.entry(*signal).or_default().push((task, token));
            }
            Wait::Ticks(0) => *immediate = true,
            Wait::Ticks(n) => self.timers.push(now.offset(*n), (task, token)),
            Wait::Any(branches) if branches.is_empty() => *immediate = true,
            Wait::Any(branches) => {
                for branch in branches {
                    self.register(task, token, branch, now, immediate);
                }
            }
        }
    }

    /// Make `task` ready now, dropping any outstanding suspension.
    pub fn make_ready(&mut self, task: TaskId) {
        self.pending.remove(&task);
        self.ready.push_back(task);
    }

    /// Forget `task`'s suspension; any registered wakes become stale.
    pub fn cancel(&mut self, task: TaskId) {
        self.pending.remove(&task);
        self.ready.retain(|t| *t != task);
    }

    // ── Wakes ─────────────────────────────────────────────────────────────

    fn wake(&mut self, (task, token): Entry) -> bool {
        if self.pending.get(&task) == Some(&token) {
            self.pending.remove(&task);
            self.ready.push_back(task);
            true
        } else {
            false
        }
    }

    fn is_live(&self, (task, token): &Entry) -> bool {
        self.pending.get(task) == Some(token)
    }

    /// Raise `signal`: every task currently waiting on it becomes ready, in
    /// the order they suspended.  Returns the number of tasks woken.
    ///
    /// Signals are edge-triggered; raising one nobody waits on does nothing.
    pub fn raise(&mut self, signal: SignalId) -> usize {
        let Some(entries) = self.waiters.remove(&signal) else {
            return 0;
        };
        let woken = entries.into_iter().filter(|e| self.wake(*e)).count();
        tracing::trace!(%signal, woken, "raised");
        woken
    }

    /// Wake every task whose timer is due at or before `now`.
    pub fn fire_timers(&mut self, now: Tick) -> usize {
        let due = self.timers.drain_through(now);
        due.into_iter().filter(|e| self.wake(*e)).count()
    }

    // ── Queries ───────────────────────────────────────────────────────────

    /// Next ready task, FIFO.
    pub fn pop_ready(&mut self) -> Option<TaskId> {
        self.ready.pop_front()
    }

    pub fn has_ready(&self) -> bool {
        !self.ready.is_empty()
    }

    /// Earliest tick at which a live timer fires.  Stale timers at the head
    /// of the queue are discarded on the way.
    pub fn next_timer(&mut self) -> Option<Tick> {
        loop {
            let (tick, live) = {
                let (tick, entries) = self.timers.peek_next()?;
                (tick, entries.iter().any(|e| self.is_live(e)))
            };
            if live {
                return Some(tick);
            }
            self.timers.drain_tick(tick);
        }
    }

    /// `true` if `task` is suspended (not ready, not running).
    pub fn is_suspended(&self, task: TaskId) -> bool {
        self.pending.contains_key(&task)
    }

    /// Number of suspended tasks.
    pub fn suspended_count(&self) -> usize {
        self.pending.len()
    }
}
