//! A fixed-rate, run-to-completion task list for a single control loop.
//!
//! Nothing here preempts or suspends. The loop calls [`Scheduler::poll`] once per pass; every task whose time has
//! come is handed back to the caller, in registration order, and the caller runs it to completion before the loop
//! carries on. Tasks therefore have to be short or the loop (and every other task) stalls for as long as they run.

use embassy_time::{Duration, Instant};
use heapless::Vec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
struct Entry<T> {
    task: T,
    period: Duration,
    next_due: Instant,
}

/// Holds up to `N` tasks of type `T`, each run at its own fixed rate.
#[derive(Debug, Clone)]
pub struct Scheduler<T, const N: usize> {
    entries: Vec<Entry<T>, N>,
}

impl<T, const N: usize> Default for Scheduler<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> Scheduler<T, N> {
    /// Constructs an empty [`Scheduler`].
    pub const fn new() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<T: Copy, const N: usize> Scheduler<T, N> {
    /// Registers `task` to run every `period`, the first time one `period` after `now`.
    ///
    /// Hands the task back if the list is full.
    pub fn schedule_fixed_rate_at(&mut self, now: Instant, task: T, period: Duration) -> Result<(), T> {
        self.entries
            .push(Entry {
                task,
                period,
                next_due: now + period,
            })
            .map_err(|entry| entry.task)
    }

    /// Registers `task` to run every `period`, starting from the current time.
    pub fn schedule_fixed_rate(&mut self, task: T, period: Duration) -> Result<(), T> {
        self.schedule_fixed_rate_at(Instant::now(), task, period)
    }

    /// Runs every task that is due at `now`, in registration order. Returns how many ran.
    ///
    /// Deadlines advance by exactly one period so that a task keeps a steady rate even when the loop is a little late.
    /// A task that has fallen more than a whole period behind (typically because another task ran long) runs once and
    /// is rescheduled one period from `now`, rather than running repeatedly to catch up.
    pub fn poll_at(&mut self, now: Instant, mut run: impl FnMut(T)) -> usize {
        let mut ran = 0;
        for entry in self.entries.iter_mut() {
            if now < entry.next_due {
                continue;
            }

            entry.next_due += entry.period;
            if entry.next_due <= now {
                #[cfg(feature = "defmt")]
                defmt::debug!("Task fell behind by more than one period, skipping missed runs");
                entry.next_due = now + entry.period;
            }

            run(entry.task);
            ran += 1;
        }
        ran
    }

    /// Runs every task that is due at the current time, in registration order. Returns how many ran.
    pub fn poll(&mut self, run: impl FnMut(T)) -> usize {
        self.poll_at(Instant::now(), run)
    }
}
