//! Stopping the tracker and pacing its waits

use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// What asked the tracker to stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Ctrl+C delivered as a signal
    Interrupted,
    /// Esc or `q` in the terminal
    QuitKey,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Interrupted => write!(f, "interrupted"),
            StopReason::QuitKey => write!(f, "quit key"),
        }
    }
}

/// Stop request shared by the poll loop, the Ctrl+C handler and the keyboard monitor.
///
/// Every wait of the tracker (process search, resolution retry, poll ticks) goes through it, so
/// a stop request ends them all at once.
#[derive(Debug, Default)]
pub struct ShutdownSignal {
    reason: Mutex<Option<StopReason>>,
    wake: Condvar,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop. The first reason is kept.
    pub fn trigger(&self, reason: StopReason) {
        let mut current = self.lock();
        current.get_or_insert(reason);
        self.wake.notify_all();
    }

    pub fn reason(&self) -> Option<StopReason> {
        *self.lock()
    }

    pub fn is_shutdown(&self) -> bool {
        self.reason().is_some()
    }

    /// Sleep until `deadline`. Returns `true` if a stop was requested.
    pub fn wait_until(&self, deadline: Instant) -> bool {
        let mut reason = self.lock();
        while reason.is_none() {
            let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                return false;
            };
            if remaining.is_zero() {
                return false;
            }
            reason = match self.wake.wait_timeout(reason, remaining) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
        true
    }

    /// Sleep for `duration`. Returns `true` if a stop was requested.
    pub fn wait(&self, duration: Duration) -> bool {
        self.wait_until(Instant::now() + duration)
    }

    /// Fixed-rate poll ticks that end when a stop is requested.
    pub fn ticks(&self, interval: Duration) -> Ticks<'_> {
        Ticks {
            signal: self,
            interval,
            next: Instant::now(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<StopReason>> {
        self.reason.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Iterator over tick instants, see [`ShutdownSignal::ticks`]
///
/// Deadlines are spaced by the interval regardless of how long a tick took. A tick that overruns
/// skips the deadlines it missed instead of firing them back to back.
pub struct Ticks<'a> {
    signal: &'a ShutdownSignal,
    interval: Duration,
    next: Instant,
}

impl Iterator for Ticks<'_> {
    type Item = Instant;

    fn next(&mut self) -> Option<Instant> {
        if self.signal.wait_until(self.next) {
            return None;
        }
        let now = Instant::now();
        self.next += self.interval;
        if self.next <= now {
            self.next = now + self.interval;
        }
        Some(now)
    }
}
