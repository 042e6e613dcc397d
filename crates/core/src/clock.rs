// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling
//!
//! Routines never read wall-clock time or sleep directly; every time-based
//! decision goes through a [`Clock`] so run loops can be driven by a
//! [`FakeClock`] in tests.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::{oneshot, Notify};

/// A one-shot timer that resolves once its duration has elapsed
pub type Timer = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// A clock that provides the current time and one-shot timers
pub trait Clock: Clone + Send + Sync + 'static {
    fn now(&self) -> Instant;

    /// Returns a timer that fires once after `duration`
    fn after(&self, duration: Duration) -> Timer;
}

/// Real system clock backed by tokio's timer wheel
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn after(&self, duration: Duration) -> Timer {
        Box::pin(tokio::time::sleep(duration))
    }
}

struct PendingTimer {
    deadline: Instant,
    fire: oneshot::Sender<()>,
}

struct FakeState {
    now: Instant,
    timers: Vec<PendingTimer>,
}

/// Fake clock for testing with controllable time
///
/// Timers only fire when the clock is moved with [`FakeClock::advance`] or
/// [`FakeClock::set`]. A zero-duration timer is already elapsed: it is never
/// registered and resolves after yielding to the scheduler once.
#[derive(Clone)]
pub struct FakeClock {
    state: Arc<Mutex<FakeState>>,
    armed: Arc<Notify>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState {
                now: Instant::now(),
                timers: Vec::new(),
            })),
            armed: Arc::new(Notify::new()),
        }
    }

    /// Advance the clock by the given duration, firing every timer that
    /// becomes due
    pub fn advance(&self, duration: Duration) {
        let due = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.now += duration;
            take_due(&mut state)
        };
        fire(due);
    }

    /// Set the clock to a specific instant, firing every timer that becomes due
    pub fn set(&self, instant: Instant) {
        let due = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.now = instant;
            take_due(&mut state)
        };
        fire(due);
    }

    /// Number of timers still waiting to fire
    ///
    /// Timers whose future has been dropped are not counted.
    pub fn pending_timers(&self) -> usize {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.timers.retain(|t| !t.fire.is_closed());
        state.timers.len()
    }

    /// Wait until at least `count` timers are pending
    ///
    /// Lets a test park until a routine has entered its interval wait before
    /// advancing the clock.
    pub async fn block_until_timers(&self, count: usize) {
        loop {
            let armed = self.armed.notified();
            if self.pending_timers() >= count {
                return;
            }
            armed.await;
        }
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).now
    }

    fn after(&self, duration: Duration) -> Timer {
        if duration.is_zero() {
            return Box::pin(tokio::task::yield_now());
        }

        let (tx, rx) = oneshot::channel();
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            let deadline = state.now + duration;
            state.timers.push(PendingTimer { deadline, fire: tx });
        }
        self.armed.notify_waiters();

        Box::pin(async move {
            // A dropped clock can never fire the timer
            if rx.await.is_err() {
                std::future::pending::<()>().await;
            }
        })
    }
}

fn take_due(state: &mut FakeState) -> Vec<PendingTimer> {
    let now = state.now;
    let (mut due, pending): (Vec<_>, Vec<_>) =
        state.timers.drain(..).partition(|t| t.deadline <= now);
    state.timers = pending;
    due.sort_by_key(|t| t.deadline);
    due
}

fn fire(due: Vec<PendingTimer>) {
    for timer in due {
        let _ = timer.fire.send(());
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
