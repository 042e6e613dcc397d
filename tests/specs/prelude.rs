//! Shared helpers for specs

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;

pub use tock_core::{
    BackgroundRoutine, Context, FakeClock, FakeRecorder, Handler, HandlerError, PeriodicRoutine,
    RecorderCall, RoutineConfig,
};

/// Counts invocations; optionally asks for reinvocation a fixed number of times
#[derive(Default)]
pub struct Counter {
    calls: AtomicUsize,
    reinvokes: AtomicUsize,
}

impl Counter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Request immediate reinvocation for the next `n` calls
    pub fn reinvoking(n: usize) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            reinvokes: AtomicUsize::new(n),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Handler for Counter {
    async fn handle(&self, ctx: &Context) -> Result<(), HandlerError> {
        ctx.err()?;
        self.calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.reinvokes.load(Ordering::SeqCst);
        if remaining > 0 {
            self.reinvokes.store(remaining - 1, Ordering::SeqCst);
            return Err(HandlerError::ReinvokeImmediately);
        }
        Ok(())
    }
}

/// Periodic routine on a fake clock
pub fn routine<H: Handler>(
    handler: H,
    interval: Duration,
    clock: &FakeClock,
) -> Arc<PeriodicRoutine<H, FakeClock>> {
    Arc::new(PeriodicRoutine::with_clock(
        &Context::new(),
        handler,
        RoutineConfig::new("spec").with_interval(interval),
        clock.clone(),
    ))
}

/// Run `start` on a background task
pub fn start<R: BackgroundRoutine>(routine: &Arc<R>) -> JoinHandle<()> {
    let routine = Arc::clone(routine);
    tokio::spawn(async move { routine.start().await })
}
