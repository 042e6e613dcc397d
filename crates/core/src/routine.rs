// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic routine: runs a [`Handler`] on an interval until stopped
//!
//! Each loop iteration invokes the handler once, classifies the result, and
//! then either waits for the next interval, reinvokes immediately, or exits
//! because the routine's context was cancelled. Consecutive immediate
//! reinvocations are capped so a handler that always asks for one still
//! yields to the interval wait.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::clock::{Clock, SystemClock};
use crate::context::Context;
use crate::error::{HandlerError, RecorderError};
use crate::handler::Handler;
use crate::monitor::BackgroundRoutine;
use crate::recorder::{Recorder, RoutineInfo, RoutineKind};
use crate::traced::Operation;

/// Back-to-back reinvocations allowed before the interval wait is forced
pub const MAX_CONSECUTIVE_REINVOCATIONS: u32 = 100;

/// Interval used when none is configured
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Resolves the wait before the next invocation; called on every iteration
pub type IntervalFn = Arc<dyn Fn() -> Duration + Send + Sync>;

/// Construction options for a [`PeriodicRoutine`]
#[derive(Clone)]
pub struct RoutineConfig {
    name: String,
    description: String,
    interval: IntervalFn,
    operation: Option<Arc<dyn Operation>>,
    recorder: Option<Arc<dyn Recorder>>,
    max_reinvocations: u32,
}

impl RoutineConfig {
    /// The name should be unique among routines sharing a recorder
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            interval: Arc::new(|| DEFAULT_INTERVAL),
            operation: None,
            recorder: None,
            max_reinvocations: MAX_CONSECUTIVE_REINVOCATIONS,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Fixed interval; replaces any earlier interval option
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Arc::new(move || interval);
        self
    }

    /// Interval re-resolved before every wait; replaces any earlier interval
    /// option
    pub fn with_interval_fn<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Duration + Send + Sync + 'static,
    {
        self.interval = Arc::new(f);
        self
    }

    /// Wrap each invocation with the given observation operation
    pub fn with_operation(mut self, operation: Arc<dyn Operation>) -> Self {
        self.operation = Some(operation);
        self
    }

    pub fn with_recorder(mut self, recorder: Arc<dyn Recorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn with_max_reinvocations(mut self, max: u32) -> Self {
        self.max_reinvocations = max;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// How a single invocation ended
enum Outcome {
    /// Cancelled by our own context: leave the loop silently
    Shutdown,
    Reinvoke,
    Completed,
    Failed(HandlerError),
}

impl Outcome {
    fn classify(ctx: &Context, result: Result<(), HandlerError>) -> Self {
        match result {
            Ok(()) => Outcome::Completed,
            Err(err) if ctx.is_cancelled() && err.is_cancelled() => Outcome::Shutdown,
            Err(err) if err.is_reinvoke() => Outcome::Reinvoke,
            Err(err) => Outcome::Failed(err),
        }
    }
}

/// Runs a handler repeatedly on its own schedule
///
/// `start` runs the loop and returns once it has stopped; `stop` may be called
/// from another task and blocks until `start` is done, including the
/// handler's `on_shutdown` hook.
pub struct PeriodicRoutine<H, C = SystemClock> {
    handler: H,
    clock: C,
    config: RoutineConfig,
    job_name: Mutex<Option<String>>,
    ctx: Context,
    finished: CancellationToken,
    started: AtomicBool,
}

impl<H: Handler> PeriodicRoutine<H> {
    /// Create a routine whose context is derived from `parent`
    pub fn new(parent: &Context, handler: H, config: RoutineConfig) -> Self {
        Self::with_clock(parent, handler, config, SystemClock)
    }
}

impl<H: Handler, C: Clock> PeriodicRoutine<H, C> {
    /// Create a routine that takes every time-based decision from `clock`
    pub fn with_clock(parent: &Context, handler: H, config: RoutineConfig, clock: C) -> Self {
        Self {
            handler,
            clock,
            config,
            job_name: Mutex::new(None),
            ctx: parent.child(),
            finished: CancellationToken::new(),
            started: AtomicBool::new(false),
        }
    }

    pub fn description(&self) -> &str {
        &self.config.description
    }

    pub fn job_name(&self) -> Option<String> {
        self.job_name
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Group this routine under a logical job label
    pub fn set_job_name(&self, job_name: impl Into<String>) {
        *self.job_name.lock().unwrap_or_else(|e| e.into_inner()) = Some(job_name.into());
    }

    /// The interval the next wait would use
    pub fn interval(&self) -> Duration {
        (self.config.interval)()
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// True once the run loop has exited and the shutdown hook has run
    pub fn is_finished(&self) -> bool {
        self.finished.is_cancelled()
    }

    pub fn info(&self) -> RoutineInfo {
        RoutineInfo {
            name: self.config.name.clone(),
            description: self.config.description.clone(),
            job_name: self.job_name(),
            kind: RoutineKind::Periodic,
            interval: self.interval(),
        }
    }

    async fn run_loop(&self, info: &RoutineInfo) {
        let mut reinvocations: u32 = 0;

        while !self.ctx.is_cancelled() {
            let (result, elapsed) = self.invoke(info).await;

            let outcome = Outcome::classify(&self.ctx, result);
            let reinvoke = match &outcome {
                Outcome::Shutdown => break,
                Outcome::Reinvoke => true,
                Outcome::Completed => false,
                Outcome::Failed(err) => {
                    self.handler.handle_error(err);
                    false
                }
            };

            let failure = match &outcome {
                Outcome::Failed(err) => Some(err),
                _ => None,
            };
            self.record(|r| r.log_run(info, elapsed, failure));

            if reinvoke {
                reinvocations += 1;
                if reinvocations < self.config.max_reinvocations {
                    continue;
                }
                tracing::debug!(
                    routine = %self.config.name,
                    reinvocations,
                    "reinvocation limit reached, waiting for next interval"
                );
            }
            reinvocations = 0;

            if !self.wait().await {
                break;
            }
        }
    }

    async fn invoke(&self, info: &RoutineInfo) -> (Result<(), HandlerError>, Duration) {
        let started = self.clock.now();

        let Some(operation) = &self.config.operation else {
            let result = self.handler.handle(&self.ctx).await;
            let elapsed = self.clock.now().saturating_duration_since(started);
            return (result, elapsed);
        };

        let span = operation.begin(info);
        let result = self
            .handler
            .handle(&self.ctx)
            .instrument(span.clone())
            .await;
        let elapsed = self.clock.now().saturating_duration_since(started);
        span.in_scope(|| operation.end(info, elapsed, &result));

        (result, elapsed)
    }

    /// Wait out the interval; false if the context was cancelled first
    async fn wait(&self) -> bool {
        let timer = self.clock.after(self.interval());
        tokio::select! {
            biased;
            _ = self.ctx.cancelled() => false,
            _ = timer => true,
        }
    }

    fn record<F>(&self, f: F)
    where
        F: FnOnce(&dyn Recorder) -> Result<(), RecorderError>,
    {
        let Some(recorder) = &self.config.recorder else {
            return;
        };
        if let Err(e) = f(recorder.as_ref()) {
            tracing::warn!(routine = %self.config.name, error = %e, "recorder call failed");
        }
    }
}

#[async_trait]
impl<H: Handler, C: Clock> BackgroundRoutine for PeriodicRoutine<H, C> {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            tracing::warn!(routine = %self.config.name, "routine already started");
            return;
        }

        // Released on every exit path, including a panicking handler
        let finished = self.finished.clone().drop_guard();

        let info = self.info();
        self.record(|r| r.save_known_routine(&info));
        self.record(|r| r.log_start(&info));
        tracing::info!(
            routine = %info.name,
            interval_ms = info.interval.as_millis() as u64,
            "routine started"
        );

        self.run_loop(&info).await;

        self.handler.on_shutdown().await;
        tracing::info!(routine = %info.name, "routine stopped");
        drop(finished);
    }

    async fn stop(&self) {
        let info = self.info();
        self.record(|r| r.log_stop(&info));
        self.ctx.cancel();
        self.finished.cancelled().await;
    }
}

#[cfg(test)]
#[path = "routine_tests.rs"]
mod tests;
