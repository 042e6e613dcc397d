// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Routines built from the daemon configuration

mod heartbeat;
mod status;
mod sweep;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tock_core::{
    BackgroundRoutine, Context, Handler, HandlerError, MemoryRecorder, PeriodicRoutine,
    Recorder, RoutineConfig as CoreRoutineConfig, TracedOperation, DEFAULT_INTERVAL,
};

use crate::config::{Config, JobConfig, RoutineConfig, STATUS_ROUTINE};

pub use heartbeat::HeartbeatHandler;
pub use status::{StatusHandler, StatusReport};
pub use sweep::SweepHandler;

/// Errors raised by daemon jobs
#[derive(Debug, Error)]
pub enum JobError {
    #[error("IO error on {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Failed to encode status: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<JobError> for HandlerError {
    fn from(err: JobError) -> Self {
        HandlerError::other(err)
    }
}

/// Interval shared between a routine and the reload path
///
/// The routine re-reads the cell before every wait, so a reload takes effect
/// after the current wait. Stored in nanoseconds, saturating at about 584 years.
#[derive(Debug, Clone)]
pub struct IntervalCell(Arc<AtomicU64>);

impl IntervalCell {
    pub fn new(interval: Duration) -> Self {
        Self(Arc::new(AtomicU64::new(nanos(interval))))
    }

    pub fn get(&self) -> Duration {
        Duration::from_nanos(self.0.load(Ordering::Relaxed))
    }

    /// Store a new interval, returning true if it changed
    pub fn set(&self, interval: Duration) -> bool {
        let nanos = nanos(interval);
        self.0.swap(nanos, Ordering::Relaxed) != nanos
    }
}

fn nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

/// Every routine the daemon supervises, plus the handles needed to reload
/// their intervals
pub struct RoutineSet {
    routines: Vec<Arc<dyn BackgroundRoutine>>,
    intervals: HashMap<String, IntervalCell>,
    status: Arc<StatusHandler>,
}

impl RoutineSet {
    /// Routines in configuration order, the status routine last
    pub fn routines(&self) -> Vec<Arc<dyn BackgroundRoutine>> {
        self.routines.clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.routines.iter().map(|r| r.name().to_string()).collect()
    }

    pub fn interval(&self, name: &str) -> Option<Duration> {
        self.intervals.get(name).map(IntervalCell::get)
    }

    pub fn status(&self) -> &Arc<StatusHandler> {
        &self.status
    }

    /// Apply the intervals of a freshly loaded config; returns how many
    /// routines changed
    ///
    /// Routines cannot be added or removed while running; such entries are
    /// logged and skipped.
    pub fn apply_intervals(&self, config: &Config) -> usize {
        let mut changed = 0;

        for routine in &config.routines {
            let Some(cell) = self.intervals.get(&routine.name) else {
                tracing::warn!(routine = %routine.name, "new routine ignored until restart");
                continue;
            };
            let interval = routine.interval.unwrap_or(DEFAULT_INTERVAL);
            if cell.set(interval) {
                tracing::info!(
                    routine = %routine.name,
                    interval = %humantime::format_duration(interval),
                    "interval updated"
                );
                changed += 1;
            }
        }

        if let Some(cell) = self.intervals.get(STATUS_ROUTINE) {
            if cell.set(config.daemon.status_interval) {
                changed += 1;
            }
        }

        for name in self.intervals.keys() {
            if name != STATUS_ROUTINE && config.routine(name).is_none() {
                tracing::warn!(routine = %name, "removed routine keeps running until restart");
            }
        }

        changed
    }
}

/// Build a routine per configured entry plus the status routine
pub fn build_routines(
    ctx: &Context,
    config: &Config,
    recorder: &Arc<MemoryRecorder>,
    status_path: PathBuf,
) -> RoutineSet {
    let mut routines: Vec<Arc<dyn BackgroundRoutine>> = Vec::new();
    let mut intervals = HashMap::new();

    for entry in &config.routines {
        let cell = IntervalCell::new(entry.interval.unwrap_or(DEFAULT_INTERVAL));
        let routine = match &entry.job {
            JobConfig::Sweep {
                dir,
                max_age,
                batch_size,
            } => periodic(
                ctx,
                SweepHandler::new(dir.clone(), *max_age, *batch_size),
                entry,
                &cell,
                recorder,
            ),
            JobConfig::Heartbeat { path } => periodic(
                ctx,
                HeartbeatHandler::new(path.clone()),
                entry,
                &cell,
                recorder,
            ),
        };
        intervals.insert(entry.name.clone(), cell);
        routines.push(routine);
    }

    let status = Arc::new(StatusHandler::new(Arc::clone(recorder), status_path));
    let cell = IntervalCell::new(config.daemon.status_interval);
    let status_config = core_config(STATUS_ROUTINE, &cell, recorder)
        .with_description("Writes routine status to disk");
    let routine = PeriodicRoutine::new(ctx, Arc::clone(&status), status_config);
    routine.set_job_name(STATUS_ROUTINE);
    routines.push(Arc::new(routine));
    intervals.insert(STATUS_ROUTINE.to_string(), cell);

    RoutineSet {
        routines,
        intervals,
        status,
    }
}

fn periodic<H: Handler>(
    ctx: &Context,
    handler: H,
    entry: &RoutineConfig,
    cell: &IntervalCell,
    recorder: &Arc<MemoryRecorder>,
) -> Arc<dyn BackgroundRoutine> {
    let config = core_config(&entry.name, cell, recorder)
        .with_description(entry.description.clone())
        .with_operation(Arc::new(TracedOperation::new(entry.job.kind())));
    let routine = PeriodicRoutine::new(ctx, handler, config);
    routine.set_job_name(entry.job.kind());
    Arc::new(routine)
}

fn core_config(
    name: &str,
    cell: &IntervalCell,
    recorder: &Arc<MemoryRecorder>,
) -> CoreRoutineConfig {
    let cell = cell.clone();
    CoreRoutineConfig::new(name)
        .with_interval_fn(move || cell.get())
        .with_recorder(Arc::clone(recorder) as Arc<dyn Recorder>)
}
