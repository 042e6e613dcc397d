// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervision of long-lived routines
//!
//! [`monitor_routines`] starts a set of [`BackgroundRoutine`]s, waits for the
//! supplied context (or for all of them to exit), then stops them all and
//! waits for them to finish.
//! [`CombinedRoutine`] nests a group behind the same contract so supervised
//! work can form a tree.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::context::Context;

/// A long-lived routine with a blocking start/stop lifecycle
#[async_trait]
pub trait BackgroundRoutine: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// Run until stopped. Called once.
    async fn start(&self);

    /// Request a stop and wait until `start` has returned
    async fn stop(&self);
}

/// Run `routines` concurrently until `ctx` is cancelled or every one has exited
///
/// After cancellation every routine is stopped concurrently, and this returns
/// once all of their `start` calls have returned. A routine that exits on its
/// own beforehand is logged and does not affect the others. With no routines
/// this returns immediately.
pub async fn monitor_routines(ctx: Context, routines: Vec<Arc<dyn BackgroundRoutine>>) {
    let mut running = start_all(&routines);
    tracing::info!(count = routines.len(), "monitoring routines");

    loop {
        tokio::select! {
            biased;
            _ = ctx.cancelled() => break,
            joined = running.join_next() => match joined {
                Some(joined) => report_exit(joined, true),
                None => {
                    tracing::info!("every routine exited on its own");
                    break;
                }
            },
        }
    }

    tracing::info!(count = routines.len(), "stopping routines");
    stop_all(&routines).await;
    while let Some(joined) = running.join_next().await {
        report_exit(joined, false);
    }
    tracing::info!("all routines stopped");
}

fn start_all(routines: &[Arc<dyn BackgroundRoutine>]) -> JoinSet<String> {
    let mut running = JoinSet::new();
    for routine in routines {
        let routine = Arc::clone(routine);
        running.spawn(async move {
            routine.start().await;
            routine.name().to_string()
        });
    }
    running
}

async fn stop_all(routines: &[Arc<dyn BackgroundRoutine>]) {
    let mut stopping = JoinSet::new();
    for routine in routines {
        let routine = Arc::clone(routine);
        stopping.spawn(async move { routine.stop().await });
    }
    while let Some(joined) = stopping.join_next().await {
        if let Err(e) = joined {
            tracing::error!(error = %e, "routine panicked while stopping");
        }
    }
}

fn report_exit(joined: Result<String, JoinError>, early: bool) {
    match joined {
        Ok(name) if early => tracing::warn!(routine = %name, "routine exited before shutdown"),
        Ok(name) => tracing::debug!(routine = %name, "routine exited"),
        Err(e) => tracing::error!(error = %e, "routine panicked"),
    }
}

/// A group of routines started and stopped together
pub struct CombinedRoutine {
    name: String,
    routines: Vec<Arc<dyn BackgroundRoutine>>,
}

impl CombinedRoutine {
    pub fn new(name: impl Into<String>, routines: Vec<Arc<dyn BackgroundRoutine>>) -> Self {
        Self {
            name: name.into(),
            routines,
        }
    }

    pub fn len(&self) -> usize {
        self.routines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routines.is_empty()
    }
}

#[async_trait]
impl BackgroundRoutine for CombinedRoutine {
    fn name(&self) -> &str {
        &self.name
    }

    /// Returns once every member's `start` has returned
    async fn start(&self) {
        let mut running = start_all(&self.routines);
        while let Some(joined) = running.join_next().await {
            report_exit(joined, false);
        }
    }

    async fn stop(&self) {
        stop_all(&self.routines).await;
    }
}

/// Routine that does nothing but wait to be stopped
#[derive(Default)]
pub struct NoopRoutine {
    stopped: CancellationToken,
}

impl NoopRoutine {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BackgroundRoutine for NoopRoutine {
    fn name(&self) -> &str {
        "noop"
    }

    async fn start(&self) {
        self.stopped.cancelled().await;
    }

    async fn stop(&self) {
        self.stopped.cancel();
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
