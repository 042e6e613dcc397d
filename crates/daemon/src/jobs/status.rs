// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status file: the daemon's runtime introspection page

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tock_core::{Context, Handler, HandlerError, MemoryRecorder, RoutineStatus};

use super::JobError;

/// Contents of `status.json`
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub pid: u32,
    pub version: &'static str,
    pub updated_at: DateTime<Utc>,
    pub routines: Vec<RoutineStatus>,
}

/// Periodically writes the recorder snapshot as JSON
pub struct StatusHandler {
    recorder: Arc<MemoryRecorder>,
    path: PathBuf,
}

impl StatusHandler {
    pub fn new(recorder: Arc<MemoryRecorder>, path: PathBuf) -> Self {
        Self { recorder, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn report(&self) -> StatusReport {
        StatusReport {
            pid: std::process::id(),
            version: env!("CARGO_PKG_VERSION"),
            updated_at: Utc::now(),
            routines: self.recorder.snapshot(),
        }
    }

    /// Write the current snapshot, replacing the file atomically
    pub fn write_snapshot(&self) -> Result<(), JobError> {
        let json = serde_json::to_string_pretty(&self.report())?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| JobError::Io(tmp.clone(), e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| JobError::Io(self.path.clone(), e))?;
        Ok(())
    }
}

#[async_trait]
impl Handler for StatusHandler {
    async fn handle(&self, ctx: &Context) -> Result<(), HandlerError> {
        ctx.err()?;
        self.write_snapshot()?;
        Ok(())
    }

    fn handle_error(&self, err: &HandlerError) {
        tracing::warn!(path = %self.path.display(), error = %err, "failed to write status");
    }

    async fn on_shutdown(&self) {
        if let Err(e) = self.write_snapshot() {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to write final status");
        }
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
