// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tock_core::{Context, Handler, HandlerError};

use super::JobError;

/// Writes the current UTC time to a file on every tick
pub struct HeartbeatHandler {
    path: PathBuf,
    beats: AtomicU64,
}

impl HeartbeatHandler {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            beats: AtomicU64::new(0),
        }
    }

    pub fn beats(&self) -> u64 {
        self.beats.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Handler for HeartbeatHandler {
    async fn handle(&self, ctx: &Context) -> Result<(), HandlerError> {
        ctx.err()?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| JobError::Io(parent.to_path_buf(), e))?;
        }
        std::fs::write(&self.path, format!("{}\n", Utc::now().to_rfc3339()))
            .map_err(|e| JobError::Io(self.path.clone(), e))?;

        let beats = self.beats.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::trace!(path = %self.path.display(), beats, "heartbeat written");
        Ok(())
    }
}

#[cfg(test)]
#[path = "heartbeat_tests.rs"]
mod tests;
