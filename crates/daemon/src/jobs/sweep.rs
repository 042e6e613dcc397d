// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Expired file sweep

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use tock_core::{Context, Handler, HandlerError};

use super::JobError;

/// Deletes files in a directory whose modification time is older than
/// `max_age`
///
/// At most `batch_size` files are removed per invocation, oldest first. While
/// expired files remain the handler asks to be reinvoked immediately.
pub struct SweepHandler {
    dir: PathBuf,
    max_age: Duration,
    batch_size: usize,
    deleted: AtomicU64,
}

impl SweepHandler {
    pub fn new(dir: PathBuf, max_age: Duration, batch_size: usize) -> Self {
        Self {
            dir,
            max_age,
            batch_size: batch_size.max(1),
            deleted: AtomicU64::new(0),
        }
    }

    /// Total files removed since the handler was created
    pub fn deleted(&self) -> u64 {
        self.deleted.load(Ordering::Relaxed)
    }

    fn expired(&self, now: SystemTime) -> Result<Vec<(SystemTime, PathBuf)>, JobError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(JobError::Io(self.dir.clone(), e)),
        };

        let mut expired = Vec::new();
        for entry in entries.flatten() {
            let Ok(meta) = entry.metadata() else {
                continue;
            };
            if !meta.is_file() {
                continue;
            }
            let Ok(modified) = meta.modified() else {
                continue;
            };
            // Files from the future are never expired
            let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
            if age > self.max_age {
                expired.push((modified, entry.path()));
            }
        }
        expired.sort();
        Ok(expired)
    }
}

impl SweepHandler {
    /// Remove `batch` in order, stopping at the first cancellation or error
    ///
    /// Files removed before the stop are still counted and logged.
    fn remove_batch(
        &self,
        ctx: &Context,
        batch: &[&Path],
        expired: u64,
    ) -> Result<(), HandlerError> {
        let mut removed = 0;
        let mut result = Ok(());
        for path in batch {
            if let Err(e) = ctx.err() {
                result = Err(e);
                break;
            }
            if let Err(e) = remove(path) {
                result = Err(e.into());
                break;
            }
            removed += 1;
        }

        if removed > 0 {
            self.deleted.fetch_add(removed, Ordering::Relaxed);
            tracing::info!(
                dir = %self.dir.display(),
                removed,
                remaining = expired.saturating_sub(removed),
                "swept expired files"
            );
        }
        result
    }
}

#[async_trait]
impl Handler for SweepHandler {
    async fn handle(&self, ctx: &Context) -> Result<(), HandlerError> {
        let expired = self.expired(SystemTime::now())?;
        if expired.is_empty() {
            return Ok(());
        }

        let batch: Vec<&Path> = expired
            .iter()
            .take(self.batch_size)
            .map(|(_, path)| path.as_path())
            .collect();
        self.remove_batch(ctx, &batch, expired.len() as u64)?;

        if expired.len() > self.batch_size {
            return Err(HandlerError::ReinvokeImmediately);
        }
        Ok(())
    }

    fn handle_error(&self, err: &HandlerError) {
        tracing::warn!(dir = %self.dir.display(), error = %err, "sweep failed");
    }
}

fn remove(path: &Path) -> Result<(), JobError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        // Someone else got there first
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(JobError::Io(path.to_path_buf(), e)),
    }
}

#[cfg(test)]
#[path = "sweep_tests.rs"]
mod tests;
