// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, reload, shutdown.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use fs2::FileExt;
use thiserror::Error;
use tokio::task::JoinHandle;
use tock_core::{monitor_routines, Context, MemoryRecorder};
use tracing::{info, warn};

use crate::config::{Config, ConfigError};
use crate::jobs::{build_routines, RoutineSet};

/// Startup marker prefix written to the log before anything else.
/// Full format: "--- tockd: starting (pid: 12345) ---"
pub const STARTUP_MARKER_PREFIX: &str = "--- tockd: starting (pid: ";

/// Files the daemon owns inside its state directory
#[derive(Debug, Clone)]
pub struct Paths {
    pub state_dir: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    pub log_path: PathBuf,
    pub status_path: PathBuf,
}

impl Paths {
    pub fn resolve(config: &Config) -> Result<Self, ConfigError> {
        let state_dir = config.state_dir()?;
        let log_path = config
            .daemon
            .log_file
            .clone()
            .unwrap_or_else(|| state_dir.join("daemon.log"));

        Ok(Self {
            lock_path: state_dir.join("daemon.pid"),
            status_path: state_dir.join("status.json"),
            log_path,
            state_dir,
        })
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Log path has no file name: {0}")]
    BadLogPath(PathBuf),
}

/// A started daemon: lock held, routines built but not yet running
pub struct Daemon {
    config_path: PathBuf,
    paths: Paths,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    ctx: Context,
    recorder: Arc<MemoryRecorder>,
    routines: RoutineSet,
    monitor: Option<JoinHandle<()>>,
    start_time: Instant,
}

/// Start the daemon
pub fn startup(config_path: &Path, config: &Config) -> Result<Daemon, LifecycleError> {
    let paths = Paths::resolve(config)?;
    match startup_inner(config_path, config, &paths) {
        Ok(daemon) => Ok(daemon),
        Err(e) => {
            // Only remove the pid file if the lock was ours
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(&paths);
            }
            Err(e)
        }
    }
}

fn startup_inner(
    config_path: &Path,
    config: &Config,
    paths: &Paths,
) -> Result<Daemon, LifecycleError> {
    // 1. Create state directory
    std::fs::create_dir_all(&paths.state_dir)?;

    // 2. Acquire lock file FIRST - prevents two daemons sharing a state dir.
    // Opened without truncation so a running daemon's pid survives the attempt.
    let mut lock_file = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&paths.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    use std::io::Write;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    // 3. Build routines under a root context
    let ctx = Context::new();
    let recorder = Arc::new(MemoryRecorder::new());
    let routines = build_routines(&ctx, config, &recorder, paths.status_path.clone());

    info!(
        routines = routines.names().len(),
        state_dir = %paths.state_dir.display(),
        "Daemon started"
    );

    Ok(Daemon {
        config_path: config_path.to_path_buf(),
        paths: paths.clone(),
        lock_file,
        ctx,
        recorder,
        routines,
        monitor: None,
        start_time: Instant::now(),
    })
}

/// Clean up resources on startup failure
fn cleanup_on_failure(paths: &Paths) {
    if paths.lock_path.exists() {
        let _ = std::fs::remove_file(&paths.lock_path);
    }
}

impl Daemon {
    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    pub fn recorder(&self) -> &Arc<MemoryRecorder> {
        &self.recorder
    }

    pub fn routines(&self) -> &RoutineSet {
        &self.routines
    }

    /// Start supervising every routine in the background
    pub fn spawn(&mut self) {
        if self.monitor.is_some() {
            warn!("routines already running");
            return;
        }
        let monitor = monitor_routines(self.ctx.clone(), self.routines.routines());
        self.monitor = Some(tokio::spawn(monitor));
    }

    /// Re-read the config file and apply new intervals
    ///
    /// On error the running configuration is kept.
    pub fn reload(&self) -> Result<usize, LifecycleError> {
        let config = Config::load(&self.config_path)?;
        let changed = self.routines.apply_intervals(&config);
        info!(changed, "Config reloaded");
        Ok(changed)
    }

    /// Stop every routine, write the final status and release the lock
    pub async fn shutdown(mut self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");

        self.ctx.cancel();
        if let Some(monitor) = self.monitor.take() {
            if let Err(e) = monitor.await {
                warn!("Routine monitor failed: {}", e);
            }
        }

        // Written after every routine has stopped so the file shows final state
        if let Err(e) = self.routines.status().write_snapshot() {
            warn!("Failed to write final status: {}", e);
        }

        if self.paths.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.paths.lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }

        let uptime = Duration::from_secs(self.start_time.elapsed().as_secs());
        info!(
            uptime = %humantime::format_duration(uptime),
            "Daemon shutdown complete"
        );
        Ok(())
    }
}

/// Write startup marker to log file (appends to existing log)
pub fn write_startup_marker(paths: &Paths) -> Result<(), LifecycleError> {
    use std::io::Write;

    if let Some(parent) = paths.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&paths.log_path)?;
    writeln!(file, "{}{}) ---", STARTUP_MARKER_PREFIX, std::process::id())?;

    Ok(())
}

/// Write startup error synchronously to log file.
pub fn write_startup_error(paths: &Paths, error: &LifecycleError) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&paths.log_path)
    else {
        return;
    };
    let _ = writeln!(file, "ERROR Failed to start daemon: {}", error);
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
