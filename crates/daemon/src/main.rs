// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tock Daemon (tockd)
//!
//! Background process that runs the configured periodic routines.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::path::{Path, PathBuf};

use tock_core::DEFAULT_INTERVAL;
use tock_daemon::lifecycle::{self, write_startup_error, write_startup_marker};
use tock_daemon::{Config, LifecycleError, Paths};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};

const USAGE: &str = "Usage: tockd [--validate] <CONFIG>";

enum Mode {
    Run(PathBuf),
    Validate(PathBuf),
    Help,
    Version,
}

fn parse_args(args: &[String]) -> Result<Mode, String> {
    let mut validate = false;
    let mut config = None;

    for arg in args {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Mode::Help),
            "-V" | "--version" => return Ok(Mode::Version),
            "--validate" => validate = true,
            flag if flag.starts_with('-') => return Err(format!("unknown option: {}", flag)),
            path if config.is_none() => config = Some(PathBuf::from(path)),
            extra => return Err(format!("unexpected argument: {}", extra)),
        }
    }

    let config = config.ok_or_else(|| "missing config path".to_string())?;
    Ok(if validate {
        Mode::Validate(config)
    } else {
        Mode::Run(config)
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse arguments
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mode = match parse_args(&args) {
        Ok(mode) => mode,
        Err(msg) => {
            eprintln!("error: {}\n{}", msg, USAGE);
            std::process::exit(2);
        }
    };

    match mode {
        Mode::Help => {
            println!("{}", USAGE);
            Ok(())
        }
        Mode::Version => {
            println!("tockd {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Mode::Validate(path) => validate(&path),
        Mode::Run(path) => run(&path).await,
    }
}

/// Print the routines a config would start, without starting them
fn validate(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load(path)?;

    for routine in &config.routines {
        let interval = routine.interval.unwrap_or(DEFAULT_INTERVAL);
        println!(
            "{}\t{}\tevery {}",
            routine.name,
            routine.job.kind(),
            humantime::format_duration(interval)
        );
    }
    println!(
        "status\tstatus\tevery {}",
        humantime::format_duration(config.daemon.status_interval)
    );
    println!("Config OK: {} routines", config.routines.len() + 1);
    Ok(())
}

async fn run(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load(config_path)?;
    let paths = Paths::resolve(&config)?;

    // Write startup marker to log (before tracing setup)
    write_startup_marker(&paths)?;

    // Set up logging
    let log_guard = setup_logging(&paths)?;

    info!("Starting tockd with config: {}", config_path.display());

    let mut daemon = match lifecycle::startup(config_path, &config) {
        Ok(d) => d,
        Err(e) => {
            // Write error synchronously (tracing is non-blocking and may not flush in time)
            write_startup_error(&paths, &e);
            error!("Failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    // Set up signal handlers
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sighup = signal(SignalKind::hangup())?;

    daemon.spawn();
    info!(
        routines = ?daemon.routines().names(),
        "Daemon ready"
    );

    // Signal ready for a parent process waiting on startup
    println!("READY");

    loop {
        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down...");
                break;
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down...");
                break;
            }
            _ = sighup.recv() => {
                info!("Received SIGHUP, reloading config...");
                if let Err(e) = daemon.reload() {
                    warn!("Reload failed, keeping current config: {}", e);
                }
            }
        }
    }

    daemon.shutdown().await?;
    info!("Daemon stopped");
    drop(log_guard);
    Ok(())
}

fn setup_logging(
    paths: &Paths,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let dir = paths
        .log_path
        .parent()
        .ok_or_else(|| LifecycleError::BadLogPath(paths.log_path.clone()))?;
    let file_name = paths
        .log_path
        .file_name()
        .ok_or_else(|| LifecycleError::BadLogPath(paths.log_path.clone()))?;
    std::fs::create_dir_all(dir)?;

    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Set up subscriber with env filter
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(guard)
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
