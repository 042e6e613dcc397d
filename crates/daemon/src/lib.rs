// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tockd internals: configuration, jobs and lifecycle

pub mod config;
pub mod jobs;
pub mod lifecycle;

pub use config::{Config, ConfigError, JobConfig, RoutineConfig};
pub use lifecycle::{startup, Daemon, LifecycleError, Paths, STARTUP_MARKER_PREFIX};
