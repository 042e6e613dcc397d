// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle recording for routines
//!
//! A [`Recorder`] observes start/run/stop events of every routine registered
//! with it. Calls are best-effort: routines log a failed call and carry on.

mod memory;

#[cfg(any(test, feature = "test-support"))]
mod fake;

use std::time::Duration;

use serde::Serialize;

use crate::error::{HandlerError, RecorderError};

pub use memory::{MemoryRecorder, RoutineStatus};

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeRecorder, RecorderCall};

/// What sort of routine a [`RoutineInfo`] describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutineKind {
    Periodic,
    Custom,
}

/// Identity of a routine as seen by recorders and instrumentation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutineInfo {
    pub name: String,
    pub description: String,
    pub job_name: Option<String>,
    pub kind: RoutineKind,
    /// Interval resolved when the info was captured
    #[serde(rename = "interval_ms", serialize_with = "serialize_millis")]
    pub interval: Duration,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Observer of routine lifecycle events
pub trait Recorder: Send + Sync {
    /// Add the routine to the registry of known routines
    fn save_known_routine(&self, routine: &RoutineInfo) -> Result<(), RecorderError>;

    fn log_start(&self, routine: &RoutineInfo) -> Result<(), RecorderError>;

    /// Record one completed invocation. `err` is set only for real failures.
    fn log_run(
        &self,
        routine: &RoutineInfo,
        duration: Duration,
        err: Option<&HandlerError>,
    ) -> Result<(), RecorderError>;

    fn log_stop(&self, routine: &RoutineInfo) -> Result<(), RecorderError>;
}
