// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process recorder backing status pages

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{Recorder, RoutineInfo};
use crate::error::{HandlerError, RecorderError};

/// Last known state of a registered routine
#[derive(Debug, Clone, Serialize)]
pub struct RoutineStatus {
    #[serde(flatten)]
    pub info: RoutineInfo,
    pub started_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub last_run_at: Option<DateTime<Utc>>,
    pub runs: u64,
    pub errors: u64,
    pub last_duration_ms: Option<u64>,
    pub last_error: Option<String>,
}

impl RoutineStatus {
    fn new(info: RoutineInfo) -> Self {
        Self {
            info,
            started_at: None,
            stopped_at: None,
            last_run_at: None,
            runs: 0,
            errors: 0,
            last_duration_ms: None,
            last_error: None,
        }
    }

    /// Running means started and not stopped since
    pub fn is_running(&self) -> bool {
        match (self.started_at, self.stopped_at) {
            (Some(started), Some(stopped)) => started > stopped,
            (Some(_), None) => true,
            _ => false,
        }
    }
}

/// Registry of known routines keyed by name
///
/// Clones share the same registry.
#[derive(Clone, Default)]
pub struct MemoryRecorder {
    routines: Arc<Mutex<BTreeMap<String, RoutineStatus>>>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status of every known routine, ordered by name
    pub fn snapshot(&self) -> Vec<RoutineStatus> {
        self.routines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<RoutineStatus> {
        self.routines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
    }

    fn update<F>(&self, routine: &RoutineInfo, f: F) -> Result<(), RecorderError>
    where
        F: FnOnce(&mut RoutineStatus),
    {
        let mut routines = self.routines.lock().unwrap_or_else(|e| e.into_inner());
        let status = routines
            .get_mut(&routine.name)
            .ok_or_else(|| RecorderError::UnknownRoutine(routine.name.clone()))?;
        f(status);
        Ok(())
    }
}

impl Recorder for MemoryRecorder {
    fn save_known_routine(&self, routine: &RoutineInfo) -> Result<(), RecorderError> {
        let mut routines = self.routines.lock().unwrap_or_else(|e| e.into_inner());
        match routines.get_mut(&routine.name) {
            // Re-registration keeps the counters, refreshes the identity
            Some(status) => status.info = routine.clone(),
            None => {
                routines.insert(routine.name.clone(), RoutineStatus::new(routine.clone()));
            }
        }
        Ok(())
    }

    fn log_start(&self, routine: &RoutineInfo) -> Result<(), RecorderError> {
        self.update(routine, |status| status.started_at = Some(Utc::now()))
    }

    fn log_run(
        &self,
        routine: &RoutineInfo,
        duration: Duration,
        err: Option<&HandlerError>,
    ) -> Result<(), RecorderError> {
        self.update(routine, |status| {
            status.runs += 1;
            status.last_run_at = Some(Utc::now());
            status.last_duration_ms = Some(duration.as_millis() as u64);
            if let Some(err) = err {
                status.errors += 1;
                status.last_error = Some(err.to_string());
            }
        })
    }

    fn log_stop(&self, routine: &RoutineInfo) -> Result<(), RecorderError> {
        self.update(routine, |status| status.stopped_at = Some(Utc::now()))
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
