// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake recorder for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{Recorder, RoutineInfo};
use crate::error::{HandlerError, RecorderError};

/// Recorded recorder call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderCall {
    SaveKnown { name: String },
    Start { name: String },
    Run {
        name: String,
        duration: Duration,
        error: Option<String>,
    },
    Stop { name: String },
}

/// Fake recorder that remembers every call
#[derive(Clone, Default)]
pub struct FakeRecorder {
    calls: Arc<Mutex<Vec<RecorderCall>>>,
    failing: Arc<AtomicBool>,
}

impl FakeRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A recorder that records every call and then reports it as failed
    pub fn failing() -> Self {
        let recorder = Self::default();
        recorder.failing.store(true, Ordering::SeqCst);
        recorder
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<RecorderCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of recorded `log_run` calls
    pub fn runs(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, RecorderCall::Run { .. }))
            .count()
    }

    fn push(&self, call: RecorderCall) -> Result<(), RecorderError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
        if self.failing.load(Ordering::SeqCst) {
            return Err(RecorderError::Unavailable("fake failure".to_string()));
        }
        Ok(())
    }
}

impl Recorder for FakeRecorder {
    fn save_known_routine(&self, routine: &RoutineInfo) -> Result<(), RecorderError> {
        self.push(RecorderCall::SaveKnown {
            name: routine.name.clone(),
        })
    }

    fn log_start(&self, routine: &RoutineInfo) -> Result<(), RecorderError> {
        self.push(RecorderCall::Start {
            name: routine.name.clone(),
        })
    }

    fn log_run(
        &self,
        routine: &RoutineInfo,
        duration: Duration,
        err: Option<&HandlerError>,
    ) -> Result<(), RecorderError> {
        self.push(RecorderCall::Run {
            name: routine.name.clone(),
            duration,
            error: err.map(|e| e.to_string()),
        })
    }

    fn log_stop(&self, routine: &RoutineInfo) -> Result<(), RecorderError> {
        self.push(RecorderCall::Stop {
            name: routine.name.clone(),
        })
    }
}
