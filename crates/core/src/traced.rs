// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracing instrumentation for handler invocations

use std::time::Duration;

use tracing::Span;

use crate::error::HandlerError;
use crate::recorder::RoutineInfo;

/// Observation hooks wrapped around every handler invocation
///
/// The routine runs the handler inside the span returned by `begin` and calls
/// `end` from within that span once the invocation returns.
pub trait Operation: Send + Sync {
    fn begin(&self, routine: &RoutineInfo) -> Span;

    fn end(&self, routine: &RoutineInfo, elapsed: Duration, result: &Result<(), HandlerError>);
}

/// Operation that emits a span and a completion event per invocation
#[derive(Debug, Clone)]
pub struct TracedOperation {
    name: String,
}

impl TracedOperation {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Operation for TracedOperation {
    fn begin(&self, routine: &RoutineInfo) -> Span {
        let span = tracing::info_span!(
            "routine.invoke",
            operation = %self.name,
            routine = %routine.name,
            job = routine.job_name.as_deref().unwrap_or(""),
        );
        span.in_scope(|| tracing::trace!("starting"));
        span
    }

    fn end(&self, _routine: &RoutineInfo, elapsed: Duration, result: &Result<(), HandlerError>) {
        let elapsed_ms = elapsed.as_millis() as u64;
        match result {
            Ok(()) => tracing::debug!(elapsed_ms, "completed"),
            Err(e) if e.is_reinvoke() => {
                tracing::debug!(elapsed_ms, "completed, reinvoke requested")
            }
            // Shutdown is expected; cancellation from elsewhere still shows up here
            Err(e) if e.is_cancelled() => tracing::debug!(elapsed_ms, "cancelled"),
            Err(e) => tracing::warn!(elapsed_ms, error = %e, "failed"),
        }
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
