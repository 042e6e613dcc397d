// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! tock-core: Periodic background routines for long-running services
//!
//! This crate provides:
//! - Cancellable contexts and a clock abstraction for deterministic tests
//! - The handler contract and a periodic run loop around it
//! - Supervision of many routines behind a single start/stop lifecycle
//! - Lifecycle recorders and tracing instrumentation
//! - Work queue draining on top of the run loop

pub mod clock;
pub mod context;
pub mod error;
pub mod handler;
pub mod monitor;
pub mod queue;
pub mod recorder;
pub mod routine;
pub mod traced;

// Re-exports
pub use clock::{Clock, FakeClock, SystemClock, Timer};
pub use context::{Context, TimeoutContext};
pub use error::{HandlerError, QueueError, RecorderError};
pub use handler::{handler_fn, Handler, HandlerFn};
pub use monitor::{monitor_routines, BackgroundRoutine, CombinedRoutine, NoopRoutine};
pub use queue::{
    DeadLetter, MemoryQueueStore, QueueDrainHandler, QueueRecord, RecordProcessor,
    StalledResetHandler, WorkQueueStore,
};
pub use recorder::{MemoryRecorder, Recorder, RoutineInfo, RoutineKind, RoutineStatus};
pub use routine::{
    IntervalFn, PeriodicRoutine, RoutineConfig, DEFAULT_INTERVAL, MAX_CONSECUTIVE_REINVOCATIONS,
};
pub use traced::{Operation, TracedOperation};

#[cfg(any(test, feature = "test-support"))]
pub use recorder::{FakeRecorder, RecorderCall};
