// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Work queue store contract and the handlers that drain it
//!
//! The store owns locking and persistence; handlers only see the call shape
//! below. [`QueueDrainHandler`] processes one record per invocation and asks
//! for immediate reinvocation while records keep coming.

mod drain;
mod memory;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::QueueError;

pub use drain::{QueueDrainHandler, RecordProcessor, StalledResetHandler};
pub use memory::{DeadLetter, MemoryQueueStore};

/// A unit of queued work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueRecord {
    pub id: String,
    pub data: BTreeMap<String, String>,
    /// Number of times the record has been dequeued
    pub attempts: u32,
}

impl QueueRecord {
    pub fn new(id: impl Into<String>, data: BTreeMap<String, String>) -> Self {
        Self {
            id: id.into(),
            data,
            attempts: 0,
        }
    }
}

/// Store of work records claimed by one worker at a time
#[async_trait]
pub trait WorkQueueStore: Send + Sync + 'static {
    /// Claim the next ready record, if any
    async fn dequeue(&self) -> Result<Option<QueueRecord>, QueueError>;

    /// Keep a claimed record from being treated as stalled
    async fn heartbeat(&self, id: &str) -> Result<(), QueueError>;

    async fn mark_complete(&self, id: &str) -> Result<(), QueueError>;

    /// Release a claimed record after a failure; the store decides whether it
    /// is retried
    async fn mark_failed(&self, id: &str, reason: &str) -> Result<(), QueueError>;

    /// Return claims without a heartbeat for `max_age` to the queue.
    /// Returns how many were reset.
    async fn reset_stalled(&self, max_age: Duration) -> Result<usize, QueueError>;
}
