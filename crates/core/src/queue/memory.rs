// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory work queue store

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::{QueueRecord, WorkQueueStore};
use crate::clock::{Clock, SystemClock};
use crate::error::QueueError;

/// A record that failed too many times
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetter {
    pub record: QueueRecord,
    pub reason: String,
}

struct Claim {
    record: QueueRecord,
    heartbeat_at: Instant,
}

#[derive(Default)]
struct QueueState {
    ready: VecDeque<QueueRecord>,
    claimed: HashMap<String, Claim>,
    completed: Vec<String>,
    dead: Vec<DeadLetter>,
}

/// FIFO queue store with retry and dead-lettering
///
/// Clones share the same queue.
#[derive(Clone)]
pub struct MemoryQueueStore<C: Clock = SystemClock> {
    state: Arc<Mutex<QueueState>>,
    clock: C,
    max_attempts: u32,
}

impl MemoryQueueStore {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for MemoryQueueStore {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> MemoryQueueStore<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            state: Arc::new(Mutex::new(QueueState::default())),
            clock,
            max_attempts: 3,
        }
    }

    /// Attempts allowed before a failing record is dead-lettered
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn push(&self, id: impl Into<String>, data: BTreeMap<String, String>) {
        self.lock().ready.push_back(QueueRecord::new(id, data));
    }

    pub fn ready_len(&self) -> usize {
        self.lock().ready.len()
    }

    pub fn claimed_len(&self) -> usize {
        self.lock().claimed.len()
    }

    /// Ids of completed records in completion order
    pub fn completed(&self) -> Vec<String> {
        self.lock().completed.clone()
    }

    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.lock().dead.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl<C: Clock> WorkQueueStore for MemoryQueueStore<C> {
    async fn dequeue(&self) -> Result<Option<QueueRecord>, QueueError> {
        let now = self.clock.now();
        let mut state = self.lock();
        let Some(mut record) = state.ready.pop_front() else {
            return Ok(None);
        };
        record.attempts += 1;
        state.claimed.insert(
            record.id.clone(),
            Claim {
                record: record.clone(),
                heartbeat_at: now,
            },
        );
        Ok(Some(record))
    }

    async fn heartbeat(&self, id: &str) -> Result<(), QueueError> {
        let now = self.clock.now();
        let mut state = self.lock();
        let claim = state
            .claimed
            .get_mut(id)
            .ok_or_else(|| QueueError::NotClaimed(id.to_string()))?;
        claim.heartbeat_at = now;
        Ok(())
    }

    async fn mark_complete(&self, id: &str) -> Result<(), QueueError> {
        let mut state = self.lock();
        state
            .claimed
            .remove(id)
            .ok_or_else(|| QueueError::NotClaimed(id.to_string()))?;
        state.completed.push(id.to_string());
        Ok(())
    }

    async fn mark_failed(&self, id: &str, reason: &str) -> Result<(), QueueError> {
        let mut state = self.lock();
        let claim = state
            .claimed
            .remove(id)
            .ok_or_else(|| QueueError::NotClaimed(id.to_string()))?;

        if claim.record.attempts >= self.max_attempts {
            tracing::warn!(record = id, reason, "record failed permanently");
            state.dead.push(DeadLetter {
                record: claim.record,
                reason: reason.to_string(),
            });
        } else {
            tracing::debug!(record = id, attempts = claim.record.attempts, "record requeued");
            state.ready.push_back(claim.record);
        }
        Ok(())
    }

    async fn reset_stalled(&self, max_age: Duration) -> Result<usize, QueueError> {
        let now = self.clock.now();
        let mut state = self.lock();
        let stalled: Vec<String> = state
            .claimed
            .iter()
            .filter(|(_, c)| now.saturating_duration_since(c.heartbeat_at) >= max_age)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &stalled {
            if let Some(claim) = state.claimed.remove(id) {
                state.ready.push_back(claim.record);
            }
        }
        Ok(stalled.len())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
