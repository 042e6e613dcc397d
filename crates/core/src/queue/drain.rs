// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handlers that drain and maintain a work queue store

use std::time::Duration;

use async_trait::async_trait;

use super::{QueueRecord, WorkQueueStore};
use crate::clock::{Clock, SystemClock};
use crate::context::Context;
use crate::error::HandlerError;
use crate::handler::Handler;

/// Processes a single dequeued record
#[async_trait]
pub trait RecordProcessor: Send + Sync + 'static {
    async fn process(&self, ctx: &Context, record: &QueueRecord) -> Result<(), HandlerError>;
}

/// Handler that takes one record per invocation from a store
///
/// Whenever a record was handled (successfully or not) the handler requests
/// immediate reinvocation, so a backlog drains back-to-back until the queue
/// is empty or the routine's reinvocation limit forces a wait. The claim is
/// heartbeated while the processor runs.
pub struct QueueDrainHandler<S, P, C = SystemClock> {
    name: String,
    store: S,
    processor: P,
    clock: C,
    heartbeat_interval: Duration,
}

impl<S: WorkQueueStore, P: RecordProcessor> QueueDrainHandler<S, P> {
    pub fn new(name: impl Into<String>, store: S, processor: P) -> Self {
        Self::with_clock(name, store, processor, SystemClock)
    }
}

impl<S: WorkQueueStore, P: RecordProcessor, C: Clock> QueueDrainHandler<S, P, C> {
    pub fn with_clock(name: impl Into<String>, store: S, processor: P, clock: C) -> Self {
        Self {
            name: name.into(),
            store,
            processor,
            clock,
            heartbeat_interval: Duration::from_secs(5),
        }
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn process_with_heartbeat(
        &self,
        ctx: &Context,
        record: &QueueRecord,
    ) -> Result<(), HandlerError> {
        let work = self.processor.process(ctx, record);
        tokio::pin!(work);

        loop {
            let beat = self.clock.after(self.heartbeat_interval);
            tokio::select! {
                result = &mut work => return result,
                _ = beat => {
                    if let Err(e) = self.store.heartbeat(&record.id).await {
                        tracing::warn!(queue = %self.name, record = %record.id, error = %e, "heartbeat failed");
                    }
                }
            }
        }
    }
}

#[async_trait]
impl<S: WorkQueueStore, P: RecordProcessor, C: Clock> Handler for QueueDrainHandler<S, P, C> {
    async fn handle(&self, ctx: &Context) -> Result<(), HandlerError> {
        ctx.err()?;

        let Some(record) = self.store.dequeue().await? else {
            return Ok(());
        };

        match self.process_with_heartbeat(ctx, &record).await {
            Ok(()) => {
                self.store.mark_complete(&record.id).await?;
                tracing::debug!(queue = %self.name, record = %record.id, "record completed");
            }
            Err(e) if ctx.is_cancelled() && e.is_cancelled() => {
                self.store
                    .mark_failed(&record.id, "interrupted by shutdown")
                    .await?;
                return Err(HandlerError::Cancelled);
            }
            Err(e) => {
                tracing::warn!(
                    queue = %self.name,
                    record = %record.id,
                    attempts = record.attempts,
                    error = %e,
                    "record failed"
                );
                self.store.mark_failed(&record.id, &e.to_string()).await?;
            }
        }

        Err(HandlerError::ReinvokeImmediately)
    }

    fn handle_error(&self, err: &HandlerError) {
        tracing::error!(queue = %self.name, error = %err, "queue drain failed");
    }
}

/// Handler that periodically returns stalled claims to the queue
pub struct StalledResetHandler<S> {
    name: String,
    store: S,
    max_age: Duration,
}

impl<S: WorkQueueStore> StalledResetHandler<S> {
    pub fn new(name: impl Into<String>, store: S, max_age: Duration) -> Self {
        Self {
            name: name.into(),
            store,
            max_age,
        }
    }
}

#[async_trait]
impl<S: WorkQueueStore> Handler for StalledResetHandler<S> {
    async fn handle(&self, _ctx: &Context) -> Result<(), HandlerError> {
        let reset = self.store.reset_stalled(self.max_age).await?;
        if reset > 0 {
            tracing::info!(queue = %self.name, reset, "reset stalled records");
        }
        Ok(())
    }

    fn handle_error(&self, err: &HandlerError) {
        tracing::error!(queue = %self.name, error = %err, "stalled record reset failed");
    }
}

#[cfg(test)]
#[path = "drain_tests.rs"]
mod tests;
