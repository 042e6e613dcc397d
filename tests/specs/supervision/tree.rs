//! Supervision specs
//!
//! Verify a tree of routines under one monitor shuts down as a unit.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tock_core::{
    monitor_routines, CombinedRoutine, MemoryQueueStore, MemoryRecorder, NoopRoutine,
    QueueDrainHandler, QueueRecord, RecordProcessor,
};

use crate::prelude::*;

struct Accept;

#[async_trait]
impl RecordProcessor for Accept {
    async fn process(&self, ctx: &Context, _record: &QueueRecord) -> Result<(), HandlerError> {
        ctx.err()
    }
}

#[tokio::test]
async fn monitor_stops_a_nested_tree() {
    let clock = FakeClock::new();
    let recorder = Arc::new(MemoryRecorder::new());
    let ctx = Context::new();

    let store = MemoryQueueStore::new();
    for id in ["a", "b", "c"] {
        store.push(id, BTreeMap::new());
    }

    let counter = Counter::new();
    let ticker = Arc::new(PeriodicRoutine::with_clock(
        &ctx,
        counter.clone(),
        RoutineConfig::new("ticker")
            .with_interval(Duration::from_secs(10))
            .with_recorder(recorder.clone()),
        clock.clone(),
    ));
    let drain = Arc::new(PeriodicRoutine::with_clock(
        &ctx,
        QueueDrainHandler::new("jobs", store.clone(), Accept),
        RoutineConfig::new("drain")
            .with_interval(Duration::from_secs(10))
            .with_recorder(recorder.clone()),
        clock.clone(),
    ));
    let members: Vec<Arc<dyn BackgroundRoutine>> = vec![ticker.clone(), drain.clone()];
    let workers = Arc::new(CombinedRoutine::new("workers", members));
    let routines: Vec<Arc<dyn BackgroundRoutine>> = vec![workers, Arc::new(NoopRoutine::new())];

    let monitor = tokio::spawn(monitor_routines(ctx.clone(), routines));
    clock.block_until_timers(2).await;

    assert_eq!(counter.calls(), 1);
    assert_eq!(store.completed(), ["a", "b", "c"]);
    assert!(recorder.get("ticker").unwrap().is_running());

    ctx.cancel();
    tokio::time::timeout(Duration::from_secs(1), monitor)
        .await
        .unwrap()
        .unwrap();

    assert!(ticker.is_finished());
    assert!(drain.is_finished());
    assert!(!recorder.get("drain").unwrap().is_running());
}
