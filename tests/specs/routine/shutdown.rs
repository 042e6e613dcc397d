//! Routine shutdown specs
//!
//! Verify stop semantics and recorder reporting.

use std::sync::Arc;
use std::time::Duration;

use crate::prelude::*;

#[tokio::test]
async fn stop_during_wait_returns_promptly() {
    let clock = FakeClock::new();
    let counter = Counter::new();
    let routine = routine(counter.clone(), Duration::from_secs(3600), &clock);

    let running = start(&routine);
    clock.block_until_timers(1).await;

    tokio::time::timeout(Duration::from_secs(1), routine.stop())
        .await
        .unwrap();
    running.await.unwrap();
    assert!(routine.is_finished());
    assert_eq!(counter.calls(), 1);
}

#[tokio::test]
async fn cancelled_parent_means_no_invocation() {
    let clock = FakeClock::new();
    let parent = Context::new();
    parent.cancel();
    let counter = Counter::new();
    let routine = Arc::new(PeriodicRoutine::with_clock(
        &parent,
        counter.clone(),
        RoutineConfig::new("late"),
        clock,
    ));

    routine.start().await;

    assert_eq!(counter.calls(), 0);
    assert!(routine.is_finished());
}

#[tokio::test]
async fn recorder_sees_full_lifecycle() {
    let clock = FakeClock::new();
    let recorder = Arc::new(FakeRecorder::new());
    let counter = Counter::new();
    let routine = Arc::new(PeriodicRoutine::with_clock(
        &Context::new(),
        counter.clone(),
        RoutineConfig::new("recorded")
            .with_interval(Duration::from_secs(1))
            .with_recorder(recorder.clone()),
        clock.clone(),
    ));

    let running = start(&routine);
    clock.block_until_timers(1).await;
    clock.advance(Duration::from_secs(1));
    clock.block_until_timers(1).await;
    routine.stop().await;
    running.await.unwrap();

    let calls = recorder.calls();
    assert!(matches!(
        calls.first(),
        Some(RecorderCall::SaveKnown { name }) if name == "recorded"
    ));
    assert!(matches!(calls.get(1), Some(RecorderCall::Start { .. })));
    assert!(matches!(calls.last(), Some(RecorderCall::Stop { .. })));
    assert_eq!(recorder.runs(), 2);
}

#[tokio::test]
async fn failing_recorder_never_stops_the_routine() {
    let clock = FakeClock::new();
    let counter = Counter::new();
    let routine = Arc::new(PeriodicRoutine::with_clock(
        &Context::new(),
        counter.clone(),
        RoutineConfig::new("unrecorded")
            .with_interval(Duration::from_secs(1))
            .with_recorder(Arc::new(FakeRecorder::failing())),
        clock.clone(),
    ));

    let running = start(&routine);
    for _ in 0..3 {
        clock.block_until_timers(1).await;
        clock.advance(Duration::from_secs(1));
    }
    clock.block_until_timers(1).await;
    routine.stop().await;
    running.await.unwrap();

    assert_eq!(counter.calls(), 4);
}
