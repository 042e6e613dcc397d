//! Routine scheduling specs
//!
//! Verify invocation timing against a fake clock.

use std::time::Duration;

use crate::prelude::*;

const TICK: Duration = Duration::from_millis(50);

#[tokio::test]
async fn first_invocation_is_immediate() {
    let clock = FakeClock::new();
    let counter = Counter::new();
    let routine = routine(counter.clone(), TICK, &clock);

    let running = start(&routine);
    clock.block_until_timers(1).await;
    assert_eq!(counter.calls(), 1);

    routine.stop().await;
    running.await.unwrap();
}

#[tokio::test]
async fn one_invocation_per_elapsed_interval() {
    let clock = FakeClock::new();
    let counter = Counter::new();
    let routine = routine(counter.clone(), TICK, &clock);

    let running = start(&routine);
    for _ in 0..4 {
        clock.block_until_timers(1).await;
        clock.advance(TICK);
    }
    clock.block_until_timers(1).await;
    // 210ms in total; the last 10ms do not complete an interval
    clock.advance(Duration::from_millis(10));

    assert_eq!(counter.calls(), 5);
    routine.stop().await;
    running.await.unwrap();
}

#[tokio::test]
async fn reinvocation_skips_the_wait() {
    let clock = FakeClock::new();
    let counter = Counter::reinvoking(3);
    let routine = routine(counter.clone(), Duration::from_secs(3600), &clock);

    let running = start(&routine);
    clock.block_until_timers(1).await;
    assert_eq!(counter.calls(), 4);

    routine.stop().await;
    running.await.unwrap();
}

#[tokio::test]
async fn endless_reinvocation_still_waits() {
    let clock = FakeClock::new();
    let counter = Counter::reinvoking(usize::MAX);
    let routine = routine(counter.clone(), Duration::from_secs(3600), &clock);

    let running = start(&routine);
    clock.block_until_timers(1).await;
    assert_eq!(counter.calls(), tock_core::MAX_CONSECUTIVE_REINVOCATIONS as usize);

    routine.stop().await;
    running.await.unwrap();
}
