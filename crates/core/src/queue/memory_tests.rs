// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::clock::FakeClock;
use yare::parameterized;

fn data(branch: &str) -> BTreeMap<String, String> {
    [("branch".to_string(), branch.to_string())]
        .into_iter()
        .collect()
}

#[tokio::test]
async fn dequeue_returns_none_when_empty() {
    let store = MemoryQueueStore::new();
    assert!(store.dequeue().await.unwrap().is_none());
}

#[tokio::test]
async fn dequeue_is_fifo_and_claims() {
    let store = MemoryQueueStore::new();
    store.push("a", data("feature-a"));
    store.push("b", data("feature-b"));

    let first = store.dequeue().await.unwrap().unwrap();
    assert_eq!(first.id, "a");
    assert_eq!(first.attempts, 1);
    assert_eq!(first.data.get("branch").map(String::as_str), Some("feature-a"));
    assert_eq!(store.ready_len(), 1);
    assert_eq!(store.claimed_len(), 1);
}

#[tokio::test]
async fn mark_complete_releases_claim() {
    let store = MemoryQueueStore::new();
    store.push("a", data("x"));
    let record = store.dequeue().await.unwrap().unwrap();

    store.mark_complete(&record.id).await.unwrap();

    assert_eq!(store.claimed_len(), 0);
    assert_eq!(store.completed(), ["a"]);
}

#[tokio::test]
async fn unclaimed_record_is_rejected() {
    let store = MemoryQueueStore::new();
    let err = store.mark_complete("missing").await.unwrap_err();
    assert!(matches!(err, QueueError::NotClaimed(id) if id == "missing"));
    assert!(store.heartbeat("missing").await.is_err());
}

#[parameterized(
    first_failure_requeues = { 2, 1, 0 },
    below_limit_requeues = { 3, 2, 0 },
    at_limit_dead_letters = { 2, 2, 1 },
)]
fn failures_requeue_until_max_attempts(max_attempts: u32, failures: u32, expected_dead: usize) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    rt.block_on(async {
        let store = MemoryQueueStore::new().with_max_attempts(max_attempts);
        store.push("a", data("x"));

        for _ in 0..failures {
            let record = store.dequeue().await.unwrap().unwrap();
            store.mark_failed(&record.id, "boom").await.unwrap();
        }

        assert_eq!(store.dead_letters().len(), expected_dead);
        assert_eq!(store.ready_len(), 1 - expected_dead);
    });
}

#[tokio::test]
async fn dead_letter_keeps_reason() {
    let store = MemoryQueueStore::new().with_max_attempts(1);
    store.push("a", data("x"));
    let record = store.dequeue().await.unwrap().unwrap();
    store.mark_failed(&record.id, "merge conflict").await.unwrap();

    let dead = store.dead_letters();
    assert_eq!(dead[0].record.id, "a");
    assert_eq!(dead[0].reason, "merge conflict");
}

#[tokio::test]
async fn reset_stalled_requeues_silent_claims() {
    let clock = FakeClock::new();
    let store = MemoryQueueStore::with_clock(clock.clone());
    store.push("quiet", data("x"));
    store.push("busy", data("y"));

    let quiet = store.dequeue().await.unwrap().unwrap();
    let busy = store.dequeue().await.unwrap().unwrap();

    clock.advance(Duration::from_secs(20));
    store.heartbeat(&busy.id).await.unwrap();
    clock.advance(Duration::from_secs(15));

    let reset = store.reset_stalled(Duration::from_secs(30)).await.unwrap();

    assert_eq!(reset, 1);
    assert_eq!(store.claimed_len(), 1);
    let requeued = store.dequeue().await.unwrap().unwrap();
    assert_eq!(requeued.id, quiet.id);
    assert_eq!(requeued.attempts, 2);
}
