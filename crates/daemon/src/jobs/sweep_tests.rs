// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::fs::File;
use tempfile::TempDir;

const HOUR: Duration = Duration::from_secs(3600);

/// Create a file whose modification time is `age` in the past
fn aged_file(dir: &TempDir, name: &str, age: Duration) -> PathBuf {
    let path = dir.path().join(name);
    let file = File::create(&path).unwrap();
    file.set_modified(SystemTime::now() - age).unwrap();
    path
}

fn remaining(dir: &TempDir) -> usize {
    std::fs::read_dir(dir.path()).unwrap().count()
}

#[tokio::test]
async fn missing_directory_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let handler = SweepHandler::new(dir.path().join("absent"), HOUR, 10);
    assert!(handler.handle(&Context::new()).await.is_ok());
}

#[tokio::test]
async fn removes_only_expired_files() {
    let dir = tempfile::tempdir().unwrap();
    let old = aged_file(&dir, "old.log", 2 * HOUR);
    let fresh = aged_file(&dir, "fresh.log", Duration::from_secs(60));
    std::fs::create_dir(dir.path().join("nested")).unwrap();

    let handler = SweepHandler::new(dir.path().to_path_buf(), HOUR, 10);
    handler.handle(&Context::new()).await.unwrap();

    assert!(!old.exists());
    assert!(fresh.exists());
    assert!(dir.path().join("nested").exists());
    assert_eq!(handler.deleted(), 1);
}

#[tokio::test]
async fn large_backlog_requests_reinvocation() {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..5 {
        aged_file(&dir, &format!("f{}", i), 2 * HOUR);
    }
    let handler = SweepHandler::new(dir.path().to_path_buf(), HOUR, 2);
    let ctx = Context::new();

    assert!(matches!(
        handler.handle(&ctx).await,
        Err(HandlerError::ReinvokeImmediately)
    ));
    assert_eq!(remaining(&dir), 3);

    assert!(matches!(
        handler.handle(&ctx).await,
        Err(HandlerError::ReinvokeImmediately)
    ));
    assert_eq!(remaining(&dir), 1);

    assert!(handler.handle(&ctx).await.is_ok());
    assert_eq!(remaining(&dir), 0);
    assert_eq!(handler.deleted(), 5);
}

#[tokio::test]
async fn oldest_files_go_first() {
    let dir = tempfile::tempdir().unwrap();
    let oldest = aged_file(&dir, "b", 5 * HOUR);
    let older = aged_file(&dir, "a", 2 * HOUR);

    let handler = SweepHandler::new(dir.path().to_path_buf(), HOUR, 1);
    let _ = handler.handle(&Context::new()).await;

    assert!(!oldest.exists());
    assert!(older.exists());
}

#[tokio::test]
async fn cancelled_context_deletes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let old = aged_file(&dir, "old", 2 * HOUR);
    let ctx = Context::new();
    ctx.cancel();

    let handler = SweepHandler::new(dir.path().to_path_buf(), HOUR, 10);
    let result = handler.handle(&ctx).await;

    assert!(matches!(result, Err(HandlerError::Cancelled)));
    assert!(old.exists());
}

#[test]
fn interrupted_batch_still_counts_removed_files() {
    let dir = tempfile::tempdir().unwrap();
    let first = aged_file(&dir, "first", 2 * HOUR);
    // A directory cannot be removed as a file, so the batch stops here
    let blocker = dir.path().join("blocker");
    std::fs::create_dir(&blocker).unwrap();
    let last = aged_file(&dir, "last", 2 * HOUR);

    let handler = SweepHandler::new(dir.path().to_path_buf(), HOUR, 10);
    let batch = [first.as_path(), blocker.as_path(), last.as_path()];
    let result = handler.remove_batch(&Context::new(), &batch, 3);

    assert!(result.is_err());
    assert!(!first.exists());
    assert!(last.exists());
    assert_eq!(handler.deleted(), 1);
}

#[test]
fn cancelled_batch_counts_nothing_it_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let old = aged_file(&dir, "old", 2 * HOUR);
    let ctx = Context::new();
    ctx.cancel();

    let handler = SweepHandler::new(dir.path().to_path_buf(), HOUR, 10);
    let result = handler.remove_batch(&ctx, &[old.as_path()], 1);

    assert!(matches!(result, Err(HandlerError::Cancelled)));
    assert!(old.exists());
    assert_eq!(handler.deleted(), 0);
}
