//! Daemon lifecycle specs
//!
//! Verify an embedded daemon starts from a config file, runs its routines
//! and leaves a final status behind.

use std::time::Duration;

use tock_daemon::{startup, Config, LifecycleError};

#[tokio::test]
async fn embedded_daemon_runs_configured_routines() {
    let dir = tempfile::tempdir().unwrap();
    let uploads = dir.path().join("uploads");
    std::fs::create_dir(&uploads).unwrap();
    let stale = uploads.join("stale.bin");
    let file = std::fs::File::create(&stale).unwrap();
    file.set_modified(std::time::SystemTime::now() - Duration::from_secs(7200))
        .unwrap();

    let config_path = dir.path().join("tock.toml");
    std::fs::write(
        &config_path,
        r#"
        [daemon]
        state_dir = "state"
        status_interval = "10ms"

        [[routine]]
        name = "uploads"
        kind = "sweep"
        interval = "10ms"
        dir = "uploads"
        max_age = "1h"
        "#,
    )
    .unwrap();
    let config = Config::load(&config_path).unwrap();

    let mut daemon = startup(&config_path, &config).unwrap();
    daemon.spawn();
    tokio::time::sleep(Duration::from_millis(100)).await;
    let status_path = daemon.paths().status_path.clone();
    daemon.shutdown().await.unwrap();

    assert!(!stale.exists());
    let status: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(status_path).unwrap()).unwrap();
    let names: Vec<&str> = status["routines"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["status", "uploads"]);
}

#[tokio::test]
async fn daemon_refuses_a_held_state_dir() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("tock.toml");
    std::fs::write(&config_path, "[daemon]\nstate_dir = \"state\"\n").unwrap();
    let config = Config::load(&config_path).unwrap();

    let first = startup(&config_path, &config).unwrap();
    assert!(matches!(
        startup(&config_path, &config),
        Err(LifecycleError::LockFailed(_))
    ));
    first.shutdown().await.unwrap();

    // Released on shutdown
    let second = startup(&config_path, &config).unwrap();
    second.shutdown().await.unwrap();
}
