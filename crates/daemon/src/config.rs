// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration file
//!
//! ```toml
//! [daemon]
//! state_dir = "/var/lib/tock"
//! status_interval = "10s"
//!
//! [[routine]]
//! name = "tmp-sweep"
//! kind = "sweep"
//! interval = "5m"
//! dir = "/tmp/uploads"
//! max_age = "1h"
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Name reserved for the built-in status routine
pub const STATUS_ROUTINE: &str = "status";

/// Files removed by a sweep per invocation when `batch_size` is not set
pub const DEFAULT_BATCH_SIZE: usize = 100;

const DEFAULT_STATUS_INTERVAL: Duration = Duration::from_secs(10);

/// Errors that can occur while loading the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config at {0}: {1}")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error("Could not determine state directory")]
    NoStateDir,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default, rename = "routine")]
    pub routines: Vec<RoutineConfig>,
}

/// The `[daemon]` table
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DaemonConfig {
    /// Directory for the lock file, log and status file
    pub state_dir: Option<PathBuf>,
    /// Log file; defaults to `daemon.log` in the state directory
    pub log_file: Option<PathBuf>,
    /// How often the status file is rewritten
    #[serde(with = "humantime_serde")]
    pub status_interval: Duration,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            state_dir: None,
            log_file: None,
            status_interval: DEFAULT_STATUS_INTERVAL,
        }
    }
}

/// One `[[routine]]` entry
#[derive(Debug, Clone, Deserialize)]
pub struct RoutineConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Falls back to the core default interval when absent
    #[serde(with = "humantime_serde", default)]
    pub interval: Option<Duration>,
    #[serde(flatten)]
    pub job: JobConfig,
}

/// What a routine does, selected by its `kind` field
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum JobConfig {
    /// Delete files in `dir` older than `max_age`
    Sweep {
        dir: PathBuf,
        #[serde(with = "humantime_serde")]
        max_age: Duration,
        #[serde(default = "default_batch_size")]
        batch_size: usize,
    },
    /// Write the current time to `path`
    Heartbeat { path: PathBuf },
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl JobConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            JobConfig::Sweep { .. } => "sweep",
            JobConfig::Heartbeat { .. } => "heartbeat",
        }
    }
}

impl Config {
    /// Read, parse and validate a config file
    ///
    /// Relative paths inside the file are resolved against the file's
    /// directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        let mut config = Self::parse(&content)?;
        if let Some(base) = path.parent() {
            config.resolve_relative(base);
        }
        Ok(config)
    }

    /// Parse and validate config text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.daemon.status_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "daemon.status_interval must be greater than zero".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for routine in &self.routines {
            let name = routine.name.trim();
            if name.is_empty() {
                return Err(ConfigError::Invalid("routine name is empty".to_string()));
            }
            if name == STATUS_ROUTINE {
                return Err(ConfigError::Invalid(format!(
                    "routine name '{}' is reserved",
                    STATUS_ROUTINE
                )));
            }
            if !seen.insert(name) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate routine name '{}'",
                    name
                )));
            }
            if routine.interval.is_some_and(|i| i.is_zero()) {
                return Err(ConfigError::Invalid(format!(
                    "routine '{}': interval must be greater than zero",
                    name
                )));
            }
            if let JobConfig::Sweep { batch_size: 0, .. } = routine.job {
                return Err(ConfigError::Invalid(format!(
                    "routine '{}': batch_size must be greater than zero",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Look up a routine entry by name
    pub fn routine(&self, name: &str) -> Option<&RoutineConfig> {
        self.routines.iter().find(|r| r.name == name)
    }

    /// The configured state directory, or `$XDG_STATE_HOME/tock`, or
    /// `~/.local/state/tock`
    pub fn state_dir(&self) -> Result<PathBuf, ConfigError> {
        if let Some(dir) = &self.daemon.state_dir {
            return Ok(dir.clone());
        }
        if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
            return Ok(PathBuf::from(xdg).join("tock"));
        }
        let home = std::env::var("HOME").map_err(|_| ConfigError::NoStateDir)?;
        Ok(PathBuf::from(home).join(".local/state/tock"))
    }

    fn resolve_relative(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };

        if let Some(dir) = self.daemon.state_dir.as_mut() {
            resolve(dir);
        }
        if let Some(file) = self.daemon.log_file.as_mut() {
            resolve(file);
        }
        for routine in &mut self.routines {
            match &mut routine.job {
                JobConfig::Sweep { dir, .. } => resolve(dir),
                JobConfig::Heartbeat { path } => resolve(path),
            }
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
