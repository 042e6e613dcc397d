// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types returned by handlers and collaborators

use thiserror::Error;

/// Outcome of a failed or redirected handler invocation
///
/// `Cancelled` and `ReinvokeImmediately` are control signals rather than
/// failures; the run loop recognises them by variant.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The context passed to the handler was cancelled
    #[error("context cancelled")]
    Cancelled,
    /// Skip the interval wait and invoke the handler again right away
    #[error("reinvoke immediately")]
    ReinvokeImmediately,
    #[error("{0}")]
    Failed(String),
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl HandlerError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    pub fn other<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Other(Box::new(err))
    }

    /// True if this error is, or wraps, [`HandlerError::Cancelled`]
    pub fn is_cancelled(&self) -> bool {
        self.chain_contains(|e| matches!(e, Self::Cancelled))
    }

    /// True if this error is, or wraps, [`HandlerError::ReinvokeImmediately`]
    pub fn is_reinvoke(&self) -> bool {
        self.chain_contains(|e| matches!(e, Self::ReinvokeImmediately))
    }

    /// Walk `Other` payloads and `source()` links looking for a match
    fn chain_contains(&self, pred: fn(&HandlerError) -> bool) -> bool {
        let mut current: &(dyn std::error::Error + 'static) = self;
        loop {
            if let Some(err) = current.downcast_ref::<HandlerError>() {
                if pred(err) {
                    return true;
                }
                // `Other` is transparent, so its `source()` skips the payload itself
                if let HandlerError::Other(inner) = err {
                    current = inner.as_ref();
                    continue;
                }
            }
            match current.source() {
                Some(next) => current = next,
                None => return false,
            }
        }
    }
}

impl From<std::io::Error> for HandlerError {
    fn from(err: std::io::Error) -> Self {
        Self::other(err)
    }
}

/// Errors from a recorder; always logged and swallowed by routines
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("routine not registered: {0}")]
    UnknownRoutine(String),
    #[error("recorder unavailable: {0}")]
    Unavailable(String),
}

/// Errors from a work queue store
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("record not claimed: {0}")]
    NotClaimed(String),
    #[error("queue store unavailable: {0}")]
    Unavailable(String),
}

impl From<QueueError> for HandlerError {
    fn from(err: QueueError) -> Self {
        Self::other(err)
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
