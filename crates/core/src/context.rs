// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cancellable execution context handed to handlers

use std::future::Future;
use std::ops::Deref;
use std::time::Duration;

use tokio_util::sync::{CancellationToken, DropGuard};

use crate::clock::Clock;
use crate::error::HandlerError;

/// Cooperative cancellation signal
///
/// Cancelling a context cancels every context derived from it with
/// [`Context::child`], never the other way round.
#[derive(Clone, Debug, Default)]
pub struct Context {
    token: CancellationToken,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive a context that is cancelled along with this one but can also be
    /// cancelled on its own
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the context is cancelled
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// `Err(HandlerError::Cancelled)` once cancelled, `Ok(())` otherwise
    pub fn err(&self) -> Result<(), HandlerError> {
        if self.is_cancelled() {
            Err(HandlerError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Drive `fut` to completion unless the context is cancelled first
    pub async fn run_until_cancelled<F>(&self, fut: F) -> Result<F::Output, HandlerError>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(HandlerError::Cancelled),
            output = fut => Ok(output),
        }
    }

    /// Derive a child context that is also cancelled once `timeout` elapses
    /// on `clock`
    ///
    /// The child is cancelled when the returned guard is dropped. Must be
    /// called from within a tokio runtime.
    pub fn with_timeout<C: Clock>(&self, clock: &C, timeout: Duration) -> TimeoutContext {
        let child = self.child();
        let deadline = clock.after(timeout);
        let token = child.token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = deadline => token.cancel(),
            }
        });

        let guard = child.token.clone().drop_guard();
        TimeoutContext {
            ctx: child,
            _guard: guard,
        }
    }
}

impl From<CancellationToken> for Context {
    fn from(token: CancellationToken) -> Self {
        Self { token }
    }
}

/// A context bounded by a deadline; see [`Context::with_timeout`]
pub struct TimeoutContext {
    ctx: Context,
    _guard: DropGuard,
}

impl Deref for TimeoutContext {
    type Target = Context;

    fn deref(&self) -> &Context {
        &self.ctx
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
