// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handler contract for recurring units of work
//!
//! A [`Handler`] is invoked repeatedly by a
//! [`PeriodicRoutine`](crate::PeriodicRoutine). The error-reporting and
//! shutdown hooks are optional capabilities with no-op defaults.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::Context;
use crate::error::HandlerError;

/// A unit of recurring work
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Perform one unit of work
    ///
    /// Implementations must observe `ctx` and return
    /// [`HandlerError::Cancelled`] promptly once it is cancelled; shutdown
    /// waits for the in-flight invocation. Return
    /// [`HandlerError::ReinvokeImmediately`] to skip the next interval wait.
    async fn handle(&self, ctx: &Context) -> Result<(), HandlerError>;

    /// Report a failed invocation. The routine keeps running afterwards.
    fn handle_error(&self, _err: &HandlerError) {}

    /// Called exactly once after the run loop has stopped for good
    async fn on_shutdown(&self) {}
}

#[async_trait]
impl<H: Handler + ?Sized> Handler for Arc<H> {
    async fn handle(&self, ctx: &Context) -> Result<(), HandlerError> {
        (**self).handle(ctx).await
    }

    fn handle_error(&self, err: &HandlerError) {
        (**self).handle_error(err)
    }

    async fn on_shutdown(&self) {
        (**self).on_shutdown().await
    }
}

/// Handler backed by an async closure
pub struct HandlerFn<F> {
    f: F,
}

/// Wrap an async closure as a [`Handler`]
///
/// Errors returned by the closure are dropped; implement [`Handler`]
/// directly to report them.
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    HandlerFn { f }
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    async fn handle(&self, ctx: &Context) -> Result<(), HandlerError> {
        (self.f)(ctx.clone()).await
    }
}
