// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

/// A domain error that keeps the handler error as its source
#[derive(Debug, Error)]
#[error("batch step failed")]
struct StepError(#[source] HandlerError);

fn sourced(inner: HandlerError) -> HandlerError {
    HandlerError::other(StepError(inner))
}

#[parameterized(
    bare = { HandlerError::ReinvokeImmediately },
    boxed = { HandlerError::other(HandlerError::ReinvokeImmediately) },
    boxed_twice = { HandlerError::other(HandlerError::other(HandlerError::ReinvokeImmediately)) },
    as_source = { sourced(HandlerError::ReinvokeImmediately) },
)]
fn reinvoke_is_found_through_wrapping(err: HandlerError) {
    assert!(err.is_reinvoke());
    assert!(!err.is_cancelled());
}

#[parameterized(
    bare = { HandlerError::Cancelled },
    boxed = { HandlerError::other(HandlerError::Cancelled) },
    as_source = { sourced(HandlerError::Cancelled) },
    source_of_boxed = { HandlerError::other(StepError(HandlerError::other(HandlerError::Cancelled))) },
)]
fn cancellation_is_found_through_wrapping(err: HandlerError) {
    assert!(err.is_cancelled());
    assert!(!err.is_reinvoke());
}

#[parameterized(
    failed = { HandlerError::failed("disk full") },
    io = { HandlerError::from(std::io::Error::other("broken pipe")) },
    queue = { HandlerError::from(QueueError::Unavailable("down".to_string())) },
    wrapped_failure = { sourced(HandlerError::failed("inner")) },
)]
fn ordinary_failures_are_not_signals(err: HandlerError) {
    assert!(!err.is_reinvoke());
    assert!(!err.is_cancelled());
}
