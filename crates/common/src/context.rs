// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (C) 2025 Shahzad A. Bhatti <bhatti@plexobject.com>
//
// This file is part of Arbiter.
//
// Arbiter is free software: you can redistribute it and/or modify
// it under the terms of the GNU Lesser General Public License as published by
// the Free Software Foundation, either version 2.1 of the License, or
// (at your option) any later version.
//
// Arbiter is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public License
// along with Arbiter. If not, see <https://www.gnu.org/licenses/>.

//! Operation Context (Go-style context.Context)
//!
//! ## Purpose
//! Carries cancellation, an optional deadline, and request metadata through every
//! blocking lock operation.
//!
//! ## Design Philosophy
//! - **Cancellation**: backed by a `CancellationToken`; clones share the same token
//! - **Deadlines**: measured on `tokio::time::Instant` so paused-clock tests are exact
//! - **Hierarchy**: `child()` contexts end when their parent ends, never the reverse
//! - **Tracing**: request_id and correlation_id for log correlation

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use ulid::Ulid;

/// Reason a context ended.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextError {
    /// The context (or one of its ancestors) was cancelled
    #[error("context cancelled")]
    Cancelled,

    /// The context deadline passed
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Operation context (Go-style context.Context)
///
/// ## Usage Pattern
/// ```rust
/// use arbiter_common::OpContext;
/// use std::time::Duration;
///
/// # async fn example() {
/// let ctx = OpContext::background().with_timeout(Duration::from_secs(5));
/// let result = ctx.run(async { 42 }).await;
/// assert_eq!(result, Ok(42));
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct OpContext {
    /// Request ID (for tracing)
    request_id: String,

    /// Correlation ID (for distributed tracing)
    correlation_id: Option<String>,

    /// Metadata (extensible key-value pairs)
    metadata: HashMap<String, String>,

    /// Cancellation signal shared by all clones
    token: CancellationToken,

    /// Absolute deadline, if any
    deadline: Option<Instant>,
}

impl OpContext {
    /// Create a root context that never ends unless cancelled.
    pub fn background() -> Self {
        Self {
            request_id: Ulid::new().to_string(),
            correlation_id: None,
            metadata: HashMap::new(),
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    /// Derive a context whose cancellation does not propagate back to `self`.
    ///
    /// Cancelling `self` still ends the child.
    pub fn child(&self) -> Self {
        Self {
            request_id: self.request_id.clone(),
            correlation_id: self.correlation_id.clone(),
            metadata: self.metadata.clone(),
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Set a deadline `timeout` from now (builder pattern).
    ///
    /// An earlier existing deadline is kept. A timeout too large to represent
    /// as an instant adds no deadline.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self,
        }
    }

    /// Set an absolute deadline (builder pattern).
    ///
    /// An earlier existing deadline is kept.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        });
        self
    }

    /// Set correlation_id (builder pattern)
    pub fn with_correlation_id(mut self, correlation_id: String) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    /// Add metadata (builder pattern)
    pub fn with_metadata(mut self, key: String, value: String) -> Self {
        self.metadata.insert(key, value);
        self
    }

    /// Cancel this context and every child derived from it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Why the context ended, or `None` while it is still live.
    ///
    /// Cancellation wins over an expired deadline.
    pub fn err(&self) -> Option<ContextError> {
        if self.token.is_cancelled() {
            return Some(ContextError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    /// True once the context is cancelled or past its deadline.
    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// Wait until the context ends and report why.
    pub async fn done(&self) -> ContextError {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    _ = self.token.cancelled() => ContextError::Cancelled,
                    _ = tokio::time::sleep_until(deadline) => ContextError::DeadlineExceeded,
                }
            }
            None => {
                self.token.cancelled().await;
                ContextError::Cancelled
            }
        }
    }

    /// Drive `fut` to completion unless the context ends first.
    ///
    /// A context that has already ended never polls `fut`.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, ContextError>
    where
        F: Future,
    {
        if let Some(err) = self.err() {
            return Err(err);
        }
        tokio::select! {
            biased;
            err = self.done() => Err(err),
            output = fut => Ok(output),
        }
    }

    /// Get the deadline, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Get request_id
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Get correlation_id
    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    /// Get metadata value
    pub fn get_metadata(&self, key: &str) -> Option<&String> {
        self.metadata.get(key)
    }
}

impl Default for OpContext {
    fn default() -> Self {
        Self::background()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_context() {
        let ctx = OpContext::background();

        assert!(!ctx.request_id().is_empty());
        assert_eq!(ctx.correlation_id(), None);
        assert_eq!(ctx.deadline(), None);
        assert_eq!(ctx.err(), None);
    }

    #[test]
    fn test_builders() {
        let ctx = OpContext::background()
            .with_correlation_id("corr-1".to_string())
            .with_metadata("owner".to_string(), "worker-7".to_string());

        assert_eq!(ctx.correlation_id(), Some("corr-1"));
        assert_eq!(ctx.get_metadata("owner"), Some(&"worker-7".to_string()));
        assert_eq!(ctx.get_metadata("missing"), None);
    }

    #[test]
    fn test_cancel_is_shared_by_clones() {
        let ctx = OpContext::background();
        let clone = ctx.clone();

        clone.cancel();

        assert_eq!(ctx.err(), Some(ContextError::Cancelled));
    }

    #[test]
    fn test_child_cancellation_flows_down_only() {
        let parent = OpContext::background();
        let child = parent.child();

        child.cancel();
        assert!(child.is_done());
        assert!(!parent.is_done());

        let other_child = parent.child();
        parent.cancel();
        assert_eq!(other_child.err(), Some(ContextError::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_earlier_deadline_is_kept() {
        let ctx = OpContext::background()
            .with_timeout(Duration::from_secs(1))
            .with_timeout(Duration::from_secs(10));

        let expected = Instant::now() + Duration::from_secs(1);
        assert_eq!(ctx.deadline(), Some(expected));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrepresentable_timeout_adds_no_deadline() {
        let ctx = OpContext::background().with_timeout(Duration::MAX);
        assert_eq!(ctx.deadline(), None);

        let bounded = OpContext::background()
            .with_timeout(Duration::from_secs(1))
            .with_timeout(Duration::MAX);
        assert_eq!(bounded.deadline(), Some(Instant::now() + Duration::from_secs(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_exceeded() {
        let ctx = OpContext::background().with_timeout(Duration::from_millis(50));

        assert_eq!(ctx.done().await, ContextError::DeadlineExceeded);
        assert_eq!(ctx.err(), Some(ContextError::DeadlineExceeded));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_aborts_on_deadline() {
        let ctx = OpContext::background().with_timeout(Duration::from_millis(100));

        let result = ctx.run(tokio::time::sleep(Duration::from_secs(5))).await;

        assert_eq!(result, Err(ContextError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_run_skips_future_when_already_cancelled() {
        let ctx = OpContext::background();
        ctx.cancel();

        let polled = std::sync::atomic::AtomicBool::new(false);
        let result = ctx
            .run(async {
                polled.store(true, std::sync::atomic::Ordering::SeqCst);
            })
            .await;

        assert_eq!(result, Err(ContextError::Cancelled));
        assert!(!polled.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_run_returns_output() {
        let ctx = OpContext::background();

        assert_eq!(ctx.run(async { "done" }).await, Ok("done"));
    }
}
