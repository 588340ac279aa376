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

//! Background lease renewal.
//!
//! A watchdog is spawned by a successful `try_lock` when the handle's options
//! enable it. Every `watchdog_interval / 3` it refreshes the record through
//! the handle's own refresh path (under the handle mutex). It stops on the
//! first of:
//! - `unlock` raising the stop signal (or the handle being dropped)
//! - the context of the call that acquired the lock ending
//! - a failed refresh, after which the handle is `Lost`
//!
//! Errors never leave the task; they are logged and counted.

use crate::lock::{LockShared, LockState};
use crate::store::expiry_after;
use arbiter_common::{ContextError, OpContext};
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Handle to a running watchdog task.
pub(crate) struct Watchdog {
    stop: CancellationToken,
    handle: JoinHandle<()>,
}

impl Watchdog {
    pub(crate) fn spawn(lock: Arc<LockShared>, ctx: OpContext, stop: CancellationToken) -> Self {
        let handle = tokio::spawn(run(lock, ctx, stop.clone()));
        Self { stop, handle }
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Signal the task to stop and wait until it has exited.
    pub(crate) async fn stop(self, lock: &LockShared, ctx: &OpContext) {
        self.stop.cancel();
        if let Err(e) = self.handle.await {
            lock.logger.error(
                ctx,
                format_args!("Watchdog task for lock: {} did not exit cleanly: {}", lock.key, e),
            );
        }
    }
}

#[derive(Debug)]
enum StopReason {
    Stopped,
    ContextEnded(ContextError),
    RefreshFailed,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Stopped => write!(f, "stop requested"),
            StopReason::ContextEnded(err) => write!(f, "{}", err),
            StopReason::RefreshFailed => write!(f, "refresh failed"),
        }
    }
}

async fn run(lock: Arc<LockShared>, ctx: OpContext, stop: CancellationToken) {
    let period = lock.options.watchdog_tick();
    let mut ticker = interval_at(expiry_after(Instant::now(), period), period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    lock.logger
        .debug(&ctx, format_args!("Watchdog started for lock: {}", lock.key));

    let reason = loop {
        tokio::select! {
            biased;
            _ = stop.cancelled() => break StopReason::Stopped,
            err = ctx.done() => break StopReason::ContextEnded(err),
            _ = ticker.tick() => {}
        }

        let mut inner = tokio::select! {
            biased;
            _ = stop.cancelled() => break StopReason::Stopped,
            err = ctx.done() => break StopReason::ContextEnded(err),
            guard = lock.inner.lock() => guard,
        };

        match lock.refresh_locked(&mut inner, &ctx).await {
            Ok(()) => {}
            Err(crate::LockError::Context(err)) => break StopReason::ContextEnded(err),
            Err(e) => {
                inner.state = LockState::Lost;
                lock.logger.error(
                    &ctx,
                    format_args!("Watchdog failed to refresh lock: {}, error: {}", lock.key, e),
                );
                metrics::counter!("arbiter_locks_watchdog_failures_total").increment(1);
                break StopReason::RefreshFailed;
            }
        }
    };

    lock.logger.debug(
        &ctx,
        format_args!("Watchdog stopped for lock: {} ({})", lock.key, reason),
    );
}
