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

//! Lock handle: the acquisition protocol and ownership state machine.
//!
//! ## States
//! ```text
//! Idle --try_lock/lock--> Held --unlock--> Idle
//!                          |
//!                          +--watchdog or refresh/unlock finds record gone--> Lost
//! ```
//! `Lost` is terminal: `try_lock`, `lock` and `refresh` return
//! [`LockError::LockLost`] and the caller builds a new handle. `unlock` stays
//! callable on every state, reports [`LockError::NotHeld`] when nothing is
//! owned, and only ever moves `Held` to `Idle`.
//!
//! ## Reentrance
//! A handle acquires at most once at a time. Acquisition only checks whether
//! the record exists, so a second `try_lock` on a held handle (or a fresh
//! handle for the same name) returns `Ok(false)`, like any other contender.
//! There is no hold counting.
//!
//! ## Concurrency
//! All operations on one handle, including the watchdog's refreshes, are
//! serialized by the handle's async mutex. Different handles share nothing
//! client-side; exclusion between them comes from the store alone.

use crate::logger::Logger;
use crate::options::LockOptions;
use crate::store::LockStore;
use crate::token::generate_token;
use crate::watchdog::Watchdog;
use crate::{LockError, LockResult};
use arbiter_common::OpContext;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Ownership state of a lock handle, as last observed by the handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    /// Never acquired, or released
    Idle,
    /// The record was created with this handle's token
    Held,
    /// The lease lapsed or was taken over while held
    Lost,
}

pub(crate) struct LockInner {
    pub(crate) state: LockState,
    watchdog: Option<Watchdog>,
}

/// State shared between a handle and its watchdog task.
pub(crate) struct LockShared {
    pub(crate) key: String,
    token: String,
    pub(crate) options: LockOptions,
    store: Arc<dyn LockStore>,
    pub(crate) logger: Arc<dyn Logger>,
    pub(crate) inner: Mutex<LockInner>,
    /// Cancelled when the handle is dropped
    closed: CancellationToken,
}

impl LockShared {
    /// Run a store call, giving up when the context ends.
    async fn call<T, F>(&self, ctx: &OpContext, fut: F) -> LockResult<T>
    where
        F: Future<Output = LockResult<T>>,
    {
        ctx.run(fut).await?
    }

    async fn guard(&self, ctx: &OpContext) -> LockResult<MutexGuard<'_, LockInner>> {
        Ok(ctx.run(self.inner.lock()).await?)
    }

    fn log_failure(&self, ctx: &OpContext, action: &str, err: &LockError) {
        if err.is_cancelled() {
            self.logger
                .debug(ctx, format_args!("Context ended while {} lock: {}", action, self.key));
        } else {
            self.logger.error(
                ctx,
                format_args!("Error {} lock: {}, error: {}", action, self.key, err),
            );
        }
    }

    async fn try_lock_locked(
        self: &Arc<Self>,
        inner: &mut LockInner,
        ctx: &OpContext,
    ) -> LockResult<bool> {
        if inner.state == LockState::Lost {
            return Err(LockError::LockLost(self.key.clone()));
        }

        let lease = self.options.effective_lease();
        let acquired = match self
            .call(ctx, self.store.try_acquire(&self.key, &self.token, lease))
            .await
        {
            Ok(acquired) => acquired,
            Err(e) => {
                self.log_failure(ctx, "acquiring", &e);
                metrics::counter!("arbiter_locks_acquire_total", "result" => "error").increment(1);
                return Err(e);
            }
        };

        if !acquired {
            metrics::counter!("arbiter_locks_acquire_total", "result" => "contended").increment(1);
            return Ok(false);
        }

        inner.state = LockState::Held;
        metrics::counter!("arbiter_locks_acquire_total", "result" => "acquired").increment(1);

        // One watchdog per acquisition; a finished one (context ended) may be replaced.
        let running = inner.watchdog.as_ref().is_some_and(|w| !w.is_finished());
        if self.options.watchdog_enabled && !running {
            self.logger
                .debug(ctx, format_args!("Starting watchdog for lock: {}", self.key));
            inner.watchdog = Some(Watchdog::spawn(
                Arc::clone(self),
                ctx.clone(),
                self.closed.child_token(),
            ));
        }

        Ok(true)
    }

    pub(crate) async fn refresh_locked(
        &self,
        inner: &mut LockInner,
        ctx: &OpContext,
    ) -> LockResult<()> {
        if inner.state == LockState::Lost {
            return Err(LockError::LockLost(self.key.clone()));
        }

        let lease = self.options.effective_lease();
        let refreshed = match self
            .call(ctx, self.store.refresh(&self.key, &self.token, lease))
            .await
        {
            Ok(refreshed) => refreshed,
            Err(e) => {
                self.log_failure(ctx, "refreshing", &e);
                metrics::counter!("arbiter_locks_refresh_total", "result" => "error").increment(1);
                return Err(e);
            }
        };

        if !refreshed {
            if inner.state == LockState::Held {
                inner.state = LockState::Lost;
            }
            metrics::counter!("arbiter_locks_refresh_total", "result" => "not_held").increment(1);
            return Err(LockError::NotHeld(self.key.clone()));
        }

        metrics::counter!("arbiter_locks_refresh_total", "result" => "refreshed").increment(1);
        Ok(())
    }
}

/// A distributed lock handle for one named resource.
///
/// Built by [`crate::LockClient::new_lock`]. The handle owns a random token
/// for its whole life; only that token can release or refresh the record it
/// created.
///
/// ## Watchdog lifetime
/// When the watchdog is enabled, automatic renewal lasts only as long as the
/// context passed to the `lock`/`try_lock` call that acquired the lock stays
/// live. Cancelling that context stops renewal and the lease then lapses in
/// the store. Dropping the handle stops renewal as well.
///
/// ## Example
/// ```rust,no_run
/// use arbiter_common::OpContext;
/// use arbiter_locks::{LockClient, LockOptions, memory::MemoryLockStore};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = LockClient::new(Arc::new(MemoryLockStore::new()));
/// let lock = client.new_lock("orders")?;
/// let ctx = OpContext::background();
///
/// lock.lock(&ctx).await?;
/// // critical section
/// lock.unlock(&ctx).await?;
/// # Ok(())
/// # }
/// ```
pub struct DistributedLock {
    shared: Arc<LockShared>,
}

impl DistributedLock {
    pub(crate) fn new(
        key: String,
        options: LockOptions,
        store: Arc<dyn LockStore>,
        logger: Arc<dyn Logger>,
    ) -> LockResult<Self> {
        options.validate()?;
        let token = generate_token()?;

        Ok(Self {
            shared: Arc::new(LockShared {
                key,
                token,
                options,
                store,
                logger,
                inner: Mutex::new(LockInner {
                    state: LockState::Idle,
                    watchdog: None,
                }),
                closed: CancellationToken::new(),
            }),
        })
    }

    /// Namespaced key of the remote record.
    pub fn key(&self) -> &str {
        &self.shared.key
    }

    /// Ownership token stored in the record while held.
    pub fn token(&self) -> &str {
        &self.shared.token
    }

    /// Options this handle was built with.
    pub fn options(&self) -> &LockOptions {
        &self.shared.options
    }

    /// Current state as last observed by this handle.
    pub async fn state(&self) -> LockState {
        self.shared.inner.lock().await.state
    }

    /// True while a watchdog task is renewing the lease.
    pub async fn watchdog_running(&self) -> bool {
        self.shared
            .inner
            .lock()
            .await
            .watchdog
            .as_ref()
            .is_some_and(|w| !w.is_finished())
    }

    /// Acquire the lock, polling until it succeeds.
    ///
    /// ## Behavior
    /// - Retries every `retry_interval` (100 ms by default)
    /// - With a non-zero `wait_timeout`, gives up once the deadline computed at
    ///   call start has passed
    /// - With a zero `wait_timeout`, retries until `ctx` ends
    ///
    /// ## Returns
    /// - `Ok(())`: lock acquired
    /// - `Err(LockError::WaitTimeout)`: wait timeout elapsed
    /// - `Err(LockError::Context)`: `ctx` was cancelled or hit its deadline
    /// - `Err(LockError::LockLost)`: this handle already lost its lease
    /// - `Err(LockError::BackendError)`: backend error
    pub async fn lock(&self, ctx: &OpContext) -> LockResult<()> {
        let shared = &self.shared;
        let start = Instant::now();
        // A wait too large to represent as an instant behaves like no limit.
        let deadline = (!shared.options.wait_timeout.is_zero())
            .then(|| start.checked_add(shared.options.wait_timeout))
            .flatten();

        shared
            .logger
            .debug(ctx, format_args!("Attempting to acquire lock: {}", shared.key));

        let mut attempts: u64 = 0;
        loop {
            attempts += 1;
            if self.try_lock(ctx).await? {
                shared.logger.info(
                    ctx,
                    format_args!("Successfully acquired lock: {} after {} attempt(s)", shared.key, attempts),
                );
                metrics::histogram!("arbiter_locks_wait_duration_seconds")
                    .record(start.elapsed().as_secs_f64());
                return Ok(());
            }

            let mut pause = shared.options.retry_interval;
            if let Some(deadline) = deadline {
                let now = Instant::now();
                if now >= deadline {
                    shared
                        .logger
                        .warn(ctx, format_args!("Timeout waiting for lock: {}", shared.key));
                    metrics::counter!("arbiter_locks_wait_timeouts_total").increment(1);
                    return Err(LockError::WaitTimeout(shared.key.clone()));
                }
                pause = pause.min(deadline - now);
            }

            if let Err(err) = ctx.run(tokio::time::sleep(pause)).await {
                shared.logger.debug(
                    ctx,
                    format_args!("Context ended while waiting for lock: {}", shared.key),
                );
                return Err(err.into());
            }
        }
    }

    /// Make exactly one acquisition attempt.
    ///
    /// On success with the watchdog enabled, starts renewal bound to `ctx`.
    ///
    /// ## Returns
    /// - `Ok(true)`: lock acquired
    /// - `Ok(false)`: the record exists (held by anyone, this handle included)
    /// - `Err(LockError::LockLost)`: this handle already lost its lease
    /// - `Err(LockError::BackendError)`: backend error
    pub async fn try_lock(&self, ctx: &OpContext) -> LockResult<bool> {
        let mut inner = self.shared.guard(ctx).await?;
        self.shared.try_lock_locked(&mut inner, ctx).await
    }

    /// Release the lock.
    ///
    /// Stops the watchdog and waits for it to finish before deleting, so no
    /// renewal can race the delete. Only a `Held` handle returns to `Idle`; a
    /// `Lost` handle still deletes a record its token owns but stays `Lost`.
    ///
    /// ## Returns
    /// - `Ok(())`: record deleted
    /// - `Err(LockError::NotHeld)`: record absent or owned by another token
    /// - `Err(LockError::BackendError)`: backend error
    pub async fn unlock(&self, ctx: &OpContext) -> LockResult<()> {
        let shared = &self.shared;
        let mut inner = shared.guard(ctx).await?;

        shared
            .logger
            .debug(ctx, format_args!("Releasing lock: {}", shared.key));

        if let Some(watchdog) = inner.watchdog.take() {
            watchdog.stop(shared, ctx).await;
        }

        let released = match shared
            .call(ctx, shared.store.release(&shared.key, &shared.token))
            .await
        {
            Ok(released) => released,
            Err(e) => {
                shared.log_failure(ctx, "releasing", &e);
                metrics::counter!("arbiter_locks_release_total", "result" => "error").increment(1);
                return Err(e);
            }
        };

        if !released {
            if inner.state == LockState::Held {
                inner.state = LockState::Lost;
            }
            metrics::counter!("arbiter_locks_release_total", "result" => "not_held").increment(1);
            return Err(LockError::NotHeld(shared.key.clone()));
        }

        // A Lost handle stays Lost even when its token still owned the record.
        if inner.state == LockState::Held {
            inner.state = LockState::Idle;
        }
        metrics::counter!("arbiter_locks_release_total", "result" => "released").increment(1);
        shared
            .logger
            .info(ctx, format_args!("Released lock: {}", shared.key));
        Ok(())
    }

    /// Reset the record's TTL to the effective lease.
    ///
    /// ## Returns
    /// - `Ok(())`: TTL reset
    /// - `Err(LockError::NotHeld)`: the lock was lost (expired or taken over)
    /// - `Err(LockError::LockLost)`: this handle is already `Lost`; the store
    ///   is not contacted
    /// - `Err(LockError::BackendError)`: backend error
    pub async fn refresh(&self, ctx: &OpContext) -> LockResult<()> {
        let mut inner = self.shared.guard(ctx).await?;
        self.shared.refresh_locked(&mut inner, ctx).await
    }
}

impl Drop for DistributedLock {
    fn drop(&mut self) {
        self.shared.closed.cancel();
    }
}

impl fmt::Debug for DistributedLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DistributedLock")
            .field("key", &self.shared.key)
            .field("options", &self.shared.options)
            .finish_non_exhaustive()
    }
}
