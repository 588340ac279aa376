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

//! Lock store trait: the atomic operations every backend must provide.

use crate::LockResult;
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;

/// Upper bound on any lease or deadline, roughly 30 years.
pub(crate) const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Snapshot of a remote lock record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockRecord {
    /// Namespaced key
    pub key: String,
    /// Token of the current holder
    pub owner: String,
    /// Remaining time to live (`None` if the record has no expiry)
    pub ttl: Option<Duration>,
}

/// Trait for the shared store holding lock records.
///
/// ## Purpose
/// Each mutating method is one atomic step on the store. Callers never read a
/// record and then write it in a separate call; every ownership decision is
/// made inside the store.
///
/// ## Design
/// - **try_acquire**: conditional create with expiry
/// - **release**: conditional delete
/// - **refresh**: conditional expiry reset
/// - **get_record**: read-only inspection, never used to make ownership decisions
///
/// ## Example
/// ```rust,ignore
/// use arbiter_locks::{LockStore, memory::MemoryLockStore};
///
/// let store = MemoryLockStore::new();
/// assert!(store.try_acquire("arbiter:orders", "token-a", ttl).await?);
/// assert!(!store.try_acquire("arbiter:orders", "token-b", ttl).await?);
/// assert!(store.release("arbiter:orders", "token-a").await?);
/// ```
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Create the record for `key` owned by `token` with `ttl`, if absent.
    ///
    /// ## Returns
    /// - `Ok(true)`: record created
    /// - `Ok(false)`: a record already exists (held by anyone, including `token`)
    /// - `Err(LockError::BackendError)`: backend error
    async fn try_acquire(&self, key: &str, token: &str, ttl: Duration) -> LockResult<bool>;

    /// Delete the record for `key` if it is owned by `token`.
    ///
    /// ## Returns
    /// - `Ok(true)`: record deleted
    /// - `Ok(false)`: record absent or owned by another token (untouched)
    async fn release(&self, key: &str, token: &str) -> LockResult<bool>;

    /// Reset the TTL of the record for `key` to `ttl` if it is owned by `token`.
    ///
    /// ## Returns
    /// - `Ok(true)`: TTL reset
    /// - `Ok(false)`: record absent or owned by another token (untouched)
    async fn refresh(&self, key: &str, token: &str, ttl: Duration) -> LockResult<bool>;

    /// Read the current record (non-atomic with respect to later calls).
    async fn get_record(&self, key: &str) -> LockResult<Option<LockRecord>>;
}

/// Convert a lease to whole milliseconds for the store, within 1 ms..=`FAR_FUTURE`.
pub(crate) fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.min(FAR_FUTURE).as_millis())
        .unwrap_or(u64::MAX)
        .max(1)
}

/// `now + ttl`, clamped to `FAR_FUTURE` so huge leases cannot overflow.
pub(crate) fn expiry_after(now: Instant, ttl: Duration) -> Instant {
    now.checked_add(ttl.min(FAR_FUTURE))
        .unwrap_or_else(|| now + FAR_FUTURE)
}
