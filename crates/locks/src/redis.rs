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

//! Redis-based lock store implementation.
//!
//! ## Purpose
//! Provides the production `LockStore`: lock records are Redis hashes with a
//! native millisecond TTL, and every ownership decision runs inside a Lua
//! script (see [`crate::scripts`]).
//!
//! ## Design Decisions
//! - **Why ConnectionManager**: multiplexed connection with automatic reconnection,
//!   cheap to clone per call
//! - **Why Lua scripts**: check-and-mutate must be one atomic step; `WATCH`/`MULTI`
//!   would need retries and still leave a read on the client
//! - **Why EVALSHA**: `redis::Script` sends the hash first and falls back to a full
//!   `EVAL` on `NOSCRIPT`, so scripts survive a `SCRIPT FLUSH` or failover
//!
//! ## Usage
//! ```rust,no_run
//! use arbiter_locks::{LockStore, redis::RedisLockStore};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = RedisLockStore::new("redis://localhost:6379").await?;
//! let acquired = store.try_acquire("arbiter:orders", "token", Duration::from_secs(30)).await?;
//! # Ok(())
//! # }
//! ```

use crate::scripts::{LockScripts, OWNER_FIELD};
use crate::store::{ttl_millis, LockRecord, LockStore};
use crate::{LockError, LockResult};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

/// Redis lock store.
///
/// ## Architecture
/// - Uses `redis` crate with async ConnectionManager
/// - Scripts are hashed once per store and shared by clones
#[derive(Clone)]
pub struct RedisLockStore {
    /// Redis connection manager (async, multiplexed)
    manager: ConnectionManager,
    /// Compiled Lua scripts
    scripts: Arc<LockScripts>,
}

impl RedisLockStore {
    /// Create a new Redis lock store with the given URL.
    ///
    /// Example URLs:
    /// - `redis://127.0.0.1/`
    /// - `rediss://host:6379/`
    ///
    /// ## Errors
    /// - [`LockError::BackendError`]: invalid URL or connection failure
    pub async fn new(redis_url: &str) -> LockResult<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| LockError::BackendError(format!("failed to create redis client: {e}")))?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| LockError::BackendError(format!("failed to connect redis: {e}")))?;
        Ok(Self::from_connection_manager(manager))
    }

    /// Wrap an existing connection manager.
    pub fn from_connection_manager(manager: ConnectionManager) -> Self {
        Self {
            manager,
            scripts: Arc::new(LockScripts::new()),
        }
    }
}

fn record_duration(op: &'static str, start: Instant) {
    metrics::histogram!(
        "arbiter_locks_redis_op_duration_seconds",
        "op" => op
    )
    .record(start.elapsed().as_secs_f64());
}

#[async_trait]
impl LockStore for RedisLockStore {
    #[instrument(skip(self, token), fields(ttl_ms = ttl_millis(ttl)))]
    async fn try_acquire(&self, key: &str, token: &str, ttl: Duration) -> LockResult<bool> {
        let start = Instant::now();
        let mut conn = self.manager.clone();

        let created: i64 = self
            .scripts
            .try_lock
            .key(key)
            .arg(token)
            .arg(ttl_millis(ttl))
            .invoke_async(&mut conn)
            .await?;

        record_duration("try_acquire", start);
        debug!(created, "Redis try-lock script finished");
        Ok(created == 1)
    }

    #[instrument(skip(self, token))]
    async fn release(&self, key: &str, token: &str) -> LockResult<bool> {
        let start = Instant::now();
        let mut conn = self.manager.clone();

        let deleted: i64 = self
            .scripts
            .unlock
            .key(key)
            .arg(token)
            .invoke_async(&mut conn)
            .await?;

        record_duration("release", start);
        debug!(deleted, "Redis unlock script finished");
        Ok(deleted > 0)
    }

    #[instrument(skip(self, token), fields(ttl_ms = ttl_millis(ttl)))]
    async fn refresh(&self, key: &str, token: &str, ttl: Duration) -> LockResult<bool> {
        let start = Instant::now();
        let mut conn = self.manager.clone();

        let refreshed: i64 = self
            .scripts
            .refresh
            .key(key)
            .arg(token)
            .arg(ttl_millis(ttl))
            .invoke_async(&mut conn)
            .await?;

        record_duration("refresh", start);
        debug!(refreshed, "Redis refresh script finished");
        Ok(refreshed == 1)
    }

    async fn get_record(&self, key: &str) -> LockResult<Option<LockRecord>> {
        let mut conn = self.manager.clone();

        let (owner, pttl): (Option<String>, i64) = redis::pipe()
            .atomic()
            .hget(key, OWNER_FIELD)
            .pttl(key)
            .query_async(&mut conn)
            .await?;

        Ok(owner.map(|owner| LockRecord {
            key: key.to_string(),
            owner,
            ttl: match pttl {
                ms if ms >= 0 => Some(Duration::from_millis(ms as u64)),
                _ => None, // -1: no expiry
            },
        }))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_url_is_backend_error() {
        let result = RedisLockStore::new("not a url").await;
        assert!(matches!(result, Err(LockError::BackendError(_))));
    }
}
