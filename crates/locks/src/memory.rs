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

//! In-memory lock store implementation (for testing).

use crate::store::{expiry_after, LockRecord, LockStore};
use crate::LockResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct Entry {
    owner: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// `Some(owner == token)` for a live record, `None` if absent or expired.
fn live_owner_matches(
    records: &HashMap<String, Entry>,
    key: &str,
    token: &str,
    now: Instant,
) -> Option<bool> {
    records
        .get(key)
        .filter(|e| e.is_live(now))
        .map(|e| e.owner == token)
}

/// In-memory lock store (for testing).
///
/// ## Purpose
/// Provides a `LockStore` with the same atomic semantics as the Redis scripts
/// for unit tests and single-process scenarios. Every operation runs under one
/// write lock, which plays the role of Redis' single-threaded script execution.
///
/// ## Limitations
/// - Not persistent (records lost on restart)
/// - Not distributed (single process only)
/// - Expired records are purged lazily, on access, like Redis passive expiry
///
/// Expiry uses `tokio::time::Instant`, so tests running on a paused clock see
/// TTLs lapse exactly when the clock is advanced.
#[derive(Clone, Default)]
pub struct MemoryLockStore {
    records: Arc<RwLock<HashMap<String, Entry>>>,
}

impl MemoryLockStore {
    /// Create a new in-memory lock store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live records (expired ones are not counted).
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.records.read().await.values().filter(|e| e.is_live(now)).count()
    }

    /// True when no live record exists.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl LockStore for MemoryLockStore {
    async fn try_acquire(&self, key: &str, token: &str, ttl: Duration) -> LockResult<bool> {
        let mut records = self.records.write().await;
        let now = Instant::now();

        if let Some(existing) = records.get(key) {
            if existing.is_live(now) {
                return Ok(false);
            }
        }

        records.insert(
            key.to_string(),
            Entry {
                owner: token.to_string(),
                expires_at: expiry_after(now, ttl),
            },
        );
        Ok(true)
    }

    async fn release(&self, key: &str, token: &str) -> LockResult<bool> {
        let mut records = self.records.write().await;
        let now = Instant::now();

        match live_owner_matches(&records, key, token, now) {
            Some(true) => {
                records.remove(key);
                Ok(true)
            }
            Some(false) => Ok(false),
            None => {
                records.remove(key);
                Ok(false)
            }
        }
    }

    async fn refresh(&self, key: &str, token: &str, ttl: Duration) -> LockResult<bool> {
        let mut records = self.records.write().await;
        let now = Instant::now();

        match live_owner_matches(&records, key, token, now) {
            Some(true) => {
                if let Some(existing) = records.get_mut(key) {
                    existing.expires_at = expiry_after(now, ttl);
                }
                Ok(true)
            }
            Some(false) => Ok(false),
            None => {
                records.remove(key);
                Ok(false)
            }
        }
    }

    async fn get_record(&self, key: &str) -> LockResult<Option<LockRecord>> {
        let records = self.records.read().await;
        let now = Instant::now();

        Ok(records.get(key).filter(|e| e.is_live(now)).map(|e| LockRecord {
            key: key.to_string(),
            owner: e.owner.clone(),
            ttl: Some(e.expires_at - now),
        }))
    }
}
