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

//! Lock client: builds namespaced lock handles over one store.

use crate::lock::DistributedLock;
use crate::logger::{Logger, TracingLogger};
use crate::options::LockOptions;
use crate::store::{LockRecord, LockStore};
use crate::LockResult;
use std::fmt;
use std::sync::Arc;

/// Prefix prepended to every lock name unless overridden.
pub const DEFAULT_KEY_PREFIX: &str = "arbiter:";

/// Factory for [`DistributedLock`] handles.
///
/// ## Purpose
/// Holds the store connection, the key prefix and the logger, so callers only
/// name the resource they want to lock. Cloning is cheap; clones share the
/// store and logger.
///
/// ## Example
/// ```rust,no_run
/// use arbiter_locks::{LockClient, LockOptions, NoopLogger, redis::RedisLockStore};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = RedisLockStore::new("redis://localhost:6379").await?;
/// let client = LockClient::new(Arc::new(store))
///     .with_key_prefix("billing:")
///     .with_logger(Arc::new(NoopLogger));
///
/// let lock = client.new_lock_with_options(
///     "invoice-42",
///     LockOptions::default().with_wait_timeout(Duration::from_secs(2)),
/// )?;
/// assert_eq!(lock.key(), "billing:invoice-42");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LockClient {
    store: Arc<dyn LockStore>,
    logger: Arc<dyn Logger>,
    prefix: String,
    defaults: LockOptions,
}

impl LockClient {
    /// Create a client with the default prefix, `TracingLogger` and default options.
    pub fn new(store: Arc<dyn LockStore>) -> Self {
        Self {
            store,
            logger: Arc::new(TracingLogger),
            prefix: DEFAULT_KEY_PREFIX.to_string(),
            defaults: LockOptions::default(),
        }
    }

    /// Connect to Redis and create a client over it.
    #[cfg(feature = "redis-backend")]
    pub async fn connect(redis_url: &str) -> LockResult<Self> {
        let store = crate::redis::RedisLockStore::new(redis_url).await?;
        Ok(Self::new(Arc::new(store)))
    }

    /// Set the logger (builder pattern)
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    /// Set the key prefix (builder pattern)
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set the options used by [`LockClient::new_lock`] (builder pattern)
    pub fn with_default_options(mut self, options: LockOptions) -> Self {
        self.defaults = options;
        self
    }

    /// Key prefix applied to lock names.
    pub fn key_prefix(&self) -> &str {
        &self.prefix
    }

    /// Options used by [`LockClient::new_lock`].
    pub fn default_options(&self) -> &LockOptions {
        &self.defaults
    }

    /// Full store key for a lock name.
    pub fn key_for(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    /// Create a handle for `name` with the client's default options.
    ///
    /// ## Errors
    /// - [`crate::LockError::ConfigError`]: invalid default options
    /// - [`crate::LockError::IdentityGeneration`]: no token could be generated
    pub fn new_lock(&self, name: &str) -> LockResult<DistributedLock> {
        self.new_lock_with_options(name, self.defaults.clone())
    }

    /// Create a handle for `name` with explicit options.
    pub fn new_lock_with_options(
        &self,
        name: &str,
        options: LockOptions,
    ) -> LockResult<DistributedLock> {
        DistributedLock::new(
            self.key_for(name),
            options,
            Arc::clone(&self.store),
            Arc::clone(&self.logger),
        )
    }

    /// Read the current record for `name`, if any.
    pub async fn get_record(&self, name: &str) -> LockResult<Option<LockRecord>> {
        self.store.get_record(&self.key_for(name)).await
    }
}

impl fmt::Debug for LockClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockClient")
            .field("prefix", &self.prefix)
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}
