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

//! Configuration support for lock clients.
//!
//! ## Purpose
//! Provides environment-based configuration for selecting the lock store
//! backend, the key prefix and the default lock options.
//!
//! ## Environment Variables
//!
//! ### Backend Selection
//! - `ARBITER_BACKEND`: Backend type (default: "redis")
//!   - "redis" → RedisLockStore
//!   - "memory" | "in-memory" → MemoryLockStore
//!
//! ### Redis Configuration
//! - `ARBITER_REDIS_URL`: Redis server URL (default: "redis://127.0.0.1:6379")
//! - `ARBITER_KEY_PREFIX`: Key prefix for isolation (default: "arbiter:")
//!
//! ### Lock Defaults (milliseconds)
//! - `ARBITER_LOCK_WAIT_TIMEOUT_MS` (default: 0, retry until cancelled)
//! - `ARBITER_LOCK_LEASE_MS` (default: 30000)
//! - `ARBITER_LOCK_WATCHDOG`: "true" | "false" (default: false)
//! - `ARBITER_LOCK_WATCHDOG_INTERVAL_MS` (default: 30000)
//! - `ARBITER_LOCK_RETRY_INTERVAL_MS` (default: 100)
//!
//! ## Example
//! ```bash
//! export ARBITER_REDIS_URL=redis://cache.internal:6379
//! export ARBITER_KEY_PREFIX=billing:
//! export ARBITER_LOCK_WATCHDOG=true
//! cargo run
//! ```

use crate::client::{LockClient, DEFAULT_KEY_PREFIX};
use crate::options::LockOptions;
use crate::{LockError, LockResult};
use std::sync::Arc;
use std::time::Duration;

/// Default Redis URL.
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Backend type configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendType {
    /// In-memory backend (requires memory-backend feature)
    InMemory,
    /// Redis backend (requires redis-backend feature)
    Redis {
        /// Redis server URL
        url: String,
    },
}

impl Default for BackendType {
    fn default() -> Self {
        Self::Redis {
            url: DEFAULT_REDIS_URL.to_string(),
        }
    }
}

/// Lock client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend type
    pub backend: BackendType,
    /// Prefix prepended to lock names
    pub key_prefix: String,
    /// Options for handles built with `LockClient::new_lock`
    pub lock_defaults: LockOptions,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend: BackendType::default(),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            lock_defaults: LockOptions::default(),
        }
    }
}

impl ClientConfig {
    /// Create configuration from environment variables.
    ///
    /// ## Environment Variables
    /// See module documentation for complete list.
    ///
    /// ## Errors
    /// - [`LockError::ConfigError`]: unknown backend or malformed value
    pub fn from_env() -> LockResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Create configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> LockResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = match lookup("ARBITER_BACKEND")
            .unwrap_or_else(|| "redis".to_string())
            .to_lowercase()
            .as_str()
        {
            "redis" => BackendType::Redis {
                url: lookup("ARBITER_REDIS_URL").unwrap_or_else(|| DEFAULT_REDIS_URL.to_string()),
            },
            "memory" | "in-memory" => BackendType::InMemory,
            other => {
                return Err(LockError::ConfigError(format!(
                    "unknown ARBITER_BACKEND: {}",
                    other
                )))
            }
        };

        let key_prefix =
            lookup("ARBITER_KEY_PREFIX").unwrap_or_else(|| DEFAULT_KEY_PREFIX.to_string());

        let mut options = LockOptions::default();
        if let Some(ms) = parse_millis(&lookup, "ARBITER_LOCK_WAIT_TIMEOUT_MS")? {
            options = options.with_wait_timeout(ms);
        }
        if let Some(ms) = parse_millis(&lookup, "ARBITER_LOCK_LEASE_MS")? {
            options = options.with_lease_time(ms);
        }
        if let Some(raw) = lookup("ARBITER_LOCK_WATCHDOG") {
            let enabled = raw.parse::<bool>().map_err(|_| {
                LockError::ConfigError(format!("ARBITER_LOCK_WATCHDOG must be true or false, got {}", raw))
            })?;
            options = options.with_watchdog(enabled);
        }
        if let Some(ms) = parse_millis(&lookup, "ARBITER_LOCK_WATCHDOG_INTERVAL_MS")? {
            options = options.with_watchdog_interval(ms);
        }
        if let Some(ms) = parse_millis(&lookup, "ARBITER_LOCK_RETRY_INTERVAL_MS")? {
            options = options.with_retry_interval(ms);
        }
        options.validate()?;

        Ok(Self {
            backend,
            key_prefix,
            lock_defaults: options,
        })
    }
}

fn parse_millis<F>(lookup: &F, name: &str) -> LockResult<Option<Duration>>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|e| LockError::ConfigError(format!("{} must be milliseconds: {}", name, e)))
        })
        .transpose()
}

/// Create a lock client from configuration.
///
/// ## Errors
/// - [`LockError::ConfigError`]: the backend is not compiled in
/// - [`LockError::BackendError`]: Redis connection failed
pub async fn create_client_from_config(config: ClientConfig) -> LockResult<LockClient> {
    let store: Arc<dyn crate::LockStore> = match config.backend {
        #[cfg(feature = "memory-backend")]
        BackendType::InMemory => Arc::new(crate::memory::MemoryLockStore::new()),
        #[cfg(feature = "redis-backend")]
        BackendType::Redis { url } => Arc::new(crate::redis::RedisLockStore::new(&url).await?),
        #[allow(unreachable_patterns)]
        other => {
            return Err(LockError::ConfigError(format!(
                "backend {:?} is not enabled in this build",
                other
            )))
        }
    };

    Ok(LockClient::new(store)
        .with_key_prefix(config.key_prefix)
        .with_default_options(config.lock_defaults))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(
            config.backend,
            BackendType::Redis {
                url: "redis://127.0.0.1:6379".to_string()
            }
        );
    }

    #[test]
    fn test_full_configuration() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("ARBITER_BACKEND", "redis"),
            ("ARBITER_REDIS_URL", "redis://cache:6380"),
            ("ARBITER_KEY_PREFIX", "billing:"),
            ("ARBITER_LOCK_WAIT_TIMEOUT_MS", "2000"),
            ("ARBITER_LOCK_LEASE_MS", "5000"),
            ("ARBITER_LOCK_WATCHDOG", "true"),
            ("ARBITER_LOCK_WATCHDOG_INTERVAL_MS", "900"),
            ("ARBITER_LOCK_RETRY_INTERVAL_MS", "50"),
        ]))
        .unwrap();

        assert_eq!(
            config.backend,
            BackendType::Redis {
                url: "redis://cache:6380".to_string()
            }
        );
        assert_eq!(config.key_prefix, "billing:");
        assert_eq!(
            config.lock_defaults,
            LockOptions::default()
                .with_wait_timeout(Duration::from_secs(2))
                .with_lease_time(Duration::from_secs(5))
                .with_watchdog(true)
                .with_watchdog_interval(Duration::from_millis(900))
                .with_retry_interval(Duration::from_millis(50))
        );
    }

    #[test]
    fn test_memory_backend() {
        let config = ClientConfig::from_lookup(lookup(&[("ARBITER_BACKEND", "In-Memory")])).unwrap();
        assert_eq!(config.backend, BackendType::InMemory);
    }

    #[test]
    fn test_invalid_values() {
        let unknown = ClientConfig::from_lookup(lookup(&[("ARBITER_BACKEND", "etcd")]));
        assert!(matches!(unknown, Err(LockError::ConfigError(_))));

        let bad_ms = ClientConfig::from_lookup(lookup(&[("ARBITER_LOCK_LEASE_MS", "soon")]));
        assert!(matches!(bad_ms, Err(LockError::ConfigError(_))));

        let bad_flag = ClientConfig::from_lookup(lookup(&[("ARBITER_LOCK_WATCHDOG", "yes")]));
        assert!(matches!(bad_flag, Err(LockError::ConfigError(_))));

        let zero_lease = ClientConfig::from_lookup(lookup(&[("ARBITER_LOCK_LEASE_MS", "0")]));
        assert!(matches!(zero_lease, Err(LockError::ConfigError(_))));
    }

    #[cfg(feature = "memory-backend")]
    #[tokio::test]
    async fn test_create_memory_client() {
        let config = ClientConfig {
            backend: BackendType::InMemory,
            key_prefix: "jobs:".to_string(),
            lock_defaults: LockOptions::default(),
        };

        let client = create_client_from_config(config).await.unwrap();
        assert_eq!(client.key_prefix(), "jobs:");
        assert_eq!(client.new_lock("nightly").unwrap().key(), "jobs:nightly");
    }
}
