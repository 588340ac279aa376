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

//! # Arbiter Distributed Locks
//!
//! ## Purpose
//! Mutual exclusion across processes for a named resource, using Redis only as
//! an atomic holder of expiring records. There is no central lock manager.
//!
//! ## Architecture
//! - **Token** ([`token`]): 128-bit random owner identity per handle
//! - **Scripts** ([`scripts`]): conditional create / delete / expiry reset in Lua
//! - **Store** ([`store`]): the [`LockStore`] seam with Redis and in-memory backends
//! - **Lock** ([`lock`]): [`DistributedLock`] handle with `lock`, `try_lock`,
//!   `unlock` and `refresh`
//! - **Watchdog**: background renewal started on acquisition when enabled
//! - **Client** ([`client`]): [`LockClient`] builds namespaced handles
//!
//! ## Design Decisions
//! - **Ownership by token**: release and renewal only succeed for the token that
//!   created the record, checked inside the store
//! - **TTL everywhere**: a crashed holder's record expires on its own
//! - **Watchdog bound to a context**: renewal lasts as long as the context of the
//!   acquiring call; cancel it (or drop the handle) and the lease lapses
//! - **No reentrance**: one acquisition per handle at a time, no hold counting
//!
//! ## Backend Support
//!
//! - **InMemory**: HashMap-based (feature: `memory-backend`, for testing)
//! - **Redis**: hashes with native TTL and Lua scripts (feature: `redis-backend`)
//!
//! ## Examples
//!
//! ### Basic Usage
//! ```rust,no_run
//! use arbiter_common::OpContext;
//! use arbiter_locks::{LockClient, LockOptions};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = LockClient::connect("redis://localhost:6379").await?;
//! let lock = client.new_lock_with_options(
//!     "scheduler:leader",
//!     LockOptions::default()
//!         .with_wait_timeout(Duration::from_secs(5))
//!         .with_watchdog(true)
//!         .with_watchdog_interval(Duration::from_secs(10)),
//! )?;
//!
//! let ctx = OpContext::background();
//! lock.lock(&ctx).await?;
//! // ... long-running critical section, kept alive by the watchdog ...
//! lock.unlock(&ctx).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod lock;
pub mod logger;
pub mod options;
pub mod scripts;
pub mod store;
pub mod token;
mod watchdog;

#[cfg(feature = "memory-backend")]
pub mod memory;

#[cfg(feature = "redis-backend")]
pub mod redis;

pub use client::{LockClient, DEFAULT_KEY_PREFIX};
pub use config::{create_client_from_config, BackendType, ClientConfig};
pub use error::{LockError, LockResult};
pub use lock::{DistributedLock, LockState};
pub use logger::{Logger, NoopLogger, TracingLogger};
pub use options::LockOptions;
pub use store::{LockRecord, LockStore};

