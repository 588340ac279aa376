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

//! Arbiter: distributed locks over Redis
//!
//! Core design:
//! - Redis is only an atomic holder of expiring records; there is no lock server
//! - Every handle owns a random token, and only that token releases or renews
//! - A crashed holder's record expires on its own
//! - An optional watchdog renews the lease while the acquiring context is live
//!
//! Member crates:
//! 1. `arbiter-common`: operation context (cancellation, deadlines, request ids)
//! 2. `arbiter-locks`: scripts, stores, lock handles and the watchdog
//!
//! ## Example
//! ```rust,no_run
//! use arbiter::{LockClient, LockOptions, OpContext};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = LockClient::connect("redis://127.0.0.1:6379").await?;
//! let lock = client.new_lock_with_options(
//!     "reports:nightly",
//!     LockOptions::default().with_wait_timeout(Duration::from_secs(3)),
//! )?;
//!
//! let ctx = OpContext::background();
//! lock.lock(&ctx).await?;
//! // critical section
//! lock.unlock(&ctx).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

// Independent crates - re-export them here
pub use arbiter_common as common;
pub use arbiter_locks as locks;

pub use arbiter_common::{ContextError, OpContext};
pub use arbiter_locks::{
    create_client_from_config, BackendType, ClientConfig, DistributedLock, LockClient, LockError,
    LockOptions, LockResult, LockState,
};
