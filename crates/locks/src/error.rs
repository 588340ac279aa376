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

//! Error types for distributed lock operations.

use arbiter_common::ContextError;
use thiserror::Error;

/// Result type for lock operations.
pub type LockResult<T> = Result<T, LockError>;

/// Errors that can occur during lock operations.
///
/// Ordinary contention is not an error: `try_lock` reports it as `Ok(false)`.
#[derive(Error, Debug)]
pub enum LockError {
    /// `lock` gave up after its configured wait timeout
    #[error("Timed out waiting for lock: {0}")]
    WaitTimeout(String),

    /// The caller's operation context ended
    #[error("Operation context ended: {0}")]
    Context(#[from] ContextError),

    /// The remote record is absent or owned by another token
    #[error("Lock not held: {0}")]
    NotHeld(String),

    /// The handle lost its lease and cannot acquire again
    #[error("Lock lost, create a new handle to retry: {0}")]
    LockLost(String),

    /// Backend error (network, protocol, script failure)
    #[error("Backend error: {0}")]
    BackendError(String),

    /// The OS random source could not produce an ownership token
    #[error("Identity generation failed: {0}")]
    IdentityGeneration(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl LockError {
    /// True for [`LockError::WaitTimeout`].
    pub fn is_timeout(&self) -> bool {
        matches!(self, LockError::WaitTimeout(_))
    }

    /// True when the caller's context was cancelled or hit its deadline.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, LockError::Context(_))
    }

    /// True for [`LockError::NotHeld`].
    pub fn is_not_held(&self) -> bool {
        matches!(self, LockError::NotHeld(_))
    }
}

#[cfg(feature = "redis-backend")]
impl From<redis::RedisError> for LockError {
    fn from(err: redis::RedisError) -> Self {
        LockError::BackendError(format!("Redis error: {}", err))
    }
}
