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

//! Lock configuration.

use crate::{LockError, LockResult};
use std::time::Duration;

/// Default lease when the watchdog is disabled.
pub const DEFAULT_LEASE_TIME: Duration = Duration::from_secs(30);

/// Default watchdog interval (also the TTL sent while the watchdog runs).
pub const DEFAULT_WATCHDOG_INTERVAL: Duration = Duration::from_secs(30);

/// Default pause between acquisition attempts in `lock`.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// Smallest lease the store accepts.
const MIN_LEASE: Duration = Duration::from_millis(1);

/// Smallest watchdog interval (the tick is a third of it).
const MIN_WATCHDOG_INTERVAL: Duration = Duration::from_millis(3);

/// Options for a single lock handle, immutable once the handle is built.
///
/// ## Example
/// ```rust
/// use arbiter_locks::LockOptions;
/// use std::time::Duration;
///
/// let options = LockOptions::default()
///     .with_wait_timeout(Duration::from_secs(5))
///     .with_watchdog(true)
///     .with_watchdog_interval(Duration::from_secs(10));
///
/// assert_eq!(options.effective_lease(), Duration::from_secs(10));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockOptions {
    /// How long `lock` keeps retrying; zero retries until the context ends
    pub wait_timeout: Duration,

    /// Record TTL when the watchdog is disabled
    pub lease_time: Duration,

    /// Renew the lease in the background while held
    pub watchdog_enabled: bool,

    /// Record TTL while the watchdog is enabled; the watchdog ticks every third of it
    pub watchdog_interval: Duration,

    /// Pause between attempts in `lock`
    pub retry_interval: Duration,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            wait_timeout: Duration::ZERO,
            lease_time: DEFAULT_LEASE_TIME,
            watchdog_enabled: false,
            watchdog_interval: DEFAULT_WATCHDOG_INTERVAL,
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }
}

impl LockOptions {
    /// Set the wait timeout (builder pattern)
    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    /// Set the lease time (builder pattern)
    pub fn with_lease_time(mut self, lease_time: Duration) -> Self {
        self.lease_time = lease_time;
        self
    }

    /// Enable or disable the watchdog (builder pattern)
    pub fn with_watchdog(mut self, enabled: bool) -> Self {
        self.watchdog_enabled = enabled;
        self
    }

    /// Set the watchdog interval (builder pattern)
    pub fn with_watchdog_interval(mut self, interval: Duration) -> Self {
        self.watchdog_interval = interval;
        self
    }

    /// Set the retry interval (builder pattern)
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    /// TTL sent to the store on acquire and refresh.
    ///
    /// With the watchdog enabled this is always the watchdog interval and
    /// `lease_time` is ignored.
    pub fn effective_lease(&self) -> Duration {
        if self.watchdog_enabled {
            self.watchdog_interval
        } else {
            self.lease_time
        }
    }

    /// Period of the watchdog loop.
    ///
    /// A third of the interval, so two consecutive ticks can be missed before
    /// the TTL lapses.
    pub fn watchdog_tick(&self) -> Duration {
        self.watchdog_interval / 3
    }

    /// Reject option sets the store or the watchdog cannot honor.
    pub fn validate(&self) -> LockResult<()> {
        if self.watchdog_enabled {
            if self.watchdog_interval < MIN_WATCHDOG_INTERVAL {
                return Err(LockError::ConfigError(format!(
                    "watchdog interval must be at least {:?}, got {:?}",
                    MIN_WATCHDOG_INTERVAL, self.watchdog_interval
                )));
            }
        } else if self.lease_time < MIN_LEASE {
            return Err(LockError::ConfigError(format!(
                "lease time must be at least {:?}, got {:?}",
                MIN_LEASE, self.lease_time
            )));
        }
        if self.retry_interval.is_zero() {
            return Err(LockError::ConfigError("retry interval must be positive".to_string()));
        }
        Ok(())
    }
}
