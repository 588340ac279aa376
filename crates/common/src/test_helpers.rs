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

//! Test helpers for integration tests against a live Redis
//!
//! Provides utilities to check if Redis is reachable before running
//! integration tests, so suites can skip instead of failing.

use std::time::Duration;
use tokio::time::timeout;
use ulid::Ulid;

/// Default Redis URL used by integration tests
pub const DEFAULT_TEST_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Get the Redis URL for tests (from env or default)
pub fn get_redis_url() -> String {
    std::env::var("ARBITER_TEST_REDIS_URL")
        .or_else(|_| std::env::var("ARBITER_REDIS_URL"))
        .unwrap_or_else(|_| DEFAULT_TEST_REDIS_URL.to_string())
}

/// Check if Redis answers PING at the test URL
pub async fn redis_available() -> bool {
    check_redis_health(&get_redis_url(), Duration::from_secs(2)).await
}

/// Check if a Redis server is available by sending PING
async fn check_redis_health(url: &str, timeout_duration: Duration) -> bool {
    let client = match redis::Client::open(url) {
        Ok(c) => c,
        Err(_) => return false,
    };

    let ping = async {
        let mut conn = client.get_multiplexed_async_connection().await?;
        redis::cmd("PING").query_async::<String>(&mut conn).await
    };

    matches!(timeout(timeout_duration, ping).await, Ok(Ok(_)))
}

/// Generate a unique lock name for testing
pub fn unique_name(prefix: &str) -> String {
    format!("{}-{}", prefix, Ulid::new())
}
