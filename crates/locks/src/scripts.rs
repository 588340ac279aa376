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

//! Lua scripts for the three atomic lock operations.
//!
//! Redis runs each script as one indivisible step, so the ownership check and
//! the mutation that follows it can never interleave with another client.
//!
//! The record is a hash with a single `owner` field:
//! ```text
//! KEYS[1] = namespaced lock key
//! ARGV[1] = owner token
//! ARGV[2] = TTL in milliseconds (create and refresh only)
//! ```
//! Every script returns 1 on success and 0 when it left the record untouched.

/// Hash field holding the owner token.
pub const OWNER_FIELD: &str = "owner";

/// Create the record with a TTL if and only if the key is absent.
pub const TRY_LOCK: &str = r#"
if redis.call('exists', KEYS[1]) == 0 then
    redis.call('hset', KEYS[1], 'owner', ARGV[1])
    redis.call('pexpire', KEYS[1], ARGV[2])
    return 1
end
return 0
"#;

/// Delete the record if and only if `owner` matches the token.
pub const UNLOCK: &str = r#"
if redis.call('hget', KEYS[1], 'owner') == ARGV[1] then
    return redis.call('del', KEYS[1])
end
return 0
"#;

/// Reset the TTL if and only if `owner` matches the token.
pub const REFRESH: &str = r#"
if redis.call('hget', KEYS[1], 'owner') == ARGV[1] then
    return redis.call('pexpire', KEYS[1], ARGV[2])
end
return 0
"#;

/// Compiled scripts, hashed once so calls go through `EVALSHA`.
#[cfg(feature = "redis-backend")]
pub(crate) struct LockScripts {
    pub(crate) try_lock: redis::Script,
    pub(crate) unlock: redis::Script,
    pub(crate) refresh: redis::Script,
}

#[cfg(feature = "redis-backend")]
impl LockScripts {
    pub(crate) fn new() -> Self {
        Self {
            try_lock: redis::Script::new(TRY_LOCK),
            unlock: redis::Script::new(UNLOCK),
            refresh: redis::Script::new(REFRESH),
        }
    }
}
