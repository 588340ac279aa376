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

//! Ownership token generation.
//!
//! Each lock handle carries one token for its whole life. The token is the only
//! proof of ownership the atomic scripts accept, so it must be unpredictable:
//! it is drawn from the OS random source and never falls back to a weaker one.

use crate::{LockError, LockResult};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::rngs::OsRng;
use rand::RngCore;

/// Number of random bytes in a token (128 bits).
pub const TOKEN_BYTES: usize = 16;

/// Generate a fresh base64-encoded ownership token.
///
/// ## Errors
/// - [`LockError::IdentityGeneration`]: the OS random source failed
pub fn generate_token() -> LockResult<String> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| LockError::IdentityGeneration(e.to_string()))?;
    Ok(STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_token_shape() {
        let token = generate_token().unwrap();

        // 16 bytes encode to 24 base64 characters including padding
        assert_eq!(token.len(), 24);
        assert_eq!(STANDARD.decode(&token).unwrap().len(), TOKEN_BYTES);
    }

    #[test]
    fn test_tokens_are_unique() {
        let tokens: HashSet<String> = (0..1000).map(|_| generate_token().unwrap()).collect();
        assert_eq!(tokens.len(), 1000);
    }
}
