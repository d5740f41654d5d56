// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! API and session token generation.
//!
//! API tokens have the shape `vg_live_<48 hex chars>`. The leading
//! [`API_KEY_PREFIX_LEN`] characters form a non-secret prefix that is
//! stored in plaintext and indexed, so validation can narrow the
//! candidate set before running the expensive hash comparison. The full
//! token is hashed with Argon2 and never persisted.

use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::Result;
use crate::password::{hash_password, verify_password};

/// Scheme tag prepended to every generated API token.
pub const API_KEY_SCHEME: &str = "vg_live_";

/// Length of the non-secret lookup prefix: the scheme tag plus the first
/// four hex characters of the random material.
pub const API_KEY_PREFIX_LEN: usize = 12;

/// Random bytes backing an API token (48 hex chars once encoded).
const API_KEY_RANDOM_BYTES: usize = 24;

/// Random bytes backing a session token (64 hex chars once encoded).
const SESSION_TOKEN_BYTES: usize = 32;

/// A freshly generated API token and its lookup prefix.
///
/// `token` is the only copy of the plaintext secret that will ever
/// exist; callers hand it to the user once and store only the hash.
#[derive(Debug)]
pub struct GeneratedApiKey {
	pub token: String,
	pub prefix: String,
}

/// Generate a new API token from CSPRNG material.
pub fn generate_api_key() -> GeneratedApiKey {
	let mut bytes = [0u8; API_KEY_RANDOM_BYTES];
	OsRng.fill_bytes(&mut bytes);

	let token = format!("{}{}", API_KEY_SCHEME, hex::encode(bytes));
	let prefix = token[..API_KEY_PREFIX_LEN].to_string();

	GeneratedApiKey { token, prefix }
}

/// Extract the lookup prefix from a presented token, if it is long enough.
pub fn api_key_prefix(token: &str) -> Option<&str> {
	if token.len() < API_KEY_PREFIX_LEN || !token.is_char_boundary(API_KEY_PREFIX_LEN) {
		return None;
	}
	Some(&token[..API_KEY_PREFIX_LEN])
}

/// Hash a full API token for storage.
pub fn hash_api_key(token: &str) -> Result<String> {
	hash_password(token)
}

/// Verify a presented token against a stored hash in constant time.
pub fn verify_api_key(token: &str, hash: &str) -> Result<bool> {
	verify_password(token, hash)
}

/// Generate an opaque bearer token for a dashboard session.
pub fn generate_session_token() -> String {
	let mut bytes = [0u8; SESSION_TOKEN_BYTES];
	OsRng.fill_bytes(&mut bytes);
	hex::encode(bytes)
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;
	use std::collections::HashSet;

	#[test]
	fn test_api_key_shape() {
		let key = generate_api_key();
		assert!(key.token.starts_with(API_KEY_SCHEME));
		assert_eq!(key.token.len(), API_KEY_SCHEME.len() + API_KEY_RANDOM_BYTES * 2);
		assert_eq!(key.prefix.len(), API_KEY_PREFIX_LEN);
		assert!(key.token.starts_with(&key.prefix));
	}

	#[test]
	fn test_prefix_extraction() {
		let key = generate_api_key();
		assert_eq!(api_key_prefix(&key.token), Some(key.prefix.as_str()));
		assert_eq!(api_key_prefix("vg_live_"), None);
		assert_eq!(api_key_prefix(""), None);
	}

	#[test]
	fn test_hash_and_verify_token() {
		let key = generate_api_key();
		let hash = hash_api_key(&key.token).unwrap();

		assert!(verify_api_key(&key.token, &hash).unwrap());

		// Same prefix, tampered suffix must fail.
		let mut tampered = key.token.clone();
		tampered.pop();
		tampered.push('0');
		if tampered != key.token {
			assert!(!verify_api_key(&tampered, &hash).unwrap());
		}
	}

	#[test]
	fn test_session_token_shape() {
		let token = generate_session_token();
		assert_eq!(token.len(), SESSION_TOKEN_BYTES * 2);
		assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
	}

	proptest! {
		#[test]
		fn generated_keys_are_unique(count in 1..64usize) {
			let mut seen = HashSet::new();
			for _ in 0..count {
				let key = generate_api_key();
				prop_assert!(seen.insert(key.token), "generated duplicate API token");
			}
		}

		#[test]
		fn short_tokens_never_yield_a_prefix(s in "[a-zA-Z0-9_]{0,11}") {
			prop_assert!(api_key_prefix(&s).is_none());
		}
	}
}
