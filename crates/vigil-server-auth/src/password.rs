// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Password hashing and verification.
//!
//! Hashes are PHC strings (`$argon2id$...`) with a per-hash random salt,
//! so the same password never produces the same stored value twice.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};

use crate::argon2_config::argon2_instance;
use crate::error::{AuthError, Result};

/// Hash a password for storage.
pub fn hash_password(password: &str) -> Result<String> {
	let salt = SaltString::generate(&mut OsRng);

	argon2_instance()
		.hash_password(password.as_bytes(), &salt)
		.map(|hash| hash.to_string())
		.map_err(|e| AuthError::Hash(e.to_string()))
}

/// Verify a password against a stored hash.
///
/// Returns `Ok(false)` on mismatch; the underlying comparison is
/// constant-time. An unparseable stored hash is an error, not a mismatch.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
	let parsed = PasswordHash::new(hash).map_err(|e| AuthError::InvalidHash(e.to_string()))?;

	Ok(argon2_instance()
		.verify_password(password.as_bytes(), &parsed)
		.is_ok())
}
