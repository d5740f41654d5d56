// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for credential operations.

use thiserror::Error;

/// Errors that can occur when hashing or verifying credentials.
#[derive(Debug, Error)]
pub enum AuthError {
	/// Hashing a password or token failed
	#[error("hashing failed: {0}")]
	Hash(String),

	/// A stored hash could not be parsed
	#[error("invalid stored hash: {0}")]
	InvalidHash(String),
}

/// Result type for credential operations.
pub type Result<T> = std::result::Result<T, AuthError>;
