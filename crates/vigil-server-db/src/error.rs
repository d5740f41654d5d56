// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error taxonomy for the storage layer.
//!
//! Repositories surface these unchanged; only facade-level transactional
//! operations fold a mid-transaction failure into rollback plus a single
//! surfaced error. Absent rows that are not failures (expired session,
//! unknown slug) are `Ok(None)`, not `NotFound`.

#[derive(Debug, thiserror::Error)]
pub enum DbError {
	/// Query execution or connection failure, always propagated.
	#[error("database error: {0}")]
	Sqlx(#[from] sqlx::Error),

	/// A row the operation requires does not exist.
	#[error("not found: {0}")]
	NotFound(String),

	/// Credential present but wrong, distinct from `NotFound`.
	#[error("invalid credential")]
	InvalidCredential,

	/// Out-of-range or malformed input rejected before touching the engine.
	#[error("validation: {0}")]
	Validation(String),

	/// Unique-constraint or account-linking conflict.
	#[error("conflict: {0}")]
	Conflict(String),

	/// Serialization error
	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	/// Invalid data read back from the store.
	#[error("internal: {0}")]
	Internal(String),
}

impl From<vigil_server_auth::AuthError> for DbError {
	fn from(err: vigil_server_auth::AuthError) -> Self {
		DbError::Internal(err.to_string())
	}
}

impl From<vigil_core::CoreError> for DbError {
	fn from(err: vigil_core::CoreError) -> Self {
		DbError::Internal(err.to_string())
	}
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Fold a unique-constraint violation into [`DbError::Conflict`]; every
/// other engine error passes through as [`DbError::Sqlx`].
pub(crate) fn map_unique_violation(err: sqlx::Error, what: &str) -> DbError {
	if err
		.as_database_error()
		.is_some_and(|e| e.is_unique_violation())
	{
		DbError::Conflict(what.to_string())
	} else {
		DbError::Sqlx(err)
	}
}
