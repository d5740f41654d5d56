// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! API key repository.
//!
//! Keys are stored as an Argon2 hash of the full token plus a short
//! non-secret prefix. Validation narrows candidates by prefix through
//! the index before any hash comparison runs, so cost stays independent
//! of the total key count. The plaintext token exists exactly once, in
//! the return value of [`create_api_key`](ApiKeyStore::create_api_key).

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{AnyPool, Row};
use vigil_core::ApiKey;
use vigil_server_auth::{api_key_prefix, generate_api_key, hash_api_key, verify_api_key};

use crate::dialect::Dialect;
use crate::error::Result;
use crate::row::{parse_timestamp, parse_timestamp_opt};

#[async_trait]
pub trait ApiKeyStore: Send + Sync {
	/// Create a key and return the plaintext token, the only time it
	/// is ever available.
	async fn create_api_key(&self, name: &str) -> Result<String>;
	/// Key metadata (never hashes), newest first.
	async fn list_api_keys(&self) -> Result<Vec<ApiKey>>;
	async fn delete_api_key(&self, id: i64) -> Result<()>;
	/// Two-stage validation: prefix lookup, then constant-time hash
	/// comparison per candidate. On success the last-used timestamp is
	/// recorded by a detached task that never delays or fails this call.
	async fn validate_api_key(&self, token: &str) -> Result<bool>;
}

/// Repository for API key database operations.
#[derive(Clone)]
pub struct ApiKeyRepository {
	pool: AnyPool,
	dialect: Dialect,
}

impl ApiKeyRepository {
	pub fn new(pool: AnyPool, dialect: Dialect) -> Self {
		Self { pool, dialect }
	}
}

#[async_trait]
impl ApiKeyStore for ApiKeyRepository {
	#[tracing::instrument(skip(self))]
	async fn create_api_key(&self, name: &str) -> Result<String> {
		let generated = generate_api_key();
		let hash = hash_api_key(&generated.token)?;

		sqlx::query(&self.dialect.rebind(
			"INSERT INTO api_keys (key_prefix, key_hash, name, created_at) VALUES (?, ?, ?, ?)",
		))
		.bind(&generated.prefix)
		.bind(&hash)
		.bind(name)
		.bind(Utc::now().to_rfc3339())
		.execute(&self.pool)
		.await?;

		tracing::info!(prefix = %generated.prefix, "API key created");
		Ok(generated.token)
	}

	#[tracing::instrument(skip(self))]
	async fn list_api_keys(&self) -> Result<Vec<ApiKey>> {
		let rows = sqlx::query(
			"SELECT id, key_prefix, name, created_at, last_used_at
			 FROM api_keys ORDER BY created_at DESC",
		)
		.fetch_all(&self.pool)
		.await?;

		let mut keys = Vec::with_capacity(rows.len());
		for row in &rows {
			let created_at: String = row.get("created_at");
			let last_used_at: Option<String> = row.get("last_used_at");
			keys.push(ApiKey {
				id: row.get("id"),
				key_prefix: row.get("key_prefix"),
				name: row.get("name"),
				created_at: parse_timestamp(&created_at, "created_at")?,
				last_used_at: parse_timestamp_opt(last_used_at, "last_used_at")?,
			});
		}
		Ok(keys)
	}

	#[tracing::instrument(skip(self), fields(api_key_id = id))]
	async fn delete_api_key(&self, id: i64) -> Result<()> {
		sqlx::query(&self.dialect.rebind("DELETE FROM api_keys WHERE id = ?"))
			.bind(id)
			.execute(&self.pool)
			.await?;
		Ok(())
	}

	#[tracing::instrument(skip(self, token))]
	async fn validate_api_key(&self, token: &str) -> Result<bool> {
		// Too short to carry a prefix: fail fast, no lookup.
		let Some(prefix) = api_key_prefix(token) else {
			return Ok(false);
		};

		let rows = sqlx::query(&self.dialect.rebind(
			"SELECT id, key_hash FROM api_keys WHERE key_prefix = ?",
		))
		.bind(prefix)
		.fetch_all(&self.pool)
		.await?;

		for row in &rows {
			let id: i64 = row.get("id");
			let hash: String = row.get("key_hash");

			match verify_api_key(token, &hash) {
				Ok(true) => {
					self.record_last_used(id);
					return Ok(true);
				}
				Ok(false) => {}
				Err(e) => {
					// A corrupt stored hash must not block other
					// candidates with the same prefix.
					tracing::warn!(api_key_id = id, error = %e, "skipping unverifiable API key hash");
				}
			}
		}

		Ok(false)
	}
}

impl ApiKeyRepository {
	/// Record the last-used timestamp without blocking or failing the
	/// validating caller. Errors are logged, never propagated.
	fn record_last_used(&self, id: i64) {
		let pool = self.pool.clone();
		let sql = self
			.dialect
			.rebind("UPDATE api_keys SET last_used_at = ? WHERE id = ?");

		tokio::spawn(async move {
			let result = sqlx::query(&sql)
				.bind(Utc::now().to_rfc3339())
				.bind(id)
				.execute(&pool)
				.await;
			if let Err(e) = result {
				tracing::warn!(api_key_id = id, error = %e, "failed to record API key last-used");
			}
		});
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_test_store;
	use vigil_server_auth::API_KEY_SCHEME;

	#[tokio::test]
	async fn test_create_returns_plaintext_once_and_stores_hash() {
		let store = create_test_store().await;
		let api_keys = store.api_keys();

		let token = api_keys.create_api_key("ci").await.unwrap();
		assert!(token.starts_with(API_KEY_SCHEME));

		let keys = api_keys.list_api_keys().await.unwrap();
		assert_eq!(keys.len(), 1);
		assert_eq!(keys[0].name, "ci");
		assert!(token.starts_with(&keys[0].key_prefix));
		assert!(keys[0].last_used_at.is_none());
	}

	#[tokio::test]
	async fn test_validate_accepts_only_the_real_token() {
		let store = create_test_store().await;
		let api_keys = store.api_keys();

		let token = api_keys.create_api_key("ci").await.unwrap();
		assert!(api_keys.validate_api_key(&token).await.unwrap());

		// Correct prefix, tampered suffix.
		let mut tampered = token.clone();
		let last = tampered.pop().unwrap();
		tampered.push(if last == '0' { '1' } else { '0' });
		assert!(!api_keys.validate_api_key(&tampered).await.unwrap());

		// Shorter than the prefix fails fast.
		assert!(!api_keys.validate_api_key("vg_live_").await.unwrap());
		assert!(!api_keys.validate_api_key("").await.unwrap());

		// Unknown prefix finds no candidates.
		assert!(!api_keys
			.validate_api_key("vg_live_ffffffffffffffffffffffffffffffffffffffffffffffff")
			.await
			.unwrap());
	}

	#[tokio::test]
	async fn test_deleted_key_no_longer_validates() {
		let store = create_test_store().await;
		let api_keys = store.api_keys();

		let token = api_keys.create_api_key("old").await.unwrap();
		let id = api_keys.list_api_keys().await.unwrap()[0].id;

		api_keys.delete_api_key(id).await.unwrap();
		assert!(!api_keys.validate_api_key(&token).await.unwrap());
		assert!(api_keys.list_api_keys().await.unwrap().is_empty());
	}
}
