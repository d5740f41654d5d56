// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Flat key/value settings store.
//!
//! This is the configuration channel for the scheduler and notifier:
//! confirmation threshold, cooldown minutes, flap-detection parameters,
//! retention days, SSO configuration. Values are opaque strings with
//! upsert semantics. Secret-valued keys are stored as given; masking on
//! read-back is the API layer's responsibility.

use async_trait::async_trait;
use sqlx::{AnyPool, Row};

use crate::dialect::Dialect;
use crate::error::{DbError, Result};

#[async_trait]
pub trait SettingsStore: Send + Sync {
	/// Fails with [`DbError::NotFound`] for an absent key.
	async fn get_setting(&self, key: &str) -> Result<String>;
	/// Insert or overwrite.
	async fn set_setting(&self, key: &str, value: &str) -> Result<()>;
}

/// Repository for settings database operations.
#[derive(Clone)]
pub struct SettingsRepository {
	pool: AnyPool,
	dialect: Dialect,
}

impl SettingsRepository {
	pub fn new(pool: AnyPool, dialect: Dialect) -> Self {
		Self { pool, dialect }
	}
}

#[async_trait]
impl SettingsStore for SettingsRepository {
	#[tracing::instrument(skip(self), fields(key = %key))]
	async fn get_setting(&self, key: &str) -> Result<String> {
		let row = sqlx::query(&self.dialect.rebind(
			"SELECT value FROM settings WHERE key = ?",
		))
		.bind(key)
		.fetch_optional(&self.pool)
		.await?;

		match row {
			Some(row) => Ok(row.get("value")),
			None => Err(DbError::NotFound(format!("setting {key}"))),
		}
	}

	#[tracing::instrument(skip(self, value), fields(key = %key))]
	async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
		let sql = self.dialect.upsert("settings", &["key", "value"], "key");
		sqlx::query(&self.dialect.rebind(&sql))
			.bind(key)
			.bind(value)
			.execute(&self.pool)
			.await?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_test_store;

	#[tokio::test]
	async fn test_settings_upsert_round_trip() {
		let store = create_test_store().await;
		let settings = store.settings();

		let err = settings.get_setting("retention_days").await.unwrap_err();
		assert!(matches!(err, DbError::NotFound(_)));

		settings.set_setting("retention_days", "90").await.unwrap();
		assert_eq!(settings.get_setting("retention_days").await.unwrap(), "90");

		settings.set_setting("retention_days", "30").await.unwrap();
		assert_eq!(settings.get_setting("retention_days").await.unwrap(), "30");
	}
}
