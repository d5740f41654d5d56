// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Notification channel repository. The channel `config` blob is opaque
//! here; senders own its schema.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{AnyPool, Row};
use vigil_core::NotificationChannel;

use crate::dialect::Dialect;
use crate::error::Result;
use crate::row::parse_timestamp;

#[async_trait]
pub trait ChannelStore: Send + Sync {
	async fn create_channel(&self, channel: &NotificationChannel) -> Result<()>;
	/// All channels, newest first.
	async fn list_channels(&self) -> Result<Vec<NotificationChannel>>;
	async fn delete_channel(&self, id: &str) -> Result<()>;
}

/// Repository for notification channel database operations.
#[derive(Clone)]
pub struct ChannelRepository {
	pool: AnyPool,
	dialect: Dialect,
}

impl ChannelRepository {
	pub fn new(pool: AnyPool, dialect: Dialect) -> Self {
		Self { pool, dialect }
	}
}

#[async_trait]
impl ChannelStore for ChannelRepository {
	#[tracing::instrument(skip(self, channel), fields(channel_id = %channel.id, kind = %channel.kind))]
	async fn create_channel(&self, channel: &NotificationChannel) -> Result<()> {
		sqlx::query(&self.dialect.rebind(
			"INSERT INTO notification_channels (id, kind, name, config, enabled, created_at)
			 VALUES (?, ?, ?, ?, ?, ?)",
		))
		.bind(&channel.id)
		.bind(&channel.kind)
		.bind(&channel.name)
		.bind(&channel.config)
		.bind(i64::from(channel.enabled))
		.bind(Utc::now().to_rfc3339())
		.execute(&self.pool)
		.await?;

		tracing::debug!(channel_id = %channel.id, "notification channel created");
		Ok(())
	}

	#[tracing::instrument(skip(self))]
	async fn list_channels(&self) -> Result<Vec<NotificationChannel>> {
		let rows = sqlx::query(
			"SELECT id, kind, name, config, enabled, created_at
			 FROM notification_channels ORDER BY created_at DESC",
		)
		.fetch_all(&self.pool)
		.await?;

		let mut channels = Vec::with_capacity(rows.len());
		for row in &rows {
			let enabled: i64 = row.get("enabled");
			let created_at: String = row.get("created_at");
			channels.push(NotificationChannel {
				id: row.get("id"),
				kind: row.get("kind"),
				name: row.get("name"),
				config: row.get("config"),
				enabled: enabled != 0,
				created_at: parse_timestamp(&created_at, "created_at")?,
			});
		}
		Ok(channels)
	}

	#[tracing::instrument(skip(self), fields(channel_id = %id))]
	async fn delete_channel(&self, id: &str) -> Result<()> {
		sqlx::query(&self.dialect.rebind(
			"DELETE FROM notification_channels WHERE id = ?",
		))
		.bind(id)
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
	async fn test_channel_crud() {
		let store = create_test_store().await;
		let channels = store.channels();

		let channel = NotificationChannel {
			id: "nc1".to_string(),
			kind: "slack".to_string(),
			name: "Dev Team".to_string(),
			config: r#"{"webhookUrl": "https://hooks.slack.com/services/T0/B0/x"}"#.to_string(),
			enabled: true,
			created_at: Utc::now(),
		};
		channels.create_channel(&channel).await.unwrap();

		let all = channels.list_channels().await.unwrap();
		assert_eq!(all.len(), 1);
		assert_eq!(all[0].name, "Dev Team");
		assert_eq!(all[0].config, channel.config);
		assert!(all[0].enabled);

		channels.delete_channel("nc1").await.unwrap();
		assert!(channels.list_channels().await.unwrap().is_empty());

		// Missing id is a no-op.
		channels.delete_channel("nc1").await.unwrap();
	}
}
