// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Group repository.
//!
//! Groups own monitors; deleting a group cascades through the foreign
//! keys to its monitors and their checks, events and outages.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{AnyPool, Row};
use vigil_core::Group;

use crate::dialect::Dialect;
use crate::error::Result;
use crate::monitor::parse_monitor_row;
use crate::row::parse_timestamp;

#[async_trait]
pub trait GroupStore: Send + Sync {
	async fn create_group(&self, id: &str, name: &str) -> Result<()>;
	async fn update_group(&self, id: &str, name: &str) -> Result<()>;
	/// Deleting an id that does not exist is a no-op, not an error.
	async fn delete_group(&self, id: &str) -> Result<()>;
	/// All groups ordered case-insensitively by name, each with its
	/// monitors eagerly attached in creation order.
	async fn list_groups(&self) -> Result<Vec<Group>>;
}

/// Repository for group database operations.
#[derive(Clone)]
pub struct GroupRepository {
	pool: AnyPool,
	dialect: Dialect,
}

impl GroupRepository {
	pub fn new(pool: AnyPool, dialect: Dialect) -> Self {
		Self { pool, dialect }
	}
}

#[async_trait]
impl GroupStore for GroupRepository {
	#[tracing::instrument(skip(self), fields(group_id = %id))]
	async fn create_group(&self, id: &str, name: &str) -> Result<()> {
		sqlx::query(&self.dialect.rebind(
			"INSERT INTO groups (id, name, created_at) VALUES (?, ?, ?)",
		))
		.bind(id)
		.bind(name)
		.bind(Utc::now().to_rfc3339())
		.execute(&self.pool)
		.await?;

		tracing::debug!(group_id = %id, "group created");
		Ok(())
	}

	#[tracing::instrument(skip(self), fields(group_id = %id))]
	async fn update_group(&self, id: &str, name: &str) -> Result<()> {
		sqlx::query(&self.dialect.rebind("UPDATE groups SET name = ? WHERE id = ?"))
			.bind(name)
			.bind(id)
			.execute(&self.pool)
			.await?;
		Ok(())
	}

	#[tracing::instrument(skip(self), fields(group_id = %id))]
	async fn delete_group(&self, id: &str) -> Result<()> {
		sqlx::query(&self.dialect.rebind("DELETE FROM groups WHERE id = ?"))
			.bind(id)
			.execute(&self.pool)
			.await?;

		tracing::debug!(group_id = %id, "group deleted");
		Ok(())
	}

	#[tracing::instrument(skip(self))]
	async fn list_groups(&self) -> Result<Vec<Group>> {
		let order = self.dialect.case_insensitive_order("name");
		let rows = sqlx::query(&format!(
			"SELECT id, name, created_at FROM groups ORDER BY {order}"
		))
		.fetch_all(&self.pool)
		.await?;

		let mut groups = Vec::with_capacity(rows.len());
		for row in &rows {
			let created_at: String = row.get("created_at");
			groups.push(Group {
				id: row.get("id"),
				name: row.get("name"),
				monitors: Vec::new(),
				created_at: parse_timestamp(&created_at, "created_at")?,
			});
		}

		// Attach monitors in one pass rather than one query per group.
		let index: std::collections::HashMap<String, usize> = groups
			.iter()
			.enumerate()
			.map(|(i, g)| (g.id.clone(), i))
			.collect();

		let monitor_rows = sqlx::query(
			"SELECT id, group_id, name, url, active, interval_seconds,
				confirmation_threshold, notification_cooldown_minutes, created_at
			 FROM monitors ORDER BY created_at ASC",
		)
		.fetch_all(&self.pool)
		.await?;

		for row in &monitor_rows {
			let monitor = parse_monitor_row(row)?;
			if let Some(&i) = index.get(&monitor.group_id) {
				groups[i].monitors.push(monitor);
			}
		}

		Ok(groups)
	}
}
