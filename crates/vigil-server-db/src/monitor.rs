// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Monitor repository: monitor CRUD plus the append-only check and
//! event streams.
//!
//! Checks arrive in batches from the scheduler (one polling cycle per
//! batch, all-or-nothing) and are pruned by age. The active flag is
//! toggled independently of every other monitor field; both the update
//! and the toggle distinguish a missing id from a successful write by
//! checking the affected-row count.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{any::AnyRow, AnyPool, Row};
use vigil_core::{CheckResult, Monitor, MonitorEvent};

use crate::dialect::{Dialect, IntervalUnit};
use crate::error::{DbError, Result};
use crate::row::parse_timestamp;

/// Polling interval applied when the caller supplies a non-positive one.
const DEFAULT_INTERVAL_SECONDS: i64 = 60;

#[async_trait]
pub trait MonitorStore: Send + Sync {
	/// Insert a monitor. A non-positive interval is replaced with the
	/// 60-second default; the creation time is stamped here.
	async fn create_monitor(&self, monitor: &Monitor) -> Result<()>;
	/// Update configuration fields. Never touches the active flag; fails
	/// with [`DbError::NotFound`] when the id does not exist.
	async fn update_monitor(
		&self,
		id: &str,
		name: &str,
		url: &str,
		interval_seconds: i64,
		confirmation_threshold: Option<i64>,
		notification_cooldown_minutes: Option<i64>,
	) -> Result<()>;
	/// Deleting a missing id is a no-op, not an error.
	async fn delete_monitor(&self, id: &str) -> Result<()>;
	/// Pause/resume. Fails with [`DbError::NotFound`] when the id does
	/// not exist, including an already-deleted one.
	async fn set_monitor_active(&self, id: &str, active: bool) -> Result<()>;
	/// All monitors in creation order.
	async fn list_monitors(&self) -> Result<Vec<Monitor>>;
	/// All-or-nothing batch insert of one polling cycle's results.
	async fn insert_checks(&self, checks: &[CheckResult]) -> Result<()>;
	/// Append a notable transition event.
	async fn create_event(&self, monitor_id: &str, kind: &str, message: &str) -> Result<()>;
	/// Latest checks for a monitor, newest first.
	async fn recent_checks(&self, monitor_id: &str, limit: i64) -> Result<Vec<CheckResult>>;
	/// Latest events for a monitor, newest first.
	async fn recent_events(&self, monitor_id: &str, limit: i64) -> Result<Vec<MonitorEvent>>;
	/// Delete checks older than `days` (validated 1–3650). Returns the
	/// number of rows removed.
	async fn prune_checks(&self, days: i64) -> Result<u64>;
}

/// Repository for monitor database operations.
#[derive(Clone)]
pub struct MonitorRepository {
	pool: AnyPool,
	dialect: Dialect,
}

impl MonitorRepository {
	pub fn new(pool: AnyPool, dialect: Dialect) -> Self {
		Self { pool, dialect }
	}
}

#[async_trait]
impl MonitorStore for MonitorRepository {
	#[tracing::instrument(skip(self, monitor), fields(monitor_id = %monitor.id, group_id = %monitor.group_id))]
	async fn create_monitor(&self, monitor: &Monitor) -> Result<()> {
		let interval = if monitor.interval_seconds < 1 {
			DEFAULT_INTERVAL_SECONDS
		} else {
			monitor.interval_seconds
		};

		sqlx::query(&self.dialect.rebind(
			"INSERT INTO monitors (id, group_id, name, url, active, interval_seconds,
				confirmation_threshold, notification_cooldown_minutes, created_at)
			 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
		))
		.bind(&monitor.id)
		.bind(&monitor.group_id)
		.bind(&monitor.name)
		.bind(&monitor.url)
		.bind(i64::from(monitor.active))
		.bind(interval)
		.bind(monitor.confirmation_threshold)
		.bind(monitor.notification_cooldown_minutes)
		.bind(Utc::now().to_rfc3339())
		.execute(&self.pool)
		.await?;

		tracing::debug!(monitor_id = %monitor.id, "monitor created");
		Ok(())
	}

	#[tracing::instrument(skip(self), fields(monitor_id = %id))]
	async fn update_monitor(
		&self,
		id: &str,
		name: &str,
		url: &str,
		interval_seconds: i64,
		confirmation_threshold: Option<i64>,
		notification_cooldown_minutes: Option<i64>,
	) -> Result<()> {
		let interval = if interval_seconds < 1 {
			DEFAULT_INTERVAL_SECONDS
		} else {
			interval_seconds
		};

		let result = sqlx::query(&self.dialect.rebind(
			"UPDATE monitors SET name = ?, url = ?, interval_seconds = ?,
				confirmation_threshold = ?, notification_cooldown_minutes = ?
			 WHERE id = ?",
		))
		.bind(name)
		.bind(url)
		.bind(interval)
		.bind(confirmation_threshold)
		.bind(notification_cooldown_minutes)
		.bind(id)
		.execute(&self.pool)
		.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("monitor {id}")));
		}
		Ok(())
	}

	#[tracing::instrument(skip(self), fields(monitor_id = %id))]
	async fn delete_monitor(&self, id: &str) -> Result<()> {
		sqlx::query(&self.dialect.rebind("DELETE FROM monitors WHERE id = ?"))
			.bind(id)
			.execute(&self.pool)
			.await?;

		tracing::debug!(monitor_id = %id, "monitor deleted");
		Ok(())
	}

	#[tracing::instrument(skip(self), fields(monitor_id = %id, active))]
	async fn set_monitor_active(&self, id: &str, active: bool) -> Result<()> {
		let result = sqlx::query(&self.dialect.rebind(
			"UPDATE monitors SET active = ? WHERE id = ?",
		))
		.bind(i64::from(active))
		.bind(id)
		.execute(&self.pool)
		.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("monitor {id}")));
		}
		Ok(())
	}

	#[tracing::instrument(skip(self))]
	async fn list_monitors(&self) -> Result<Vec<Monitor>> {
		let rows = sqlx::query(
			"SELECT id, group_id, name, url, active, interval_seconds,
				confirmation_threshold, notification_cooldown_minutes, created_at
			 FROM monitors ORDER BY created_at ASC",
		)
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(parse_monitor_row).collect()
	}

	#[tracing::instrument(skip(self, checks), fields(count = checks.len()))]
	async fn insert_checks(&self, checks: &[CheckResult]) -> Result<()> {
		if checks.is_empty() {
			return Ok(());
		}

		let sql = self.dialect.rebind(
			"INSERT INTO monitor_checks (monitor_id, status, latency_ms, status_code, timestamp)
			 VALUES (?, ?, ?, ?, ?)",
		);

		let mut tx = self.pool.begin().await?;
		for check in checks {
			sqlx::query(&sql)
				.bind(&check.monitor_id)
				.bind(check.status.to_string())
				.bind(check.latency_ms)
				.bind(check.status_code)
				.bind(check.timestamp.to_rfc3339())
				.execute(&mut *tx)
				.await?;
		}
		tx.commit().await?;

		Ok(())
	}

	#[tracing::instrument(skip(self, message), fields(monitor_id = %monitor_id, kind = %kind))]
	async fn create_event(&self, monitor_id: &str, kind: &str, message: &str) -> Result<()> {
		sqlx::query(&self.dialect.rebind(
			"INSERT INTO monitor_events (monitor_id, kind, message, timestamp) VALUES (?, ?, ?, ?)",
		))
		.bind(monitor_id)
		.bind(kind)
		.bind(message)
		.bind(Utc::now().to_rfc3339())
		.execute(&self.pool)
		.await?;
		Ok(())
	}

	#[tracing::instrument(skip(self), fields(monitor_id = %monitor_id, limit))]
	async fn recent_checks(&self, monitor_id: &str, limit: i64) -> Result<Vec<CheckResult>> {
		let rows = sqlx::query(&self.dialect.rebind(
			"SELECT monitor_id, status, latency_ms, status_code, timestamp
			 FROM monitor_checks
			 WHERE monitor_id = ? ORDER BY timestamp DESC LIMIT ?",
		))
		.bind(monitor_id)
		.bind(limit)
		.fetch_all(&self.pool)
		.await?;

		let mut checks = Vec::with_capacity(rows.len());
		for row in &rows {
			let status: String = row.get("status");
			let timestamp: String = row.get("timestamp");
			checks.push(CheckResult {
				monitor_id: row.get("monitor_id"),
				status: status.parse()?,
				latency_ms: row.get("latency_ms"),
				status_code: row.get("status_code"),
				timestamp: parse_timestamp(&timestamp, "timestamp")?,
			});
		}
		Ok(checks)
	}

	#[tracing::instrument(skip(self), fields(monitor_id = %monitor_id, limit))]
	async fn recent_events(&self, monitor_id: &str, limit: i64) -> Result<Vec<MonitorEvent>> {
		let rows = sqlx::query(&self.dialect.rebind(
			"SELECT id, monitor_id, kind, message, timestamp
			 FROM monitor_events
			 WHERE monitor_id = ? ORDER BY timestamp DESC LIMIT ?",
		))
		.bind(monitor_id)
		.bind(limit)
		.fetch_all(&self.pool)
		.await?;

		let mut events = Vec::with_capacity(rows.len());
		for row in &rows {
			let timestamp: String = row.get("timestamp");
			events.push(MonitorEvent {
				id: row.get("id"),
				monitor_id: row.get("monitor_id"),
				kind: row.get("kind"),
				message: row.get("message"),
				timestamp: parse_timestamp(&timestamp, "timestamp")?,
			});
		}
		Ok(events)
	}

	#[tracing::instrument(skip(self), fields(days))]
	async fn prune_checks(&self, days: i64) -> Result<u64> {
		if !(1..=3650).contains(&days) {
			return Err(DbError::Validation(format!(
				"invalid retention days: {days} (must be between 1 and 3650)"
			)));
		}

		let cutoff = self.dialect.older_than_param("timestamp", IntervalUnit::Days);
		let result = sqlx::query(&self.dialect.rebind(&format!(
			"DELETE FROM monitor_checks WHERE {cutoff}"
		)))
		.bind(days as i32)
		.execute(&self.pool)
		.await?;

		let pruned = result.rows_affected();
		if pruned > 0 {
			tracing::info!(days, pruned, "pruned monitor checks");
		}
		Ok(pruned)
	}
}

/// Decode one monitors row; shared with the group repository's eager
/// monitor attachment.
pub(crate) fn parse_monitor_row(row: &AnyRow) -> Result<Monitor> {
	let active: i64 = row.get("active");
	let created_at: String = row.get("created_at");

	Ok(Monitor {
		id: row.get("id"),
		group_id: row.get("group_id"),
		name: row.get("name"),
		url: row.get("url"),
		active: active != 0,
		interval_seconds: row.get("interval_seconds"),
		confirmation_threshold: row.get("confirmation_threshold"),
		notification_cooldown_minutes: row.get("notification_cooldown_minutes"),
		created_at: parse_timestamp(&created_at, "created_at")?,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::group::GroupStore;
	use crate::testing::{create_test_store, new_monitor};
	use vigil_core::CheckStatus;

	#[tokio::test]
	async fn test_create_and_list_monitor() {
		let store = create_test_store().await;
		store.groups().create_group("g1", "Test Group").await.unwrap();

		let mut monitor = new_monitor("m1", "g1");
		monitor.interval_seconds = 120;
		store.monitors().create_monitor(&monitor).await.unwrap();

		let monitors = store.monitors().list_monitors().await.unwrap();
		assert_eq!(monitors.len(), 1);
		assert_eq!(monitors[0].interval_seconds, 120);
		assert!(monitors[0].active);
	}

	#[tokio::test]
	async fn test_create_monitor_defaults_interval() {
		let store = create_test_store().await;
		store.groups().create_group("g1", "G1").await.unwrap();

		let mut monitor = new_monitor("m1", "g1");
		monitor.interval_seconds = 0;
		store.monitors().create_monitor(&monitor).await.unwrap();

		let monitors = store.monitors().list_monitors().await.unwrap();
		assert_eq!(monitors[0].interval_seconds, 60);
	}

	#[tokio::test]
	async fn test_update_monitor() {
		let store = create_test_store().await;
		store.groups().create_group("g1", "G1").await.unwrap();
		store.monitors().create_monitor(&new_monitor("m1", "g1")).await.unwrap();

		store
			.monitors()
			.update_monitor("m1", "New Name", "http://new.example.com", 300, Some(3), None)
			.await
			.unwrap();

		let monitors = store.monitors().list_monitors().await.unwrap();
		assert_eq!(monitors[0].name, "New Name");
		assert_eq!(monitors[0].url, "http://new.example.com");
		assert_eq!(monitors[0].interval_seconds, 300);
		assert_eq!(monitors[0].confirmation_threshold, Some(3));
		// Update never touches the active flag.
		assert!(monitors[0].active);
	}

	#[tokio::test]
	async fn test_update_monitor_not_found() {
		let store = create_test_store().await;
		let err = store
			.monitors()
			.update_monitor("missing", "Name", "http://example.com", 60, None, None)
			.await
			.unwrap_err();
		assert!(matches!(err, DbError::NotFound(_)));
	}

	#[tokio::test]
	async fn test_set_monitor_active_is_idempotent_and_checks_existence() {
		let store = create_test_store().await;
		store.groups().create_group("g1", "G1").await.unwrap();
		store.monitors().create_monitor(&new_monitor("m1", "g1")).await.unwrap();

		store.monitors().set_monitor_active("m1", false).await.unwrap();
		store.monitors().set_monitor_active("m1", false).await.unwrap();
		let monitors = store.monitors().list_monitors().await.unwrap();
		assert!(!monitors[0].active);

		let err = store
			.monitors()
			.set_monitor_active("missing", true)
			.await
			.unwrap_err();
		assert!(matches!(err, DbError::NotFound(_)));

		// An already-deleted id is indistinguishable from a missing one.
		store.monitors().delete_monitor("m1").await.unwrap();
		let err = store
			.monitors()
			.set_monitor_active("m1", true)
			.await
			.unwrap_err();
		assert!(matches!(err, DbError::NotFound(_)));
	}

	#[tokio::test]
	async fn test_checks_and_events_round_trip() {
		let store = create_test_store().await;
		store.groups().create_group("g1", "G1").await.unwrap();
		store.monitors().create_monitor(&new_monitor("m1", "g1")).await.unwrap();

		let checks = vec![
			crate::testing::new_check("m1", CheckStatus::Up, 100),
			crate::testing::new_check("m1", CheckStatus::Down, 0),
		];
		store.monitors().insert_checks(&checks).await.unwrap();
		// Empty batch is a no-op.
		store.monitors().insert_checks(&[]).await.unwrap();

		let history = store.monitors().recent_checks("m1", 10).await.unwrap();
		assert_eq!(history.len(), 2);

		store
			.monitors()
			.create_event("m1", "down", "connection refused")
			.await
			.unwrap();
		let events = store.monitors().recent_events("m1", 10).await.unwrap();
		assert_eq!(events.len(), 1);
		assert_eq!(events[0].kind, "down");
		assert_eq!(events[0].message, "connection refused");
	}

	#[tokio::test]
	async fn test_recent_checks_respects_limit() {
		let store = create_test_store().await;
		store.groups().create_group("g1", "G1").await.unwrap();
		store.monitors().create_monitor(&new_monitor("m1", "g1")).await.unwrap();

		let checks: Vec<_> = (0..5)
			.map(|i| crate::testing::new_check("m1", CheckStatus::Up, 100 + i))
			.collect();
		store.monitors().insert_checks(&checks).await.unwrap();

		let history = store.monitors().recent_checks("m1", 3).await.unwrap();
		assert_eq!(history.len(), 3);
	}

	#[tokio::test]
	async fn test_prune_checks_validates_range() {
		let store = create_test_store().await;
		assert!(matches!(
			store.monitors().prune_checks(0).await.unwrap_err(),
			DbError::Validation(_)
		));
		assert!(matches!(
			store.monitors().prune_checks(3651).await.unwrap_err(),
			DbError::Validation(_)
		));
		assert_eq!(store.monitors().prune_checks(30).await.unwrap(), 0);
	}

	#[tokio::test]
	async fn test_prune_checks_removes_old_rows() {
		let store = create_test_store().await;
		store.groups().create_group("g1", "G1").await.unwrap();
		store.monitors().create_monitor(&new_monitor("m1", "g1")).await.unwrap();

		let mut old_check = crate::testing::new_check("m1", CheckStatus::Up, 100);
		old_check.timestamp = Utc::now() - chrono::Duration::days(10);
		let fresh_check = crate::testing::new_check("m1", CheckStatus::Up, 100);
		store
			.monitors()
			.insert_checks(&[old_check, fresh_check])
			.await
			.unwrap();

		let pruned = store.monitors().prune_checks(7).await.unwrap();
		assert_eq!(pruned, 1);
		assert_eq!(store.monitors().recent_checks("m1", 10).await.unwrap().len(), 1);
	}
}
