// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Outage repository.
//!
//! An outage is an interval per monitor; it is active while `end_time`
//! is null. `create_outage` always inserts; it deliberately does not
//! check for an already-open outage, so idempotency rests with the
//! scheduler. `close_outage` stamps every open row for the monitor and
//! is a no-op when none is open.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{any::AnyRow, AnyPool, Row};
use vigil_core::MonitorOutage;

use crate::dialect::Dialect;
use crate::error::Result;
use crate::row::{parse_timestamp, parse_timestamp_opt};

#[async_trait]
pub trait OutageStore: Send + Sync {
	/// Open a new outage interval for a monitor.
	async fn create_outage(&self, monitor_id: &str, kind: &str, summary: &str) -> Result<()>;
	/// Close every open outage for a monitor. Returns the number of rows
	/// closed; zero is success, not an error.
	async fn close_outage(&self, monitor_id: &str) -> Result<u64>;
	/// Currently open outages joined with monitor/group names, newest
	/// first by start time.
	async fn active_outages(&self) -> Result<Vec<MonitorOutage>>;
	/// Closed outages whose end time is at or after `since`, newest
	/// first by end time. Seeds incident history.
	async fn resolved_outages(&self, since: DateTime<Utc>) -> Result<Vec<MonitorOutage>>;
}

/// Repository for outage database operations.
#[derive(Clone)]
pub struct OutageRepository {
	pool: AnyPool,
	dialect: Dialect,
}

impl OutageRepository {
	pub fn new(pool: AnyPool, dialect: Dialect) -> Self {
		Self { pool, dialect }
	}
}

#[async_trait]
impl OutageStore for OutageRepository {
	#[tracing::instrument(skip(self, summary), fields(monitor_id = %monitor_id, kind = %kind))]
	async fn create_outage(&self, monitor_id: &str, kind: &str, summary: &str) -> Result<()> {
		sqlx::query(&self.dialect.rebind(
			"INSERT INTO monitor_outages (monitor_id, kind, summary, start_time)
			 VALUES (?, ?, ?, ?)",
		))
		.bind(monitor_id)
		.bind(kind)
		.bind(summary)
		.bind(Utc::now().to_rfc3339())
		.execute(&self.pool)
		.await?;

		tracing::info!(monitor_id = %monitor_id, kind = %kind, "outage opened");
		Ok(())
	}

	#[tracing::instrument(skip(self), fields(monitor_id = %monitor_id))]
	async fn close_outage(&self, monitor_id: &str) -> Result<u64> {
		let result = sqlx::query(&self.dialect.rebind(
			"UPDATE monitor_outages SET end_time = ? WHERE monitor_id = ? AND end_time IS NULL",
		))
		.bind(Utc::now().to_rfc3339())
		.bind(monitor_id)
		.execute(&self.pool)
		.await?;

		let closed = result.rows_affected();
		if closed > 0 {
			tracing::info!(monitor_id = %monitor_id, closed, "outage closed");
		}
		Ok(closed)
	}

	#[tracing::instrument(skip(self))]
	async fn active_outages(&self) -> Result<Vec<MonitorOutage>> {
		let rows = sqlx::query(
			"SELECT o.id, o.monitor_id, o.kind, o.summary, o.start_time, o.end_time,
				m.name AS monitor_name, g.name AS group_name, g.id AS group_id
			 FROM monitor_outages o
			 JOIN monitors m ON o.monitor_id = m.id
			 JOIN groups g ON m.group_id = g.id
			 WHERE o.end_time IS NULL
			 ORDER BY o.start_time DESC",
		)
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(parse_outage_row).collect()
	}

	#[tracing::instrument(skip(self))]
	async fn resolved_outages(&self, since: DateTime<Utc>) -> Result<Vec<MonitorOutage>> {
		let since_clause = self.dialect.instant_at_or_after("o.end_time");
		let rows = sqlx::query(&self.dialect.rebind(&format!(
			"SELECT o.id, o.monitor_id, o.kind, o.summary, o.start_time, o.end_time,
				m.name AS monitor_name, g.name AS group_name, g.id AS group_id
			 FROM monitor_outages o
			 JOIN monitors m ON o.monitor_id = m.id
			 JOIN groups g ON m.group_id = g.id
			 WHERE o.end_time IS NOT NULL AND {since_clause}
			 ORDER BY o.end_time DESC"
		)))
		.bind(since.to_rfc3339())
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(parse_outage_row).collect()
	}
}

fn parse_outage_row(row: &AnyRow) -> Result<MonitorOutage> {
	let start_time: String = row.get("start_time");
	let end_time: Option<String> = row.get("end_time");

	Ok(MonitorOutage {
		id: row.get("id"),
		monitor_id: row.get("monitor_id"),
		kind: row.get("kind"),
		summary: row.get("summary"),
		start_time: parse_timestamp(&start_time, "start_time")?,
		end_time: parse_timestamp_opt(end_time, "end_time")?,
		monitor_name: row.get("monitor_name"),
		group_name: row.get("group_name"),
		group_id: row.get("group_id"),
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::group::GroupStore;
	use crate::monitor::MonitorStore;
	use crate::testing::{create_test_store, new_monitor};

	#[tokio::test]
	async fn test_outage_lifecycle() {
		let store = create_test_store().await;
		store.groups().create_group("g1", "G1").await.unwrap();
		store.monitors().create_monitor(&new_monitor("m1", "g1")).await.unwrap();

		store
			.outages()
			.create_outage("m1", "down", "connection refused")
			.await
			.unwrap();

		let active = store.outages().active_outages().await.unwrap();
		assert_eq!(active.len(), 1);
		assert_eq!(active[0].monitor_id, "m1");
		assert_eq!(active[0].kind, "down");
		assert_eq!(active[0].group_name, "G1");
		assert!(active[0].end_time.is_none());

		let closed = store.outages().close_outage("m1").await.unwrap();
		assert_eq!(closed, 1);
		assert!(store.outages().active_outages().await.unwrap().is_empty());

		let epoch = DateTime::<Utc>::from_timestamp(0, 0).unwrap();
		let history = store.outages().resolved_outages(epoch).await.unwrap();
		assert_eq!(history.len(), 1);
		assert!(history[0].end_time.is_some());
	}

	#[tokio::test]
	async fn test_close_outage_without_open_is_noop() {
		let store = create_test_store().await;
		store.groups().create_group("g1", "G1").await.unwrap();
		store.monitors().create_monitor(&new_monitor("m1", "g1")).await.unwrap();

		let closed = store.outages().close_outage("m1").await.unwrap();
		assert_eq!(closed, 0);
	}

	#[tokio::test]
	async fn test_create_outage_never_dedups_open_outages() {
		let store = create_test_store().await;
		store.groups().create_group("g1", "G1").await.unwrap();
		store.monitors().create_monitor(&new_monitor("m1", "g1")).await.unwrap();

		store.outages().create_outage("m1", "down", "first").await.unwrap();
		store.outages().create_outage("m1", "degraded", "second").await.unwrap();

		// Insert-always: both stay open until a close sweeps them.
		assert_eq!(store.outages().active_outages().await.unwrap().len(), 2);
		assert_eq!(store.outages().close_outage("m1").await.unwrap(), 2);
	}

	#[tokio::test]
	async fn test_resolved_outages_respects_since() {
		let store = create_test_store().await;
		store.groups().create_group("g1", "G1").await.unwrap();
		store.monitors().create_monitor(&new_monitor("m1", "g1")).await.unwrap();

		store.outages().create_outage("m1", "down", "gone").await.unwrap();
		store.outages().close_outage("m1").await.unwrap();

		let future = Utc::now() + chrono::Duration::hours(1);
		assert!(store
			.outages()
			.resolved_outages(future)
			.await
			.unwrap()
			.is_empty());
	}
}
