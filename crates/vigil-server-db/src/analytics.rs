// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Read-only derived views computed inside the query layer: rolling
//! uptime, bucketed latency series, deduplicated SSL-expiry warnings and
//! system-wide counters.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::{AnyPool, Row};
use vigil_core::{LatencyPoint, SslWarning, SystemEvent, SystemStats, UptimeStats};

use crate::dialect::{BucketGranularity, Dialect, IntervalUnit};
use crate::error::{DbError, Result};
use crate::row::parse_timestamp;

#[async_trait]
pub trait AnalyticsStore: Send + Sync {
	/// Uptime percentage over 1, 7 and 30 days, from one scan of the
	/// check table. A window with zero checks reports 100%.
	async fn uptime_stats(&self, monitor_id: &str) -> Result<UptimeStats>;
	/// Latency series over the last `hours` (validated 1–8760), bucketed
	/// by minute up to one hour, by hour up to seven days, by day
	/// beyond. Buckets come back in chronological order; a bucket is
	/// `failed` when any check in it was not `up`.
	async fn latency_stats(&self, monitor_id: &str, hours: i64) -> Result<Vec<LatencyPoint>>;
	/// The most recent `ssl_expiring` event per monitor from the last
	/// seven days. Monitors without one are absent.
	async fn ssl_warnings(&self) -> Result<Vec<SslWarning>>;
	async fn system_stats(&self) -> Result<SystemStats>;
	/// Events across all monitors joined with monitor names, newest
	/// first, bounded by `limit`.
	async fn system_events(&self, limit: i64) -> Result<Vec<SystemEvent>>;
	/// Backing-store size in bytes.
	async fn database_size(&self) -> Result<i64>;
}

/// Repository for derived analytics queries.
#[derive(Clone)]
pub struct AnalyticsRepository {
	pool: AnyPool,
	dialect: Dialect,
}

impl AnalyticsRepository {
	pub fn new(pool: AnyPool, dialect: Dialect) -> Self {
		Self { pool, dialect }
	}
}

#[async_trait]
impl AnalyticsStore for AnalyticsRepository {
	#[tracing::instrument(skip(self), fields(monitor_id = %monitor_id))]
	async fn uptime_stats(&self, monitor_id: &str) -> Result<UptimeStats> {
		let day = self.dialect.cutoff("timestamp", 1, IntervalUnit::Days);
		let week = self.dialect.cutoff("timestamp", 7, IntervalUnit::Days);
		let month = self.dialect.cutoff("timestamp", 30, IntervalUnit::Days);

		let row = sqlx::query(&self.dialect.rebind(&format!(
			"SELECT
				COUNT(CASE WHEN {day} THEN 1 END) AS total_24h,
				COUNT(CASE WHEN {day} AND status = 'up' THEN 1 END) AS up_24h,
				COUNT(CASE WHEN {week} THEN 1 END) AS total_7d,
				COUNT(CASE WHEN {week} AND status = 'up' THEN 1 END) AS up_7d,
				COUNT(CASE WHEN {month} THEN 1 END) AS total_30d,
				COUNT(CASE WHEN {month} AND status = 'up' THEN 1 END) AS up_30d
			 FROM monitor_checks
			 WHERE monitor_id = ?"
		)))
		.bind(monitor_id)
		.fetch_one(&self.pool)
		.await?;

		// No recorded checks is no evidence of downtime, not full
		// downtime.
		let percentage = |up: i64, total: i64| -> f64 {
			if total == 0 {
				100.0
			} else {
				(up as f64 / total as f64) * 100.0
			}
		};

		Ok(UptimeStats {
			day: percentage(row.get("up_24h"), row.get("total_24h")),
			week: percentage(row.get("up_7d"), row.get("total_7d")),
			month: percentage(row.get("up_30d"), row.get("total_30d")),
		})
	}

	#[tracing::instrument(skip(self), fields(monitor_id = %monitor_id, hours))]
	async fn latency_stats(&self, monitor_id: &str, hours: i64) -> Result<Vec<LatencyPoint>> {
		if !(1..=8760).contains(&hours) {
			return Err(DbError::Validation(format!(
				"invalid hours: {hours} (must be between 1 and 8760)"
			)));
		}

		let granularity = if hours <= 1 {
			BucketGranularity::Minute
		} else if hours <= 168 {
			BucketGranularity::Hour
		} else {
			BucketGranularity::Day
		};
		let bucket = self.dialect.time_bucket("timestamp", granularity);
		let cutoff = self.dialect.cutoff_param("timestamp", IntervalUnit::Hours);

		let rows = sqlx::query(&self.dialect.rebind(&format!(
			"SELECT {bucket} AS ts_bucket,
				CAST(AVG(latency_ms) AS INTEGER) AS avg_latency,
				MAX(CASE WHEN status != 'up' THEN 1 ELSE 0 END) AS failed
			 FROM monitor_checks
			 WHERE monitor_id = ? AND {cutoff}
			 GROUP BY ts_bucket
			 ORDER BY ts_bucket ASC"
		)))
		.bind(monitor_id)
		.bind(hours as i32)
		.fetch_all(&self.pool)
		.await?;

		let mut points = Vec::with_capacity(rows.len());
		for row in &rows {
			let bucket: String = row.get("ts_bucket");
			let failed: i64 = row.get("failed");
			points.push(LatencyPoint {
				timestamp: parse_bucket_timestamp(&bucket)?,
				latency_ms: row.get("avg_latency"),
				failed: failed != 0,
			});
		}
		Ok(points)
	}

	#[tracing::instrument(skip(self))]
	async fn ssl_warnings(&self) -> Result<Vec<SslWarning>> {
		let recent = self.dialect.cutoff("e.timestamp", 7, IntervalUnit::Days);
		let recent_inner = self.dialect.cutoff("e2.timestamp", 7, IntervalUnit::Days);

		let rows = sqlx::query(&format!(
			"SELECT e.id, e.monitor_id, m.name AS monitor_name, g.name AS group_name,
				g.id AS group_id, e.message, e.timestamp
			 FROM monitor_events e
			 JOIN monitors m ON e.monitor_id = m.id
			 JOIN groups g ON m.group_id = g.id
			 WHERE e.kind = 'ssl_expiring'
			 AND {recent}
			 AND e.id = (
				SELECT MAX(e2.id) FROM monitor_events e2
				WHERE e2.monitor_id = e.monitor_id
				AND e2.kind = 'ssl_expiring'
				AND {recent_inner}
			 )
			 ORDER BY e.timestamp DESC"
		))
		.fetch_all(&self.pool)
		.await?;

		let mut warnings = Vec::with_capacity(rows.len());
		for row in &rows {
			let timestamp: String = row.get("timestamp");
			warnings.push(SslWarning {
				event_id: row.get("id"),
				monitor_id: row.get("monitor_id"),
				monitor_name: row.get("monitor_name"),
				group_name: row.get("group_name"),
				group_id: row.get("group_id"),
				message: row.get("message"),
				timestamp: parse_timestamp(&timestamp, "timestamp")?,
			});
		}
		Ok(warnings)
	}

	#[tracing::instrument(skip(self))]
	async fn system_stats(&self) -> Result<SystemStats> {
		let total_monitors: i64 = sqlx::query("SELECT COUNT(*) FROM monitors")
			.fetch_one(&self.pool)
			.await?
			.get(0);
		let active_monitors: i64 = sqlx::query("SELECT COUNT(*) FROM monitors WHERE active = 1")
			.fetch_one(&self.pool)
			.await?
			.get(0);
		let down_monitors: i64 = sqlx::query(
			"SELECT COUNT(DISTINCT monitor_id) FROM monitor_outages
			 WHERE end_time IS NULL AND kind = 'down'",
		)
		.fetch_one(&self.pool)
		.await?
		.get(0);
		let degraded_monitors: i64 = sqlx::query(
			"SELECT COUNT(DISTINCT monitor_id) FROM monitor_outages
			 WHERE end_time IS NULL AND kind = 'degraded'",
		)
		.fetch_one(&self.pool)
		.await?
		.get(0);
		let total_groups: i64 = sqlx::query("SELECT COUNT(*) FROM groups")
			.fetch_one(&self.pool)
			.await?
			.get(0);
		let daily_checks_estimate: i64 = sqlx::query(
			"SELECT COALESCE(SUM(86400 / interval_seconds), 0) FROM monitors WHERE active = 1",
		)
		.fetch_one(&self.pool)
		.await?
		.get(0);

		Ok(SystemStats {
			total_monitors,
			active_monitors,
			down_monitors,
			degraded_monitors,
			total_groups,
			daily_checks_estimate,
		})
	}

	#[tracing::instrument(skip(self), fields(limit))]
	async fn system_events(&self, limit: i64) -> Result<Vec<SystemEvent>> {
		let rows = sqlx::query(&self.dialect.rebind(
			"SELECT e.id, e.monitor_id, m.name AS monitor_name, e.kind, e.message, e.timestamp
			 FROM monitor_events e
			 JOIN monitors m ON e.monitor_id = m.id
			 ORDER BY e.timestamp DESC LIMIT ?",
		))
		.bind(limit)
		.fetch_all(&self.pool)
		.await?;

		let mut events = Vec::with_capacity(rows.len());
		for row in &rows {
			let timestamp: String = row.get("timestamp");
			events.push(SystemEvent {
				id: row.get("id"),
				monitor_id: row.get("monitor_id"),
				monitor_name: row.get("monitor_name"),
				kind: row.get("kind"),
				message: row.get("message"),
				timestamp: parse_timestamp(&timestamp, "timestamp")?,
			});
		}
		Ok(events)
	}

	#[tracing::instrument(skip(self))]
	async fn database_size(&self) -> Result<i64> {
		let size: i64 = sqlx::query(self.dialect.database_size_sql())
			.fetch_one(&self.pool)
			.await?
			.get(0);
		Ok(size)
	}
}

/// Parse a bucket key as rendered by [`Dialect::time_bucket`]:
/// `YYYY-MM-DD HH:MM:SS` for minute/hour buckets, `YYYY-MM-DD` for day
/// buckets.
fn parse_bucket_timestamp(bucket: &str) -> Result<DateTime<Utc>> {
	let naive = if bucket.len() == 10 {
		NaiveDate::parse_from_str(bucket, "%Y-%m-%d")
			.map_err(|e| DbError::Internal(format!("invalid day bucket {bucket}: {e}")))?
			.and_hms_opt(0, 0, 0)
			.ok_or_else(|| DbError::Internal(format!("invalid day bucket {bucket}")))?
	} else {
		NaiveDateTime::parse_from_str(bucket, "%Y-%m-%d %H:%M:%S")
			.map_err(|e| DbError::Internal(format!("invalid time bucket {bucket}: {e}")))?
	};
	Ok(DateTime::from_naive_utc_and_offset(naive, Utc))
}
