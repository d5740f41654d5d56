// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Derived analytics types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Rolling uptime percentages for one monitor.
///
/// A window with zero recorded checks reports 100%: no evidence of
/// downtime is not evidence of downtime.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UptimeStats {
	pub day: f64,
	pub week: f64,
	pub month: f64,
}

/// One bucket of the latency time series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatencyPoint {
	pub timestamp: DateTime<Utc>,
	/// Average latency over the bucket, in milliseconds.
	pub latency_ms: i64,
	/// True when any check in the bucket was not `up`; dominates the
	/// average for display purposes.
	pub failed: bool,
}

/// The most recent active SSL-expiry warning for one monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SslWarning {
	pub event_id: i64,
	pub monitor_id: String,
	pub monitor_name: String,
	pub group_name: String,
	pub group_id: String,
	pub message: String,
	pub timestamp: DateTime<Utc>,
}

/// System-wide dashboard counters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SystemStats {
	pub total_monitors: i64,
	pub active_monitors: i64,
	/// Monitors with an open `down` outage.
	pub down_monitors: i64,
	/// Monitors with an open `degraded` outage.
	pub degraded_monitors: i64,
	pub total_groups: i64,
	/// Capacity-planning estimate: sum of 86400 / interval over active
	/// monitors. Not a historical count.
	pub daily_checks_estimate: i64,
}
