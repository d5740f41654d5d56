// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Monitor, group, check and outage types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named collection of monitors. Deleting a group cascades to its
/// monitors and, transitively, their checks, events and outages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
	pub id: String,
	pub name: String,
	/// Monitors owned by this group, eagerly attached by list queries.
	pub monitors: Vec<Monitor>,
	pub created_at: DateTime<Utc>,
}

/// A single watched target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Monitor {
	pub id: String,
	pub group_id: String,
	pub name: String,
	pub url: String,
	/// Paused monitors keep their configuration but are skipped by the
	/// scheduler. Toggled independently of every other field.
	pub active: bool,
	/// Polling interval in seconds, minimum 1.
	pub interval_seconds: i64,
	/// Per-monitor override of the global confirmation threshold.
	pub confirmation_threshold: Option<i64>,
	/// Per-monitor override of the global notification cooldown (minutes).
	pub notification_cooldown_minutes: Option<i64>,
	pub created_at: DateTime<Utc>,
}

/// Outcome of a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
	Up,
	Down,
	Degraded,
}

impl std::fmt::Display for CheckStatus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			CheckStatus::Up => write!(f, "up"),
			CheckStatus::Down => write!(f, "down"),
			CheckStatus::Degraded => write!(f, "degraded"),
		}
	}
}

impl std::str::FromStr for CheckStatus {
	type Err = crate::error::CoreError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"up" => Ok(CheckStatus::Up),
			"down" => Ok(CheckStatus::Down),
			"degraded" => Ok(CheckStatus::Degraded),
			other => Err(crate::error::CoreError::InvalidCheckStatus(other.to_string())),
		}
	}
}

/// One point-in-time probe result. Append-only: rows are batch inserted
/// by the scheduler and pruned by age, never updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
	pub monitor_id: String,
	pub status: CheckStatus,
	/// Round-trip latency in milliseconds.
	pub latency_ms: i64,
	/// HTTP status code, zero when the probe never got a response.
	pub status_code: i64,
	pub timestamp: DateTime<Utc>,
}

/// A notable monitor transition (`up`, `down`, `degraded`,
/// `ssl_expiring`, ...). The type set is open; new probe logic may emit
/// new kinds without a schema change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorEvent {
	pub id: i64,
	pub monitor_id: String,
	pub kind: String,
	pub message: String,
	pub timestamp: DateTime<Utc>,
}

/// An event joined with the name of the monitor that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemEvent {
	pub id: i64,
	pub monitor_id: String,
	pub monitor_name: String,
	pub kind: String,
	pub message: String,
	pub timestamp: DateTime<Utc>,
}

/// An open or closed interval during which a monitor was non-operational.
/// An outage is active while `end_time` is `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorOutage {
	pub id: i64,
	pub monitor_id: String,
	pub kind: String,
	pub summary: String,
	pub start_time: DateTime<Utc>,
	pub end_time: Option<DateTime<Utc>>,
	/// Joined monitor name for display.
	pub monitor_name: String,
	/// Joined owning-group name and id for display.
	pub group_name: String,
	pub group_id: String,
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::str::FromStr;

	#[test]
	fn test_check_status_round_trip() {
		for status in [CheckStatus::Up, CheckStatus::Down, CheckStatus::Degraded] {
			let parsed = CheckStatus::from_str(&status.to_string()).unwrap();
			assert_eq!(parsed, status);
		}
	}

	#[test]
	fn test_check_status_rejects_unknown() {
		assert!(CheckStatus::from_str("flapping").is_err());
		assert!(CheckStatus::from_str("UP").is_err());
	}
}
