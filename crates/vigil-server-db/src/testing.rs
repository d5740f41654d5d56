// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared test helpers: an in-memory store and entity factories.

use chrono::Utc;
use vigil_core::{CheckResult, CheckStatus, Incident, IncidentKind, IncidentSource, Monitor};

use crate::monitor::MonitorStore;
use crate::store::Store;

/// Connect an in-memory SQLite store and clear the seeded baseline rows
/// so tests start from an empty state.
pub async fn create_test_store() -> Store {
	let store = Store::connect("sqlite::memory:")
		.await
		.expect("failed to create test store");

	for sql in ["DELETE FROM status_pages", "DELETE FROM groups"] {
		sqlx::query(sql)
			.execute(store.pool())
			.await
			.expect("failed to clear seeded rows");
	}

	store
}

/// An active monitor with a 60-second interval.
pub fn new_monitor(id: &str, group_id: &str) -> Monitor {
	Monitor {
		id: id.to_string(),
		group_id: group_id.to_string(),
		name: format!("{id} monitor"),
		url: format!("http://{id}.example.com"),
		active: true,
		interval_seconds: 60,
		confirmation_threshold: None,
		notification_cooldown_minutes: None,
		created_at: Utc::now(),
	}
}

/// Insert a monitor built by [`new_monitor`].
pub async fn create_test_monitor(store: &Store, id: &str, group_id: &str) {
	store
		.monitors()
		.create_monitor(&new_monitor(id, group_id))
		.await
		.expect("failed to create test monitor");
}

/// A check stamped now; `up` checks carry a 200 status code.
pub fn new_check(monitor_id: &str, status: CheckStatus, latency_ms: i64) -> CheckResult {
	CheckResult {
		monitor_id: monitor_id.to_string(),
		status,
		latency_ms,
		status_code: if status == CheckStatus::Up { 200 } else { 0 },
		timestamp: Utc::now(),
	}
}

/// A manual, private incident started now.
pub fn new_incident(id: &str, kind: IncidentKind, status: &str) -> Incident {
	Incident {
		id: id.to_string(),
		title: format!("Incident {id}"),
		description: "something happened".to_string(),
		kind,
		severity: "minor".to_string(),
		status: status.to_string(),
		start_time: Utc::now(),
		end_time: None,
		affected_groups: "[]".to_string(),
		source: IncidentSource::Manual,
		outage_id: None,
		public: false,
		created_at: Utc::now(),
	}
}
