// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Incident and incident-update types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether an incident row describes an unplanned incident or a planned
/// maintenance window. Maintenance windows are excluded from the public
/// resolved-incident feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentKind {
	Incident,
	Maintenance,
}

impl std::fmt::Display for IncidentKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			IncidentKind::Incident => write!(f, "incident"),
			IncidentKind::Maintenance => write!(f, "maintenance"),
		}
	}
}

impl std::str::FromStr for IncidentKind {
	type Err = crate::error::CoreError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"incident" => Ok(IncidentKind::Incident),
			"maintenance" => Ok(IncidentKind::Maintenance),
			other => Err(crate::error::CoreError::InvalidIncidentKind(other.to_string())),
		}
	}
}

/// How an incident came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentSource {
	/// Created by an operator through the dashboard.
	Manual,
	/// Created by the scheduler from an outage.
	Auto,
}

impl std::fmt::Display for IncidentSource {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			IncidentSource::Manual => write!(f, "manual"),
			IncidentSource::Auto => write!(f, "auto"),
		}
	}
}

impl std::str::FromStr for IncidentSource {
	type Err = crate::error::CoreError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"manual" => Ok(IncidentSource::Manual),
			"auto" => Ok(IncidentSource::Auto),
			other => Err(crate::error::CoreError::InvalidIncidentSource(other.to_string())),
		}
	}
}

/// A user- or system-facing communication object, optionally linked to
/// the outage that triggered it.
///
/// `status` is a free-form lifecycle string (`investigating`,
/// `identified`, `resolved`, `scheduled`, `completed`, ...) owned by the
/// presentation layer; this layer only distinguishes the resolved /
/// completed terminal states in queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
	pub id: String,
	pub title: String,
	pub description: String,
	pub kind: IncidentKind,
	/// Free-form severity label (`minor`, `major`, `critical`).
	pub severity: String,
	pub status: String,
	pub start_time: DateTime<Utc>,
	pub end_time: Option<DateTime<Utc>>,
	/// JSON-serialized array of affected group ids.
	pub affected_groups: String,
	pub source: IncidentSource,
	/// Back-reference to the outage this incident was created from.
	pub outage_id: Option<i64>,
	/// Visible on public status pages.
	pub public: bool,
	pub created_at: DateTime<Utc>,
}

/// An append-only timeline entry owned by one incident.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentUpdate {
	pub id: i64,
	pub incident_id: String,
	pub status: String,
	pub message: String,
	pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::str::FromStr;

	#[test]
	fn test_incident_kind_round_trip() {
		assert_eq!(IncidentKind::from_str("incident").unwrap(), IncidentKind::Incident);
		assert_eq!(IncidentKind::from_str("maintenance").unwrap(), IncidentKind::Maintenance);
		assert!(IncidentKind::from_str("outage").is_err());
	}

	#[test]
	fn test_incident_source_round_trip() {
		assert_eq!(IncidentSource::from_str("manual").unwrap(), IncidentSource::Manual);
		assert_eq!(IncidentSource::from_str("auto").unwrap(), IncidentSource::Auto);
		assert!(IncidentSource::from_str("scheduler").is_err());
	}
}
