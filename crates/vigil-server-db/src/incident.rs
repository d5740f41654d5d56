// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Incident repository: incident CRUD and the append-only update
//! timeline.
//!
//! The public status page and RSS feed consume
//! [`public_resolved_incidents`](IncidentStore::public_resolved_incidents),
//! which deliberately excludes maintenance windows.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{any::AnyRow, AnyPool, Row};
use vigil_core::{Incident, IncidentUpdate};

use crate::dialect::Dialect;
use crate::error::Result;
use crate::row::{parse_timestamp, parse_timestamp_opt};

const INCIDENT_COLUMNS: &str = "id, title, description, kind, severity, status, start_time, \
	end_time, affected_groups, source, outage_id, public, created_at";

#[async_trait]
pub trait IncidentStore: Send + Sync {
	async fn create_incident(&self, incident: &Incident) -> Result<()>;
	/// Open incidents plus anything started at or after `since`, newest
	/// first by creation time.
	async fn list_incidents(&self, since: DateTime<Utc>) -> Result<Vec<Incident>>;
	/// Absent id is `None`, not an error.
	async fn get_incident(&self, id: &str) -> Result<Option<Incident>>;
	async fn update_incident(&self, incident: &Incident) -> Result<()>;
	async fn set_incident_public(&self, id: &str, public: bool) -> Result<()>;
	/// Deleting a missing id is a no-op; updates cascade away with the
	/// incident.
	async fn delete_incident(&self, id: &str) -> Result<()>;
	/// Append a timeline entry.
	async fn create_incident_update(
		&self,
		incident_id: &str,
		status: &str,
		message: &str,
	) -> Result<()>;
	/// Timeline entries in chronological order.
	async fn list_incident_updates(&self, incident_id: &str) -> Result<Vec<IncidentUpdate>>;
	/// Public, resolved or completed, non-maintenance incidents started
	/// at or after `since`, newest first by start time.
	async fn public_resolved_incidents(&self, since: DateTime<Utc>) -> Result<Vec<Incident>>;
}

/// Repository for incident database operations.
#[derive(Clone)]
pub struct IncidentRepository {
	pool: AnyPool,
	dialect: Dialect,
}

impl IncidentRepository {
	pub fn new(pool: AnyPool, dialect: Dialect) -> Self {
		Self { pool, dialect }
	}
}

#[async_trait]
impl IncidentStore for IncidentRepository {
	#[tracing::instrument(skip(self, incident), fields(incident_id = %incident.id, kind = %incident.kind))]
	async fn create_incident(&self, incident: &Incident) -> Result<()> {
		sqlx::query(&self.dialect.rebind(
			"INSERT INTO incidents (id, title, description, kind, severity, status, start_time,
				end_time, affected_groups, source, outage_id, public, created_at)
			 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
		))
		.bind(&incident.id)
		.bind(&incident.title)
		.bind(&incident.description)
		.bind(incident.kind.to_string())
		.bind(&incident.severity)
		.bind(&incident.status)
		.bind(incident.start_time.to_rfc3339())
		.bind(incident.end_time.map(|t| t.to_rfc3339()))
		.bind(&incident.affected_groups)
		.bind(incident.source.to_string())
		.bind(incident.outage_id)
		.bind(i64::from(incident.public))
		.bind(Utc::now().to_rfc3339())
		.execute(&self.pool)
		.await?;

		tracing::info!(incident_id = %incident.id, "incident created");
		Ok(())
	}

	#[tracing::instrument(skip(self))]
	async fn list_incidents(&self, since: DateTime<Utc>) -> Result<Vec<Incident>> {
		let since_clause = self.dialect.instant_at_or_after("start_time");
		let rows = sqlx::query(&self.dialect.rebind(&format!(
			"SELECT {INCIDENT_COLUMNS} FROM incidents
			 WHERE (status != 'resolved' AND status != 'completed') OR {since_clause}
			 ORDER BY created_at DESC"
		)))
		.bind(since.to_rfc3339())
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(parse_incident_row).collect()
	}

	#[tracing::instrument(skip(self), fields(incident_id = %id))]
	async fn get_incident(&self, id: &str) -> Result<Option<Incident>> {
		let row = sqlx::query(&self.dialect.rebind(&format!(
			"SELECT {INCIDENT_COLUMNS} FROM incidents WHERE id = ?"
		)))
		.bind(id)
		.fetch_optional(&self.pool)
		.await?;

		row.as_ref().map(parse_incident_row).transpose()
	}

	#[tracing::instrument(skip(self, incident), fields(incident_id = %incident.id))]
	async fn update_incident(&self, incident: &Incident) -> Result<()> {
		sqlx::query(&self.dialect.rebind(
			"UPDATE incidents
			 SET title = ?, description = ?, kind = ?, severity = ?, status = ?,
				start_time = ?, end_time = ?, affected_groups = ?, source = ?,
				outage_id = ?, public = ?
			 WHERE id = ?",
		))
		.bind(&incident.title)
		.bind(&incident.description)
		.bind(incident.kind.to_string())
		.bind(&incident.severity)
		.bind(&incident.status)
		.bind(incident.start_time.to_rfc3339())
		.bind(incident.end_time.map(|t| t.to_rfc3339()))
		.bind(&incident.affected_groups)
		.bind(incident.source.to_string())
		.bind(incident.outage_id)
		.bind(i64::from(incident.public))
		.bind(&incident.id)
		.execute(&self.pool)
		.await?;
		Ok(())
	}

	#[tracing::instrument(skip(self), fields(incident_id = %id, public))]
	async fn set_incident_public(&self, id: &str, public: bool) -> Result<()> {
		sqlx::query(&self.dialect.rebind(
			"UPDATE incidents SET public = ? WHERE id = ?",
		))
		.bind(i64::from(public))
		.bind(id)
		.execute(&self.pool)
		.await?;
		Ok(())
	}

	#[tracing::instrument(skip(self), fields(incident_id = %id))]
	async fn delete_incident(&self, id: &str) -> Result<()> {
		sqlx::query(&self.dialect.rebind("DELETE FROM incidents WHERE id = ?"))
			.bind(id)
			.execute(&self.pool)
			.await?;

		tracing::debug!(incident_id = %id, "incident deleted");
		Ok(())
	}

	#[tracing::instrument(skip(self, message), fields(incident_id = %incident_id, status = %status))]
	async fn create_incident_update(
		&self,
		incident_id: &str,
		status: &str,
		message: &str,
	) -> Result<()> {
		sqlx::query(&self.dialect.rebind(
			"INSERT INTO incident_updates (incident_id, status, message, created_at)
			 VALUES (?, ?, ?, ?)",
		))
		.bind(incident_id)
		.bind(status)
		.bind(message)
		.bind(Utc::now().to_rfc3339())
		.execute(&self.pool)
		.await?;
		Ok(())
	}

	#[tracing::instrument(skip(self), fields(incident_id = %incident_id))]
	async fn list_incident_updates(&self, incident_id: &str) -> Result<Vec<IncidentUpdate>> {
		let rows = sqlx::query(&self.dialect.rebind(
			"SELECT id, incident_id, status, message, created_at
			 FROM incident_updates
			 WHERE incident_id = ?
			 ORDER BY created_at ASC",
		))
		.bind(incident_id)
		.fetch_all(&self.pool)
		.await?;

		let mut updates = Vec::with_capacity(rows.len());
		for row in &rows {
			let created_at: String = row.get("created_at");
			updates.push(IncidentUpdate {
				id: row.get("id"),
				incident_id: row.get("incident_id"),
				status: row.get("status"),
				message: row.get("message"),
				created_at: parse_timestamp(&created_at, "created_at")?,
			});
		}
		Ok(updates)
	}

	#[tracing::instrument(skip(self))]
	async fn public_resolved_incidents(&self, since: DateTime<Utc>) -> Result<Vec<Incident>> {
		let since_clause = self.dialect.instant_at_or_after("start_time");
		let rows = sqlx::query(&self.dialect.rebind(&format!(
			"SELECT {INCIDENT_COLUMNS} FROM incidents
			 WHERE public = 1
			 AND kind = 'incident'
			 AND (status = 'resolved' OR status = 'completed')
			 AND {since_clause}
			 ORDER BY start_time DESC"
		)))
		.bind(since.to_rfc3339())
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(parse_incident_row).collect()
	}
}

fn parse_incident_row(row: &AnyRow) -> Result<Incident> {
	let kind: String = row.get("kind");
	let source: String = row.get("source");
	let public: i64 = row.get("public");
	let start_time: String = row.get("start_time");
	let end_time: Option<String> = row.get("end_time");
	let created_at: String = row.get("created_at");

	Ok(Incident {
		id: row.get("id"),
		title: row.get("title"),
		description: row.get("description"),
		kind: kind.parse()?,
		severity: row.get("severity"),
		status: row.get("status"),
		start_time: parse_timestamp(&start_time, "start_time")?,
		end_time: parse_timestamp_opt(end_time, "end_time")?,
		affected_groups: row.get("affected_groups"),
		source: source.parse()?,
		outage_id: row.get("outage_id"),
		public: public != 0,
		created_at: parse_timestamp(&created_at, "created_at")?,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{create_test_store, new_incident};
	use vigil_core::IncidentKind;

	#[tokio::test]
	async fn test_incident_crud_and_timeline() {
		let store = create_test_store().await;
		let incidents = store.incidents();

		let incident = new_incident("inc-1", IncidentKind::Incident, "investigating");
		incidents.create_incident(&incident).await.unwrap();

		let fetched = incidents.get_incident("inc-1").await.unwrap().unwrap();
		assert_eq!(fetched.title, incident.title);
		assert_eq!(fetched.kind, IncidentKind::Incident);
		assert!(incidents.get_incident("missing").await.unwrap().is_none());

		let mut updated = fetched;
		updated.status = "resolved".to_string();
		updated.end_time = Some(Utc::now());
		incidents.update_incident(&updated).await.unwrap();
		let fetched = incidents.get_incident("inc-1").await.unwrap().unwrap();
		assert_eq!(fetched.status, "resolved");
		assert!(fetched.end_time.is_some());

		incidents
			.create_incident_update("inc-1", "investigating", "looking into it")
			.await
			.unwrap();
		incidents
			.create_incident_update("inc-1", "resolved", "fixed")
			.await
			.unwrap();
		let updates = incidents.list_incident_updates("inc-1").await.unwrap();
		assert_eq!(updates.len(), 2);
		assert_eq!(updates[0].status, "investigating");
		assert_eq!(updates[1].status, "resolved");

		incidents.delete_incident("inc-1").await.unwrap();
		assert!(incidents.get_incident("inc-1").await.unwrap().is_none());
		assert!(incidents.list_incident_updates("inc-1").await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_list_incidents_keeps_open_ones_regardless_of_age() {
		let store = create_test_store().await;
		let incidents = store.incidents();

		let mut old_open = new_incident("inc-open", IncidentKind::Incident, "investigating");
		old_open.start_time = Utc::now() - chrono::Duration::days(90);
		incidents.create_incident(&old_open).await.unwrap();

		let mut old_resolved = new_incident("inc-done", IncidentKind::Incident, "resolved");
		old_resolved.start_time = Utc::now() - chrono::Duration::days(90);
		incidents.create_incident(&old_resolved).await.unwrap();

		let since = Utc::now() - chrono::Duration::days(30);
		let listed = incidents.list_incidents(since).await.unwrap();
		let ids: Vec<_> = listed.iter().map(|i| i.id.as_str()).collect();
		assert!(ids.contains(&"inc-open"));
		assert!(!ids.contains(&"inc-done"));
	}

	#[tokio::test]
	async fn test_public_resolved_excludes_maintenance() {
		let store = create_test_store().await;
		let incidents = store.incidents();

		let mut maintenance = new_incident("inc-maint", IncidentKind::Maintenance, "completed");
		maintenance.public = true;
		incidents.create_incident(&maintenance).await.unwrap();

		let mut resolved = new_incident("inc-res", IncidentKind::Incident, "resolved");
		resolved.public = true;
		incidents.create_incident(&resolved).await.unwrap();

		let mut private_resolved = new_incident("inc-priv", IncidentKind::Incident, "resolved");
		private_resolved.public = false;
		incidents.create_incident(&private_resolved).await.unwrap();

		let epoch = DateTime::<Utc>::from_timestamp(0, 0).unwrap();
		let feed = incidents.public_resolved_incidents(epoch).await.unwrap();
		assert_eq!(feed.len(), 1);
		assert_eq!(feed[0].id, "inc-res");
	}

	#[tokio::test]
	async fn test_set_incident_public() {
		let store = create_test_store().await;
		let incidents = store.incidents();

		let incident = new_incident("inc-1", IncidentKind::Incident, "resolved");
		incidents.create_incident(&incident).await.unwrap();

		incidents.set_incident_public("inc-1", true).await.unwrap();
		assert!(incidents.get_incident("inc-1").await.unwrap().unwrap().public);
	}
}
