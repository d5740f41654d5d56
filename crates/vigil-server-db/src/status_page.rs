// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Status page repository.
//!
//! Pages are keyed by unique slug and written with upsert semantics.
//! `public` and `enabled` are independent toggles: enabled gates
//! reachability, public gates anonymous access.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{any::AnyRow, AnyPool, Row};
use vigil_core::{StatusPage, StatusPageInput};

use crate::dialect::Dialect;
use crate::error::Result;
use crate::row::parse_timestamp;

const STATUS_PAGE_COLUMNS: &str = "id, slug, title, group_id, public, enabled, description, \
	logo_url, accent_color, theme, show_uptime_bars, show_uptime_percentage, \
	show_incident_history, created_at";

#[async_trait]
pub trait StatusPageStore: Send + Sync {
	async fn list_status_pages(&self) -> Result<Vec<StatusPage>>;
	/// Absent slug is `None`, not an error.
	async fn get_status_page_by_slug(&self, slug: &str) -> Result<Option<StatusPage>>;
	/// Insert or fully replace the page with this slug.
	async fn upsert_status_page(&self, input: &StatusPageInput) -> Result<()>;
	async fn set_status_page_public(&self, slug: &str, public: bool) -> Result<()>;
	async fn set_status_page_enabled(&self, slug: &str, enabled: bool) -> Result<()>;
}

/// Repository for status page database operations.
#[derive(Clone)]
pub struct StatusPageRepository {
	pool: AnyPool,
	dialect: Dialect,
}

impl StatusPageRepository {
	pub fn new(pool: AnyPool, dialect: Dialect) -> Self {
		Self { pool, dialect }
	}
}

#[async_trait]
impl StatusPageStore for StatusPageRepository {
	#[tracing::instrument(skip(self))]
	async fn list_status_pages(&self) -> Result<Vec<StatusPage>> {
		let rows = sqlx::query(&format!(
			"SELECT {STATUS_PAGE_COLUMNS} FROM status_pages ORDER BY created_at ASC"
		))
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(parse_status_page_row).collect()
	}

	#[tracing::instrument(skip(self), fields(slug = %slug))]
	async fn get_status_page_by_slug(&self, slug: &str) -> Result<Option<StatusPage>> {
		let row = sqlx::query(&self.dialect.rebind(&format!(
			"SELECT {STATUS_PAGE_COLUMNS} FROM status_pages WHERE slug = ?"
		)))
		.bind(slug)
		.fetch_optional(&self.pool)
		.await?;

		row.as_ref().map(parse_status_page_row).transpose()
	}

	#[tracing::instrument(skip(self, input), fields(slug = %input.slug))]
	async fn upsert_status_page(&self, input: &StatusPageInput) -> Result<()> {
		let sql = self.dialect.upsert(
			"status_pages",
			&[
				"slug",
				"title",
				"group_id",
				"public",
				"enabled",
				"description",
				"logo_url",
				"accent_color",
				"theme",
				"show_uptime_bars",
				"show_uptime_percentage",
				"show_incident_history",
				"created_at",
			],
			"slug",
		);

		sqlx::query(&self.dialect.rebind(&sql))
			.bind(&input.slug)
			.bind(&input.title)
			.bind(input.group_id.as_deref())
			.bind(i64::from(input.public))
			.bind(i64::from(input.enabled))
			.bind(&input.description)
			.bind(&input.logo_url)
			.bind(&input.accent_color)
			.bind(&input.theme)
			.bind(i64::from(input.show_uptime_bars))
			.bind(i64::from(input.show_uptime_percentage))
			.bind(i64::from(input.show_incident_history))
			.bind(Utc::now().to_rfc3339())
			.execute(&self.pool)
			.await?;

		tracing::debug!(slug = %input.slug, "status page upserted");
		Ok(())
	}

	#[tracing::instrument(skip(self), fields(slug = %slug, public))]
	async fn set_status_page_public(&self, slug: &str, public: bool) -> Result<()> {
		sqlx::query(&self.dialect.rebind(
			"UPDATE status_pages SET public = ? WHERE slug = ?",
		))
		.bind(i64::from(public))
		.bind(slug)
		.execute(&self.pool)
		.await?;
		Ok(())
	}

	#[tracing::instrument(skip(self), fields(slug = %slug, enabled))]
	async fn set_status_page_enabled(&self, slug: &str, enabled: bool) -> Result<()> {
		sqlx::query(&self.dialect.rebind(
			"UPDATE status_pages SET enabled = ? WHERE slug = ?",
		))
		.bind(i64::from(enabled))
		.bind(slug)
		.execute(&self.pool)
		.await?;
		Ok(())
	}
}

fn parse_status_page_row(row: &AnyRow) -> Result<StatusPage> {
	let public: i64 = row.get("public");
	let enabled: i64 = row.get("enabled");
	let show_uptime_bars: i64 = row.get("show_uptime_bars");
	let show_uptime_percentage: i64 = row.get("show_uptime_percentage");
	let show_incident_history: i64 = row.get("show_incident_history");
	let created_at: String = row.get("created_at");

	Ok(StatusPage {
		id: row.get("id"),
		slug: row.get("slug"),
		title: row.get("title"),
		group_id: row.get("group_id"),
		public: public != 0,
		enabled: enabled != 0,
		description: row.get("description"),
		logo_url: row.get("logo_url"),
		accent_color: row.get("accent_color"),
		theme: row.get("theme"),
		show_uptime_bars: show_uptime_bars != 0,
		show_uptime_percentage: show_uptime_percentage != 0,
		show_incident_history: show_incident_history != 0,
		created_at: parse_timestamp(&created_at, "created_at")?,
	})
}
