// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Schema migrations and baseline seeding.
//!
//! Migrations are embedded per dialect, applied in version order inside a
//! transaction, and tracked in `schema_migrations`. Statements are
//! additionally `IF NOT EXISTS`-guarded where the engine allows, so a
//! half-tracked schema converges instead of failing. Seeding inserts
//! baseline rows (default group, default global status page) only when
//! the target table is empty.

use std::collections::HashSet;

use chrono::Utc;
use sqlx::{AnyPool, Row};

use crate::dialect::Dialect;
use crate::error::Result;

/// Id of the group every fresh install starts with.
pub const DEFAULT_GROUP_ID: &str = "g-default";

/// Slug of the seeded global status page.
pub const DEFAULT_STATUS_PAGE_SLUG: &str = "status";

struct Migration {
	version: i64,
	name: &'static str,
	sqlite: &'static [&'static str],
	postgres: &'static [&'static str],
}

impl Migration {
	fn statements(&self, dialect: Dialect) -> &'static [&'static str] {
		match dialect {
			Dialect::Sqlite => self.sqlite,
			Dialect::Postgres => self.postgres,
		}
	}
}

const MIGRATIONS: &[Migration] = &[
	Migration {
		version: 1,
		name: "monitoring-core",
		sqlite: &[
			"CREATE TABLE IF NOT EXISTS groups (
				id TEXT PRIMARY KEY,
				name TEXT NOT NULL,
				created_at TEXT NOT NULL
			)",
			"CREATE TABLE IF NOT EXISTS monitors (
				id TEXT PRIMARY KEY,
				group_id TEXT NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
				name TEXT NOT NULL,
				url TEXT NOT NULL,
				active INTEGER NOT NULL DEFAULT 1,
				interval_seconds INTEGER NOT NULL DEFAULT 60,
				created_at TEXT NOT NULL
			)",
			"CREATE TABLE IF NOT EXISTS monitor_checks (
				id INTEGER PRIMARY KEY AUTOINCREMENT,
				monitor_id TEXT NOT NULL REFERENCES monitors(id) ON DELETE CASCADE,
				status TEXT NOT NULL,
				latency_ms INTEGER NOT NULL,
				status_code INTEGER NOT NULL DEFAULT 0,
				timestamp TEXT NOT NULL
			)",
			"CREATE INDEX IF NOT EXISTS idx_monitor_checks_monitor_time
				ON monitor_checks(monitor_id, timestamp)",
			"CREATE TABLE IF NOT EXISTS monitor_events (
				id INTEGER PRIMARY KEY AUTOINCREMENT,
				monitor_id TEXT NOT NULL REFERENCES monitors(id) ON DELETE CASCADE,
				kind TEXT NOT NULL,
				message TEXT NOT NULL,
				timestamp TEXT NOT NULL
			)",
			"CREATE INDEX IF NOT EXISTS idx_monitor_events_monitor_time
				ON monitor_events(monitor_id, timestamp)",
			"CREATE TABLE IF NOT EXISTS monitor_outages (
				id INTEGER PRIMARY KEY AUTOINCREMENT,
				monitor_id TEXT NOT NULL REFERENCES monitors(id) ON DELETE CASCADE,
				kind TEXT NOT NULL,
				summary TEXT NOT NULL,
				start_time TEXT NOT NULL,
				end_time TEXT
			)",
			"CREATE INDEX IF NOT EXISTS idx_monitor_outages_open
				ON monitor_outages(monitor_id) WHERE end_time IS NULL",
		],
		postgres: &[
			"CREATE TABLE IF NOT EXISTS groups (
				id TEXT PRIMARY KEY,
				name TEXT NOT NULL,
				created_at TEXT NOT NULL
			)",
			"CREATE TABLE IF NOT EXISTS monitors (
				id TEXT PRIMARY KEY,
				group_id TEXT NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
				name TEXT NOT NULL,
				url TEXT NOT NULL,
				active INTEGER NOT NULL DEFAULT 1,
				interval_seconds INTEGER NOT NULL DEFAULT 60,
				created_at TEXT NOT NULL
			)",
			"CREATE TABLE IF NOT EXISTS monitor_checks (
				id BIGSERIAL PRIMARY KEY,
				monitor_id TEXT NOT NULL REFERENCES monitors(id) ON DELETE CASCADE,
				status TEXT NOT NULL,
				latency_ms BIGINT NOT NULL,
				status_code INTEGER NOT NULL DEFAULT 0,
				timestamp TEXT NOT NULL
			)",
			"CREATE INDEX IF NOT EXISTS idx_monitor_checks_monitor_time
				ON monitor_checks(monitor_id, timestamp)",
			"CREATE TABLE IF NOT EXISTS monitor_events (
				id BIGSERIAL PRIMARY KEY,
				monitor_id TEXT NOT NULL REFERENCES monitors(id) ON DELETE CASCADE,
				kind TEXT NOT NULL,
				message TEXT NOT NULL,
				timestamp TEXT NOT NULL
			)",
			"CREATE INDEX IF NOT EXISTS idx_monitor_events_monitor_time
				ON monitor_events(monitor_id, timestamp)",
			"CREATE TABLE IF NOT EXISTS monitor_outages (
				id BIGSERIAL PRIMARY KEY,
				monitor_id TEXT NOT NULL REFERENCES monitors(id) ON DELETE CASCADE,
				kind TEXT NOT NULL,
				summary TEXT NOT NULL,
				start_time TEXT NOT NULL,
				end_time TEXT
			)",
			"CREATE INDEX IF NOT EXISTS idx_monitor_outages_open
				ON monitor_outages(monitor_id) WHERE end_time IS NULL",
		],
	},
	Migration {
		version: 2,
		name: "auth",
		sqlite: &[
			"CREATE TABLE IF NOT EXISTS users (
				id INTEGER PRIMARY KEY AUTOINCREMENT,
				username TEXT NOT NULL UNIQUE,
				password_hash TEXT NOT NULL DEFAULT '',
				timezone TEXT NOT NULL DEFAULT 'UTC',
				email TEXT,
				sso_provider TEXT,
				sso_id TEXT,
				avatar_url TEXT,
				display_name TEXT,
				created_at TEXT NOT NULL
			)",
			"CREATE TABLE IF NOT EXISTS sessions (
				token TEXT PRIMARY KEY,
				user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
				expires_at TEXT NOT NULL
			)",
			"CREATE TABLE IF NOT EXISTS api_keys (
				id INTEGER PRIMARY KEY AUTOINCREMENT,
				key_prefix TEXT NOT NULL,
				key_hash TEXT NOT NULL,
				name TEXT NOT NULL,
				created_at TEXT NOT NULL,
				last_used_at TEXT
			)",
			"CREATE INDEX IF NOT EXISTS idx_api_keys_prefix ON api_keys(key_prefix)",
		],
		postgres: &[
			"CREATE TABLE IF NOT EXISTS users (
				id BIGSERIAL PRIMARY KEY,
				username TEXT NOT NULL UNIQUE,
				password_hash TEXT NOT NULL DEFAULT '',
				timezone TEXT NOT NULL DEFAULT 'UTC',
				email TEXT,
				sso_provider TEXT,
				sso_id TEXT,
				avatar_url TEXT,
				display_name TEXT,
				created_at TEXT NOT NULL
			)",
			"CREATE TABLE IF NOT EXISTS sessions (
				token TEXT PRIMARY KEY,
				user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
				expires_at TEXT NOT NULL
			)",
			"CREATE TABLE IF NOT EXISTS api_keys (
				id BIGSERIAL PRIMARY KEY,
				key_prefix TEXT NOT NULL,
				key_hash TEXT NOT NULL,
				name TEXT NOT NULL,
				created_at TEXT NOT NULL,
				last_used_at TEXT
			)",
			"CREATE INDEX IF NOT EXISTS idx_api_keys_prefix ON api_keys(key_prefix)",
		],
	},
	Migration {
		version: 3,
		name: "status-pages-settings-channels",
		sqlite: &[
			"CREATE TABLE IF NOT EXISTS status_pages (
				id INTEGER PRIMARY KEY AUTOINCREMENT,
				slug TEXT NOT NULL UNIQUE,
				title TEXT NOT NULL,
				group_id TEXT REFERENCES groups(id) ON DELETE CASCADE,
				public INTEGER NOT NULL DEFAULT 0,
				enabled INTEGER NOT NULL DEFAULT 1,
				description TEXT NOT NULL DEFAULT '',
				logo_url TEXT NOT NULL DEFAULT '',
				accent_color TEXT NOT NULL DEFAULT '',
				theme TEXT NOT NULL DEFAULT 'system',
				show_uptime_bars INTEGER NOT NULL DEFAULT 1,
				show_uptime_percentage INTEGER NOT NULL DEFAULT 1,
				show_incident_history INTEGER NOT NULL DEFAULT 1,
				created_at TEXT NOT NULL
			)",
			"CREATE TABLE IF NOT EXISTS notification_channels (
				id TEXT PRIMARY KEY,
				kind TEXT NOT NULL,
				name TEXT NOT NULL,
				config TEXT NOT NULL,
				enabled INTEGER NOT NULL DEFAULT 1,
				created_at TEXT NOT NULL
			)",
			"CREATE TABLE IF NOT EXISTS settings (
				key TEXT PRIMARY KEY,
				value TEXT NOT NULL
			)",
		],
		postgres: &[
			"CREATE TABLE IF NOT EXISTS status_pages (
				id BIGSERIAL PRIMARY KEY,
				slug TEXT NOT NULL UNIQUE,
				title TEXT NOT NULL,
				group_id TEXT REFERENCES groups(id) ON DELETE CASCADE,
				public INTEGER NOT NULL DEFAULT 0,
				enabled INTEGER NOT NULL DEFAULT 1,
				description TEXT NOT NULL DEFAULT '',
				logo_url TEXT NOT NULL DEFAULT '',
				accent_color TEXT NOT NULL DEFAULT '',
				theme TEXT NOT NULL DEFAULT 'system',
				show_uptime_bars INTEGER NOT NULL DEFAULT 1,
				show_uptime_percentage INTEGER NOT NULL DEFAULT 1,
				show_incident_history INTEGER NOT NULL DEFAULT 1,
				created_at TEXT NOT NULL
			)",
			"CREATE TABLE IF NOT EXISTS notification_channels (
				id TEXT PRIMARY KEY,
				kind TEXT NOT NULL,
				name TEXT NOT NULL,
				config TEXT NOT NULL,
				enabled INTEGER NOT NULL DEFAULT 1,
				created_at TEXT NOT NULL
			)",
			"CREATE TABLE IF NOT EXISTS settings (
				key TEXT PRIMARY KEY,
				value TEXT NOT NULL
			)",
		],
	},
	Migration {
		version: 4,
		name: "incidents",
		sqlite: &[
			"CREATE TABLE IF NOT EXISTS incidents (
				id TEXT PRIMARY KEY,
				title TEXT NOT NULL,
				description TEXT NOT NULL DEFAULT '',
				kind TEXT NOT NULL DEFAULT 'incident',
				severity TEXT NOT NULL DEFAULT 'minor',
				status TEXT NOT NULL,
				start_time TEXT NOT NULL,
				end_time TEXT,
				affected_groups TEXT NOT NULL DEFAULT '[]',
				source TEXT NOT NULL DEFAULT 'manual',
				outage_id INTEGER REFERENCES monitor_outages(id) ON DELETE SET NULL,
				created_at TEXT NOT NULL
			)",
			"CREATE TABLE IF NOT EXISTS incident_updates (
				id INTEGER PRIMARY KEY AUTOINCREMENT,
				incident_id TEXT NOT NULL REFERENCES incidents(id) ON DELETE CASCADE,
				status TEXT NOT NULL,
				message TEXT NOT NULL,
				created_at TEXT NOT NULL
			)",
		],
		postgres: &[
			"CREATE TABLE IF NOT EXISTS incidents (
				id TEXT PRIMARY KEY,
				title TEXT NOT NULL,
				description TEXT NOT NULL DEFAULT '',
				kind TEXT NOT NULL DEFAULT 'incident',
				severity TEXT NOT NULL DEFAULT 'minor',
				status TEXT NOT NULL,
				start_time TEXT NOT NULL,
				end_time TEXT,
				affected_groups TEXT NOT NULL DEFAULT '[]',
				source TEXT NOT NULL DEFAULT 'manual',
				outage_id BIGINT REFERENCES monitor_outages(id) ON DELETE SET NULL,
				created_at TEXT NOT NULL
			)",
			"CREATE TABLE IF NOT EXISTS incident_updates (
				id BIGSERIAL PRIMARY KEY,
				incident_id TEXT NOT NULL REFERENCES incidents(id) ON DELETE CASCADE,
				status TEXT NOT NULL,
				message TEXT NOT NULL,
				created_at TEXT NOT NULL
			)",
		],
	},
	Migration {
		version: 5,
		name: "monitor-notification-overrides",
		sqlite: &[
			"ALTER TABLE monitors ADD COLUMN confirmation_threshold INTEGER",
			"ALTER TABLE monitors ADD COLUMN notification_cooldown_minutes INTEGER",
		],
		postgres: &[
			"ALTER TABLE monitors ADD COLUMN IF NOT EXISTS confirmation_threshold INTEGER",
			"ALTER TABLE monitors ADD COLUMN IF NOT EXISTS notification_cooldown_minutes INTEGER",
		],
	},
	Migration {
		version: 6,
		name: "incident-visibility",
		sqlite: &["ALTER TABLE incidents ADD COLUMN public INTEGER NOT NULL DEFAULT 0"],
		postgres: &[
			"ALTER TABLE incidents ADD COLUMN IF NOT EXISTS public INTEGER NOT NULL DEFAULT 0",
		],
	},
];

/// Tables the destructive reset drops, children before parents. Drop
/// statements are assembled by string formatting; table names must only
/// ever come from this list.
const RESET_TABLES: &[&str] = &[
	"incident_updates",
	"incidents",
	"status_pages",
	"notification_channels",
	"settings",
	"sessions",
	"api_keys",
	"users",
	"monitor_checks",
	"monitor_events",
	"monitor_outages",
	"monitors",
	"groups",
	"schema_migrations",
];

/// Apply every unapplied migration in version order.
#[tracing::instrument(skip(pool))]
pub async fn run_migrations(pool: &AnyPool, dialect: Dialect) -> Result<()> {
	sqlx::query(
		"CREATE TABLE IF NOT EXISTS schema_migrations (
			version BIGINT PRIMARY KEY,
			name TEXT NOT NULL,
			applied_at TEXT NOT NULL
		)",
	)
	.execute(pool)
	.await?;

	let applied: HashSet<i64> = sqlx::query("SELECT version FROM schema_migrations")
		.fetch_all(pool)
		.await?
		.iter()
		.map(|row| row.get::<i64, _>(0))
		.collect();

	for migration in MIGRATIONS {
		if applied.contains(&migration.version) {
			continue;
		}

		let mut tx = pool.begin().await?;
		for statement in migration.statements(dialect) {
			sqlx::query(statement).execute(&mut *tx).await?;
		}
		sqlx::query(&dialect.rebind(
			"INSERT INTO schema_migrations (version, name, applied_at) VALUES (?, ?, ?)",
		))
		.bind(migration.version)
		.bind(migration.name)
		.bind(Utc::now().to_rfc3339())
		.execute(&mut *tx)
		.await?;
		tx.commit().await?;

		tracing::info!(
			version = migration.version,
			name = migration.name,
			"applied migration"
		);
	}

	Ok(())
}

/// Insert baseline rows into empty tables.
#[tracing::instrument(skip(pool))]
pub async fn seed(pool: &AnyPool, dialect: Dialect) -> Result<()> {
	let group_count: i64 = sqlx::query("SELECT COUNT(*) FROM groups")
		.fetch_one(pool)
		.await?
		.get(0);

	if group_count == 0 {
		sqlx::query(&dialect.rebind(
			"INSERT INTO groups (id, name, created_at) VALUES (?, ?, ?)",
		))
		.bind(DEFAULT_GROUP_ID)
		.bind("Default")
		.bind(Utc::now().to_rfc3339())
		.execute(pool)
		.await?;
		tracing::info!(group_id = DEFAULT_GROUP_ID, "seeded default group");
	}

	let page_count: i64 = sqlx::query("SELECT COUNT(*) FROM status_pages")
		.fetch_one(pool)
		.await?
		.get(0);

	if page_count == 0 {
		sqlx::query(&dialect.rebind(
			"INSERT INTO status_pages (slug, title, group_id, public, enabled, created_at)
			 VALUES (?, ?, NULL, 0, 1, ?)",
		))
		.bind(DEFAULT_STATUS_PAGE_SLUG)
		.bind("Service Status")
		.bind(Utc::now().to_rfc3339())
		.execute(pool)
		.await?;
		tracing::info!(slug = DEFAULT_STATUS_PAGE_SLUG, "seeded default status page");
	}

	Ok(())
}

/// Drop every known table and rebuild the schema from scratch.
///
/// Only reachable through [`Store::reset`](crate::store::Store::reset),
/// never through a CRUD path.
#[tracing::instrument(skip(pool))]
pub async fn reset(pool: &AnyPool, dialect: Dialect) -> Result<()> {
	if let Some(off) = dialect.foreign_keys_toggle(false) {
		sqlx::query(off).execute(pool).await?;
	}

	for table in RESET_TABLES {
		sqlx::query(&dialect.drop_table(table)).execute(pool).await?;
	}

	if let Some(on) = dialect.foreign_keys_toggle(true) {
		sqlx::query(on).execute(pool).await?;
	}

	run_migrations(pool, dialect).await?;
	seed(pool, dialect).await
}
