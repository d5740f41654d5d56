// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The store facade: one handle combining every repository.
//!
//! [`Store::connect`] detects the engine from the URL, builds the pool,
//! runs migrations, seeds baseline rows and constructs the repositories
//! with the shared pool and dialect. Everything is constructor-injected;
//! there is no ambient state.

use sqlx::AnyPool;

use crate::analytics::AnalyticsRepository;
use crate::api_key::ApiKeyRepository;
use crate::channel::ChannelRepository;
use crate::dialect::Dialect;
use crate::error::Result;
use crate::group::GroupRepository;
use crate::incident::IncidentRepository;
use crate::monitor::MonitorRepository;
use crate::outage::OutageRepository;
use crate::settings::SettingsRepository;
use crate::status_page::StatusPageRepository;
use crate::user::UserRepository;
use crate::{migrate, pool};

/// Single entry point to the persistence layer.
#[derive(Clone)]
pub struct Store {
	pool: AnyPool,
	dialect: Dialect,
	groups: GroupRepository,
	monitors: MonitorRepository,
	outages: OutageRepository,
	incidents: IncidentRepository,
	status_pages: StatusPageRepository,
	channels: ChannelRepository,
	settings: SettingsRepository,
	users: UserRepository,
	api_keys: ApiKeyRepository,
	analytics: AnalyticsRepository,
}

impl Store {
	/// Connect, migrate and seed.
	///
	/// # Arguments
	/// * `url` - "sqlite://path", "sqlite::memory:" or "postgres://..."
	#[tracing::instrument(skip(url))]
	pub async fn connect(url: &str) -> Result<Self> {
		let dialect = Dialect::from_url(url)?;
		let pool = pool::create_pool(url, dialect).await?;

		migrate::run_migrations(&pool, dialect).await?;
		migrate::seed(&pool, dialect).await?;

		tracing::info!(dialect = dialect.name(), "store ready");
		Ok(Self::assemble(pool, dialect))
	}

	fn assemble(pool: AnyPool, dialect: Dialect) -> Self {
		Self {
			groups: GroupRepository::new(pool.clone(), dialect),
			monitors: MonitorRepository::new(pool.clone(), dialect),
			outages: OutageRepository::new(pool.clone(), dialect),
			incidents: IncidentRepository::new(pool.clone(), dialect),
			status_pages: StatusPageRepository::new(pool.clone(), dialect),
			channels: ChannelRepository::new(pool.clone(), dialect),
			settings: SettingsRepository::new(pool.clone(), dialect),
			users: UserRepository::new(pool.clone(), dialect),
			api_keys: ApiKeyRepository::new(pool.clone(), dialect),
			analytics: AnalyticsRepository::new(pool.clone(), dialect),
			pool,
			dialect,
		}
	}

	pub fn groups(&self) -> &GroupRepository {
		&self.groups
	}

	pub fn monitors(&self) -> &MonitorRepository {
		&self.monitors
	}

	pub fn outages(&self) -> &OutageRepository {
		&self.outages
	}

	pub fn incidents(&self) -> &IncidentRepository {
		&self.incidents
	}

	pub fn status_pages(&self) -> &StatusPageRepository {
		&self.status_pages
	}

	pub fn channels(&self) -> &ChannelRepository {
		&self.channels
	}

	pub fn settings(&self) -> &SettingsRepository {
		&self.settings
	}

	pub fn users(&self) -> &UserRepository {
		&self.users
	}

	pub fn api_keys(&self) -> &ApiKeyRepository {
		&self.api_keys
	}

	pub fn analytics(&self) -> &AnalyticsRepository {
		&self.analytics
	}

	pub fn dialect(&self) -> Dialect {
		self.dialect
	}

	pub fn pool(&self) -> &AnyPool {
		&self.pool
	}

	/// Destructive reset: drop every known table, re-run migrations and
	/// seeds. Exposed as an explicit administrative operation only.
	#[tracing::instrument(skip(self))]
	pub async fn reset(&self) -> Result<()> {
		tracing::warn!("resetting database");
		migrate::reset(&self.pool, self.dialect).await
	}

	/// Close the underlying pool.
	pub async fn close(&self) {
		self.pool.close().await;
	}
}

#[cfg(test)]
mod tests {
	use crate::api_key::ApiKeyStore;
	use crate::group::GroupStore;
	use crate::monitor::MonitorStore;
	use crate::outage::OutageStore;
	use crate::settings::SettingsStore;
	use crate::status_page::StatusPageStore;
	use crate::testing::{create_test_store, new_check, new_monitor};
	use crate::{migrate, Store};
	use sqlx::Row;
	use vigil_core::CheckStatus;

	async fn count(store: &Store, sql: &str) -> i64 {
		sqlx::query(sql)
			.fetch_one(store.pool())
			.await
			.unwrap()
			.get(0)
	}

	#[tokio::test]
	async fn test_group_deletion_cascades_to_monitor_data() {
		let store = create_test_store().await;
		store.groups().create_group("g-del", "To Delete").await.unwrap();
		store
			.monitors()
			.create_monitor(&new_monitor("m-del", "g-del"))
			.await
			.unwrap();

		store
			.monitors()
			.insert_checks(&[new_check("m-del", CheckStatus::Up, 100)])
			.await
			.unwrap();
		store.monitors().create_event("m-del", "down", "it died").await.unwrap();
		store.outages().create_outage("m-del", "down", "it died").await.unwrap();

		// Monitor deletion takes its checks and events with it.
		store.monitors().delete_monitor("m-del").await.unwrap();
		assert_eq!(
			count(&store, "SELECT COUNT(*) FROM monitor_checks WHERE monitor_id = 'm-del'").await,
			0
		);
		assert_eq!(
			count(&store, "SELECT COUNT(*) FROM monitor_events WHERE monitor_id = 'm-del'").await,
			0
		);
		assert_eq!(
			count(&store, "SELECT COUNT(*) FROM monitor_outages WHERE monitor_id = 'm-del'").await,
			0
		);

		// Group deletion cascades transitively through a re-created
		// monitor.
		store
			.monitors()
			.create_monitor(&new_monitor("m-del", "g-del"))
			.await
			.unwrap();
		store
			.monitors()
			.insert_checks(&[new_check("m-del", CheckStatus::Up, 100)])
			.await
			.unwrap();

		store.groups().delete_group("g-del").await.unwrap();
		assert_eq!(count(&store, "SELECT COUNT(*) FROM monitors").await, 0);
		assert_eq!(count(&store, "SELECT COUNT(*) FROM monitor_checks").await, 0);
	}

	#[tokio::test]
	async fn test_migrations_are_idempotent() {
		let store = create_test_store().await;

		migrate::run_migrations(store.pool(), store.dialect()).await.unwrap();
		migrate::run_migrations(store.pool(), store.dialect()).await.unwrap();

		// Still exactly one row per migration version.
		let applied = count(&store, "SELECT COUNT(*) FROM schema_migrations").await;
		let distinct =
			count(&store, "SELECT COUNT(DISTINCT version) FROM schema_migrations").await;
		assert_eq!(applied, distinct);
	}

	#[tokio::test]
	async fn test_seed_only_fills_empty_tables() {
		let store = Store::connect("sqlite::memory:").await.unwrap();

		// Fresh install got the defaults.
		let groups = store.groups().list_groups().await.unwrap();
		assert_eq!(groups.len(), 1);
		assert_eq!(groups[0].id, migrate::DEFAULT_GROUP_ID);
		assert!(store
			.status_pages()
			.get_status_page_by_slug(migrate::DEFAULT_STATUS_PAGE_SLUG)
			.await
			.unwrap()
			.is_some());

		// Re-seeding a populated store changes nothing.
		migrate::seed(store.pool(), store.dialect()).await.unwrap();
		assert_eq!(store.groups().list_groups().await.unwrap().len(), 1);
	}

	#[tokio::test]
	async fn test_file_backed_store_persists_across_connections() {
		let dir = tempfile::tempdir().unwrap();
		let url = format!("sqlite://{}", dir.path().join("vigil.db").display());

		let store = Store::connect(&url).await.unwrap();
		store.groups().create_group("g1", "G1").await.unwrap();
		store.close().await;

		// Reconnecting re-runs the (idempotent) migrations and skips
		// seeding because the tables are populated.
		let store = Store::connect(&url).await.unwrap();
		let groups = store.groups().list_groups().await.unwrap();
		assert!(groups.iter().any(|g| g.id == "g1"));
	}

	#[tokio::test]
	async fn test_reset_drops_data_and_reseeds() {
		let store = create_test_store().await;
		store.groups().create_group("g1", "G1").await.unwrap();
		store.monitors().create_monitor(&new_monitor("m1", "g1")).await.unwrap();
		store.settings().set_setting("retention_days", "90").await.unwrap();
		store.api_keys().create_api_key("ci").await.unwrap();

		store.reset().await.unwrap();

		assert_eq!(count(&store, "SELECT COUNT(*) FROM monitors").await, 0);
		assert!(store.api_keys().list_api_keys().await.unwrap().is_empty());
		assert!(store.settings().get_setting("retention_days").await.is_err());

		// Back to the seeded baseline.
		let groups = store.groups().list_groups().await.unwrap();
		assert_eq!(groups.len(), 1);
		assert_eq!(groups[0].id, migrate::DEFAULT_GROUP_ID);
	}
}
