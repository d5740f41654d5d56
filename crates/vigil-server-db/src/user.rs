// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! User, session and SSO repository.
//!
//! Usernames are matched case-sensitively (whitespace trimmed only);
//! `create_user` lowercases before storing. Authentication distinguishes
//! a missing user from a wrong password; merging the two for
//! enumeration resistance is a policy decision left to the HTTP layer.
//!
//! SSO find-or-create runs as one transaction so two concurrent logins
//! for the same identity cannot race each other into duplicate accounts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{any::AnyRow, AnyPool, Row};
use vigil_core::{Session, User};
use vigil_server_auth::{hash_password, synthesize_username, verify_password};

use crate::dialect::Dialect;
use crate::error::{map_unique_violation, DbError, Result};
use crate::row::parse_timestamp;

const USER_COLUMNS: &str = "id, username, password_hash, timezone, email, sso_provider, \
	sso_id, avatar_url, display_name, created_at";

#[async_trait]
pub trait UserStore: Send + Sync {
	/// Case-sensitive username match, then hash comparison. Fails with
	/// [`DbError::NotFound`] for an unknown user and
	/// [`DbError::InvalidCredential`] for a wrong password, two
	/// deliberately distinct kinds.
	async fn authenticate(&self, username: &str, password: &str) -> Result<User>;
	/// Create a password-bearing account; the username is lowercased.
	async fn create_user(&self, username: &str, password: &str, timezone: &str) -> Result<()>;
	/// Update timezone, and the password when one is supplied.
	async fn update_user(&self, id: i64, password: Option<&str>, timezone: &str) -> Result<()>;
	/// Re-check a password for an already-authenticated user.
	async fn verify_user_password(&self, id: i64, password: &str) -> Result<()>;
	/// Lookup with the password hash redacted. Absent id is `None`.
	async fn get_user(&self, id: i64) -> Result<Option<User>>;
	/// Lookup with the password hash redacted. Absent email is `None`.
	async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
	async fn has_users(&self) -> Result<bool>;
	/// Atomic probe: setup is complete once any user exists or the
	/// `setup_completed` setting is recorded.
	async fn is_setup_complete(&self) -> Result<bool>;
	/// Match by external identity, else link by email (refused when the
	/// account has a password), else auto-provision when allowed. All
	/// branches commit or roll back atomically.
	async fn find_or_create_sso_user(
		&self,
		provider: &str,
		sso_id: &str,
		email: &str,
		display_name: &str,
		avatar_url: &str,
		auto_provision: bool,
	) -> Result<User>;
	async fn create_session(
		&self,
		user_id: i64,
		token: &str,
		expires_at: DateTime<Utc>,
	) -> Result<()>;
	/// Absent or expired tokens are `None`, not an error.
	async fn get_session(&self, token: &str) -> Result<Option<Session>>;
	async fn delete_session(&self, token: &str) -> Result<()>;
	/// Delete a user's sessions, optionally sparing one token (the
	/// caller's current session).
	async fn delete_user_sessions(&self, user_id: i64, except_token: Option<&str>) -> Result<()>;
	/// Garbage-collect sessions past their expiry. Returns the number
	/// removed.
	async fn delete_expired_sessions(&self) -> Result<u64>;
}

/// Repository for user, session and SSO database operations.
#[derive(Clone)]
pub struct UserRepository {
	pool: AnyPool,
	dialect: Dialect,
}

impl UserRepository {
	pub fn new(pool: AnyPool, dialect: Dialect) -> Self {
		Self { pool, dialect }
	}
}

#[async_trait]
impl UserStore for UserRepository {
	#[tracing::instrument(skip(self, password), fields(username = %username))]
	async fn authenticate(&self, username: &str, password: &str) -> Result<User> {
		let username = username.trim();

		let row = sqlx::query(&self.dialect.rebind(&format!(
			"SELECT {USER_COLUMNS} FROM users WHERE username = ?"
		)))
		.bind(username)
		.fetch_optional(&self.pool)
		.await?;

		let user = match row {
			Some(row) => parse_user_row(&row)?,
			None => return Err(DbError::NotFound(format!("user {username}"))),
		};

		if user.password_hash.is_empty() || !verify_password(password, &user.password_hash)? {
			return Err(DbError::InvalidCredential);
		}

		tracing::debug!(user_id = user.id, "user authenticated");
		Ok(user)
	}

	#[tracing::instrument(skip(self, password), fields(username = %username))]
	async fn create_user(&self, username: &str, password: &str, timezone: &str) -> Result<()> {
		let username = username.trim().to_lowercase();
		let hash = hash_password(password)?;

		sqlx::query(&self.dialect.rebind(
			"INSERT INTO users (username, password_hash, timezone, created_at) VALUES (?, ?, ?, ?)",
		))
		.bind(&username)
		.bind(&hash)
		.bind(timezone)
		.bind(Utc::now().to_rfc3339())
		.execute(&self.pool)
		.await
		.map_err(|e| map_unique_violation(e, &format!("username {username} already exists")))?;

		tracing::info!(username = %username, "user created");
		Ok(())
	}

	#[tracing::instrument(skip(self, password), fields(user_id = id))]
	async fn update_user(&self, id: i64, password: Option<&str>, timezone: &str) -> Result<()> {
		match password.filter(|p| !p.is_empty()) {
			Some(password) => {
				let hash = hash_password(password)?;
				sqlx::query(&self.dialect.rebind(
					"UPDATE users SET password_hash = ?, timezone = ? WHERE id = ?",
				))
				.bind(&hash)
				.bind(timezone)
				.bind(id)
				.execute(&self.pool)
				.await?;
			}
			None => {
				sqlx::query(&self.dialect.rebind(
					"UPDATE users SET timezone = ? WHERE id = ?",
				))
				.bind(timezone)
				.bind(id)
				.execute(&self.pool)
				.await?;
			}
		}
		Ok(())
	}

	#[tracing::instrument(skip(self, password), fields(user_id = id))]
	async fn verify_user_password(&self, id: i64, password: &str) -> Result<()> {
		let row = sqlx::query(&self.dialect.rebind(
			"SELECT password_hash FROM users WHERE id = ?",
		))
		.bind(id)
		.fetch_optional(&self.pool)
		.await?;

		let hash: String = match row {
			Some(row) => row.get("password_hash"),
			None => return Err(DbError::NotFound(format!("user {id}"))),
		};

		if hash.is_empty() || !verify_password(password, &hash)? {
			return Err(DbError::InvalidCredential);
		}
		Ok(())
	}

	#[tracing::instrument(skip(self), fields(user_id = id))]
	async fn get_user(&self, id: i64) -> Result<Option<User>> {
		let row = sqlx::query(&self.dialect.rebind(&format!(
			"SELECT {USER_COLUMNS} FROM users WHERE id = ?"
		)))
		.bind(id)
		.fetch_optional(&self.pool)
		.await?;

		row.as_ref().map(parse_user_row_redacted).transpose()
	}

	#[tracing::instrument(skip(self, email))]
	async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
		let row = sqlx::query(&self.dialect.rebind(&format!(
			"SELECT {USER_COLUMNS} FROM users WHERE email = ?"
		)))
		.bind(email)
		.fetch_optional(&self.pool)
		.await?;

		row.as_ref().map(parse_user_row_redacted).transpose()
	}

	#[tracing::instrument(skip(self))]
	async fn has_users(&self) -> Result<bool> {
		let count: i64 = sqlx::query("SELECT COUNT(*) FROM users")
			.fetch_one(&self.pool)
			.await?
			.get(0);
		Ok(count > 0)
	}

	#[tracing::instrument(skip(self))]
	async fn is_setup_complete(&self) -> Result<bool> {
		// One query so concurrent setup requests cannot both observe an
		// incomplete state.
		let count: i64 = sqlx::query(
			"SELECT (SELECT COUNT(*) FROM users)
				+ (SELECT COUNT(*) FROM settings
					WHERE key = 'setup_completed' AND value = 'true')",
		)
		.fetch_one(&self.pool)
		.await?
		.get(0);
		Ok(count > 0)
	}

	#[tracing::instrument(skip(self, email, display_name, avatar_url), fields(provider = %provider))]
	async fn find_or_create_sso_user(
		&self,
		provider: &str,
		sso_id: &str,
		email: &str,
		display_name: &str,
		avatar_url: &str,
		auto_provision: bool,
	) -> Result<User> {
		let mut tx = self.pool.begin().await?;

		// Branch 1: already linked to this external identity.
		let row = sqlx::query(&self.dialect.rebind(&format!(
			"SELECT {USER_COLUMNS} FROM users WHERE sso_provider = ? AND sso_id = ?"
		)))
		.bind(provider)
		.bind(sso_id)
		.fetch_optional(&mut *tx)
		.await?;

		if let Some(row) = row {
			let mut user = parse_user_row(&row)?;
			if !avatar_url.is_empty() || !display_name.is_empty() {
				sqlx::query(&self.dialect.rebind(
					"UPDATE users SET avatar_url = ?, display_name = ? WHERE id = ?",
				))
				.bind(avatar_url)
				.bind(display_name)
				.bind(user.id)
				.execute(&mut *tx)
				.await?;
				user.avatar_url = Some(avatar_url.to_string());
				user.display_name = Some(display_name.to_string());
			}
			tx.commit().await?;
			user.password_hash.clear();
			return Ok(user);
		}

		// Branch 2: link by email, unless the account has a password. A
		// password-bearing account must opt in through settings, or an
		// attacker-controlled external identity sharing the victim's
		// email would take the account over.
		let row = sqlx::query(&self.dialect.rebind(&format!(
			"SELECT {USER_COLUMNS} FROM users WHERE email = ?"
		)))
		.bind(email)
		.fetch_optional(&mut *tx)
		.await?;

		if let Some(row) = row {
			let mut user = parse_user_row(&row)?;
			if !user.password_hash.is_empty() {
				return Err(DbError::Conflict(
					"account exists with this email; SSO linking requires verification".to_string(),
				));
			}

			sqlx::query(&self.dialect.rebind(
				"UPDATE users SET sso_provider = ?, sso_id = ?, avatar_url = ?, display_name = ?
				 WHERE id = ?",
			))
			.bind(provider)
			.bind(sso_id)
			.bind(avatar_url)
			.bind(display_name)
			.bind(user.id)
			.execute(&mut *tx)
			.await?;
			tx.commit().await?;

			user.sso_provider = Some(provider.to_string());
			user.sso_id = Some(sso_id.to_string());
			user.avatar_url = Some(avatar_url.to_string());
			user.display_name = Some(display_name.to_string());
			user.password_hash.clear();
			tracing::info!(user_id = user.id, provider = %provider, "SSO identity linked");
			return Ok(user);
		}

		// Branch 3: nothing to link and provisioning is off.
		if !auto_provision {
			return Err(DbError::NotFound("user".to_string()));
		}

		// Branch 4: provision a password-less account with a synthetic
		// unique username.
		let base = synthesize_username(display_name, email);
		let mut username = base.clone();
		let mut counter = 1;
		loop {
			let count: i64 = sqlx::query(&self.dialect.rebind(
				"SELECT COUNT(*) FROM users WHERE username = ?",
			))
			.bind(&username)
			.fetch_one(&mut *tx)
			.await?
			.get(0);
			if count == 0 {
				break;
			}
			username = format!("{base}{counter}");
			counter += 1;
		}

		let id: i64 = sqlx::query(&self.dialect.rebind(
			"INSERT INTO users (username, password_hash, email, sso_provider, sso_id,
				avatar_url, display_name, created_at)
			 VALUES (?, '', ?, ?, ?, ?, ?, ?)
			 RETURNING id",
		))
		.bind(&username)
		.bind(email)
		.bind(provider)
		.bind(sso_id)
		.bind(avatar_url)
		.bind(display_name)
		.bind(Utc::now().to_rfc3339())
		.fetch_one(&mut *tx)
		.await?
		.get(0);

		tx.commit().await?;
		tracing::info!(user_id = id, username = %username, provider = %provider, "SSO user provisioned");

		Ok(User {
			id,
			username,
			password_hash: String::new(),
			timezone: "UTC".to_string(),
			email: Some(email.to_string()),
			sso_provider: Some(provider.to_string()),
			sso_id: Some(sso_id.to_string()),
			avatar_url: Some(avatar_url.to_string()),
			display_name: Some(display_name.to_string()),
			created_at: Utc::now(),
		})
	}

	#[tracing::instrument(skip(self, token))]
	async fn create_session(
		&self,
		user_id: i64,
		token: &str,
		expires_at: DateTime<Utc>,
	) -> Result<()> {
		sqlx::query(&self.dialect.rebind(
			"INSERT INTO sessions (token, user_id, expires_at) VALUES (?, ?, ?)",
		))
		.bind(token)
		.bind(user_id)
		.bind(expires_at.to_rfc3339())
		.execute(&self.pool)
		.await?;
		Ok(())
	}

	#[tracing::instrument(skip(self, token))]
	async fn get_session(&self, token: &str) -> Result<Option<Session>> {
		let not_expired = self.dialect.instant_after("expires_at");
		let row = sqlx::query(&self.dialect.rebind(&format!(
			"SELECT token, user_id, expires_at FROM sessions WHERE token = ? AND {not_expired}"
		)))
		.bind(token)
		.bind(Utc::now().to_rfc3339())
		.fetch_optional(&self.pool)
		.await?;

		match row {
			Some(row) => {
				let expires_at: String = row.get("expires_at");
				Ok(Some(Session {
					token: row.get("token"),
					user_id: row.get("user_id"),
					expires_at: parse_timestamp(&expires_at, "expires_at")?,
				}))
			}
			None => Ok(None),
		}
	}

	#[tracing::instrument(skip(self, token))]
	async fn delete_session(&self, token: &str) -> Result<()> {
		sqlx::query(&self.dialect.rebind("DELETE FROM sessions WHERE token = ?"))
			.bind(token)
			.execute(&self.pool)
			.await?;
		Ok(())
	}

	#[tracing::instrument(skip(self, except_token))]
	async fn delete_user_sessions(&self, user_id: i64, except_token: Option<&str>) -> Result<()> {
		match except_token {
			Some(token) => {
				sqlx::query(&self.dialect.rebind(
					"DELETE FROM sessions WHERE user_id = ? AND token != ?",
				))
				.bind(user_id)
				.bind(token)
				.execute(&self.pool)
				.await?;
			}
			None => {
				sqlx::query(&self.dialect.rebind(
					"DELETE FROM sessions WHERE user_id = ?",
				))
				.bind(user_id)
				.execute(&self.pool)
				.await?;
			}
		}
		Ok(())
	}

	#[tracing::instrument(skip(self))]
	async fn delete_expired_sessions(&self) -> Result<u64> {
		let expired = self.dialect.instant_at_or_before("expires_at");
		let result = sqlx::query(&self.dialect.rebind(&format!(
			"DELETE FROM sessions WHERE {expired}"
		)))
		.bind(Utc::now().to_rfc3339())
		.execute(&self.pool)
		.await?;

		let removed = result.rows_affected();
		if removed > 0 {
			tracing::debug!(removed, "expired sessions removed");
		}
		Ok(removed)
	}
}

fn parse_user_row(row: &AnyRow) -> Result<User> {
	let created_at: String = row.get("created_at");

	Ok(User {
		id: row.get("id"),
		username: row.get("username"),
		password_hash: row.get("password_hash"),
		timezone: row.get("timezone"),
		email: row.get("email"),
		sso_provider: row.get("sso_provider"),
		sso_id: row.get("sso_id"),
		avatar_url: row.get("avatar_url"),
		display_name: row.get("display_name"),
		created_at: parse_timestamp(&created_at, "created_at")?,
	})
}

fn parse_user_row_redacted(row: &AnyRow) -> Result<User> {
	let mut user = parse_user_row(row)?;
	user.password_hash.clear();
	Ok(user)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::settings::SettingsStore;
	use crate::testing::create_test_store;

	#[tokio::test]
	async fn test_authenticate_distinguishes_missing_from_wrong_password() {
		let store = create_test_store().await;
		let users = store.users();

		users.create_user("admin", "correct horse", "UTC").await.unwrap();

		let user = users.authenticate("admin", "correct horse").await.unwrap();
		assert_eq!(user.username, "admin");

		let err = users.authenticate("admin", "battery staple").await.unwrap_err();
		assert!(matches!(err, DbError::InvalidCredential));

		let err = users.authenticate("nobody", "correct horse").await.unwrap_err();
		assert!(matches!(err, DbError::NotFound(_)));
	}

	#[tokio::test]
	async fn test_authenticate_is_case_sensitive() {
		let store = create_test_store().await;
		let users = store.users();

		// create_user lowercases, authenticate does not normalize.
		users.create_user("Admin", "pw", "UTC").await.unwrap();
		assert!(users.authenticate("admin", "pw").await.is_ok());
		let err = users.authenticate("Admin", "pw").await.unwrap_err();
		assert!(matches!(err, DbError::NotFound(_)));
	}

	#[tokio::test]
	async fn test_duplicate_username_is_conflict() {
		let store = create_test_store().await;
		let users = store.users();

		users.create_user("admin", "pw", "UTC").await.unwrap();
		let err = users.create_user("admin", "pw2", "UTC").await.unwrap_err();
		assert!(matches!(err, DbError::Conflict(_)));
	}

	#[tokio::test]
	async fn test_get_user_redacts_hash() {
		let store = create_test_store().await;
		let users = store.users();

		users.create_user("admin", "pw", "Europe/Berlin").await.unwrap();
		let authed = users.authenticate("admin", "pw").await.unwrap();

		let user = users.get_user(authed.id).await.unwrap().unwrap();
		assert!(user.password_hash.is_empty());
		assert_eq!(user.timezone, "Europe/Berlin");

		assert!(users.get_user(9999).await.unwrap().is_none());
	}

	#[tokio::test]
	async fn test_setup_state_probes() {
		let store = create_test_store().await;
		let users = store.users();

		assert!(!users.has_users().await.unwrap());
		assert!(!users.is_setup_complete().await.unwrap());

		store
			.settings()
			.set_setting("setup_completed", "true")
			.await
			.unwrap();
		assert!(users.is_setup_complete().await.unwrap());

		users.create_user("admin", "pw", "UTC").await.unwrap();
		assert!(users.has_users().await.unwrap());
	}

	#[tokio::test]
	async fn test_session_lifecycle_and_expiry() {
		let store = create_test_store().await;
		let users = store.users();

		users.create_user("admin", "pw", "UTC").await.unwrap();
		let user = users.authenticate("admin", "pw").await.unwrap();

		let fresh = Utc::now() + chrono::Duration::hours(1);
		users.create_session(user.id, "tok-live", fresh).await.unwrap();
		let stale = Utc::now() - chrono::Duration::hours(1);
		users.create_session(user.id, "tok-stale", stale).await.unwrap();

		let session = users.get_session("tok-live").await.unwrap().unwrap();
		assert_eq!(session.user_id, user.id);
		// Expired and unknown tokens both read as absent.
		assert!(users.get_session("tok-stale").await.unwrap().is_none());
		assert!(users.get_session("tok-unknown").await.unwrap().is_none());

		assert_eq!(users.delete_expired_sessions().await.unwrap(), 1);

		users.delete_session("tok-live").await.unwrap();
		assert!(users.get_session("tok-live").await.unwrap().is_none());
	}

	#[tokio::test]
	async fn test_delete_user_sessions_spares_excepted_token() {
		let store = create_test_store().await;
		let users = store.users();

		users.create_user("admin", "pw", "UTC").await.unwrap();
		let user = users.authenticate("admin", "pw").await.unwrap();

		let expiry = Utc::now() + chrono::Duration::hours(1);
		users.create_session(user.id, "tok-a", expiry).await.unwrap();
		users.create_session(user.id, "tok-b", expiry).await.unwrap();

		users
			.delete_user_sessions(user.id, Some("tok-a"))
			.await
			.unwrap();
		assert!(users.get_session("tok-a").await.unwrap().is_some());
		assert!(users.get_session("tok-b").await.unwrap().is_none());

		users.delete_user_sessions(user.id, None).await.unwrap();
		assert!(users.get_session("tok-a").await.unwrap().is_none());
	}

	#[tokio::test]
	async fn test_sso_provisions_and_reuses_identity() {
		let store = create_test_store().await;
		let users = store.users();

		let user = users
			.find_or_create_sso_user("google", "ext-1", "ada@example.com", "Ada Lovelace", "", true)
			.await
			.unwrap();
		assert_eq!(user.username, "adalovelace");
		assert_eq!(user.sso_provider.as_deref(), Some("google"));

		// Second login with the same identity returns the same account
		// and refreshes the cached profile.
		let again = users
			.find_or_create_sso_user(
				"google",
				"ext-1",
				"ada@example.com",
				"Ada L.",
				"https://avatars.example.com/ada.png",
				true,
			)
			.await
			.unwrap();
		assert_eq!(again.id, user.id);
		assert_eq!(again.display_name.as_deref(), Some("Ada L."));
	}

	#[tokio::test]
	async fn test_sso_refuses_linking_password_account() {
		let store = create_test_store().await;
		let users = store.users();

		users.create_user("ada", "pw", "UTC").await.unwrap();
		let authed = users.authenticate("ada", "pw").await.unwrap();
		// Give the password account an email to collide with.
		sqlx::query(&store.dialect().rebind("UPDATE users SET email = ? WHERE id = ?"))
			.bind("ada@example.com")
			.bind(authed.id)
			.execute(store.pool())
			.await
			.unwrap();

		let err = users
			.find_or_create_sso_user("google", "ext-9", "ada@example.com", "Ada", "", true)
			.await
			.unwrap_err();
		assert!(matches!(err, DbError::Conflict(_)));
	}

	#[tokio::test]
	async fn test_sso_links_passwordless_account_by_email() {
		let store = create_test_store().await;
		let users = store.users();

		let provisioned = users
			.find_or_create_sso_user("google", "ext-1", "ada@example.com", "Ada", "", true)
			.await
			.unwrap();

		// A different provider for the same email links onto the
		// password-less account instead of creating a second one.
		let linked = users
			.find_or_create_sso_user("github", "gh-1", "ada@example.com", "Ada", "", true)
			.await
			.unwrap();
		assert_eq!(linked.id, provisioned.id);
		assert_eq!(linked.sso_provider.as_deref(), Some("github"));
	}

	#[tokio::test]
	async fn test_sso_respects_auto_provision_flag() {
		let store = create_test_store().await;
		let err = store
			.users()
			.find_or_create_sso_user("google", "ext-1", "new@example.com", "New", "", false)
			.await
			.unwrap_err();
		assert!(matches!(err, DbError::NotFound(_)));
	}

	#[tokio::test]
	async fn test_sso_username_collision_gets_suffix() {
		let store = create_test_store().await;
		let users = store.users();

		users.create_user("ada", "pw", "UTC").await.unwrap();
		let provisioned = users
			.find_or_create_sso_user("google", "ext-2", "ada@other.example.com", "Ada", "", true)
			.await
			.unwrap();
		assert_eq!(provisioned.username, "ada1");
	}
}
