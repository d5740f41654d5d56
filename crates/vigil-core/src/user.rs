// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! User, session and API key types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A dashboard account. Usernames are unique and matched case-sensitively.
///
/// `password_hash` is only populated on the authentication path; every
/// other lookup returns it empty. SSO-only accounts store an empty hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
	pub id: i64,
	pub username: String,
	#[serde(skip_serializing, default)]
	pub password_hash: String,
	pub timezone: String,
	pub email: Option<String>,
	pub sso_provider: Option<String>,
	pub sso_id: Option<String>,
	pub avatar_url: Option<String>,
	pub display_name: Option<String>,
	pub created_at: DateTime<Utc>,
}

/// A bearer session token with expiry, independent of the user record's
/// lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
	pub token: String,
	pub user_id: i64,
	pub expires_at: DateTime<Utc>,
}

/// Metadata for a stored API key. The full secret is hashed at rest; only
/// the short non-secret prefix survives in plaintext for lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
	pub id: i64,
	pub key_prefix: String,
	pub name: String,
	pub created_at: DateTime<Utc>,
	pub last_used_at: Option<DateTime<Utc>>,
}
