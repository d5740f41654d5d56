// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Notification channel configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A configured notification destination (email, webhook, chat, ...).
///
/// `config` is an opaque JSON document owned by the channel sender; this
/// layer stores and returns it without interpretation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationChannel {
	pub id: String,
	pub kind: String,
	pub name: String,
	pub config: String,
	pub enabled: bool,
	pub created_at: DateTime<Utc>,
}
