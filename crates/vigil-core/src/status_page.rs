// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Status page configuration types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named, externally visible view over a subset of groups/monitors.
///
/// `public` and `enabled` are independent: a page must be enabled to be
/// reachable at all, and additionally public to be reachable without
/// authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusPage {
	pub id: i64,
	pub slug: String,
	pub title: String,
	/// Scope the page to one group; `None` means the global page.
	pub group_id: Option<String>,
	pub public: bool,
	pub enabled: bool,
	pub description: String,
	pub logo_url: String,
	pub accent_color: String,
	/// `light`, `dark` or `system`.
	pub theme: String,
	pub show_uptime_bars: bool,
	pub show_uptime_percentage: bool,
	pub show_incident_history: bool,
	pub created_at: DateTime<Utc>,
}

/// Input for creating or replacing a status page, keyed by slug.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusPageInput {
	pub slug: String,
	pub title: String,
	pub group_id: Option<String>,
	pub public: bool,
	pub enabled: bool,
	pub description: String,
	pub logo_url: String,
	pub accent_color: String,
	pub theme: String,
	pub show_uptime_bars: bool,
	pub show_uptime_percentage: bool,
	pub show_incident_history: bool,
}

impl StatusPageInput {
	/// A minimal page with default display configuration.
	pub fn new(slug: impl Into<String>, title: impl Into<String>) -> Self {
		Self {
			slug: slug.into(),
			title: title.into(),
			group_id: None,
			public: false,
			enabled: true,
			description: String::new(),
			logo_url: String::new(),
			accent_color: String::new(),
			theme: "system".to_string(),
			show_uptime_bars: true,
			show_uptime_percentage: true,
			show_incident_history: true,
		}
	}
}
