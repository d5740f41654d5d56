// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core domain types for the Vigil uptime monitoring system.
//!
//! This crate holds the plain data model shared by the storage layer and
//! its consumers: groups, monitors, checks, events, outages, incidents,
//! status pages, notification channels, users, sessions, API keys and the
//! derived analytics shapes. It has no I/O and no database dependency.

pub mod channel;
pub mod error;
pub mod incident;
pub mod monitor;
pub mod stats;
pub mod status_page;
pub mod user;

pub use channel::NotificationChannel;
pub use error::CoreError;
pub use incident::{Incident, IncidentKind, IncidentSource, IncidentUpdate};
pub use monitor::{
	CheckResult, CheckStatus, Group, Monitor, MonitorEvent, MonitorOutage, SystemEvent,
};
pub use stats::{LatencyPoint, SslWarning, SystemStats, UptimeStats};
pub use status_page::{StatusPage, StatusPageInput};
pub use user::{ApiKey, Session, User};
