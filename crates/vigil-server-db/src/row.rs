// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Decoding helpers shared by the repositories.
//!
//! Timestamps are stored as RFC 3339 text and flags as 0/1 integers in
//! both engines; every row struct funnels through these.

use chrono::{DateTime, Utc};

use crate::error::{DbError, Result};

/// Parse a stored RFC 3339 timestamp.
pub(crate) fn parse_timestamp(value: &str, field: &str) -> Result<DateTime<Utc>> {
	DateTime::parse_from_rfc3339(value)
		.map(|dt| dt.with_timezone(&Utc))
		.map_err(|e| DbError::Internal(format!("invalid {field}: {e}")))
}

/// Parse an optional stored RFC 3339 timestamp.
pub(crate) fn parse_timestamp_opt(
	value: Option<String>,
	field: &str,
) -> Result<Option<DateTime<Utc>>> {
	value.map(|s| parse_timestamp(&s, field)).transpose()
}
