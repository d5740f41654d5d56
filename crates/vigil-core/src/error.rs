// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the core domain model.

use thiserror::Error;

/// Errors that can occur when parsing domain values.
#[derive(Debug, Error)]
pub enum CoreError {
	/// Invalid check status string
	#[error("invalid check status: {0}")]
	InvalidCheckStatus(String),

	/// Invalid incident kind string
	#[error("invalid incident kind: {0}")]
	InvalidIncidentKind(String),

	/// Invalid incident source string
	#[error("invalid incident source: {0}")]
	InvalidIncidentSource(String),
}
