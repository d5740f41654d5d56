// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Username synthesis for auto-provisioned SSO accounts.

/// Derive a base username from an SSO display name, falling back to the
/// email local part.
///
/// The result is lowercased and stripped to `[a-z0-9_]`; when nothing
/// survives, `user` is returned. Uniqueness is the caller's problem: the
/// user repository appends a numeric suffix on collision.
pub fn synthesize_username(display_name: &str, email: &str) -> String {
	let source = if display_name.trim().is_empty() {
		email.split('@').next().unwrap_or_default()
	} else {
		display_name.trim()
	};

	let cleaned: String = source
		.to_lowercase()
		.chars()
		.filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_')
		.collect();

	if cleaned.is_empty() {
		"user".to_string()
	} else {
		cleaned
	}
}
