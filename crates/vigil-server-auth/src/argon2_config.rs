// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared Argon2 instance for password and API-token hashing.
//!
//! Production builds use the argon2 crate's Argon2id defaults
//! (memory 19456 KiB, 2 iterations). Test builds swap in minimal
//! parameters so repository tests that create users and API keys stay
//! fast; those parameters MUST NOT leak into production code paths.

use argon2::Argon2;
#[cfg(test)]
use argon2::{Algorithm, Params, Version};

/// Returns the Argon2 hasher for the current build context.
#[inline]
pub(crate) fn argon2_instance() -> Argon2<'static> {
	#[cfg(test)]
	{
		// Reduced-cost parameters for tests ONLY: 1 MiB, 1 iteration.
		let params = Params::new(1024, 1, 1, None).expect("valid Argon2 params for tests");
		Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
	}

	#[cfg(not(test))]
	{
		Argon2::default()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_argon2_instance_constructs() {
		let argon2 = argon2_instance();
		let _ = format!("{argon2:?}");
	}
}
