// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Credential primitives for the Vigil server.
//!
//! Password hashing, API-token generation and verification, session
//! tokens and SSO username synthesis. This crate owns everything
//! secret-shaped so the storage layer never touches raw crypto APIs.

mod argon2_config;
pub mod error;
pub mod password;
pub mod token;
pub mod username;

pub use error::{AuthError, Result};
pub use password::{hash_password, verify_password};
pub use token::{
	api_key_prefix, generate_api_key, generate_session_token, hash_api_key, verify_api_key,
	GeneratedApiKey, API_KEY_PREFIX_LEN, API_KEY_SCHEME,
};
pub use username::synthesize_username;
