// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Publishable API keys for SDK authentication.
//!
//! Browser and client SDKs authenticate with a publishable key. Publishable
//! keys are safe to embed in client code and always carry the `pk_` prefix,
//! e.g. `pk_live_4f2a...` or `pk_test_123`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prefix carried by every publishable key.
pub const PUBLISHABLE_KEY_PREFIX: &str = "pk_";

/// Number of leading characters kept when a key is shown in logs.
const REDACTED_PREFIX_LEN: usize = 8;

/// Errors produced while validating a publishable key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiKeyError {
	#[error("API key is required")]
	Empty,

	#[error("invalid API key format: publishable keys should start with \"pk_\"")]
	InvalidPrefix,
}

/// A validated publishable key.
///
/// `Debug` and `Display` only ever show the redacted form; use
/// [`PublishableKey::expose`] when the raw value is needed on the wire.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PublishableKey(String);

impl PublishableKey {
	/// Validates and wraps a raw key.
	pub fn parse(raw: impl Into<String>) -> Result<Self, ApiKeyError> {
		let raw = raw.into();
		if raw.is_empty() {
			return Err(ApiKeyError::Empty);
		}
		if !raw.starts_with(PUBLISHABLE_KEY_PREFIX) {
			return Err(ApiKeyError::InvalidPrefix);
		}
		Ok(Self(raw))
	}

	/// Returns the raw key value.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Returns the key truncated for logging, e.g. `pk_test_...`.
	pub fn redacted(&self) -> String {
		let prefix: String = self.0.chars().take(REDACTED_PREFIX_LEN).collect();
		format!("{prefix}...")
	}
}

impl std::fmt::Debug for PublishableKey {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_tuple("PublishableKey").field(&self.redacted()).finish()
	}
}

impl std::fmt::Display for PublishableKey {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.redacted())
	}
}

impl std::str::FromStr for PublishableKey {
	type Err = ApiKeyError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

impl TryFrom<String> for PublishableKey {
	type Error = ApiKeyError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::parse(value)
	}
}

impl From<PublishableKey> for String {
	fn from(key: PublishableKey) -> Self {
		key.0
	}
}
