// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session and anonymous identifiers.
//!
//! Both are opaque strings of the form `<tag>_<uuid-v4>`: sessions use the
//! `s_` tag and anonymous device ids use `a_`. The newtypes keep the tag
//! invariant checkable when values are read back from storage.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Tag prefix for session identifiers.
pub const SESSION_ID_PREFIX: &str = "s_";
/// Tag prefix for anonymous identifiers.
pub const ANONYMOUS_ID_PREFIX: &str = "a_";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("identifier {value:?} is missing the {expected:?} prefix")]
pub struct IdError {
	pub value: String,
	pub expected: &'static str,
}

fn check_prefix(value: &str, prefix: &'static str) -> Result<(), IdError> {
	if value.len() > prefix.len() && value.starts_with(prefix) {
		Ok(())
	} else {
		Err(IdError {
			value: value.to_string(),
			expected: prefix,
		})
	}
}

/// Identifier for a bounded activity window.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
	/// Mints a fresh session id.
	pub fn generate() -> Self {
		Self(format!("{SESSION_ID_PREFIX}{}", Uuid::new_v4()))
	}

	/// Wraps an existing value, checking the `s_` tag.
	pub fn parse(value: impl Into<String>) -> Result<Self, IdError> {
		let value = value.into();
		check_prefix(&value, SESSION_ID_PREFIX)?;
		Ok(Self(value))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

/// Durable pseudonymous identifier for a device or profile.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AnonymousId(String);

impl AnonymousId {
	/// Mints a fresh anonymous id.
	pub fn generate() -> Self {
		Self(format!("{ANONYMOUS_ID_PREFIX}{}", Uuid::new_v4()))
	}

	/// Wraps an existing value, checking the `a_` tag.
	pub fn parse(value: impl Into<String>) -> Result<Self, IdError> {
		let value = value.into();
		check_prefix(&value, ANONYMOUS_ID_PREFIX)?;
		Ok(Self(value))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

macro_rules! impl_id_conversions {
	($ty:ident) => {
		impl std::fmt::Display for $ty {
			fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
				f.write_str(&self.0)
			}
		}

		impl std::str::FromStr for $ty {
			type Err = IdError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::parse(s)
			}
		}

		impl TryFrom<String> for $ty {
			type Error = IdError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				Self::parse(value)
			}
		}

		impl From<$ty> for String {
			fn from(id: $ty) -> Self {
				id.0
			}
		}

		impl AsRef<str> for $ty {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
	};
}

impl_id_conversions!(SessionId);
impl_id_conversions!(AnonymousId);

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	fn assert_uuid_v4_shape(token: &str) {
		let parsed = Uuid::parse_str(token).expect("token should be a uuid");
		assert_eq!(parsed.get_version_num(), 4);
		assert_eq!(token.len(), 36);
		assert_eq!(token.matches('-').count(), 4);
	}

	#[test]
	fn generated_session_id_has_tag_and_uuid() {
		let id = SessionId::generate();
		let token = id.as_str().strip_prefix("s_").unwrap();
		assert_uuid_v4_shape(token);
	}

	#[test]
	fn generated_anonymous_id_has_tag_and_uuid() {
		let id = AnonymousId::generate();
		let token = id.as_str().strip_prefix("a_").unwrap();
		assert_uuid_v4_shape(token);
	}

	#[test]
	fn parse_rejects_wrong_tag() {
		assert!(SessionId::parse("a_123").is_err());
		assert!(AnonymousId::parse("s_123").is_err());
		assert!(SessionId::parse("s_").is_err());
		assert!(AnonymousId::parse("").is_err());
	}

	#[test]
	fn parse_accepts_stored_values() {
		let id = SessionId::parse("s_abc").unwrap();
		assert_eq!(id.to_string(), "s_abc");
	}

	#[test]
	fn serde_is_transparent_string() {
		let id = AnonymousId::parse("a_device").unwrap();
		let json = serde_json::to_string(&id).unwrap();
		assert_eq!(json, "\"a_device\"");

		let bad: Result<AnonymousId, _> = serde_json::from_str("\"device\"");
		assert!(bad.is_err());
	}

	proptest! {
		#[test]
		fn generated_ids_are_unique(_seed: u64) {
			prop_assert_ne!(SessionId::generate(), SessionId::generate());
			prop_assert_ne!(AnonymousId::generate(), AnonymousId::generate());
		}
	}
}
