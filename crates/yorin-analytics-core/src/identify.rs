// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Property processing for the identify and group-identify operations.
//!
//! The backend treats `$`-prefixed keys as first-class contact and company
//! fields. Older integrations send bare `email` / `name` keys; these are
//! promoted to their canonical `$` key when the caller did not provide the
//! canonical key already. The bare key is kept as an ordinary custom
//! property alongside the promoted one.

use serde_json::{Map, Value};

/// Canonical contact fields understood by the backend.
pub mod person {
	pub const USER_ID: &str = "$user_id";
	pub const EMAIL: &str = "$email";
	pub const FIRST_NAME: &str = "$first_name";
	pub const LAST_NAME: &str = "$last_name";
	pub const FULL_NAME: &str = "$full_name";
	pub const PHONE: &str = "$phone";
	pub const COMPANY: &str = "$company";
	pub const JOB_TITLE: &str = "$job_title";
	pub const AVATAR_URL: &str = "$avatar_url";
}

/// Canonical company fields understood by the backend.
pub mod group {
	pub const GROUP_ID: &str = "group_id";
	pub const NAME: &str = "$name";
	pub const DESCRIPTION: &str = "$description";
	pub const COMPANY: &str = "$company";
	pub const WEBSITE: &str = "$website";
	pub const INDUSTRY: &str = "$industry";
	pub const SIZE: &str = "$size";
	pub const EMAIL: &str = "$email";
	pub const PHONE: &str = "$phone";
}

/// Legacy bare keys and the canonical key each one is promoted to.
const LEGACY_PERSON_KEYS: &[(&str, &str)] = &[("email", person::EMAIL), ("name", person::FULL_NAME)];
const LEGACY_GROUP_KEYS: &[(&str, &str)] = &[("name", group::NAME)];

fn promote_legacy_keys(properties: &Map<String, Value>, legacy: &[(&str, &str)]) -> Map<String, Value> {
	let mut processed = Map::new();

	for (key, value) in properties {
		if value.is_null() {
			continue;
		}
		processed.insert(key.clone(), value.clone());
	}

	for (bare, canonical) in legacy {
		if properties.contains_key(*canonical) {
			continue;
		}
		if let Some(value) = processed.get(*bare).cloned() {
			processed.insert((*canonical).to_string(), value);
		}
	}

	processed
}

/// Builds the property payload of an identify event.
///
/// Null values are dropped, legacy keys are promoted, and `$user_id` is
/// always set to `user_id`, overriding any caller-supplied value.
pub fn identify_properties(user_id: &str, properties: &Map<String, Value>) -> Map<String, Value> {
	let mut processed = promote_legacy_keys(properties, LEGACY_PERSON_KEYS);
	processed.insert(person::USER_ID.to_string(), Value::String(user_id.to_string()));
	processed
}

/// Builds the property payload of a group-identify event.
///
/// Null values are dropped, legacy `name` is promoted to `$name`, and
/// `group_id` (no `$` prefix) is always set to `group_id`.
pub fn group_properties(group_id: &str, properties: &Map<String, Value>) -> Map<String, Value> {
	let mut processed = promote_legacy_keys(properties, LEGACY_GROUP_KEYS);
	processed.insert(group::GROUP_ID.to_string(), Value::String(group_id.to_string()));
	processed
}
