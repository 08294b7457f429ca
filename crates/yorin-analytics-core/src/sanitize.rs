// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Size and shape limits applied to events right before transmission.

use serde_json::{Map, Value};

use crate::event::Event;
use crate::identify::{group, person};

/// Maximum length of `href` and `referrer`, in characters.
pub const MAX_URL_LENGTH: usize = 2048;
/// Maximum length of a property key, in characters.
pub const MAX_PROPERTY_KEY_LENGTH: usize = 100;
/// Maximum length of a string property value, in characters.
pub const MAX_PROPERTY_VALUE_LENGTH: usize = 1000;
/// Maximum number of properties kept per event.
pub const MAX_PROPERTIES: usize = 100;

/// Keys the SDK injects itself. They survive the property cap even when they
/// fall outside the first [`MAX_PROPERTIES`] entries.
const INJECTED_KEYS: &[&str] = &["event_name", person::USER_ID, group::GROUP_ID];

/// Truncates `value` to at most `max` characters.
pub fn truncate_chars(value: &str, max: usize) -> &str {
	match value.char_indices().nth(max) {
		Some((byte_index, _)) => &value[..byte_index],
		None => value,
	}
}

fn sanitize_value(value: &Value) -> Value {
	match value {
		Value::String(s) => Value::String(truncate_chars(s, MAX_PROPERTY_VALUE_LENGTH).to_string()),
		other => other.clone(),
	}
}

/// Applies the property limits: first [`MAX_PROPERTIES`] entries in
/// iteration order, keys and string values truncated, injected keys retained.
pub fn sanitize_properties(properties: &Map<String, Value>) -> Map<String, Value> {
	let mut sanitized = Map::new();

	for (key, value) in properties.iter().take(MAX_PROPERTIES) {
		let key = truncate_chars(key, MAX_PROPERTY_KEY_LENGTH).to_string();
		sanitized.insert(key, sanitize_value(value));
	}

	for key in INJECTED_KEYS {
		if sanitized.contains_key(*key) {
			continue;
		}
		if let Some(value) = properties.get(*key) {
			sanitized.insert((*key).to_string(), sanitize_value(value));
		}
	}

	sanitized
}

/// Returns a sanitized copy of `event`; the input is left untouched.
pub fn sanitize_event(event: &Event) -> Event {
	let mut sanitized = event.clone().with_properties(sanitize_properties(event.properties()));

	if let Some(url) = event.url() {
		sanitized = sanitized.with_url(truncate_chars(url, MAX_URL_LENGTH));
	}
	if let Some(referrer) = event.referrer() {
		sanitized = sanitized.with_referrer(truncate_chars(referrer, MAX_URL_LENGTH));
	}

	sanitized
}
