// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Event records as they travel to the collection endpoint.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::api_key::PublishableKey;
use crate::ids::{AnonymousId, SessionId};

/// The kind of a captured event.
///
/// The serialized names match what the collection endpoint expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
	#[serde(rename = "pageview")]
	Pageview,
	#[serde(rename = "custom_events")]
	Custom,
	#[serde(rename = "identify")]
	Identify,
	#[serde(rename = "groupIdentify")]
	GroupIdentify,
}

impl EventKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			EventKind::Pageview => "pageview",
			EventKind::Custom => "custom_events",
			EventKind::Identify => "identify",
			EventKind::GroupIdentify => "groupIdentify",
		}
	}
}

impl std::fmt::Display for EventKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Viewport dimensions of the host surface in CSS pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub width: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub height: Option<u32>,
}

impl Viewport {
	pub fn new(width: u32, height: u32) -> Self {
		Self {
			width: Some(width),
			height: Some(height),
		}
	}
}

/// A single captured event.
///
/// Events are assembled once with the `with_*` methods and are read-only
/// afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
	#[serde(rename = "type")]
	kind: EventKind,
	api_key: String,
	#[serde(default, rename = "href", skip_serializing_if = "Option::is_none")]
	url: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	referrer: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	viewport: Option<Viewport>,
	anonymous_id: AnonymousId,
	session_id: SessionId,
	#[serde(default)]
	properties: Map<String, Value>,
}

impl Event {
	pub fn new(
		kind: EventKind,
		api_key: &PublishableKey,
		anonymous_id: AnonymousId,
		session_id: SessionId,
	) -> Self {
		Self {
			kind,
			api_key: api_key.expose().to_string(),
			url: None,
			referrer: None,
			viewport: None,
			anonymous_id,
			session_id,
			properties: Map::new(),
		}
	}

	pub fn with_url(mut self, url: impl Into<String>) -> Self {
		self.url = Some(url.into());
		self
	}

	pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
		self.referrer = Some(referrer.into());
		self
	}

	pub fn with_viewport(mut self, viewport: Option<Viewport>) -> Self {
		self.viewport = viewport;
		self
	}

	pub fn with_properties(mut self, properties: Map<String, Value>) -> Self {
		self.properties = properties;
		self
	}

	pub fn kind(&self) -> EventKind {
		self.kind
	}

	pub fn api_key(&self) -> &str {
		&self.api_key
	}

	pub fn url(&self) -> Option<&str> {
		self.url.as_deref()
	}

	pub fn referrer(&self) -> Option<&str> {
		self.referrer.as_deref()
	}

	pub fn viewport(&self) -> Option<Viewport> {
		self.viewport
	}

	pub fn anonymous_id(&self) -> &AnonymousId {
		&self.anonymous_id
	}

	pub fn session_id(&self) -> &SessionId {
		&self.session_id
	}

	pub fn properties(&self) -> &Map<String, Value> {
		&self.properties
	}

	/// Returns true when the event carries a non-empty page URL.
	pub fn has_page_context(&self) -> bool {
		self.url.as_deref().is_some_and(|url| !url.is_empty())
	}
}

/// Response body of `POST /v1/events`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventResponse {
	pub success: bool,
	#[serde(default)]
	pub message: String,
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn test_event(kind: EventKind) -> Event {
		Event::new(
			kind,
			&PublishableKey::parse("pk_test_123").unwrap(),
			AnonymousId::parse("a_device").unwrap(),
			SessionId::parse("s_session").unwrap(),
		)
	}

	#[test]
	fn kind_wire_names() {
		assert_eq!(
			serde_json::to_value(EventKind::Pageview).unwrap(),
			json!("pageview")
		);
		assert_eq!(
			serde_json::to_value(EventKind::Custom).unwrap(),
			json!("custom_events")
		);
		assert_eq!(
			serde_json::to_value(EventKind::Identify).unwrap(),
			json!("identify")
		);
		assert_eq!(
			serde_json::to_value(EventKind::GroupIdentify).unwrap(),
			json!("groupIdentify")
		);
	}

	#[test]
	fn serializes_wire_field_names() {
		let mut props = Map::new();
		props.insert("event_name".to_string(), json!("signup"));

		let event = test_event(EventKind::Custom)
			.with_url("https://example.com/a")
			.with_referrer("https://google.com/")
			.with_viewport(Some(Viewport::new(1280, 720)))
			.with_properties(props);

		let value = serde_json::to_value(&event).unwrap();
		assert_eq!(
			value,
			json!({
				"type": "custom_events",
				"apiKey": "pk_test_123",
				"href": "https://example.com/a",
				"referrer": "https://google.com/",
				"viewport": {"width": 1280, "height": 720},
				"anonymousId": "a_device",
				"sessionId": "s_session",
				"properties": {"event_name": "signup"}
			})
		);
	}

	#[test]
	fn omits_absent_optional_fields() {
		let value = serde_json::to_value(test_event(EventKind::Identify)).unwrap();
		let object = value.as_object().unwrap();
		assert!(!object.contains_key("href"));
		assert!(!object.contains_key("referrer"));
		assert!(!object.contains_key("viewport"));
	}

	#[test]
	fn page_context_requires_non_empty_url() {
		assert!(!test_event(EventKind::Custom).has_page_context());
		assert!(!test_event(EventKind::Custom)
			.with_url("")
			.has_page_context());
		assert!(test_event(EventKind::Custom)
			.with_url("https://example.com")
			.has_page_context());
	}

	#[test]
	fn event_response_tolerates_missing_message() {
		let response: EventResponse = serde_json::from_str(r#"{"success":true}"#).unwrap();
		assert!(response.success);
		assert!(response.message.is_empty());
	}
}
