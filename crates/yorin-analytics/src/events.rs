// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Builds events from call-site input, identity and page context.

use std::sync::Arc;

use serde_json::Value;
use yorin_analytics_core::{
	classify_referrer, group_properties, identify_properties, Event, EventKind, PublishableKey,
};

use crate::context::PageContext;
use crate::identity::IdentityStore;
use crate::properties::Properties;

/// Pageview property keys the caller may use to override page context.
pub mod pageview {
	pub const URL: &str = "url";
	pub const TITLE: &str = "title";
	pub const REFERRER: &str = "referrer";
}

pub struct EventFactory {
	api_key: PublishableKey,
	identity: Arc<IdentityStore>,
	context: Arc<dyn PageContext>,
}

impl EventFactory {
	pub fn new(api_key: PublishableKey, identity: Arc<IdentityStore>, context: Arc<dyn PageContext>) -> Self {
		Self {
			api_key,
			identity,
			context,
		}
	}

	/// The URL a pageview with `props` would record: the caller's `url`
	/// property, else the current page.
	pub fn pageview_url(&self, props: &Properties) -> Option<String> {
		props
			.get_str(pageview::URL)
			.filter(|url| !url.is_empty())
			.map(str::to_string)
			.or_else(|| self.context.current_url())
	}

	/// Every event starts here; this is where the session slides forward.
	fn base(&self, kind: EventKind) -> Event {
		Event::new(
			kind,
			&self.api_key,
			self.identity.anonymous_id(),
			self.identity.touch_session(),
		)
	}

	/// A pageview of `url`. Computed `page_title`, `referrer_type` and
	/// `search_engine` are overridden by caller properties.
	pub fn pageview(&self, url: &str, props: &Properties) -> Event {
		let raw_referrer = self.context.referrer().unwrap_or_default();
		let host_url = self.context.current_url().unwrap_or_else(|| url.to_string());
		let info = classify_referrer(&raw_referrer, Some(&host_url));

		let mut computed = Properties::new()
			.insert_opt(
				"page_title",
				props
					.get_str(pageview::TITLE)
					.map(str::to_string)
					.or_else(|| self.context.title()),
			)
			.insert("referrer_type", info.referrer_type.as_str())
			.insert_opt("search_engine", info.search_engine);
		computed = computed.merge(props.clone());

		let referrer = props
			.get_str(pageview::REFERRER)
			.map(str::to_string)
			.unwrap_or(info.referrer);

		self
			.base(EventKind::Pageview)
			.with_url(url)
			.with_referrer(referrer)
			.with_viewport(self.context.viewport())
			.with_properties(computed.into_map())
	}

	/// A custom event. `event_name` always holds `name`.
	pub fn custom(&self, name: &str, props: &Properties) -> Option<Event> {
		let url = self.context.current_url()?;

		let mut properties = props.as_map().clone();
		properties.insert("event_name".to_string(), Value::String(name.to_string()));

		Some(
			self
				.base(EventKind::Custom)
				.with_url(url)
				.with_referrer(self.context.referrer().unwrap_or_default())
				.with_viewport(self.context.viewport())
				.with_properties(properties),
		)
	}

	pub fn identify(&self, user_id: &str, props: &Properties) -> Option<Event> {
		let url = self.context.current_url()?;
		Some(
			self
				.base(EventKind::Identify)
				.with_url(url)
				.with_properties(identify_properties(user_id, props.as_map())),
		)
	}

	pub fn group_identify(&self, group_id: &str, props: &Properties) -> Option<Event> {
		let url = self.context.current_url()?;
		Some(
			self
				.base(EventKind::GroupIdentify)
				.with_url(url)
				.with_properties(group_properties(group_id, props.as_map())),
		)
	}
}
