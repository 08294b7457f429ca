// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The page the host application is currently showing.
//!
//! Events are only built while a current URL is known. Hosts without a
//! page (server-side rendering, background jobs) leave the URL unset and
//! every capture call becomes a no-op.

use parking_lot::RwLock;
use url::Url;
use yorin_analytics_core::Viewport;

pub trait PageContext: Send + Sync {
	/// The URL of the page being shown, if any.
	fn current_url(&self) -> Option<String>;

	/// The URL of the page that led here, if any.
	fn referrer(&self) -> Option<String>;

	fn title(&self) -> Option<String>;

	fn viewport(&self) -> Option<Viewport>;

	/// `scheme://host[:port]` of the current URL, used as the `Origin` header.
	fn origin(&self) -> Option<String> {
		let url = Url::parse(&self.current_url()?).ok()?;
		match url.origin() {
			origin @ url::Origin::Tuple(..) => Some(origin.ascii_serialization()),
			url::Origin::Opaque(_) => None,
		}
	}
}

#[derive(Debug, Clone, Default)]
struct PageState {
	url: Option<String>,
	referrer: Option<String>,
	title: Option<String>,
	viewport: Option<Viewport>,
}

/// A page context the host updates as it navigates.
#[derive(Debug, Default)]
pub struct StaticPageContext {
	state: RwLock<PageState>,
}

impl StaticPageContext {
	/// A context with no page. Every capture call is dropped until
	/// [`StaticPageContext::set_url`] is called.
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_url(url: impl Into<String>) -> Self {
		let context = Self::new();
		context.set_url(url);
		context
	}

	pub fn set_url(&self, url: impl Into<String>) {
		self.state.write().url = Some(url.into());
	}

	pub fn clear_url(&self) {
		self.state.write().url = None;
	}

	pub fn set_referrer(&self, referrer: impl Into<String>) {
		self.state.write().referrer = Some(referrer.into());
	}

	pub fn set_title(&self, title: impl Into<String>) {
		self.state.write().title = Some(title.into());
	}

	pub fn set_viewport(&self, viewport: Viewport) {
		self.state.write().viewport = Some(viewport);
	}

	/// Moves to `url`, making the previous URL the referrer.
	pub fn navigate(&self, url: impl Into<String>) {
		let mut state = self.state.write();
		let previous = state.url.replace(url.into());
		state.referrer = previous;
	}
}

impl PageContext for StaticPageContext {
	fn current_url(&self) -> Option<String> {
		self.state.read().url.clone().filter(|url| !url.is_empty())
	}

	fn referrer(&self) -> Option<String> {
		self.state.read().referrer.clone()
	}

	fn title(&self) -> Option<String> {
		self.state.read().title.clone()
	}

	fn viewport(&self) -> Option<Viewport> {
		self.state.read().viewport
	}
}
