// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Host lifecycle signals: page visibility and unload, in-app navigation,
//! and clicks on tracked elements.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::properties::Properties;

/// Quiet period after the last navigation before a pageview fires.
pub const NAVIGATION_DEBOUNCE: Duration = Duration::from_millis(100);

/// Longest `element_text` recorded for a click, in characters.
pub const MAX_ELEMENT_TEXT_LENGTH: usize = 100;

pub const ELEMENT_CLICKED_EVENT: &str = "element_clicked";

/// Page lifecycle transitions the host reports to the SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
	/// The page is no longer visible (tab switched, app backgrounded).
	/// Queued events are flushed through the normal delivery path.
	VisibilityHidden,
	/// The page is being hidden for navigation or close.
	PageHide,
	/// The page is about to unload.
	BeforeUnload,
}

impl LifecycleEvent {
	/// True for transitions after which the process may be torn down before
	/// a normal request completes.
	pub fn is_unload(&self) -> bool {
		matches!(self, LifecycleEvent::PageHide | LifecycleEvent::BeforeUnload)
	}
}

/// A clicked element. Only elements with a tracking name are recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClickTarget {
	/// Tag name, e.g. `button`.
	pub element_type: String,
	pub text: String,
	pub id: Option<String>,
	pub classes: Option<String>,
	/// The element's tracking name. `None` means the element is not tracked.
	pub track_name: Option<String>,
}

impl ClickTarget {
	pub fn new(element_type: impl Into<String>, track_name: impl Into<String>) -> Self {
		Self {
			element_type: element_type.into(),
			track_name: Some(track_name.into()),
			..Default::default()
		}
	}

	pub fn with_text(mut self, text: impl Into<String>) -> Self {
		self.text = text.into();
		self
	}

	pub fn with_id(mut self, id: impl Into<String>) -> Self {
		self.id = Some(id.into());
		self
	}

	pub fn with_classes(mut self, classes: impl Into<String>) -> Self {
		self.classes = Some(classes.into());
		self
	}

	/// Properties of the `element_clicked` event, or `None` for untracked
	/// elements.
	pub fn properties(&self) -> Option<Properties> {
		let track_name = self.track_name.as_deref().filter(|name| !name.is_empty())?;
		let text: String = self.text.chars().take(MAX_ELEMENT_TEXT_LENGTH).collect();

		Some(
			Properties::new()
				.insert("element_type", self.element_type.to_lowercase())
				.insert("element_text", text)
				.insert_opt("element_id", self.id.as_deref().filter(|id| !id.is_empty()))
				.insert_opt(
					"element_classes",
					self.classes.as_deref().filter(|classes| !classes.is_empty()),
				)
				.insert("track_name", track_name),
		)
	}
}

/// Trailing-edge debounce for navigation notifications.
///
/// Each call to [`NavigationDebouncer::settle`] supersedes the ones before
/// it; only the last call in a burst returns true.
#[derive(Debug)]
pub struct NavigationDebouncer {
	delay: Duration,
	generation: AtomicU64,
}

impl NavigationDebouncer {
	pub fn new(delay: Duration) -> Self {
		Self {
			delay,
			generation: AtomicU64::new(0),
		}
	}

	/// Waits out the quiet period. Returns false if another navigation
	/// arrived meanwhile.
	pub async fn settle(&self) -> bool {
		let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
		tokio::time::sleep(self.delay).await;
		self.generation.load(Ordering::SeqCst) == ticket
	}
}

impl Default for NavigationDebouncer {
	fn default() -> Self {
		Self::new(NAVIGATION_DEBOUNCE)
	}
}
