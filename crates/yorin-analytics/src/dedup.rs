// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Short-window suppression of repeated pageviews.

use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;
use crate::storage::FallbackStorage;

pub const LAST_PAGEVIEW_KEY: &str = "yorin_last_pageview";

/// Repeat pageviews of the same URL inside this window are dropped.
pub const PAGEVIEW_DEDUP_WINDOW: Duration = Duration::from_millis(3000);

/// Remembers the last sent pageview as `{url}_{timestamp_ms}`.
pub struct PageviewDedup {
	storage: Arc<FallbackStorage>,
	clock: Arc<dyn Clock>,
}

impl PageviewDedup {
	pub fn new(storage: Arc<FallbackStorage>, clock: Arc<dyn Clock>) -> Self {
		Self { storage, clock }
	}

	/// Returns false for a repeat of the last pageview inside the window.
	/// Otherwise records `url` as the last pageview and returns true.
	pub fn check_and_record(&self, url: &str) -> bool {
		let now_ms = self.clock.now_ms();

		if let Some((last_url, last_ms)) = self.last() {
			if last_url == url && now_ms - last_ms < PAGEVIEW_DEDUP_WINDOW.as_millis() as i64 {
				return false;
			}
		}

		self.storage.set(LAST_PAGEVIEW_KEY, &format!("{url}_{now_ms}"));
		true
	}

	fn last(&self) -> Option<(String, i64)> {
		let record = self.storage.get(LAST_PAGEVIEW_KEY)?;
		// URLs may contain `_`; the timestamp is everything after the last one.
		let (url, ms) = record.rsplit_once('_')?;
		Some((url.to_string(), ms.parse().ok()?))
	}
}
