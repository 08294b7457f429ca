// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Remote settings with a local, time-boxed cache.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, error, warn};
use yorin_analytics_core::{AnalyticsSettings, CachedSettings, PublishableKey};

use crate::clock::Clock;
use crate::storage::FallbackStorage;
use crate::transport::Transport;

/// Storage key of the cached settings for `api_key`.
pub fn cache_key(api_key: &PublishableKey) -> String {
	format!("yorin_settings_{}", api_key.expose())
}

/// Loads settings from the local cache or the settings endpoint.
///
/// Loading never fails: any fetch problem yields
/// [`AnalyticsSettings::default`].
pub struct SettingsCache {
	storage: Arc<FallbackStorage>,
	clock: Arc<dyn Clock>,
	transport: Arc<dyn Transport>,
	cache_key: String,
	current: RwLock<Option<AnalyticsSettings>>,
}

impl SettingsCache {
	pub fn new(
		api_key: &PublishableKey,
		storage: Arc<FallbackStorage>,
		clock: Arc<dyn Clock>,
		transport: Arc<dyn Transport>,
	) -> Self {
		Self {
			storage,
			clock,
			transport,
			cache_key: cache_key(api_key),
			current: RwLock::new(None),
		}
	}

	/// The most recently loaded settings, `None` before the first load.
	pub fn current(&self) -> Option<AnalyticsSettings> {
		self.current.read().clone()
	}

	pub async fn load(&self) -> AnalyticsSettings {
		let settings = match self.cached() {
			Some(settings) => {
				debug!(?settings, "Analytics settings loaded from cache");
				settings
			}
			None => self.fetch().await,
		};

		*self.current.write() = Some(settings.clone());
		settings
	}

	fn cached(&self) -> Option<AnalyticsSettings> {
		let raw = self.storage.get(&self.cache_key)?;

		let entry: CachedSettings = match serde_json::from_str(&raw) {
			Ok(entry) => entry,
			Err(e) => {
				warn!(error = %e, "Failed to parse cached settings");
				return None;
			}
		};

		if !entry.is_fresh(self.clock.now_ms()) {
			self.storage.remove(&self.cache_key);
			return None;
		}

		Some(entry.settings)
	}

	async fn fetch(&self) -> AnalyticsSettings {
		match self.transport.fetch_settings().await {
			Ok(response) if response.success => match response.settings {
				Some(settings) => {
					self.store(&settings);
					debug!(?settings, "Analytics settings loaded from server");
					settings
				}
				None => {
					warn!("Settings response carried no settings, using defaults");
					AnalyticsSettings::default()
				}
			},
			Ok(response) => {
				warn!(
					message = response.message.as_deref().unwrap_or_default(),
					"Failed to load analytics settings, using defaults"
				);
				AnalyticsSettings::default()
			}
			Err(e) => {
				error!(error = %e, "Failed to fetch analytics settings, using defaults");
				AnalyticsSettings::default()
			}
		}
	}

	fn store(&self, settings: &AnalyticsSettings) {
		let entry = CachedSettings::new(settings.clone(), self.clock.now_ms());
		match serde_json::to_string(&entry) {
			Ok(json) => self.storage.set(&self.cache_key, &json),
			Err(e) => warn!(error = %e, "Failed to cache settings"),
		}
	}
}
