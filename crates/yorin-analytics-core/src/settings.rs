// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Remotely configured auto-capture settings.

use serde::{Deserialize, Serialize};

/// How long a fetched settings value stays valid, in milliseconds.
pub const SETTINGS_CACHE_TTL_MS: i64 = 300_000;

/// Feature flags governing auto-capture behavior for a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSettings {
	pub autocapture_frontend_interactions: bool,
	pub enable_heatmaps: bool,
	pub enable_web_vitals_autocapture: bool,
	pub cookieless_server_hash_mode: bool,
	/// Bounce window in seconds.
	pub bounce_rate_duration: u32,
}

impl Default for AnalyticsSettings {
	fn default() -> Self {
		Self {
			autocapture_frontend_interactions: true,
			enable_heatmaps: false,
			enable_web_vitals_autocapture: false,
			cookieless_server_hash_mode: false,
			bounce_rate_duration: 10,
		}
	}
}

/// Response body of `GET /v1/settings`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsResponse {
	pub success: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub settings: Option<AnalyticsSettings>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
}

/// Settings as persisted in local storage, stamped with the fetch time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedSettings {
	pub settings: AnalyticsSettings,
	/// Milliseconds since the Unix epoch.
	pub timestamp: i64,
}

impl CachedSettings {
	pub fn new(settings: AnalyticsSettings, timestamp: i64) -> Self {
		Self {
			settings,
			timestamp,
		}
	}

	/// Returns true while the entry is younger than the cache TTL.
	pub fn is_fresh(&self, now_ms: i64) -> bool {
		now_ms - self.timestamp < SETTINGS_CACHE_TTL_MS
	}
}
