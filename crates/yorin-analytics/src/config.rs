// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! File-based SDK configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// SDK configuration as read from TOML. Every field except the key and URL
/// has a default.
///
/// ```toml
/// api_key = "pk_live_abc"
/// api_url = "https://collect.yorin.example"
/// batch_size = 50
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YorinConfig {
	pub api_key: String,
	pub api_url: String,
	pub auto_track_pageviews: bool,
	pub auto_track_clicks: bool,
	pub debug: bool,
	pub session_timeout_ms: u64,
	pub batch_size: usize,
	pub flush_interval_ms: u64,
	pub enable_batching: bool,
	pub request_timeout_ms: u64,
}

impl Default for YorinConfig {
	fn default() -> Self {
		Self {
			api_key: String::new(),
			api_url: String::new(),
			auto_track_pageviews: true,
			auto_track_clicks: false,
			debug: false,
			session_timeout_ms: 30 * 60 * 1000,
			batch_size: 20,
			flush_interval_ms: 1000,
			enable_batching: true,
			request_timeout_ms: 10_000,
		}
	}
}

impl YorinConfig {
	pub fn from_toml_str(input: &str) -> Result<Self> {
		Ok(toml::from_str(input)?)
	}

	pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let contents = std::fs::read_to_string(path).map_err(|e| {
			crate::error::AnalyticsError::InvalidConfig(format!("{}: {e}", path.display()))
		})?;
		Self::from_toml_str(&contents)
	}

	pub fn session_timeout(&self) -> Duration {
		Duration::from_millis(self.session_timeout_ms)
	}

	pub fn flush_interval(&self) -> Duration {
		Duration::from_millis(self.flush_interval_ms)
	}

	pub fn request_timeout(&self) -> Duration {
		Duration::from_millis(self.request_timeout_ms)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::AnalyticsError;

	#[test]
	fn test_defaults() {
		let config = YorinConfig::default();
		assert!(config.auto_track_pageviews);
		assert!(!config.auto_track_clicks);
		assert!(!config.debug);
		assert_eq!(config.session_timeout(), Duration::from_secs(1800));
		assert_eq!(config.batch_size, 20);
		assert_eq!(config.flush_interval(), Duration::from_millis(1000));
		assert!(config.enable_batching);
		assert_eq!(config.request_timeout(), Duration::from_secs(10));
	}

	#[test]
	fn test_partial_toml_fills_defaults() {
		let config = YorinConfig::from_toml_str(
			r#"
				api_key = "pk_test_123"
				api_url = "https://collect.example.com"
				batch_size = 50
				auto_track_clicks = true
			"#,
		)
		.unwrap();

		assert_eq!(config.api_key, "pk_test_123");
		assert_eq!(config.api_url, "https://collect.example.com");
		assert_eq!(config.batch_size, 50);
		assert!(config.auto_track_clicks);
		assert_eq!(config.flush_interval_ms, 1000);
	}

	#[test]
	fn test_malformed_toml_is_config_error() {
		let result = YorinConfig::from_toml_str("batch_size = \"many\"");
		assert!(matches!(result, Err(AnalyticsError::Config(_))));
	}

	#[test]
	fn test_from_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("yorin.toml");
		std::fs::write(&path, "api_key = \"pk_file\"\ndebug = true\n").unwrap();

		let config = YorinConfig::from_file(&path).unwrap();
		assert_eq!(config.api_key, "pk_file");
		assert!(config.debug);
	}

	#[test]
	fn test_missing_file_is_invalid_config() {
		let result = YorinConfig::from_file("/nonexistent/yorin.toml");
		assert!(matches!(result, Err(AnalyticsError::InvalidConfig(_))));
	}
}
