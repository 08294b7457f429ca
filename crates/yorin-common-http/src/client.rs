// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared HTTP client with a consistent User-Agent header.

use reqwest::{Client, ClientBuilder};
use std::time::Duration;

/// SDK name reported in the User-Agent.
pub const SDK_NAME: &str = "yorin-analytics-rust";
/// SDK version reported in the User-Agent.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Creates a new HTTP client builder with the standard SDK User-Agent header.
///
/// Use this when you need to customize the client (e.g., set timeout).
///
/// # Example
/// ```ignore
/// let client = yorin_common_http::builder()
///     .timeout(Duration::from_secs(30))
///     .build()?;
/// ```
pub fn builder() -> ClientBuilder {
	Client::builder().user_agent(user_agent())
}

/// Creates a new HTTP client with a custom timeout and the standard User-Agent.
pub fn new_client_with_timeout(timeout: Duration) -> reqwest::Result<Client> {
	builder().timeout(timeout).build()
}

/// Returns the standard SDK User-Agent string.
///
/// Format: `yorin-analytics-rust/{version}`
pub fn user_agent() -> String {
	format!("{SDK_NAME}/{SDK_VERSION}")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn user_agent_has_correct_format() {
		let ua = user_agent();
		let parts: Vec<&str> = ua.split('/').collect();
		assert_eq!(parts.len(), 2);
		assert_eq!(parts[0], SDK_NAME);
		assert_eq!(parts[1], SDK_VERSION);
	}

	#[test]
	fn client_with_timeout_builds() {
		let client = new_client_with_timeout(Duration::from_secs(5));
		assert!(client.is_ok());
	}
}
