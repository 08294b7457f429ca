// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the analytics SDK.
//!
//! Only construction and configuration loading hand these to callers.
//! Delivery failures are classified here, then logged and swallowed by the
//! delivery engine.

use thiserror::Error;
use yorin_common_http::RetryableError;

/// Marker the collection endpoint uses when the calling origin is not allowed
/// for the API key.
pub const INVALID_DOMAIN_MARKER: &str = "Invalid domain";

/// Analytics SDK errors.
#[derive(Debug, Error)]
pub enum AnalyticsError {
	#[error("API key is required")]
	MissingApiKey,

	#[error("invalid API key: must start with 'pk_'")]
	InvalidApiKey,

	#[error("API URL is required")]
	MissingApiUrl,

	#[error("invalid API URL: {0}")]
	InvalidApiUrl(String),

	#[error("invalid configuration: {0}")]
	InvalidConfig(String),

	/// HTTP request failed before a response arrived.
	#[error("HTTP request failed: {0}")]
	RequestFailed(#[from] reqwest::Error),

	/// Server returned a non-2xx response.
	#[error("server error ({status}): {message}")]
	ServerError { status: u16, message: String },

	/// Well-formed response with `success: false`.
	#[error("event rejected: {0}")]
	Rejected(String),

	/// The calling origin is not permitted for this API key.
	#[error("domain not allowed: {0}")]
	DomainNotAllowed(String),

	#[error("invalid response: {0}")]
	InvalidResponse(String),

	#[error("failed to parse configuration: {0}")]
	Config(#[from] toml::de::Error),
}

impl AnalyticsError {
	/// Classifies a failure reported by the collection endpoint.
	pub fn from_response(status: u16, message: String) -> Self {
		if message.contains(INVALID_DOMAIN_MARKER) {
			return AnalyticsError::DomainNotAllowed(message);
		}
		if (200..300).contains(&status) {
			AnalyticsError::Rejected(message)
		} else {
			AnalyticsError::ServerError { status, message }
		}
	}

	pub fn is_domain_error(&self) -> bool {
		matches!(self, AnalyticsError::DomainNotAllowed(_))
	}
}

impl RetryableError for AnalyticsError {
	fn is_retryable(&self) -> bool {
		match self {
			AnalyticsError::RequestFailed(e) => e.is_retryable(),
			AnalyticsError::ServerError { status, .. } => !(400..500).contains(status),
			AnalyticsError::Rejected(_) | AnalyticsError::InvalidResponse(_) => true,
			_ => false,
		}
	}
}

/// Result type alias for analytics operations.
pub type Result<T> = std::result::Result<T, AnalyticsError>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_server_error_retryable_statuses() {
		for status in [500, 502, 503, 504] {
			let err = AnalyticsError::ServerError {
				status,
				message: "test".to_string(),
			};
			assert!(err.is_retryable(), "status {status} should be retryable");
		}
	}

	#[test]
	fn test_client_errors_never_retried() {
		for status in [400, 401, 403, 404, 422, 429] {
			let err = AnalyticsError::ServerError {
				status,
				message: "test".to_string(),
			};
			assert!(
				!err.is_retryable(),
				"status {status} should not be retryable"
			);
		}
	}

	#[test]
	fn test_invalid_domain_classified_before_status() {
		let err = AnalyticsError::from_response(403, "Invalid domain: localhost".to_string());
		assert!(err.is_domain_error());
		assert!(!err.is_retryable());

		let err = AnalyticsError::from_response(200, "Invalid domain".to_string());
		assert!(err.is_domain_error());

		let err = AnalyticsError::from_response(500, "Invalid domain".to_string());
		assert!(!err.is_retryable());
	}

	#[test]
	fn test_rejected_success_false_is_retryable() {
		let err = AnalyticsError::from_response(200, "temporarily unavailable".to_string());
		assert!(matches!(err, AnalyticsError::Rejected(_)));
		assert!(err.is_retryable());
	}

	#[test]
	fn test_configuration_errors_not_retryable() {
		assert!(!AnalyticsError::MissingApiKey.is_retryable());
		assert!(!AnalyticsError::InvalidApiKey.is_retryable());
		assert!(!AnalyticsError::InvalidConfig("batch_size".to_string()).is_retryable());
	}
}
