// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Retry logic with exponential backoff for HTTP requests.

use std::time::Duration;
use tracing::debug;

/// Backoff policy for [`retry`].
///
/// `max_attempts` counts every attempt including the first, so the default of
/// 4 means one initial request followed by up to 3 retries.
#[derive(Debug, Clone)]
pub struct RetryConfig {
	pub max_attempts: u32,
	pub base_delay: Duration,
	pub max_delay: Duration,
	pub backoff_factor: f64,
	pub jitter: bool,
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			max_attempts: 4,
			base_delay: Duration::from_millis(1000),
			max_delay: Duration::from_millis(10_000),
			backoff_factor: 2.0,
			jitter: false,
		}
	}
}

/// Classifies an error as transient (worth another attempt) or terminal.
pub trait RetryableError {
	fn is_retryable(&self) -> bool;
}

impl RetryableError for reqwest::Error {
	fn is_retryable(&self) -> bool {
		if self.is_builder() {
			return false;
		}

		match self.status() {
			Some(status) => !status.is_client_error(),
			None => true,
		}
	}
}

/// Delay before retry number `attempt` (zero-based), capped at `max_delay`.
pub fn calculate_delay(cfg: &RetryConfig, attempt: u32) -> Duration {
	let exponential_delay = cfg.base_delay.as_secs_f64() * cfg.backoff_factor.powi(attempt as i32);
	let capped_delay = exponential_delay.min(cfg.max_delay.as_secs_f64());

	let final_delay = if cfg.jitter {
		let jitter_factor = 0.5 + fastrand::f64();
		capped_delay * jitter_factor
	} else {
		capped_delay
	};

	Duration::from_secs_f64(final_delay)
}

/// Runs `f` until it succeeds, returns a terminal error, or `max_attempts`
/// is reached. The last error is returned when attempts run out.
pub async fn retry<F, Fut, T, E>(cfg: &RetryConfig, mut f: F) -> Result<T, E>
where
	F: FnMut() -> Fut,
	Fut: std::future::Future<Output = Result<T, E>>,
	E: RetryableError + std::fmt::Debug,
{
	let max_attempts = cfg.max_attempts.max(1);
	let mut attempt = 1;

	loop {
		let err = match f().await {
			Ok(value) => return Ok(value),
			Err(err) => err,
		};

		if !err.is_retryable() {
			debug!(error = ?err, attempt, "Terminal error, not retrying");
			return Err(err);
		}
		if attempt >= max_attempts {
			debug!(error = ?err, attempt, "Retry attempts exhausted");
			return Err(err);
		}

		let delay = calculate_delay(cfg, attempt - 1);
		debug!(
			error = ?err,
			attempt,
			max_attempts,
			delay_ms = delay.as_millis() as u64,
			"Transient error, retrying"
		);
		tokio::time::sleep(delay).await;
		attempt += 1;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicU32, Ordering};
	use std::sync::Arc;

	#[derive(Debug)]
	struct MockError {
		retryable: bool,
	}

	impl RetryableError for MockError {
		fn is_retryable(&self) -> bool {
			self.retryable
		}
	}

	fn fast_config(max_attempts: u32) -> RetryConfig {
		RetryConfig {
			max_attempts,
			base_delay: Duration::from_millis(1),
			max_delay: Duration::from_millis(10),
			backoff_factor: 2.0,
			jitter: false,
		}
	}

	#[test]
	fn test_default_config_matches_delivery_policy() {
		let cfg = RetryConfig::default();
		assert_eq!(cfg.max_attempts, 4);
		assert_eq!(cfg.base_delay, Duration::from_millis(1000));
		assert_eq!(cfg.max_delay, Duration::from_millis(10_000));
		assert_eq!(cfg.backoff_factor, 2.0);
		assert!(!cfg.jitter);
	}

	/// A terminal error must not be retried: 4xx responses and rejected
	/// origins fail on the first attempt.
	#[tokio::test]
	async fn test_non_retryable_error_fails_immediately() {
		let attempt_count = Arc::new(AtomicU32::new(0));
		let attempt_count_clone = Arc::clone(&attempt_count);

		let result: Result<(), MockError> = retry(&fast_config(4), || {
			let count = Arc::clone(&attempt_count_clone);
			async move {
				count.fetch_add(1, Ordering::SeqCst);
				Err(MockError { retryable: false })
			}
		})
		.await;

		assert!(result.is_err());
		assert_eq!(
			attempt_count.load(Ordering::SeqCst),
			1,
			"non-retryable error should only attempt once"
		);
	}

	#[tokio::test]
	async fn test_retryable_error_retries_up_to_max_attempts() {
		let attempt_count = Arc::new(AtomicU32::new(0));
		let attempt_count_clone = Arc::clone(&attempt_count);

		let result: Result<(), MockError> = retry(&fast_config(4), || {
			let count = Arc::clone(&attempt_count_clone);
			async move {
				count.fetch_add(1, Ordering::SeqCst);
				Err(MockError { retryable: true })
			}
		})
		.await;

		assert!(result.is_err());
		assert_eq!(
			attempt_count.load(Ordering::SeqCst),
			4,
			"should attempt exactly max_attempts times"
		);
	}

	#[tokio::test]
	async fn test_succeeds_after_retries() {
		let attempt_count = Arc::new(AtomicU32::new(0));
		let attempt_count_clone = Arc::clone(&attempt_count);

		let result: Result<&str, MockError> = retry(&fast_config(4), || {
			let count = Arc::clone(&attempt_count_clone);
			async move {
				let current = count.fetch_add(1, Ordering::SeqCst);
				if current < 2 {
					Err(MockError { retryable: true })
				} else {
					Ok("success")
				}
			}
		})
		.await;

		assert_eq!(result.unwrap(), "success");
		assert_eq!(
			attempt_count.load(Ordering::SeqCst),
			3,
			"should succeed on third attempt"
		);
	}

	#[test]
	fn test_delay_doubles_from_base() {
		let cfg = RetryConfig::default();
		assert_eq!(calculate_delay(&cfg, 0), Duration::from_millis(1000));
		assert_eq!(calculate_delay(&cfg, 1), Duration::from_millis(2000));
		assert_eq!(calculate_delay(&cfg, 2), Duration::from_millis(4000));
	}

	#[test]
	fn test_delay_respects_max_delay() {
		let cfg = RetryConfig::default();

		for attempt in 0..10 {
			let delay = calculate_delay(&cfg, attempt);
			assert!(
				delay <= Duration::from_millis(10_000),
				"delay {delay:?} at attempt {attempt} exceeds max_delay"
			);
		}
		assert_eq!(calculate_delay(&cfg, 8), Duration::from_millis(10_000));
	}

	#[test]
	fn test_jitter_adds_randomness() {
		let cfg_with_jitter = RetryConfig {
			jitter: true,
			..RetryConfig::default()
		};

		let delays: Vec<Duration> = (0..10)
			.map(|_| calculate_delay(&cfg_with_jitter, 1))
			.collect();

		let all_same = delays.windows(2).all(|w| w[0] == w[1]);
		assert!(!all_same, "delays with jitter should vary");
	}
}
