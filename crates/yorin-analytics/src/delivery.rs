// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Sanitized, retried delivery of events.
//!
//! Delivery failures never reach the caller. They are logged here: domain
//! rejections at `warn`, everything else at `error`.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, warn};
use yorin_analytics_core::{sanitize_event, Event};
use yorin_common_http::RetryConfig;

use crate::error::AnalyticsError;
use crate::transport::Transport;

/// Outcome of a delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
	Delivered,
	/// Nothing to send.
	Skipped,
	/// Gave up after a terminal failure or after exhausting retries.
	Dropped,
}

/// Handler for sending events to the collection endpoint.
#[async_trait]
pub trait EventSender: Send + Sync {
	async fn send_one(&self, event: Event) -> DeliveryStatus;

	async fn send_batch(&self, events: Vec<Event>) -> DeliveryStatus;

	/// Best-effort send that does not wait for the network.
	fn send_beacon(&self, events: Vec<Event>);
}

pub struct DeliveryEngine {
	transport: Arc<dyn Transport>,
	retry_config: RetryConfig,
}

impl DeliveryEngine {
	pub fn new(transport: Arc<dyn Transport>, retry_config: RetryConfig) -> Self {
		Self {
			transport,
			retry_config,
		}
	}

	fn report(result: Result<(), AnalyticsError>, count: usize) -> DeliveryStatus {
		match result {
			Ok(()) => {
				debug!(count, "Events delivered");
				DeliveryStatus::Delivered
			}
			Err(e) if e.is_domain_error() => {
				warn!(
					count,
					error = %e,
					"Domain validation failed, this is expected during local development"
				);
				DeliveryStatus::Dropped
			}
			Err(e) => {
				error!(count, error = %e, "Failed to send events after retries");
				DeliveryStatus::Dropped
			}
		}
	}
}

#[async_trait]
impl EventSender for DeliveryEngine {
	async fn send_one(&self, event: Event) -> DeliveryStatus {
		let event = sanitize_event(&event);
		let result = yorin_common_http::retry(&self.retry_config, || async {
			self.transport.post_event(&event).await.map(|_| ())
		})
		.await;
		Self::report(result, 1)
	}

	async fn send_batch(&self, events: Vec<Event>) -> DeliveryStatus {
		if events.is_empty() {
			return DeliveryStatus::Skipped;
		}

		let events: Vec<Event> = events.iter().map(sanitize_event).collect();
		let result = yorin_common_http::retry(&self.retry_config, || async {
			self.transport.post_batch(&events).await.map(|_| ())
		})
		.await;
		Self::report(result, events.len())
	}

	fn send_beacon(&self, events: Vec<Event>) {
		if events.is_empty() {
			return;
		}

		debug!(count = events.len(), "Sending events via beacon");
		self
			.transport
			.send_beacon(events.iter().map(sanitize_event).collect());
	}
}
