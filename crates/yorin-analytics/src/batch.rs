// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Event batching and background flush for the analytics SDK.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::{debug, info, warn};
use yorin_analytics_core::Event;

use crate::delivery::{DeliveryStatus, EventSender};

/// Largest number of events sent in one batch call by
/// [`BatchQueue::send_chunked`].
pub const MAX_EVENTS_PER_REQUEST: usize = 1000;

/// Configuration for the event batch queue.
#[derive(Debug, Clone)]
pub struct BatchConfig {
	/// When false every event is sent on its own as soon as it is built.
	pub enabled: bool,
	/// Number of queued events that triggers an immediate flush.
	pub batch_size: usize,
	/// Interval between timer flushes.
	pub flush_interval: Duration,
}

impl Default for BatchConfig {
	fn default() -> Self {
		Self {
			enabled: true,
			batch_size: 20,
			flush_interval: Duration::from_millis(1000),
		}
	}
}

/// Buffers events and hands them to an [`EventSender`].
///
/// Every drain swaps the buffer for an empty one under the lock before any
/// network work starts, so each event leaves the queue exactly once no
/// matter which trigger (size, timer, manual, unload) drained it.
pub struct BatchQueue {
	config: BatchConfig,
	sender: Arc<dyn EventSender>,
	queue: Mutex<Vec<Event>>,
	shutdown: AtomicBool,
	shutdown_notify: Notify,
}

impl BatchQueue {
	pub fn new(config: BatchConfig, sender: Arc<dyn EventSender>) -> Self {
		Self {
			config,
			sender,
			queue: Mutex::new(Vec::new()),
			shutdown: AtomicBool::new(false),
			shutdown_notify: Notify::new(),
		}
	}

	pub fn config(&self) -> &BatchConfig {
		&self.config
	}

	/// Queues an event, or sends it directly when batching is disabled.
	///
	/// Reaching the batch size drains the queue and sends it before
	/// returning.
	pub async fn enqueue(&self, event: Event) -> DeliveryStatus {
		if !self.config.enabled {
			return self.sender.send_one(event).await;
		}

		let full = {
			let mut queue = self.queue.lock();
			queue.push(event);
			if queue.len() >= self.config.batch_size {
				Some(std::mem::take(&mut *queue))
			} else {
				None
			}
		};

		match full {
			Some(events) => {
				debug!(count = events.len(), "Batch size reached, flushing");
				self.sender.send_batch(events).await
			}
			None => DeliveryStatus::Skipped,
		}
	}

	/// Drains the queue and sends its contents as one batch.
	pub async fn flush(&self) -> DeliveryStatus {
		let events = self.take();
		if events.is_empty() {
			return DeliveryStatus::Skipped;
		}

		debug!(count = events.len(), "Flushing event batch");
		self.sender.send_batch(events).await
	}

	/// Drains the queue through the fire-and-forget path.
	pub fn unload_flush(&self) {
		let events = self.take();
		if events.is_empty() {
			return;
		}

		debug!(count = events.len(), "Page unload, flushing remaining events");
		self.sender.send_beacon(events);
	}

	/// Sends `events` in consecutive calls of at most
	/// [`MAX_EVENTS_PER_REQUEST`], bypassing the queue.
	pub async fn send_chunked(&self, events: Vec<Event>) {
		let mut events = events.into_iter().peekable();
		while events.peek().is_some() {
			let chunk: Vec<Event> = events.by_ref().take(MAX_EVENTS_PER_REQUEST).collect();
			self.sender.send_batch(chunk).await;
		}
	}

	pub fn len(&self) -> usize {
		self.queue.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Stops [`BatchQueue::run`] after one final flush.
	pub fn shutdown(&self) {
		self.shutdown.store(true, Ordering::SeqCst);
		self.shutdown_notify.notify_one();
	}

	pub fn is_shutdown(&self) -> bool {
		self.shutdown.load(Ordering::SeqCst)
	}

	/// Runs the timer flush loop until [`BatchQueue::shutdown`].
	pub async fn run(&self) {
		info!(
			flush_interval_ms = self.config.flush_interval.as_millis() as u64,
			batch_size = self.config.batch_size,
			"Starting analytics batch timer"
		);

		let mut interval = tokio::time::interval(self.config.flush_interval);
		interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
		// The first tick completes immediately.
		interval.tick().await;

		loop {
			if self.is_shutdown() {
				break;
			}

			tokio::select! {
				_ = interval.tick() => {
					if !self.is_empty() {
						self.flush().await;
					}
				}
				_ = self.shutdown_notify.notified() => {}
			}
		}

		if !self.is_empty() {
			self.flush().await;
		}
		info!("Analytics batch timer stopped");
	}

	fn take(&self) -> Vec<Event> {
		let mut queue = self.queue.lock();
		std::mem::take(&mut *queue)
	}
}

impl Drop for BatchQueue {
	fn drop(&mut self) {
		let remaining = self.queue.get_mut().len();
		if remaining > 0 {
			warn!(count = remaining, "Batch queue dropped with unsent events");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use proptest::prelude::*;
	use yorin_analytics_core::{AnonymousId, EventKind, PublishableKey, SessionId};

	#[derive(Default)]
	struct MockSender {
		singles: Mutex<Vec<Event>>,
		batches: Mutex<Vec<Vec<Event>>>,
		beacons: Mutex<Vec<Vec<Event>>>,
	}

	impl MockSender {
		fn batch_sizes(&self) -> Vec<usize> {
			self.batches.lock().iter().map(Vec::len).collect()
		}
	}

	#[async_trait]
	impl EventSender for MockSender {
		async fn send_one(&self, event: Event) -> DeliveryStatus {
			self.singles.lock().push(event);
			DeliveryStatus::Delivered
		}

		async fn send_batch(&self, events: Vec<Event>) -> DeliveryStatus {
			self.batches.lock().push(events);
			DeliveryStatus::Delivered
		}

		fn send_beacon(&self, events: Vec<Event>) {
			self.beacons.lock().push(events);
		}
	}

	fn create_test_event(name: &str) -> Event {
		let mut properties = serde_json::Map::new();
		properties.insert("event_name".to_string(), name.into());
		Event::new(
			EventKind::Custom,
			&PublishableKey::parse("pk_test_123").unwrap(),
			AnonymousId::parse("a_device").unwrap(),
			SessionId::parse("s_session").unwrap(),
		)
		.with_url("https://example.com")
		.with_properties(properties)
	}

	fn event_name(event: &Event) -> &str {
		event.properties()["event_name"].as_str().unwrap()
	}

	fn queue(config: BatchConfig) -> (Arc<MockSender>, BatchQueue) {
		let sender = Arc::new(MockSender::default());
		let queue = BatchQueue::new(config, sender.clone());
		(sender, queue)
	}

	fn slow_timer(batch_size: usize) -> BatchConfig {
		BatchConfig {
			enabled: true,
			batch_size,
			flush_interval: Duration::from_secs(60),
		}
	}

	#[tokio::test]
	async fn test_below_batch_size_holds_events() {
		let (sender, queue) = queue(slow_timer(5));

		for i in 0..4 {
			queue.enqueue(create_test_event(&format!("e{i}"))).await;
		}

		assert_eq!(queue.len(), 4);
		assert!(sender.batches.lock().is_empty());
	}

	#[tokio::test]
	async fn test_reaching_batch_size_flushes_once() {
		let (sender, queue) = queue(slow_timer(5));

		for i in 0..5 {
			queue.enqueue(create_test_event(&format!("e{i}"))).await;
		}

		assert_eq!(queue.len(), 0);
		assert_eq!(sender.batch_sizes(), vec![5]);
		let batches = sender.batches.lock();
		let names: Vec<&str> = batches[0].iter().map(event_name).collect();
		assert_eq!(names, vec!["e0", "e1", "e2", "e3", "e4"]);
	}

	#[tokio::test]
	async fn test_disabled_batching_sends_immediately() {
		let (sender, queue) = queue(BatchConfig {
			enabled: false,
			..BatchConfig::default()
		});

		queue.enqueue(create_test_event("direct")).await;

		assert_eq!(queue.len(), 0);
		assert_eq!(sender.singles.lock().len(), 1);
		assert!(sender.batches.lock().is_empty());
	}

	#[tokio::test]
	async fn test_flush_sends_and_clears() {
		let (sender, queue) = queue(slow_timer(20));
		queue.enqueue(create_test_event("a")).await;
		queue.enqueue(create_test_event("b")).await;

		assert_eq!(queue.flush().await, DeliveryStatus::Delivered);

		assert_eq!(sender.batch_sizes(), vec![2]);
		assert_eq!(queue.len(), 0);
	}

	#[tokio::test]
	async fn test_flush_empty_queue_is_noop() {
		let (sender, queue) = queue(slow_timer(20));
		assert_eq!(queue.flush().await, DeliveryStatus::Skipped);
		assert!(sender.batches.lock().is_empty());
	}

	#[tokio::test]
	async fn test_unload_flush_uses_beacon() {
		let (sender, queue) = queue(slow_timer(20));
		queue.enqueue(create_test_event("a")).await;

		queue.unload_flush();
		queue.unload_flush();

		assert_eq!(sender.beacons.lock().len(), 1);
		assert!(sender.batches.lock().is_empty());
		assert_eq!(queue.len(), 0);
	}

	#[tokio::test]
	async fn test_send_chunked_splits_at_limit() {
		let (sender, queue) = queue(slow_timer(20));
		let events: Vec<Event> = (0..1001)
			.map(|i| create_test_event(&format!("e{i}")))
			.collect();

		queue.send_chunked(events).await;

		assert_eq!(sender.batch_sizes(), vec![1000, 1]);
		let batches = sender.batches.lock();
		assert_eq!(event_name(&batches[0][0]), "e0");
		assert_eq!(event_name(&batches[1][0]), "e1000");
	}

	#[tokio::test(start_paused = true)]
	async fn test_timer_flushes_pending_events() {
		let sender = Arc::new(MockSender::default());
		let queue = Arc::new(BatchQueue::new(
			BatchConfig {
				enabled: true,
				batch_size: 20,
				flush_interval: Duration::from_millis(1000),
			},
			sender.clone(),
		));

		let runner = Arc::clone(&queue);
		let handle = tokio::spawn(async move { runner.run().await });

		queue.enqueue(create_test_event("a")).await;
		tokio::time::sleep(Duration::from_millis(1500)).await;

		assert_eq!(sender.batch_sizes(), vec![1]);
		assert_eq!(queue.len(), 0);

		// Idle ticks do not send empty batches.
		tokio::time::sleep(Duration::from_millis(3000)).await;
		assert_eq!(sender.batch_sizes(), vec![1]);

		queue.shutdown();
		handle.await.unwrap();
	}

	#[tokio::test(start_paused = true)]
	async fn test_shutdown_flushes_remaining() {
		let sender = Arc::new(MockSender::default());
		let queue = Arc::new(BatchQueue::new(slow_timer(20), sender.clone()));

		let runner = Arc::clone(&queue);
		let handle = tokio::spawn(async move { runner.run().await });

		queue.enqueue(create_test_event("last")).await;
		queue.shutdown();
		handle.await.unwrap();

		assert_eq!(sender.batch_sizes(), vec![1]);
		assert!(queue.is_shutdown());
	}

	proptest! {
		#[test]
		fn chunking_preserves_count_and_order(total in 0usize..2500) {
			let runtime = tokio::runtime::Builder::new_current_thread()
				.build()
				.unwrap();
			let (sender, queue) = queue(slow_timer(20));
			let events: Vec<Event> = (0..total)
				.map(|i| create_test_event(&i.to_string()))
				.collect();

			runtime.block_on(queue.send_chunked(events));

			let sizes = sender.batch_sizes();
			prop_assert_eq!(sizes.len(), total.div_ceil(MAX_EVENTS_PER_REQUEST));
			prop_assert!(sizes.iter().all(|&n| n > 0 && n <= MAX_EVENTS_PER_REQUEST));

			let names: Vec<usize> = sender
				.batches
				.lock()
				.iter()
				.flatten()
				.map(|e| event_name(e).parse().unwrap())
				.collect();
			prop_assert_eq!(names, (0..total).collect::<Vec<_>>());
		}
	}
}
