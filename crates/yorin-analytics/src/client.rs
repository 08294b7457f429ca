// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The public analytics client.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use url::Url;
use yorin_analytics_core::{AnalyticsSettings, AnonymousId, Event, PublishableKey, SessionId};
use yorin_common_http::RetryConfig;

use crate::batch::{BatchConfig, BatchQueue, MAX_EVENTS_PER_REQUEST};
use crate::clock::{Clock, SystemClock};
use crate::config::YorinConfig;
use crate::context::{PageContext, StaticPageContext};
use crate::dedup::PageviewDedup;
use crate::delivery::DeliveryEngine;
use crate::error::{AnalyticsError, Result};
use crate::events::EventFactory;
use crate::identity::IdentityStore;
use crate::lifecycle::{ClickTarget, LifecycleEvent, NavigationDebouncer, ELEMENT_CLICKED_EVENT};
use crate::properties::Properties;
use crate::settings::SettingsCache;
use crate::storage::{FallbackStorage, FileStorage, MemoryStorage, Storage};
use crate::transport::{HttpTransport, Transport};

/// Builder for constructing a [`Yorin`] client.
pub struct YorinBuilder {
	config: YorinConfig,
	retry_config: RetryConfig,
	storage: Option<Arc<dyn Storage>>,
	page_context: Option<Arc<dyn PageContext>>,
	clock: Option<Arc<dyn Clock>>,
	transport: Option<Arc<dyn Transport>>,
}

impl YorinBuilder {
	pub fn new() -> Self {
		Self::from_config(YorinConfig::default())
	}

	/// Seeds the builder from a loaded configuration.
	pub fn from_config(config: YorinConfig) -> Self {
		Self {
			config,
			retry_config: RetryConfig::default(),
			storage: None,
			page_context: None,
			clock: None,
			transport: None,
		}
	}

	/// Sets the publishable key (`pk_...`).
	pub fn api_key(mut self, key: impl Into<String>) -> Self {
		self.config.api_key = key.into();
		self
	}

	/// Sets the collection endpoint, e.g. `https://collect.yorin.example`.
	pub fn api_url(mut self, url: impl Into<String>) -> Self {
		self.config.api_url = url.into();
		self
	}

	pub fn auto_track_pageviews(mut self, enabled: bool) -> Self {
		self.config.auto_track_pageviews = enabled;
		self
	}

	pub fn auto_track_clicks(mut self, enabled: bool) -> Self {
		self.config.auto_track_clicks = enabled;
		self
	}

	/// Enables verbose payload logging at `debug` level.
	pub fn debug(mut self, enabled: bool) -> Self {
		self.config.debug = enabled;
		self
	}

	pub fn session_timeout(mut self, timeout: Duration) -> Self {
		self.config.session_timeout_ms = timeout.as_millis() as u64;
		self
	}

	pub fn batch_size(mut self, size: usize) -> Self {
		self.config.batch_size = size;
		self
	}

	pub fn flush_interval(mut self, interval: Duration) -> Self {
		self.config.flush_interval_ms = interval.as_millis() as u64;
		self
	}

	pub fn enable_batching(mut self, enabled: bool) -> Self {
		self.config.enable_batching = enabled;
		self
	}

	pub fn request_timeout(mut self, timeout: Duration) -> Self {
		self.config.request_timeout_ms = timeout.as_millis() as u64;
		self
	}

	pub fn retry_config(mut self, config: RetryConfig) -> Self {
		self.retry_config = config;
		self
	}

	/// Persistent storage for identifiers and cached settings. Defaults to
	/// a JSON file under the platform data directory.
	pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
		self.storage = Some(storage);
		self
	}

	/// The page the host is showing. Defaults to an empty
	/// [`StaticPageContext`], under which every capture call is a no-op.
	pub fn page_context(mut self, context: Arc<dyn PageContext>) -> Self {
		self.page_context = Some(context);
		self
	}

	pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = Some(clock);
		self
	}

	/// Replaces the HTTP transport.
	pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
		self.transport = Some(transport);
		self
	}

	/// Validates the configuration and builds the client.
	///
	/// Identifiers are loaded or minted here. No network traffic happens
	/// until [`Yorin::init`] or the first capture call.
	pub fn build(self) -> Result<Yorin> {
		let config = self.config;

		if config.api_key.is_empty() {
			return Err(AnalyticsError::MissingApiKey);
		}
		if config.api_url.is_empty() {
			return Err(AnalyticsError::MissingApiUrl);
		}
		let api_key =
			PublishableKey::parse(config.api_key.as_str()).map_err(|_| AnalyticsError::InvalidApiKey)?;
		match Url::parse(&config.api_url) {
			Ok(url) if !url.cannot_be_a_base() => {}
			Ok(_) => return Err(AnalyticsError::InvalidApiUrl(config.api_url.clone())),
			Err(e) => {
				return Err(AnalyticsError::InvalidApiUrl(format!(
					"{}: {e}",
					config.api_url
				)))
			}
		}
		if config.batch_size == 0 {
			return Err(AnalyticsError::InvalidConfig(
				"batch_size must be greater than zero".to_string(),
			));
		}
		if config.flush_interval_ms == 0 {
			return Err(AnalyticsError::InvalidConfig(
				"flush_interval must be greater than zero".to_string(),
			));
		}

		let api_url = config.api_url.trim_end_matches('/').to_string();

		let primary: Arc<dyn Storage> = match self.storage {
			Some(storage) => storage,
			None => default_storage(),
		};
		let storage = Arc::new(FallbackStorage::new(primary));
		let clock: Arc<dyn Clock> = match self.clock {
			Some(clock) => clock,
			None => Arc::new(SystemClock),
		};
		let context: Arc<dyn PageContext> = match self.page_context {
			Some(context) => context,
			None => Arc::new(StaticPageContext::new()),
		};
		let transport: Arc<dyn Transport> = match self.transport {
			Some(transport) => transport,
			None => Arc::new(HttpTransport::new(
				api_url.clone(),
				api_key.clone(),
				context.clone(),
				config.request_timeout(),
			)?),
		};

		let identity = Arc::new(IdentityStore::new(
			storage.clone(),
			clock.clone(),
			config.session_timeout(),
		));
		let settings = SettingsCache::new(&api_key, storage.clone(), clock.clone(), transport.clone());
		let delivery = Arc::new(DeliveryEngine::new(transport, self.retry_config));
		let queue = Arc::new(BatchQueue::new(
			BatchConfig {
				enabled: config.enable_batching,
				batch_size: config.batch_size,
				flush_interval: config.flush_interval(),
			},
			delivery,
		));
		let dedup = PageviewDedup::new(storage.clone(), clock);
		let factory = EventFactory::new(api_key.clone(), identity.clone(), context);

		info!(
			api_key = %api_key.redacted(),
			api_url = %api_url,
			batching = config.enable_batching,
			"Yorin analytics client created"
		);

		Ok(Yorin {
			inner: Arc::new(Inner {
				config,
				storage,
				identity,
				settings,
				factory,
				dedup,
				queue,
				debouncer: NavigationDebouncer::default(),
				initialized: AtomicBool::new(false),
				closed: AtomicBool::new(false),
				timer: Mutex::new(None),
			}),
		})
	}
}

fn default_storage() -> Arc<dyn Storage> {
	let Some(path) = FileStorage::default_path() else {
		return Arc::new(MemoryStorage::new());
	};
	match FileStorage::open(&path) {
		Ok(file) => Arc::new(file),
		Err(e) => {
			warn!(path = ?path, error = %e, "Failed to open storage file, using in-memory storage");
			Arc::new(MemoryStorage::new())
		}
	}
}

impl Default for YorinBuilder {
	fn default() -> Self {
		Self::new()
	}
}

struct Inner {
	config: YorinConfig,
	storage: Arc<FallbackStorage>,
	identity: Arc<IdentityStore>,
	settings: SettingsCache,
	factory: EventFactory,
	dedup: PageviewDedup,
	queue: Arc<BatchQueue>,
	debouncer: NavigationDebouncer,
	initialized: AtomicBool,
	closed: AtomicBool,
	timer: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Inner {
	fn drop(&mut self) {
		// Lets a running timer task exit after its final flush.
		self.queue.shutdown();
	}
}

/// Client for capturing analytics events.
///
/// `Yorin` is a cheap handle; clones share the same queue, identity and
/// settings. Capture calls never fail: delivery problems are logged and
/// the events dropped.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use yorin_analytics::{Properties, StaticPageContext, Yorin};
///
/// let page = Arc::new(StaticPageContext::with_url("https://shop.example.com/"));
/// let yorin = Yorin::builder()
///     .api_key("pk_live_abc123")
///     .api_url("https://collect.yorin.example")
///     .page_context(page.clone())
///     .build()?;
///
/// yorin.init().await;
/// yorin.track("checkout_started", Properties::new().insert("cart_value", 99.5)).await;
/// yorin.identify("user_123", Properties::new().insert("email", "ada@example.com")).await;
/// yorin.shutdown().await;
/// ```
#[derive(Clone)]
pub struct Yorin {
	inner: Arc<Inner>,
}

impl Yorin {
	pub fn builder() -> YorinBuilder {
		YorinBuilder::new()
	}

	/// Starts the flush timer, loads settings and records the initial
	/// pageview when auto pageviews are enabled.
	///
	/// Calling `init` more than once has no further effect.
	pub async fn init(&self) {
		if self.is_closed() {
			warn!("Cannot initialize a shut down analytics client");
			return;
		}
		if self.inner.initialized.swap(true, Ordering::SeqCst) {
			warn!("Analytics client already initialized");
			return;
		}

		if self.inner.config.enable_batching {
			let queue = Arc::clone(&self.inner.queue);
			let handle = tokio::spawn(async move { queue.run().await });
			*self.inner.timer.lock() = Some(handle);
		}

		let settings = self.inner.settings.load().await;
		if self.inner.config.debug {
			debug!(?settings, "Analytics settings in effect");
		}

		if self.should_auto_track_pageviews() {
			self.pageview(Properties::new()).await;
		}

		info!(
			session_id = %self.session_id(),
			auto_pageviews = self.should_auto_track_pageviews(),
			auto_clicks = self.should_auto_track_clicks(),
			"Yorin analytics initialized"
		);
	}

	/// Records a pageview.
	///
	/// The optional `url`, `title` and `referrer` properties override the
	/// page context. A repeat pageview of the same URL within 3 seconds is
	/// dropped.
	pub async fn pageview(&self, properties: Properties) {
		if self.reject_closed("pageview") {
			return;
		}

		let Some(url) = self.inner.factory.pageview_url(&properties) else {
			debug!("Skipping pageview without page context");
			return;
		};

		if !self.inner.dedup.check_and_record(&url) {
			debug!(url = %url, "Skipping duplicate pageview");
			return;
		}

		let event = self.inner.factory.pageview(&url, &properties);
		self.dispatch(event).await;
	}

	/// Records a custom event named `name`.
	pub async fn track(&self, name: &str, properties: Properties) {
		if self.reject_closed("track") {
			return;
		}
		if let Some(event) = self.build_track_event(name, properties) {
			self.dispatch(event).await;
		}
	}

	/// Alias of [`Yorin::track`].
	pub async fn event(&self, name: &str, properties: Properties) {
		self.track(name, properties).await;
	}

	/// Associates the current visitor with `user_id`.
	///
	/// Legacy `email` and `name` properties are also sent as `$email` and
	/// `$full_name` unless those keys are present. `$user_id` is always
	/// `user_id`. Null values are dropped.
	pub async fn identify(&self, user_id: &str, properties: Properties) {
		if self.reject_closed("identify") {
			return;
		}
		match self.inner.factory.identify(user_id, &properties) {
			Some(event) => self.dispatch(event).await,
			None => debug!("Skipping identify without page context"),
		}
	}

	/// Associates the current visitor with the group `group_id`.
	///
	/// A legacy `name` property is also sent as `$name` unless that key is
	/// present. `group_id` is always `group_id`.
	pub async fn group_identify(&self, group_id: &str, properties: Properties) {
		if self.reject_closed("group_identify") {
			return;
		}
		match self.inner.factory.group_identify(group_id, &properties) {
			Some(event) => self.dispatch(event).await,
			None => debug!("Skipping group identify without page context"),
		}
	}

	/// Builds a custom event without sending it, for use with
	/// [`Yorin::track_batch`]. `None` without page context.
	pub fn build_track_event(&self, name: &str, properties: Properties) -> Option<Event> {
		let event = self.inner.factory.custom(name, &properties);
		if event.is_none() {
			debug!(event_name = name, "Skipping event without page context");
		}
		event
	}

	/// Sends `events` straight to the collection endpoint, bypassing the
	/// queue. More than 1000 events are split into several requests.
	pub async fn track_batch(&self, events: Vec<Event>) {
		if self.reject_closed("track_batch") {
			return;
		}
		if events.is_empty() {
			warn!("Cannot send empty batch");
			return;
		}
		if events.len() > MAX_EVENTS_PER_REQUEST {
			warn!(
				count = events.len(),
				max = MAX_EVENTS_PER_REQUEST,
				"Batch too large, splitting into smaller batches"
			);
		}
		self.inner.queue.send_chunked(events).await;
	}

	/// Sends everything queued right now as one batch.
	pub async fn flush(&self) {
		self.inner.queue.flush().await;
	}

	/// Starts a new session immediately.
	pub fn reset_session(&self) -> SessionId {
		let session_id = self.inner.identity.reset_session();
		debug!(session_id = %session_id, "Session reset");
		session_id
	}

	/// Replaces the anonymous id, e.g. on logout.
	pub fn reset_anonymous_id(&self) -> AnonymousId {
		let anonymous_id = self.inner.identity.reset_anonymous_id();
		debug!(anonymous_id = %anonymous_id, "Anonymous ID reset");
		anonymous_id
	}

	pub fn session_id(&self) -> SessionId {
		self.inner.identity.session_id()
	}

	pub fn anonymous_id(&self) -> AnonymousId {
		self.inner.identity.anonymous_id()
	}

	/// Settings loaded by [`Yorin::init`], `None` before that.
	pub fn settings(&self) -> Option<AnalyticsSettings> {
		self.inner.settings.current()
	}

	/// Number of events currently queued.
	pub fn batch_size(&self) -> usize {
		self.inner.queue.len()
	}

	/// Tells the client the host navigated within the app.
	///
	/// Navigations are debounced by 100ms; the last one in a burst records
	/// a pageview when auto pageviews are enabled. Returns the handle of
	/// the debounce task, or `None` when the client is shut down or no
	/// async runtime is available.
	pub fn notify_navigation(&self) -> Option<JoinHandle<()>> {
		if self.is_closed() {
			return None;
		}
		let handle = tokio::runtime::Handle::try_current().ok()?;

		let client = self.clone();
		Some(handle.spawn(async move {
			if client.inner.debouncer.settle().await && client.should_auto_track_pageviews() {
				client.pageview(Properties::new()).await;
			}
		}))
	}

	/// Reacts to a page lifecycle transition.
	///
	/// Hidden pages flush normally. Unloading pages hand the queue to the
	/// fire-and-forget beacon path, which does not wait for a response.
	pub async fn handle_lifecycle(&self, event: LifecycleEvent) {
		if event.is_unload() {
			self.inner.queue.unload_flush();
		} else if !self.inner.queue.is_empty() {
			debug!("Page hidden, flushing events");
			self.inner.queue.flush().await;
		}
	}

	/// Records `element_clicked` for a tracked element when auto click
	/// tracking is enabled.
	pub async fn track_click(&self, target: &ClickTarget) {
		if !self.should_auto_track_clicks() {
			return;
		}
		if let Some(properties) = target.properties() {
			self.track(ELEMENT_CLICKED_EVENT, properties).await;
		}
	}

	/// Stops the flush timer, sends whatever is still queued and writes
	/// pending storage changes. Later capture calls are dropped.
	pub async fn shutdown(&self) {
		if self.inner.closed.swap(true, Ordering::SeqCst) {
			return;
		}

		info!("Shutting down analytics client");
		self.inner.queue.shutdown();

		let timer = self.inner.timer.lock().take();
		match timer {
			Some(handle) => {
				if let Err(e) = handle.await {
					error!(error = %e, "Error waiting for flush task to complete");
				}
			}
			None => {
				self.inner.queue.flush().await;
			}
		}

		let storage = self.inner.storage.clone();
		if let Err(e) = tokio::task::spawn_blocking(move || storage.flush()).await {
			error!(error = %e, "Error waiting for storage flush to complete");
		}

		info!("Analytics client shutdown complete");
	}

	pub fn is_closed(&self) -> bool {
		self.inner.closed.load(Ordering::SeqCst)
	}

	fn reject_closed(&self, operation: &str) -> bool {
		if self.is_closed() {
			warn!(operation, "Analytics client is shut down, dropping call");
			return true;
		}
		false
	}

	fn should_auto_track_pageviews(&self) -> bool {
		self.inner.config.auto_track_pageviews && self.autocapture_allowed()
	}

	fn should_auto_track_clicks(&self) -> bool {
		self.inner.config.auto_track_clicks && self.autocapture_allowed()
	}

	fn autocapture_allowed(&self) -> bool {
		self
			.inner
			.settings
			.current()
			.map_or(true, |settings| settings.autocapture_frontend_interactions)
	}

	async fn dispatch(&self, event: Event) {
		if self.inner.config.debug {
			debug!(
				kind = %event.kind(),
				url = event.url().unwrap_or_default(),
				properties = ?event.properties(),
				"Capturing event"
			);
		}
		self.inner.queue.enqueue(event).await;
	}
}
