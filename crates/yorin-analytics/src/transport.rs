// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Wire calls to the collection endpoint.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, ORIGIN, REFERER};
use reqwest::{Client, RequestBuilder, Response};
use tracing::{debug, warn};
use yorin_analytics_core::{Event, EventResponse, PublishableKey, SettingsResponse};

use crate::context::PageContext;
use crate::error::{AnalyticsError, Result};

/// One attempt at each wire call. Retries are layered on top by the
/// delivery engine.
#[async_trait]
pub trait Transport: Send + Sync {
	/// `GET /v1/settings`.
	async fn fetch_settings(&self) -> Result<SettingsResponse>;

	/// `POST /v1/events` with a single event object.
	async fn post_event(&self, event: &Event) -> Result<EventResponse>;

	/// `POST /v1/events` with an array of events.
	async fn post_batch(&self, events: &[Event]) -> Result<EventResponse>;

	/// Fire-and-forget `POST /v1/events` with an array of events.
	///
	/// Returns immediately. There is no confirmation that the request was
	/// sent or accepted.
	fn send_beacon(&self, events: Vec<Event>);
}

/// [`Transport`] over reqwest.
pub struct HttpTransport {
	client: Client,
	base_url: String,
	api_key: PublishableKey,
	context: Arc<dyn PageContext>,
}

impl HttpTransport {
	/// `base_url` must not end with a `/`.
	pub fn new(
		base_url: impl Into<String>,
		api_key: PublishableKey,
		context: Arc<dyn PageContext>,
		request_timeout: Duration,
	) -> Result<Self> {
		let client = yorin_common_http::builder()
			.timeout(request_timeout)
			.build()
			.map_err(AnalyticsError::RequestFailed)?;

		Ok(Self {
			client,
			base_url: base_url.into(),
			api_key,
			context,
		})
	}

	fn events_url(&self) -> String {
		format!("{}/v1/events", self.base_url)
	}

	fn settings_url(&self) -> String {
		format!("{}/v1/settings", self.base_url)
	}

	/// Adds `Origin` and `Referer` when the host has a current page.
	fn with_page_headers(&self, mut request: RequestBuilder) -> RequestBuilder {
		if let Some(origin) = self.context.origin() {
			request = request.header(ORIGIN, origin);
		}
		if let Some(url) = self.context.current_url() {
			request = request.header(REFERER, url);
		}
		request
	}

	async fn post_json<T>(&self, body: &T) -> Result<EventResponse>
	where
		T: serde::Serialize + ?Sized + Sync,
	{
		let request = self.with_page_headers(self.client.post(self.events_url()).json(body));
		let response = request.send().await?;
		parse_event_response(response).await
	}
}

async fn parse_event_response(response: Response) -> Result<EventResponse> {
	let status = response.status();
	let body = response.text().await?;

	if !status.is_success() {
		let message = serde_json::from_str::<EventResponse>(&body)
			.ok()
			.map(|parsed| parsed.message)
			.filter(|message| !message.is_empty())
			.unwrap_or_else(|| {
				if body.is_empty() {
					status.canonical_reason().unwrap_or_default().to_string()
				} else {
					body
				}
			});
		return Err(AnalyticsError::from_response(status.as_u16(), message));
	}

	let parsed: EventResponse =
		serde_json::from_str(&body).map_err(|e| AnalyticsError::InvalidResponse(e.to_string()))?;
	if !parsed.success {
		return Err(AnalyticsError::from_response(status.as_u16(), parsed.message));
	}

	Ok(parsed)
}

#[async_trait]
impl Transport for HttpTransport {
	async fn fetch_settings(&self) -> Result<SettingsResponse> {
		let response = self
			.client
			.get(self.settings_url())
			.header(AUTHORIZATION, format!("Bearer {}", self.api_key.expose()))
			.send()
			.await?;

		let status = response.status();
		if !status.is_success() {
			return Err(AnalyticsError::ServerError {
				status: status.as_u16(),
				message: response.text().await.unwrap_or_default(),
			});
		}

		let body = response.text().await?;
		serde_json::from_str(&body).map_err(|e| AnalyticsError::InvalidResponse(e.to_string()))
	}

	async fn post_event(&self, event: &Event) -> Result<EventResponse> {
		self.post_json(event).await
	}

	async fn post_batch(&self, events: &[Event]) -> Result<EventResponse> {
		self.post_json(events).await
	}

	fn send_beacon(&self, events: Vec<Event>) {
		let Ok(handle) = tokio::runtime::Handle::try_current() else {
			warn!(
				count = events.len(),
				"No async runtime available, dropping unload events"
			);
			return;
		};

		let count = events.len();
		let request = self.with_page_headers(self.client.post(self.events_url()).json(&events));
		handle.spawn(async move {
			match request.send().await {
				Ok(response) => debug!(count, status = %response.status(), "Beacon delivered"),
				Err(e) => debug!(count, error = %e, "Beacon failed"),
			}
		});
	}
}
