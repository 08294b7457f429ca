// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};
use yorin_analytics::{
	ManualClock, MemoryStorage, RetryConfig, StaticPageContext, Storage, YorinBuilder, Yorin,
};

pub const API_KEY: &str = "pk_test_abc123";
pub const PAGE_URL: &str = "https://shop.example.com/cart";

pub struct Harness {
	pub server: MockServer,
	pub page: Arc<StaticPageContext>,
	pub clock: ManualClock,
	pub storage: Arc<MemoryStorage>,
}

impl Harness {
	pub async fn start() -> Self {
		Self {
			server: MockServer::start().await,
			page: Arc::new(StaticPageContext::with_url(PAGE_URL)),
			clock: ManualClock::default(),
			storage: Arc::new(MemoryStorage::new()),
		}
	}

	/// A builder wired to the mock server with millisecond retry delays.
	pub fn builder(&self) -> YorinBuilder {
		let storage: Arc<dyn Storage> = self.storage.clone();
		Yorin::builder()
			.api_key(API_KEY)
			.api_url(self.server.uri())
			.page_context(self.page.clone())
			.clock(Arc::new(self.clock.clone()))
			.storage(storage)
			.retry_config(fast_retry())
	}

	/// Requests received on `POST /v1/events`.
	pub async fn event_posts(&self) -> Vec<Request> {
		self.server
			.received_requests()
			.await
			.unwrap_or_default()
			.into_iter()
			.filter(|req| req.method == wiremock::http::Method::POST && req.url.path() == "/v1/events")
			.collect()
	}

	pub async fn settings_gets(&self) -> usize {
		self.server
			.received_requests()
			.await
			.unwrap_or_default()
			.iter()
			.filter(|req| req.url.path() == "/v1/settings")
			.count()
	}

	/// Polls until `count` event posts arrived or two seconds pass.
	pub async fn wait_for_posts(&self, count: usize) -> Vec<Request> {
		for _ in 0..100 {
			let posts = self.event_posts().await;
			if posts.len() >= count {
				return posts;
			}
			tokio::time::sleep(Duration::from_millis(20)).await;
		}
		self.event_posts().await
	}

	pub async fn accept_events(&self) {
		Mock::given(method("POST"))
			.and(path("/v1/events"))
			.respond_with(ok_response())
			.mount(&self.server)
			.await;
	}

	pub async fn serve_settings(&self, settings: Value) {
		Mock::given(method("GET"))
			.and(path("/v1/settings"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"success": true,
				"settings": settings,
			})))
			.mount(&self.server)
			.await;
	}
}

pub fn ok_response() -> ResponseTemplate {
	ResponseTemplate::new(200).set_body_json(json!({"success": true, "message": "ok"}))
}

pub fn fast_retry() -> RetryConfig {
	RetryConfig {
		base_delay: Duration::from_millis(5),
		max_delay: Duration::from_millis(20),
		..RetryConfig::default()
	}
}

pub fn body(request: &Request) -> Value {
	serde_json::from_slice(&request.body).expect("request body is JSON")
}

pub fn settings_json(autocapture: bool) -> Value {
	json!({
		"autocapture_frontend_interactions": autocapture,
		"enable_heatmaps": false,
		"enable_web_vitals_autocapture": false,
		"cookieless_server_hash_mode": false,
		"bounce_rate_duration": 10
	})
}
