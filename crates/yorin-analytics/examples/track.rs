// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Example: Capture pageviews and events using the yorin-analytics SDK.
//!
//! Run with:
//!   YORIN_API_KEY=pk_test_... cargo run --example track -p yorin-analytics
//!
//! Set `YORIN_CONFIG` to a TOML file to load the whole configuration from
//! disk instead. `RUST_LOG=yorin_analytics=debug` shows delivery activity.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use yorin_analytics::{
	ClickTarget, LifecycleEvent, Properties, StaticPageContext, Viewport, Yorin, YorinBuilder,
	YorinConfig,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("yorin_analytics=info")),
		)
		.init();

	let builder = match std::env::var("YORIN_CONFIG") {
		Ok(path) => YorinBuilder::from_config(YorinConfig::from_file(path)?),
		Err(_) => {
			let api_key =
				std::env::var("YORIN_API_KEY").expect("YORIN_API_KEY environment variable required");
			let api_url = std::env::var("YORIN_API_URL")
				.unwrap_or_else(|_| "https://collect.yorin.example".to_string());
			Yorin::builder().api_key(api_key).api_url(api_url)
		}
	};

	// The host keeps the page context current as it navigates.
	let page = Arc::new(StaticPageContext::with_url("https://shop.example.com/"));
	page.set_title("Example Shop");
	page.set_viewport(Viewport::new(1440, 900));

	let yorin = builder
		.page_context(page.clone())
		.auto_track_clicks(true)
		.debug(true)
		.build()?;

	println!("Initializing analytics client...");
	yorin.init().await;
	println!("  Session ID: {}", yorin.session_id());
	println!("  Anonymous ID: {}", yorin.anonymous_id());

	yorin
		.identify(
			"user_example_123",
			Properties::new()
				.insert("email", "example@example.com")
				.insert("name", "Example User"),
		)
		.await;

	yorin
		.group_identify(
			"company_123",
			Properties::new()
				.insert("$name", "Acme Corp")
				.insert("employee_count", 100),
		)
		.await;

	yorin
		.track(
			"checkout_started",
			Properties::new()
				.insert("cart_value", 99.5)
				.insert("items", 3),
		)
		.await;

	// An in-app navigation followed by a click on a tracked element.
	page.navigate("https://shop.example.com/checkout");
	page.set_title("Checkout");
	if let Some(handle) = yorin.notify_navigation() {
		handle.await?;
	}

	yorin
		.track_click(&ClickTarget::new("button", "place_order").with_text("Place order"))
		.await;

	println!("Queued events: {}", yorin.batch_size());

	// The page going into the background flushes what is queued.
	yorin.handle_lifecycle(LifecycleEvent::VisibilityHidden).await;

	yorin.shutdown().await;
	println!("Done.");

	Ok(())
}
