// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Rust SDK for Yorin analytics.
//!
//! Captures pageviews, custom events and identify calls from a host
//! application, batches them, and delivers them to the Yorin collection
//! endpoint with retry. Capture calls never fail or block the host: delivery
//! problems are logged through `tracing` and the affected events dropped.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use yorin_analytics::{Properties, StaticPageContext, Yorin};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let page = Arc::new(StaticPageContext::with_url("https://shop.example.com/"));
//!
//!     let yorin = Yorin::builder()
//!         .api_key("pk_live_abc123")
//!         .api_url("https://collect.yorin.example")
//!         .page_context(page.clone())
//!         .build()?;
//!
//!     // Starts the flush timer, loads settings, records the first pageview.
//!     yorin.init().await;
//!
//!     yorin.track("checkout_started", Properties::new()
//!         .insert("cart_value", 99.5)
//!     ).await;
//!
//!     // After in-app navigation.
//!     page.navigate("https://shop.example.com/checkout");
//!     yorin.notify_navigation();
//!
//!     yorin.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! # Page context
//!
//! Events describe the page they happened on. The host supplies a
//! [`PageContext`]; [`StaticPageContext`] is a ready-made one it updates as
//! it navigates. Without a current URL every capture call is a no-op, which
//! is how server-side code paths stay silent.
//!
//! # Batching
//!
//! With batching enabled (the default) events are queued and sent when 20
//! have accumulated, every second, on [`Yorin::flush`], or when the host
//! reports a page lifecycle transition through [`Yorin::handle_lifecycle`].
//! Unloading pages use a fire-and-forget send that does not wait for the
//! response.
//!
//! # Identity
//!
//! Session ids (`s_...`) expire after 30 minutes of inactivity; anonymous
//! ids (`a_...`) persist until [`Yorin::reset_anonymous_id`]. Both are kept
//! in a [`Storage`], a JSON file under the platform data directory unless
//! another store is configured. If storage fails the SDK carries on with
//! in-memory ids.

pub mod batch;
pub mod client;
pub mod clock;
pub mod config;
pub mod context;
pub mod dedup;
pub mod delivery;
pub mod error;
pub mod events;
pub mod identity;
pub mod lifecycle;
pub mod properties;
pub mod settings;
pub mod storage;
pub mod transport;

pub use batch::{BatchConfig, BatchQueue, MAX_EVENTS_PER_REQUEST};
pub use client::{Yorin, YorinBuilder};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::YorinConfig;
pub use context::{PageContext, StaticPageContext};
pub use delivery::{DeliveryEngine, DeliveryStatus, EventSender};
pub use error::{AnalyticsError, Result};
pub use lifecycle::{ClickTarget, LifecycleEvent};
pub use properties::Properties;
pub use storage::{FallbackStorage, FileStorage, MemoryStorage, Storage, StorageError};
pub use transport::{HttpTransport, Transport};

pub use yorin_analytics_core::{
	AnalyticsSettings, AnonymousId, Event, EventKind, PublishableKey, SessionId, Viewport,
};
pub use yorin_common_http::RetryConfig;
