// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the Yorin analytics SDK.
//!
//! This crate holds everything that does not touch the network or local
//! storage: the event wire format, identifier newtypes, publishable keys,
//! remote settings, referrer classification, identify property processing
//! and the outgoing payload sanitizer.

pub mod api_key;
pub mod event;
pub mod identify;
pub mod ids;
pub mod referrer;
pub mod sanitize;
pub mod settings;

pub use api_key::{ApiKeyError, PublishableKey, PUBLISHABLE_KEY_PREFIX};
pub use event::{Event, EventKind, EventResponse, Viewport};
pub use identify::{group_properties, identify_properties};
pub use ids::{AnonymousId, IdError, SessionId, ANONYMOUS_ID_PREFIX, SESSION_ID_PREFIX};
pub use referrer::{classify_referrer, ReferrerInfo, ReferrerType};
pub use sanitize::{
	sanitize_event, sanitize_properties, truncate_chars, MAX_PROPERTIES, MAX_PROPERTY_KEY_LENGTH,
	MAX_PROPERTY_VALUE_LENGTH, MAX_URL_LENGTH,
};
pub use settings::{AnalyticsSettings, CachedSettings, SettingsResponse, SETTINGS_CACHE_TTL_MS};
