// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session and anonymous identifiers with their persistence rules.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;
use yorin_analytics_core::{AnonymousId, SessionId};

use crate::clock::Clock;
use crate::storage::FallbackStorage;

pub const SESSION_ID_KEY: &str = "yorin_session_id";
pub const SESSION_TIMESTAMP_KEY: &str = "yorin_session_timestamp";
pub const ANONYMOUS_ID_KEY: &str = "yorin_anonymous_id";

/// Inactivity window after which a new session starts.
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone)]
struct Identity {
	session_id: SessionId,
	anonymous_id: AnonymousId,
}

/// Owns the current session and anonymous identifiers.
///
/// The session has a sliding expiry: each [`IdentityStore::touch_session`]
/// within the timeout refreshes the stored timestamp, and the first touch
/// after the timeout mints a new id. The anonymous id never expires.
pub struct IdentityStore {
	storage: Arc<FallbackStorage>,
	clock: Arc<dyn Clock>,
	session_timeout: Duration,
	state: Mutex<Identity>,
}

impl IdentityStore {
	/// Loads persisted identifiers, minting whichever are missing or expired.
	pub fn new(storage: Arc<FallbackStorage>, clock: Arc<dyn Clock>, session_timeout: Duration) -> Self {
		let session_id = get_or_create_session(&storage, clock.as_ref(), session_timeout);
		let anonymous_id = get_or_create_anonymous(&storage);

		Self {
			storage,
			clock,
			session_timeout,
			state: Mutex::new(Identity {
				session_id,
				anonymous_id,
			}),
		}
	}

	/// Returns the live session id, renewing or rolling it over.
	pub fn touch_session(&self) -> SessionId {
		let mut state = self.state.lock();
		let session_id = get_or_create_session(&self.storage, self.clock.as_ref(), self.session_timeout);
		if session_id != state.session_id {
			debug!(session_id = %session_id, "Session rolled over");
		}
		state.session_id = session_id.clone();
		session_id
	}

	/// The in-memory session id. Does not renew it.
	pub fn session_id(&self) -> SessionId {
		self.state.lock().session_id.clone()
	}

	pub fn anonymous_id(&self) -> AnonymousId {
		self.state.lock().anonymous_id.clone()
	}

	pub fn reset_session(&self) -> SessionId {
		let mut state = self.state.lock();
		let session_id = SessionId::generate();
		persist_session(&self.storage, &session_id, self.clock.now_ms());
		state.session_id = session_id.clone();
		session_id
	}

	pub fn reset_anonymous_id(&self) -> AnonymousId {
		let mut state = self.state.lock();
		let anonymous_id = AnonymousId::generate();
		self.storage.set(ANONYMOUS_ID_KEY, anonymous_id.as_str());
		state.anonymous_id = anonymous_id.clone();
		anonymous_id
	}
}

fn persist_session(storage: &FallbackStorage, session_id: &SessionId, now_ms: i64) {
	storage.set(SESSION_ID_KEY, session_id.as_str());
	storage.set(SESSION_TIMESTAMP_KEY, &now_ms.to_string());
}

fn get_or_create_session(storage: &FallbackStorage, clock: &dyn Clock, timeout: Duration) -> SessionId {
	let now_ms = clock.now_ms();

	let existing = storage
		.get(SESSION_ID_KEY)
		.and_then(|id| SessionId::parse(id).ok());
	let timestamp = storage
		.get(SESSION_TIMESTAMP_KEY)
		.and_then(|ts| ts.parse::<i64>().ok());

	if let (Some(session_id), Some(timestamp)) = (existing, timestamp) {
		if now_ms - timestamp < timeout.as_millis() as i64 {
			storage.set(SESSION_TIMESTAMP_KEY, &now_ms.to_string());
			return session_id;
		}
	}

	let session_id = SessionId::generate();
	persist_session(storage, &session_id, now_ms);
	session_id
}

fn get_or_create_anonymous(storage: &FallbackStorage) -> AnonymousId {
	if let Some(anonymous_id) = storage
		.get(ANONYMOUS_ID_KEY)
		.and_then(|id| AnonymousId::parse(id).ok())
	{
		return anonymous_id;
	}

	let anonymous_id = AnonymousId::generate();
	storage.set(ANONYMOUS_ID_KEY, anonymous_id.as_str());
	anonymous_id
}
