// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared HTTP utilities for the Yorin SDK.
//!
//! This crate provides:
//! - A pre-configured HTTP client with the SDK User-Agent header
//! - Retry logic with exponential backoff for transient delivery failures

mod client;
mod retry;

pub use client::{builder, new_client_with_timeout, user_agent, SDK_NAME, SDK_VERSION};
pub use retry::{calculate_delay, retry, RetryConfig, RetryableError};
