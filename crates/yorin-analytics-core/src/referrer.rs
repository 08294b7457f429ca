// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Referrer source classification for pageviews.

use serde::{Deserialize, Serialize};
use url::Url;

/// Search engines and the hostnames that identify them.
const SEARCH_ENGINES: &[(&str, &[&str])] = &[
	(
		"google",
		&[
			"google.com",
			"google.co.uk",
			"google.ca",
			"google.de",
			"google.fr",
			"google.it",
			"google.es",
			"google.com.br",
			"google.co.jp",
			"google.co.in",
		],
	),
	("bing", &["bing.com"]),
	("yahoo", &["yahoo.com", "search.yahoo.com"]),
	("duckduckgo", &["duckduckgo.com"]),
	("yandex", &["yandex.com", "yandex.ru"]),
	("baidu", &["baidu.com"]),
	("ask", &["ask.com"]),
	("aol", &["search.aol.com"]),
];

const SOCIAL_NETWORKS: &[&str] = &[
	"facebook.com",
	"twitter.com",
	"x.com",
	"linkedin.com",
	"instagram.com",
	"pinterest.com",
	"reddit.com",
	"tiktok.com",
	"youtube.com",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferrerType {
	Direct,
	Internal,
	Search,
	Social,
	External,
}

impl ReferrerType {
	pub fn as_str(&self) -> &'static str {
		match self {
			ReferrerType::Direct => "direct",
			ReferrerType::Internal => "internal",
			ReferrerType::Search => "search",
			ReferrerType::Social => "social",
			ReferrerType::External => "external",
		}
	}
}

/// Classified referrer for a pageview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferrerInfo {
	/// The referrer URL, empty for direct visits and unparsable referrers.
	pub referrer: String,
	pub referrer_type: ReferrerType,
	pub search_engine: Option<&'static str>,
}

impl ReferrerInfo {
	fn direct() -> Self {
		Self {
			referrer: String::new(),
			referrer_type: ReferrerType::Direct,
			search_engine: None,
		}
	}

	fn of(referrer: &str, referrer_type: ReferrerType) -> Self {
		Self {
			referrer: referrer.to_string(),
			referrer_type,
			search_engine: None,
		}
	}
}

/// Classifies `referrer` relative to the page at `current_url`.
///
/// Rules apply in order: empty or unparsable → direct, same host → internal,
/// search engine host → search, social host → social, anything else →
/// external. Host tables match by substring, so `www.google.com` counts as
/// google.
pub fn classify_referrer(referrer: &str, current_url: Option<&str>) -> ReferrerInfo {
	if referrer.is_empty() {
		return ReferrerInfo::direct();
	}

	let Ok(referrer_url) = Url::parse(referrer) else {
		return ReferrerInfo::direct();
	};
	let Some(referrer_host) = referrer_url.host_str() else {
		return ReferrerInfo::direct();
	};

	let current_host = current_url
		.and_then(|url| Url::parse(url).ok())
		.and_then(|url| url.host_str().map(str::to_string));
	if current_host.as_deref() == Some(referrer_host) {
		return ReferrerInfo::of(referrer, ReferrerType::Internal);
	}

	for (engine, domains) in SEARCH_ENGINES {
		if domains.iter().any(|domain| referrer_host.contains(domain)) {
			return ReferrerInfo {
				search_engine: Some(*engine),
				..ReferrerInfo::of(referrer, ReferrerType::Search)
			};
		}
	}

	if SOCIAL_NETWORKS
		.iter()
		.any(|domain| referrer_host.contains(domain))
	{
		return ReferrerInfo::of(referrer, ReferrerType::Social);
	}

	ReferrerInfo::of(referrer, ReferrerType::External)
}
