//! Presence in a curated listing
//!
//! A URL listed in the curated feed scores 100, anything else 0. Absence is
//! a defined answer, so every requested URL always gets a value.

use async_trait::async_trait;
use curator_core::{normalize_url, PopularitySignal};
use curator_net::{parse_feed_links, SharedPolicy};
use std::collections::HashSet;
use tracing::{info, warn};

use crate::{SignalError, SignalFetcher, SignalMap, SourceId};

pub const TECH_BLOG_FEED_URL: &str =
    "https://yamadashy.github.io/tech-blog-rss-feed/feeds/rss.xml";

/// Binary presence signal from one curated feed
pub struct PresenceFetcher {
    source: SourceId,
    policy: SharedPolicy,
    feed_url: String,
}

impl PresenceFetcher {
    pub fn new(source: SourceId, policy: SharedPolicy, feed_url: impl Into<String>) -> Self {
        Self {
            source,
            policy,
            feed_url: feed_url.into(),
        }
    }

    /// Aggregated Japanese tech-blog feed
    pub fn tech_blog_feed(policy: SharedPolicy) -> Self {
        Self::new(SourceId::TechBlogFeed, policy, TECH_BLOG_FEED_URL)
    }

    async fn listed_urls(&self) -> Result<HashSet<String>, SignalError> {
        let response = self.policy.fetch(&self.feed_url).await?;
        let links =
            parse_feed_links(&response.body).map_err(|e| SignalError::Parse(e.to_string()))?;
        Ok(links
            .iter()
            .flatten()
            .filter_map(|link| normalize_url(link).ok())
            .collect())
    }
}

#[async_trait]
impl SignalFetcher for PresenceFetcher {
    fn source(&self) -> SourceId {
        self.source
    }

    async fn fetch_batch(&self, urls: &[String]) -> Result<SignalMap, SignalError> {
        if urls.is_empty() {
            return Ok(SignalMap::new());
        }

        let listed = self.listed_urls().await.unwrap_or_else(|e| {
            warn!("{}: listing unavailable, scoring all URLs 0: {}", self.source, e);
            HashSet::new()
        });

        let signals: SignalMap = urls
            .iter()
            .map(|url| {
                let present = normalize_url(url).is_ok_and(|n| listed.contains(&n));
                let value = if present { 100.0 } else { 0.0 };
                (url.clone(), PopularitySignal::Observed(value))
            })
            .collect();

        let matched = signals
            .values()
            .filter(|s| **s == PopularitySignal::Observed(100.0))
            .count();
        info!("{}: {} of {} URLs listed", self.source, matched, urls.len());
        Ok(signals)
    }
}
