//! Rank within a site's "popular items" feed
//!
//! Only URLs on the feed's own domain can be ranked. Everything else gets
//! the configured off-domain value. The feed is advisory: if it cannot be
//! fetched or parsed, every URL scores 0 instead of failing the batch.

use async_trait::async_trait;
use curator_core::{is_on_domain, normalize_url, PopularitySignal};
use curator_net::{parse_feed_links, SharedPolicy};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::{RankLadder, SignalError, SignalFetcher, SignalMap, SourceId};

pub const QIITA_POPULAR_FEED_URL: &str = "https://qiita.com/popular-items/feed";
pub const QIITA_DOMAIN: &str = "qiita.com";

/// Ranks in-domain URLs by their position in a popular-items feed
pub struct FeedRankFetcher {
    source: SourceId,
    policy: SharedPolicy,
    feed_url: String,
    domain: String,
    ladder: RankLadder,
    off_domain: PopularitySignal,
}

impl FeedRankFetcher {
    pub fn new(
        source: SourceId,
        policy: SharedPolicy,
        feed_url: impl Into<String>,
        domain: impl Into<String>,
        ladder: RankLadder,
    ) -> Self {
        Self {
            source,
            policy,
            feed_url: feed_url.into(),
            domain: domain.into(),
            ladder,
            off_domain: PopularitySignal::Observed(0.0),
        }
    }

    /// Qiita popular-items feed
    pub fn qiita(policy: SharedPolicy) -> Self {
        Self::new(
            SourceId::QiitaPopular,
            policy,
            QIITA_POPULAR_FEED_URL,
            QIITA_DOMAIN,
            RankLadder::POPULAR_FEED,
        )
    }

    /// Signal given to URLs outside the feed's domain
    pub fn with_off_domain(mut self, signal: PopularitySignal) -> Self {
        self.off_domain = signal;
        self
    }

    /// Normalized URL -> 1-based rank; the first listing position wins
    async fn fetch_ranks(&self) -> Result<HashMap<String, usize>, SignalError> {
        let response = self.policy.fetch(&self.feed_url).await?;
        let links =
            parse_feed_links(&response.body).map_err(|e| SignalError::Parse(e.to_string()))?;

        let mut ranks = HashMap::new();
        for (idx, link) in links.iter().enumerate() {
            // linkless entries still take up a position
            let Some(link) = link else { continue };
            match normalize_url(link) {
                Ok(normalized) => {
                    ranks.entry(normalized).or_insert(idx + 1);
                }
                Err(e) => debug!("Skipping feed link {}: {}", link, e),
            }
        }
        Ok(ranks)
    }
}

#[async_trait]
impl SignalFetcher for FeedRankFetcher {
    fn source(&self) -> SourceId {
        self.source
    }

    async fn fetch_batch(&self, urls: &[String]) -> Result<SignalMap, SignalError> {
        let (in_domain, off_domain): (Vec<&String>, Vec<&String>) =
            urls.iter().partition(|u| is_on_domain(u, &self.domain));
        debug!(
            "{}: {} in-domain, {} off-domain URLs",
            self.source,
            in_domain.len(),
            off_domain.len()
        );

        let mut signals: SignalMap = off_domain
            .into_iter()
            .map(|u| (u.clone(), self.off_domain))
            .collect();
        if in_domain.is_empty() {
            return Ok(signals);
        }

        let ranks = match self.fetch_ranks().await {
            Ok(ranks) => ranks,
            Err(e) => {
                warn!("{}: feed unavailable, scoring its URLs 0: {}", self.source, e);
                HashMap::new()
            }
        };

        let mut matched = 0;
        for url in in_domain {
            let rank = normalize_url(url).ok().and_then(|n| ranks.get(&n).copied());
            if rank.is_some() {
                matched += 1;
            }
            signals.insert(url.clone(), PopularitySignal::Observed(self.ladder.score(rank)));
        }
        info!("{}: {} of {} URLs ranked", self.source, matched, urls.len());
        Ok(signals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curator_net::{FetchPolicy, HttpResponse, PolicyConfig, ScriptedTransport};
    use std::sync::Arc;

    fn feed_with(n: usize) -> String {
        let entries: String = (1..=n)
            .map(|i| {
                format!(
                    r#"<entry><id>tag:qiita.com,2005:{i}</id><title>Item {i}</title><updated>2025-01-01T00:00:00Z</updated><link rel="alternate" type="text/html" href="https://qiita.com/user/items/{i}"/></entry>"#
                )
            })
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><feed xmlns="http://www.w3.org/2005/Atom"><id>tag:qiita.com,2005:feed</id><title>Popular</title><updated>2025-01-01T00:00:00Z</updated>{entries}</feed>"#
        )
    }

    fn fetcher(transport: Arc<ScriptedTransport>) -> FeedRankFetcher {
        let policy = Arc::new(FetchPolicy::new(PolicyConfig::immediate(), transport));
        FeedRankFetcher::qiita(policy)
    }

    #[tokio::test]
    async fn test_ranks_map_through_ladder() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(QIITA_POPULAR_FEED_URL, feed_with(60));
        let urls: Vec<String> = [1, 10, 11, 50, 51]
            .iter()
            .map(|i| format!("https://qiita.com/user/items/{i}"))
            .chain(["https://qiita.com/user/items/999".to_string()])
            .collect();

        let signals = fetcher(transport).fetch_batch(&urls).await.unwrap();
        let score = |i: usize| signals[&urls[i]].observed().unwrap();
        assert_eq!(score(0), 100.0);
        assert_eq!(score(1), 100.0);
        assert_eq!(score(2), 70.0);
        assert_eq!(score(3), 20.0);
        assert_eq!(score(4), 0.0);
        assert_eq!(score(5), 0.0);
    }

    #[tokio::test]
    async fn test_tracking_variant_matches() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(QIITA_POPULAR_FEED_URL, feed_with(3));
        let url = "http://qiita.com/user/items/2/?utm_source=x".to_string();
        let signals = fetcher(transport).fetch_batch(&[url.clone()]).await.unwrap();
        assert_eq!(signals[&url], PopularitySignal::Observed(100.0));
    }

    #[tokio::test]
    async fn test_off_domain_value() {
        let transport = Arc::new(ScriptedTransport::new());
        let url = "https://zenn.dev/a/articles/b".to_string();

        let signals = fetcher(transport.clone()).fetch_batch(&[url.clone()]).await.unwrap();
        assert_eq!(signals[&url], PopularitySignal::Observed(0.0));
        assert_eq!(transport.call_count(), 0);

        let signals = fetcher(transport)
            .with_off_domain(PopularitySignal::NotApplicable)
            .fetch_batch(&[url.clone()])
            .await
            .unwrap();
        assert_eq!(signals[&url], PopularitySignal::NotApplicable);
    }

    #[tokio::test]
    async fn test_feed_failure_scores_zero() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(QIITA_POPULAR_FEED_URL, Ok(HttpResponse::with_status(404)));
        let urls = vec![
            "https://qiita.com/user/items/1".to_string(),
            "https://example.com/x".to_string(),
        ];
        let signals = fetcher(transport).fetch_batch(&urls).await.unwrap();
        assert_eq!(signals.len(), 2);
        assert!(signals.values().all(|s| *s == PopularitySignal::Observed(0.0)));
    }

    #[tokio::test]
    async fn test_linkless_entry_takes_a_rank() {
        let transport = Arc::new(ScriptedTransport::new());
        let linkless = r#"<entry><id>tag:qiita.com,2005:0</id><title>Deleted</title><updated>2025-01-01T00:00:00Z</updated></entry>"#;
        let feed = feed_with(10).replacen("<entry>", &format!("{linkless}<entry>"), 1);
        transport.respond(QIITA_POPULAR_FEED_URL, feed);
        let url = "https://qiita.com/user/items/10".to_string();

        let signals = fetcher(transport).fetch_batch(&[url.clone()]).await.unwrap();
        // listed tenth, but eleventh in the feed
        assert_eq!(signals[&url], PopularitySignal::Observed(70.0));
    }
}
