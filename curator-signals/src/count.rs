//! Bookmark counts
//!
//! URLs are queried in sub-batches of at most `batch_size`; sub-batches run
//! concurrently through the shared policy. A failed sub-batch leaves its URLs
//! out of the result (unavailable, not zero).

use async_trait::async_trait;
use curator_core::PopularitySignal;
use curator_net::SharedPolicy;
use futures::future::join_all;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::{bookmark_score, SignalError, SignalFetcher, SignalMap, SourceId};

pub const HATENA_COUNT_API_URL: &str = "https://bookmark.hatenaapis.com/count/entries";

/// Default URLs per request
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Bookmark-count fetcher with logarithmic scoring
pub struct CountFetcher {
    source: SourceId,
    policy: SharedPolicy,
    api_url: String,
    batch_size: usize,
}

impl CountFetcher {
    pub fn new(source: SourceId, policy: SharedPolicy, api_url: impl Into<String>) -> Self {
        Self {
            source,
            policy,
            api_url: api_url.into(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Hatena bookmark count API
    pub fn hatena(policy: SharedPolicy) -> Self {
        Self::new(SourceId::HatenaBookmark, policy, HATENA_COUNT_API_URL)
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// `<api>?url=<a>&url=<b>...`
    fn request_url(&self, urls: &[String]) -> String {
        let query = urls
            .iter()
            .map(|u| format!("url={}", urlencoding::encode(u)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.api_url, query)
    }

    async fn fetch_counts(&self, urls: &[String]) -> Result<HashMap<String, u64>, SignalError> {
        let response = self.policy.fetch(&self.request_url(urls)).await?;
        let body: HashMap<String, Value> = response
            .json()
            .map_err(|e| SignalError::Parse(e.to_string()))?;
        debug!("{}: {} counts for {} URLs", self.source, body.len(), urls.len());
        Ok(body
            .into_iter()
            .map(|(url, count)| (url, count.as_u64().unwrap_or(0)))
            .collect())
    }
}

#[async_trait]
impl SignalFetcher for CountFetcher {
    fn source(&self) -> SourceId {
        self.source
    }

    async fn fetch_batch(&self, urls: &[String]) -> Result<SignalMap, SignalError> {
        if urls.is_empty() {
            return Ok(SignalMap::new());
        }

        let chunks: Vec<&[String]> = urls.chunks(self.batch_size).collect();
        let results = join_all(chunks.iter().map(|chunk| self.fetch_counts(chunk))).await;

        let mut signals = SignalMap::new();
        let mut failed = 0;
        for (chunk, result) in chunks.iter().zip(results) {
            match result {
                Ok(counts) => {
                    for url in chunk.iter() {
                        if let Some(&count) = counts.get(url) {
                            signals.insert(
                                url.clone(),
                                PopularitySignal::Observed(bookmark_score(count)),
                            );
                        }
                    }
                }
                Err(e) => {
                    failed += 1;
                    warn!("{}: sub-batch of {} URLs failed: {}", self.source, chunk.len(), e);
                }
            }
        }

        info!(
            "{}: {} of {} URLs scored ({} failed sub-batches)",
            self.source,
            signals.len(),
            urls.len(),
            failed
        );
        Ok(signals)
    }
}
