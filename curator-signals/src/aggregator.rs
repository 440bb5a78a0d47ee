//! Weighted popularity aggregation
//!
//! All fetchers run concurrently on the full URL set. Per URL the score is
//! `sum(w_i * v_i) / sum(w_i)` over sources that produced an observed value.
//! Explicit zeros count; failed sources, missing URLs and not-applicable
//! values are left out of both sums. A URL with no contributing source gets
//! the fallback score.

use curator_core::{AggregatedScore, PopularitySignal};
use curator_net::SharedPolicy;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{
    CountFetcher, FeedRankFetcher, PagedRankFetcher, PresenceFetcher, SharedFetcher, SignalMap,
    SourceId,
};

/// A fetcher and its weight
#[derive(Clone)]
pub struct WeightedFetcher {
    pub fetcher: SharedFetcher,
    pub weight: f64,
}

/// Runs every signal source and combines the results
#[derive(Clone, Default)]
pub struct SignalAggregator {
    fetchers: Vec<WeightedFetcher>,
}

impl SignalAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The four known sources at their canonical weights
    pub fn with_default_sources(policy: SharedPolicy) -> Self {
        Self::new()
            .with_fetcher(Arc::new(PresenceFetcher::tech_blog_feed(policy.clone())))
            .with_fetcher(Arc::new(CountFetcher::hatena(policy.clone())))
            .with_fetcher(Arc::new(PagedRankFetcher::zenn(policy.clone())))
            .with_fetcher(Arc::new(FeedRankFetcher::qiita(policy)))
    }

    /// Add a fetcher at its source's canonical weight
    pub fn with_fetcher(self, fetcher: SharedFetcher) -> Self {
        let weight = fetcher.source().canonical_weight();
        self.with_weighted(fetcher, weight)
    }

    pub fn with_weighted(mut self, fetcher: SharedFetcher, weight: f64) -> Self {
        self.fetchers.push(WeightedFetcher { fetcher, weight });
        self
    }

    pub fn sources(&self) -> Vec<SourceId> {
        self.fetchers.iter().map(|f| f.fetcher.source()).collect()
    }

    /// Aggregated popularity for every URL in `urls`
    pub async fn fetch_batch(&self, urls: &[String]) -> HashMap<String, AggregatedScore> {
        if urls.is_empty() {
            return HashMap::new();
        }
        info!(
            "Fetching popularity for {} URLs from {} sources",
            urls.len(),
            self.fetchers.len()
        );

        let results = join_all(self.fetchers.iter().map(|wf| wf.fetcher.fetch_batch(urls))).await;

        let mut per_source: Vec<(f64, SignalMap)> = Vec::with_capacity(self.fetchers.len());
        for (wf, result) in self.fetchers.iter().zip(results) {
            match result {
                Ok(map) => per_source.push((wf.weight, map)),
                Err(e) => warn!("{} failed, excluded from aggregation: {}", wf.fetcher.source(), e),
            }
        }

        let scores: HashMap<String, AggregatedScore> = urls
            .iter()
            .map(|url| {
                let signals = per_source
                    .iter()
                    .map(|(weight, map)| (*weight, map.get(url).copied()));
                (url.clone(), combine(signals))
            })
            .collect();

        let computed = scores.values().filter(|s| !s.is_fallback()).count();
        info!("Aggregated popularity: {} computed, {} fallback", computed, urls.len() - computed);
        scores
    }
}

/// Weighted mean over observed signals, or the fallback when none are observed
pub fn combine(signals: impl IntoIterator<Item = (f64, Option<PopularitySignal>)>) -> AggregatedScore {
    let mut weighted_sum = 0.0;
    let mut weight_sum = 0.0;
    let mut sources = 0;
    for (weight, signal) in signals {
        if let Some(value) = signal.and_then(PopularitySignal::observed) {
            weighted_sum += weight * value;
            weight_sum += weight;
            sources += 1;
        }
    }

    if sources == 0 || weight_sum <= 0.0 {
        return AggregatedScore::fallback();
    }
    let value = weighted_sum / weight_sum;
    debug!("Combined {} sources -> {:.2}", sources, value);
    AggregatedScore { value, sources }
}
