//! Duplicate and already-judged removal
//!
//! Pass 1 keeps the first article per normalized URL. Pass 2 drops articles
//! the judgment cache already knows. A cache that cannot answer counts as
//! "not cached", so a broken cache never hides articles.

use curator_core::{Article, SharedCache};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default)]
pub struct DedupResult {
    pub unique: Vec<Article>,
    pub duplicate_count: usize,
    pub cached_count: usize,
}

#[derive(Clone, Default)]
pub struct Deduplicator {
    cache: Option<SharedCache>,
}

impl Deduplicator {
    pub fn new(cache: Option<SharedCache>) -> Self {
        Self { cache }
    }

    pub async fn deduplicate(&self, articles: Vec<Article>) -> DedupResult {
        let input = articles.len();
        let mut seen = HashSet::new();
        let mut duplicate_count = 0;
        let mut survivors = Vec::with_capacity(input);
        for article in articles {
            if seen.insert(article.normalized_url.clone()) {
                survivors.push(article);
            } else {
                debug!("Duplicate: {} ({})", article.url, article.normalized_url);
                duplicate_count += 1;
            }
        }

        let (unique, cached_count) = match &self.cache {
            Some(cache) => {
                let urls: Vec<String> = survivors.iter().map(|a| a.url.clone()).collect();
                let cached = cache.batch_exists(&urls).await.unwrap_or_else(|e| {
                    warn!("Cache lookup failed, treating all as not cached: {}", e);
                    HashMap::new()
                });
                let (hits, unique): (Vec<Article>, Vec<Article>) = survivors
                    .into_iter()
                    .partition(|a| cached.get(&a.url).copied().unwrap_or(false));
                (unique, hits.len())
            }
            None => (survivors, 0),
        };

        info!(
            "Dedup: {} in, {} unique, {} duplicates, {} cached",
            input,
            unique.len(),
            duplicate_count,
            cached_count
        );
        DedupResult {
            unique,
            duplicate_count,
            cached_count,
        }
    }
}
