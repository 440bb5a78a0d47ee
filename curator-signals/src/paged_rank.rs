//! Rank within a paginated weekly ranking API
//!
//! Pages are fetched in order until the page cap, an empty page, or a page
//! without `next_page`. Ranks continue across pages. A failure part-way
//! keeps nothing: the ranking is all-or-nothing, and a failed ranking scores
//! every URL 0.

use async_trait::async_trait;
use curator_core::{is_on_domain, normalize_url, PopularitySignal};
use curator_net::SharedPolicy;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::{RankLadder, SignalError, SignalFetcher, SignalMap, SourceId};

pub const ZENN_ARTICLES_API_URL: &str = "https://zenn.dev/api/articles";
pub const ZENN_BASE_URL: &str = "https://zenn.dev";
pub const ZENN_DOMAIN: &str = "zenn.dev";

/// Default page cap (about 100 items)
pub const DEFAULT_MAX_PAGES: usize = 4;

#[derive(Debug, Deserialize)]
struct RankingPage {
    #[serde(default)]
    articles: Vec<RankedItem>,
    #[serde(default)]
    next_page: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RankedItem {
    #[serde(default)]
    path: String,
}

/// Ranks in-domain URLs by position in a paginated ranking
pub struct PagedRankFetcher {
    source: SourceId,
    policy: SharedPolicy,
    api_url: String,
    base_url: String,
    domain: String,
    max_pages: usize,
    ladder: RankLadder,
}

impl PagedRankFetcher {
    pub fn new(
        source: SourceId,
        policy: SharedPolicy,
        api_url: impl Into<String>,
        base_url: impl Into<String>,
        domain: impl Into<String>,
        ladder: RankLadder,
    ) -> Self {
        Self {
            source,
            policy,
            api_url: api_url.into(),
            base_url: base_url.into(),
            domain: domain.into(),
            max_pages: DEFAULT_MAX_PAGES,
            ladder,
        }
    }

    /// Zenn weekly article ranking
    pub fn zenn(policy: SharedPolicy) -> Self {
        Self::new(
            SourceId::ZennWeekly,
            policy,
            ZENN_ARTICLES_API_URL,
            ZENN_BASE_URL,
            ZENN_DOMAIN,
            RankLadder::WEEKLY_RANKING,
        )
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    fn page_url(&self, page: usize) -> String {
        if page == 1 {
            format!("{}?order=weekly", self.api_url)
        } else {
            format!("{}?order=weekly&page={}", self.api_url, page)
        }
    }

    /// Normalized URL -> 1-based rank across all fetched pages
    async fn fetch_ranking(&self) -> Result<HashMap<String, usize>, SignalError> {
        let mut ranking = HashMap::new();
        let mut next_rank = 1;

        for page in 1..=self.max_pages {
            let response = self.policy.fetch(&self.page_url(page)).await?;
            let body: RankingPage = response
                .json()
                .map_err(|e| SignalError::Parse(e.to_string()))?;
            if body.articles.is_empty() {
                break;
            }

            for item in body.articles.iter().filter(|i| !i.path.is_empty()) {
                let full = format!("{}{}", self.base_url, item.path);
                if let Ok(normalized) = normalize_url(&full) {
                    ranking.entry(normalized).or_insert(next_rank);
                }
                next_rank += 1;
            }
            debug!("{}: page {} done, {} ranked so far", self.source, page, ranking.len());

            if body.next_page.as_ref().map_or(true, |n| n.is_null()) {
                break;
            }
        }
        Ok(ranking)
    }
}

#[async_trait]
impl SignalFetcher for PagedRankFetcher {
    fn source(&self) -> SourceId {
        self.source
    }

    async fn fetch_batch(&self, urls: &[String]) -> Result<SignalMap, SignalError> {
        let mut signals: SignalMap = urls
            .iter()
            .map(|u| (u.clone(), PopularitySignal::Observed(0.0)))
            .collect();
        let in_domain: Vec<&String> = urls
            .iter()
            .filter(|u| is_on_domain(u, &self.domain))
            .collect();
        if in_domain.is_empty() {
            return Ok(signals);
        }

        let ranking = match self.fetch_ranking().await {
            Ok(ranking) => ranking,
            Err(e) => {
                warn!("{}: ranking unavailable, scoring all URLs 0: {}", self.source, e);
                return Ok(signals);
            }
        };

        let mut matched = 0;
        for url in in_domain {
            let rank = normalize_url(url).ok().and_then(|n| ranking.get(&n).copied());
            if rank.is_some() {
                matched += 1;
            }
            signals.insert(url.clone(), PopularitySignal::Observed(self.ladder.score(rank)));
        }
        info!("{}: {} of {} URLs ranked", self.source, matched, urls.len());
        Ok(signals)
    }
}
