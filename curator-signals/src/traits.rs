//! Common traits for popularity signal sources

use async_trait::async_trait;
use curator_core::PopularitySignal;
use curator_net::NetError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Per-URL signals from one source; a missing URL means "unavailable"
pub type SignalMap = HashMap<String, PopularitySignal>;

/// Errors from signal fetching
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("Network error: {0}")]
    Network(#[from] NetError),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// The popularity sources Curator knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    /// Curated tech-blog RSS feed (presence)
    TechBlogFeed,
    /// Hatena bookmark counts
    HatenaBookmark,
    /// Zenn weekly ranking
    ZennWeekly,
    /// Qiita popular-items feed
    QiitaPopular,
}

impl SourceId {
    pub const ALL: [SourceId; 4] = [
        SourceId::TechBlogFeed,
        SourceId::HatenaBookmark,
        SourceId::ZennWeekly,
        SourceId::QiitaPopular,
    ];

    /// Weight in the aggregated popularity score
    pub fn canonical_weight(self) -> f64 {
        match self {
            SourceId::TechBlogFeed => 0.05,
            SourceId::HatenaBookmark => 0.45,
            SourceId::ZennWeekly => 0.35,
            SourceId::QiitaPopular => 0.15,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SourceId::TechBlogFeed => "tech_blog_feed",
            SourceId::HatenaBookmark => "hatena_bookmark",
            SourceId::ZennWeekly => "zenn_weekly",
            SourceId::QiitaPopular => "qiita_popular",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Common interface for all popularity sources
#[async_trait]
pub trait SignalFetcher: Send + Sync {
    /// Which source this fetcher speaks for
    fn source(&self) -> SourceId;

    /// Signals for a batch of article URLs, keyed by the URLs as given
    async fn fetch_batch(&self, urls: &[String]) -> Result<SignalMap, SignalError>;
}

pub type SharedFetcher = Arc<dyn SignalFetcher>;
