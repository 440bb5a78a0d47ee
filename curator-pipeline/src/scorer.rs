//! Relevance scoring
//!
//! Five components in 0-100 combined with convex weights:
//! - recency: loses 10 points per whole day since publication
//! - consensus: 20 points per occurrence of the normalized URL
//! - popularity: aggregated external signals, fallback when unavailable
//! - interest: first matching tier of the interest profile
//! - authority: configured level of the article's source

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use curator_core::{
    AggregatedScore, Article, InterestProfile, RelevanceScore, RelevanceWeights, SourceRegistry,
    DEFAULT_POPULARITY,
};
use curator_signals::SignalAggregator;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Anything that can rate URLs by popularity
#[async_trait]
pub trait PopularitySource: Send + Sync {
    async fn popularity(&self, urls: &[String]) -> HashMap<String, AggregatedScore>;
}

pub type SharedPopularity = Arc<dyn PopularitySource>;

#[async_trait]
impl PopularitySource for SignalAggregator {
    async fn popularity(&self, urls: &[String]) -> HashMap<String, AggregatedScore> {
        self.fetch_batch(urls).await
    }
}

pub struct RelevanceScorer {
    profile: InterestProfile,
    registry: SourceRegistry,
    popularity: SharedPopularity,
    weights: RelevanceWeights,
}

impl RelevanceScorer {
    pub fn new(profile: InterestProfile, registry: SourceRegistry, popularity: SharedPopularity) -> Self {
        Self {
            profile,
            registry,
            popularity,
            weights: RelevanceWeights::CANONICAL,
        }
    }

    /// Scores keyed by normalized URL; consensus counts occurrences in `articles`
    pub async fn calculate_scores(&self, articles: &[Article]) -> HashMap<String, RelevanceScore> {
        let occurrences = count_occurrences(articles);
        self.calculate_scores_with_occurrences(articles, &occurrences).await
    }

    /// Scores keyed by normalized URL with consensus taken from `occurrences`
    ///
    /// Lets the caller count occurrences before duplicates were collapsed.
    /// URLs missing from `occurrences` count once.
    pub async fn calculate_scores_with_occurrences(
        &self,
        articles: &[Article],
        occurrences: &HashMap<String, usize>,
    ) -> HashMap<String, RelevanceScore> {
        info!("Scoring {} articles", articles.len());
        let urls: Vec<String> = articles.iter().map(|a| a.url.clone()).collect();
        let popularity = self.popularity.popularity(&urls).await;
        let now = Utc::now();

        let scores: HashMap<String, RelevanceScore> = articles
            .iter()
            .map(|article| {
                let count = occurrences.get(&article.normalized_url).copied().unwrap_or(1);
                let score = RelevanceScore::new(
                    &article.url,
                    recency_score(article.published_at, now),
                    consensus_score(count),
                    popularity
                        .get(&article.url)
                        .map_or(DEFAULT_POPULARITY, |s| s.value),
                    self.profile.score(&article.title, &article.description),
                    self.registry.authority_score(&article.source_name),
                    count,
                    &self.weights,
                );
                debug!("{} -> {:.1}", article.url, score.total);
                (article.normalized_url.clone(), score)
            })
            .collect();

        info!("Scored {} articles", scores.len());
        scores
    }
}

/// Normalized URL -> occurrences
pub fn count_occurrences(articles: &[Article]) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for article in articles {
        *counts.entry(article.normalized_url.clone()).or_insert(0) += 1;
    }
    counts
}

pub fn recency_score(published_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let days_old = (now - published_at).num_days() as f64;
    (100.0 - days_old * 10.0).clamp(0.0, 100.0)
}

pub fn consensus_score(occurrences: usize) -> f64 {
    (occurrences as f64 * 20.0).min(100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use curator_core::{normalize_url, AuthorityLevel, SourceConfig};

    struct FixedPopularity(HashMap<String, AggregatedScore>);

    #[async_trait]
    impl PopularitySource for FixedPopularity {
        async fn popularity(&self, _urls: &[String]) -> HashMap<String, AggregatedScore> {
            self.0.clone()
        }
    }

    fn article(url: &str, title: &str, source: &str, age: Duration) -> Article {
        let now = Utc::now();
        Article {
            url: url.to_string(),
            normalized_url: normalize_url(url).unwrap(),
            title: title.to_string(),
            description: "No description".to_string(),
            source_name: source.to_string(),
            published_at: now - age,
            collected_at: now,
        }
    }

    fn scorer(popularity: HashMap<String, AggregatedScore>) -> RelevanceScorer {
        let profile = InterestProfile {
            max_interest: vec!["Rust (tokio, async)".to_string()],
            ignore_interest: vec!["Celebrity".to_string()],
            ..Default::default()
        };
        let registry = SourceRegistry::new(vec![SourceConfig {
            source_id: "rust_blog".to_string(),
            name: "Rust Blog".to_string(),
            feed_url: "https://blog.rust-lang.org/feed.xml".to_string(),
            authority_level: AuthorityLevel::Official,
            enabled: true,
        }])
        .unwrap();
        RelevanceScorer::new(profile, registry, Arc::new(FixedPopularity(popularity)))
    }

    #[test]
    fn test_recency() {
        let now = Utc::now();
        assert_eq!(recency_score(now, now), 100.0);
        assert_eq!(recency_score(now - Duration::hours(23), now), 100.0);
        assert_eq!(recency_score(now - Duration::hours(49), now), 80.0);
        assert_eq!(recency_score(now - Duration::days(15), now), 0.0);
        assert_eq!(recency_score(now + Duration::days(3), now), 100.0);
    }

    #[test]
    fn test_consensus() {
        assert_eq!(consensus_score(1), 20.0);
        assert_eq!(consensus_score(3), 60.0);
        assert_eq!(consensus_score(9), 100.0);
    }

    #[tokio::test]
    async fn test_components_and_total() {
        let url = "https://blog.rust-lang.org/2025/01/01/tokio.html";
        let popularity = HashMap::from([(url.to_string(), AggregatedScore { value: 60.0, sources: 3 })]);
        let articles = vec![article(url, "Async Rust with Tokio", "Rust Blog", Duration::hours(26))];

        let scores = scorer(popularity).calculate_scores(&articles).await;
        let score = &scores[&articles[0].normalized_url];
        assert_eq!(score.recency, 90.0);
        assert_eq!(score.consensus, 20.0);
        assert_eq!(score.popularity, 60.0);
        assert_eq!(score.interest, 100.0);
        assert_eq!(score.authority, 100.0);
        let expected = 90.0 * 0.20 + 20.0 * 0.15 + 60.0 * 0.35 + 100.0 * 0.25 + 100.0 * 0.05;
        assert!((score.total - expected).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_missing_popularity_and_unknown_source() {
        let articles = vec![article("https://example.com/gossip", "Celebrity news", "Unknown", Duration::days(30))];
        let scores = scorer(HashMap::new()).calculate_scores(&articles).await;
        let score = &scores[&articles[0].normalized_url];
        assert_eq!(score.popularity, DEFAULT_POPULARITY);
        assert_eq!(score.interest, 0.0);
        assert_eq!(score.authority, 0.0);
        assert_eq!(score.recency, 0.0);
        assert!((0.0..=100.0).contains(&score.total));
    }

    #[tokio::test]
    async fn test_occurrences_drive_consensus() {
        let articles = vec![
            article("https://example.com/a?utm_source=x", "Post", "Unknown", Duration::hours(1)),
            article("http://example.com/a", "Post", "Unknown", Duration::hours(1)),
        ];
        let scores = scorer(HashMap::new()).calculate_scores(&articles).await;
        assert_eq!(scores.len(), 1);
        let score = &scores["https://example.com/a"];
        assert_eq!(score.source_count, 2);
        assert_eq!(score.consensus, 40.0);

        let occurrences = HashMap::from([("https://example.com/a".to_string(), 4)]);
        let scores = scorer(HashMap::new())
            .calculate_scores_with_occurrences(&articles[..1], &occurrences)
            .await;
        assert_eq!(scores["https://example.com/a"].consensus, 80.0);
    }
}
