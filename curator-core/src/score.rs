//! Popularity signals and relevance scores
//!
//! Scores are 0-100 floats. A popularity signal that was checked and came
//! back empty is `Observed(0.0)`; one that was never obtained is simply not
//! present. The two must never be confused.

use serde::{Deserialize, Serialize};

use crate::DEFAULT_POPULARITY;

/// One source's opinion about one URL
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PopularitySignal {
    /// A value in the source's 0-100 range; zero is meaningful
    Observed(f64),
    /// The URL is outside the source's domain
    NotApplicable,
}

impl PopularitySignal {
    pub fn observed(self) -> Option<f64> {
        match self {
            PopularitySignal::Observed(v) => Some(v),
            PopularitySignal::NotApplicable => None,
        }
    }
}

/// Weighted popularity for one URL
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregatedScore {
    pub value: f64,
    /// Number of sources that contributed; zero means `value` is the fallback
    pub sources: usize,
}

impl AggregatedScore {
    pub fn fallback() -> Self {
        Self {
            value: DEFAULT_POPULARITY,
            sources: 0,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.sources == 0
    }
}

/// Convex weights over the five relevance components
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelevanceWeights {
    pub recency: f64,
    pub consensus: f64,
    pub popularity: f64,
    pub interest: f64,
    pub authority: f64,
}

impl RelevanceWeights {
    pub const CANONICAL: RelevanceWeights = RelevanceWeights {
        recency: 0.20,
        consensus: 0.15,
        popularity: 0.35,
        interest: 0.25,
        authority: 0.05,
    };

    pub fn sum(&self) -> f64 {
        self.recency + self.consensus + self.popularity + self.interest + self.authority
    }
}

impl Default for RelevanceWeights {
    fn default() -> Self {
        Self::CANONICAL
    }
}

/// Per-article score breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevanceScore {
    pub url: String,
    pub recency: f64,
    pub consensus: f64,
    pub popularity: f64,
    pub interest: f64,
    pub authority: f64,
    /// Occurrences of the normalized URL in the batch
    pub source_count: usize,
    pub total: f64,
}

impl RelevanceScore {
    /// Build a score and compute its weighted total
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        url: impl Into<String>,
        recency: f64,
        consensus: f64,
        popularity: f64,
        interest: f64,
        authority: f64,
        source_count: usize,
        weights: &RelevanceWeights,
    ) -> Self {
        let total = recency * weights.recency
            + consensus * weights.consensus
            + popularity * weights.popularity
            + interest * weights.interest
            + authority * weights.authority;
        Self {
            url: url.into(),
            recency,
            consensus,
            popularity,
            interest,
            authority,
            source_count,
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_weights_sum_to_one() {
        assert!((RelevanceWeights::CANONICAL.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_total_bounds() {
        let w = RelevanceWeights::CANONICAL;
        let max = RelevanceScore::new("u", 100.0, 100.0, 100.0, 100.0, 100.0, 5, &w);
        let min = RelevanceScore::new("u", 0.0, 0.0, 0.0, 0.0, 0.0, 1, &w);
        assert!((max.total - 100.0).abs() < 1e-9);
        assert_eq!(min.total, 0.0);
    }

    #[test]
    fn test_single_component_never_reaches_100() {
        let w = RelevanceWeights::CANONICAL;
        let recency = RelevanceScore::new("u", 100.0, 0.0, 0.0, 0.0, 0.0, 1, &w);
        assert!((recency.total - 20.0).abs() < 1e-9);
        let popularity = RelevanceScore::new("u", 0.0, 0.0, 100.0, 0.0, 0.0, 1, &w);
        assert!((popularity.total - 35.0).abs() < 1e-9);
        for total in [
            RelevanceScore::new("u", 0.0, 100.0, 0.0, 0.0, 0.0, 5, &w).total,
            RelevanceScore::new("u", 0.0, 0.0, 0.0, 100.0, 0.0, 1, &w).total,
            RelevanceScore::new("u", 0.0, 0.0, 0.0, 0.0, 100.0, 1, &w).total,
        ] {
            assert!(total < 100.0);
        }
    }

    #[test]
    fn test_signal_observed() {
        assert_eq!(PopularitySignal::Observed(0.0).observed(), Some(0.0));
        assert_eq!(PopularitySignal::NotApplicable.observed(), None);
        assert!(AggregatedScore::fallback().is_fallback());
    }
}
