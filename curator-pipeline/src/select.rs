//! Candidate and final selection

use curator_core::{domain_of, Article, InterestLabel, Judgment, RelevanceScore};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::{debug, info};

pub const DEFAULT_MAX_CANDIDATES: usize = 150;
pub const DEFAULT_MAX_FINAL: usize = 12;
pub const DEFAULT_MAX_PER_DOMAIN: usize = 4;

#[derive(Debug, Clone, Default)]
pub struct SelectionResult {
    pub candidates: Vec<Article>,
    /// Normalized URL -> relevance total, candidates only
    pub totals: HashMap<String, f64>,
}

/// Top articles by relevance, ties broken by recency
#[derive(Debug, Clone, Copy)]
pub struct CandidateSelector {
    max_candidates: usize,
}

impl Default for CandidateSelector {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CANDIDATES)
    }
}

impl CandidateSelector {
    pub fn new(max_candidates: usize) -> Self {
        Self { max_candidates }
    }

    pub fn select(
        &self,
        articles: &[Article],
        scores: &HashMap<String, RelevanceScore>,
    ) -> SelectionResult {
        let mut scored: Vec<(&Article, f64)> = articles
            .iter()
            .filter_map(|a| scores.get(&a.normalized_url).map(|s| (a, s.total)))
            .collect();

        // stable: equal keys keep input order
        scored.sort_by(|(a, a_total), (b, b_total)| {
            b_total
                .partial_cmp(a_total)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.published_at.cmp(&a.published_at))
        });
        scored.truncate(self.max_candidates);

        let totals = scored
            .iter()
            .map(|(a, total)| (a.normalized_url.clone(), *total))
            .collect();
        let candidates: Vec<Article> = scored.into_iter().map(|(a, _)| a.clone()).collect();
        info!("Selected {} of {} articles as candidates", candidates.len(), articles.len());
        SelectionResult { candidates, totals }
    }
}

/// Final pick by label priority with a per-domain cap
#[derive(Debug, Clone, Copy)]
pub struct FinalSelector {
    max_articles: usize,
    max_per_domain: usize,
}

impl Default for FinalSelector {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FINAL, DEFAULT_MAX_PER_DOMAIN)
    }
}

impl FinalSelector {
    pub fn new(max_articles: usize, max_per_domain: usize) -> Self {
        Self {
            max_articles,
            max_per_domain,
        }
    }

    pub fn select(&self, judgments: &[Judgment]) -> Vec<Judgment> {
        let mut ranked: Vec<&Judgment> = judgments
            .iter()
            .filter(|j| j.interest_label != InterestLabel::Ignore)
            .collect();
        ranked.sort_by(|a, b| priority_order(a, b));

        let mut per_domain: HashMap<String, usize> = HashMap::new();
        let mut selected = Vec::new();
        for judgment in ranked {
            if selected.len() >= self.max_articles {
                break;
            }
            let domain = domain_of(&judgment.url).unwrap_or_default();
            let count = per_domain.entry(domain).or_insert(0);
            if *count >= self.max_per_domain {
                debug!("Domain cap reached, skipping {}", judgment.url);
                continue;
            }
            *count += 1;
            selected.push(judgment.clone());
        }

        info!("Final selection: {} of {} judgments", selected.len(), judgments.len());
        selected
    }
}

/// Interest, then buzz, then newest judgment, then highest confidence
fn priority_order(a: &Judgment, b: &Judgment) -> Ordering {
    a.interest_label
        .priority()
        .cmp(&b.interest_label.priority())
        .then_with(|| a.buzz_label.priority().cmp(&b.buzz_label.priority()))
        .then_with(|| b.judged_at.cmp(&a.judged_at))
        .then_with(|| b.confidence.partial_cmp(&a.confidence).unwrap_or(Ordering::Equal))
}
