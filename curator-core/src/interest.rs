//! Reader interest profile
//!
//! Topics are free-form labels such as `"AI/ML (LLM, RAG、agents)"`. The text
//! before the parenthetical is the main keyword; the items inside it are
//! sub-keywords. Matching is a case-insensitive substring test.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::NEUTRAL_INTEREST;

static PAREN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[（(]([^（(）)]*)").unwrap());

static SEPARATOR_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[,，、]").unwrap());

/// Interest tiers, checked from most to least interesting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterestTier {
    Max,
    High,
    Medium,
    Low,
    Ignore,
}

impl InterestTier {
    pub const ORDERED: [InterestTier; 5] = [
        InterestTier::Max,
        InterestTier::High,
        InterestTier::Medium,
        InterestTier::Low,
        InterestTier::Ignore,
    ];

    pub fn score(self) -> f64 {
        match self {
            InterestTier::Max => 100.0,
            InterestTier::High => 85.0,
            InterestTier::Medium => 70.0,
            InterestTier::Low => 50.0,
            InterestTier::Ignore => 0.0,
        }
    }
}

/// Topics the reader cares about, grouped by tier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterestProfile {
    /// Free-text description of the reader, used in judge prompts
    pub summary: String,
    pub max_interest: Vec<String>,
    pub high_interest: Vec<String>,
    pub medium_interest: Vec<String>,
    pub low_interest: Vec<String>,
    pub ignore_interest: Vec<String>,
}

impl InterestProfile {
    pub fn topics(&self, tier: InterestTier) -> &[String] {
        match tier {
            InterestTier::Max => &self.max_interest,
            InterestTier::High => &self.high_interest,
            InterestTier::Medium => &self.medium_interest,
            InterestTier::Low => &self.low_interest,
            InterestTier::Ignore => &self.ignore_interest,
        }
    }

    /// First tier with a topic matching `text`
    pub fn match_tier(&self, text: &str) -> Option<InterestTier> {
        let text = text.to_lowercase();
        InterestTier::ORDERED
            .into_iter()
            .find(|tier| self.topics(*tier).iter().any(|t| topic_matches(t, &text)))
    }

    /// Interest score for an article's title and description
    pub fn score(&self, title: &str, description: &str) -> f64 {
        self.match_tier(&format!("{title} {description}"))
            .map(InterestTier::score)
            .unwrap_or(NEUTRAL_INTEREST)
    }

    /// Render the profile as prompt context for the judge
    pub fn format_for_prompt(&self) -> String {
        let mut lines = Vec::new();
        if !self.summary.trim().is_empty() {
            lines.push(self.summary.trim().to_string());
            lines.push(String::new());
        }
        let sections = [
            ("Top priority topics", &self.max_interest),
            ("Strong interest", &self.high_interest),
            ("Moderate interest", &self.medium_interest),
            ("Low priority", &self.low_interest),
            ("Not interested", &self.ignore_interest),
        ];
        for (heading, topics) in sections {
            if topics.is_empty() {
                continue;
            }
            lines.push(format!("**{heading}**:"));
            lines.extend(topics.iter().map(|t| format!("- {t}")));
            lines.push(String::new());
        }
        lines.join("\n").trim().to_string()
    }
}

/// Lowercased keywords of a topic label
///
/// The text before the first parenthesis plus the items of the last
/// (innermost when nested) parenthetical.
pub fn topic_keywords(topic: &str) -> Vec<String> {
    let main_end = topic.find(['(', '（']).unwrap_or(topic.len());
    let mut keywords = vec![topic[..main_end].trim().to_lowercase()];

    if let Some(cap) = PAREN_REGEX.captures_iter(topic).last() {
        keywords.extend(
            SEPARATOR_REGEX
                .split(&cap[1])
                .map(|k| k.trim().to_lowercase()),
        );
    }

    keywords.retain(|k| !k.is_empty());
    keywords
}

/// `text` must already be lowercased
fn topic_matches(topic: &str, text: &str) -> bool {
    topic_keywords(topic).iter().any(|k| text.contains(k.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> InterestProfile {
        InterestProfile {
            summary: "Backend engineer".to_string(),
            max_interest: vec!["AI/ML（大規模言語モデル、RAG）".to_string()],
            high_interest: vec!["Rust (async, tokio)".to_string()],
            medium_interest: vec!["Kubernetes".to_string()],
            low_interest: vec!["Frontend (React，Vue)".to_string()],
            ignore_interest: vec!["Gaming".to_string()],
        }
    }

    #[test]
    fn test_topic_keywords() {
        assert_eq!(
            topic_keywords("AI/ML（大規模言語モデル、RAG）"),
            vec!["ai/ml", "大規模言語モデル", "rag"]
        );
        assert_eq!(topic_keywords("Rust (async, tokio)"), vec!["rust", "async", "tokio"]);
        assert_eq!(topic_keywords("Frontend (React，Vue)"), vec!["frontend", "react", "vue"]);
        assert_eq!(topic_keywords("Kubernetes"), vec!["kubernetes"]);
        assert_eq!(
            topic_keywords("Cloud (AWS) and Infra (Terraform, Pulumi)"),
            vec!["cloud", "terraform", "pulumi"]
        );
        assert_eq!(topic_keywords("DB (SQL (Postgres))"), vec!["db", "postgres"]);
    }

    #[test]
    fn test_tiers_checked_in_order() {
        let p = profile();
        assert_eq!(p.score("Building RAG pipelines", ""), 100.0);
        assert_eq!(p.score("Tokio internals", "and some gaming"), 85.0);
        assert_eq!(p.score("kubernetes operators", ""), 70.0);
        assert_eq!(p.score("VUE 4 released", ""), 50.0);
        assert_eq!(p.score("Gaming news", ""), 0.0);
    }

    #[test]
    fn test_no_match_is_neutral() {
        let p = profile();
        assert_eq!(p.score("Gardening tips", "tomatoes"), NEUTRAL_INTEREST);
        assert_ne!(NEUTRAL_INTEREST, InterestTier::Max.score());
        assert_ne!(NEUTRAL_INTEREST, InterestTier::Ignore.score());
    }

    #[test]
    fn test_format_for_prompt() {
        let text = profile().format_for_prompt();
        assert!(text.starts_with("Backend engineer"));
        assert!(text.contains("- Kubernetes"));
    }
}
