//! Judgment labels and results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::MAX_REASON_CHARS;

/// How much the reader should care about an article
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InterestLabel {
    /// Read now
    ActNow,
    /// Useful for design decisions
    Think,
    /// Good to know
    Fyi,
    /// Not interesting; excluded from the final selection
    Ignore,
}

impl InterestLabel {
    /// Urgency rank; lower sorts first
    pub fn priority(self) -> u8 {
        match self {
            InterestLabel::ActNow => 0,
            InterestLabel::Think => 1,
            InterestLabel::Fyi => 2,
            InterestLabel::Ignore => 3,
        }
    }
}

/// How much an article is being talked about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuzzLabel {
    High,
    Mid,
    Low,
}

impl BuzzLabel {
    /// Popularity rank; lower sorts first
    pub fn priority(self) -> u8 {
        match self {
            BuzzLabel::High => 0,
            BuzzLabel::Mid => 1,
            BuzzLabel::Low => 2,
        }
    }
}

/// Result of judging one article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Judgment {
    pub url: String,
    pub interest_label: InterestLabel,
    pub buzz_label: BuzzLabel,
    /// 0.0 - 1.0
    pub confidence: f64,
    pub reason: String,
    pub model_id: String,
    pub judged_at: DateTime<Utc>,
}

impl Judgment {
    pub fn new(
        url: impl Into<String>,
        interest_label: InterestLabel,
        buzz_label: BuzzLabel,
        confidence: f64,
        reason: &str,
        model_id: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            interest_label,
            buzz_label,
            confidence: confidence.clamp(0.0, 1.0),
            reason: reason.chars().take(MAX_REASON_CHARS).collect(),
            model_id: model_id.into(),
            judged_at: Utc::now(),
        }
    }

    pub fn with_judged_at(mut self, judged_at: DateTime<Utc>) -> Self {
        self.judged_at = judged_at;
        self
    }

    /// Lowest-category judgment substituted when the judge fails
    pub fn fallback(url: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self::new(
            url,
            InterestLabel::Ignore,
            BuzzLabel::Low,
            0.0,
            "LLM judgment failed",
            model_id,
        )
    }
}
