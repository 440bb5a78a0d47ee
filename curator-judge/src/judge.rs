//! Article judge
//!
//! Asks the LLM for an interest label, a buzz label, a confidence and a short
//! reason per article. Malformed answers are retried with a linear backoff;
//! backend errors are not. Every input gets a judgment: failures become the
//! lowest-category fallback and are counted.

use async_trait::async_trait;
use curator_core::{Article, BuzzLabel, InterestLabel, InterestProfile, Judgment, SharedCache};
use futures::stream::{self, StreamExt};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{LlmError, SharedBackend};

/// Markdown code fence around the whole answer
static FENCE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^```[A-Za-z]*\s*(.*?)\s*```$").unwrap());

const JUDGE_SYSTEM_PROMPT: &str = r#"
You are a senior software engineer triaging technical articles for a reader with the interest profile below.

# Interest profile
{profile}

# Labels
interest_label:
- ACT_NOW: read now, urgent or directly relevant
- THINK: useful input for design and technology decisions
- FYI: good general awareness
- IGNORE: outside the reader's interests

buzz_label:
- HIGH: widely discussed among engineers
- MID: some attention
- LOW: little attention

confidence: 0.0 to 1.0
reason: one or two sentences, at most 200 characters

# Output
Answer with a single JSON object and nothing else:
{"interest_label": "ACT_NOW" | "THINK" | "FYI" | "IGNORE", "buzz_label": "HIGH" | "MID" | "LOW", "confidence": 0.85, "reason": "..."}
"#;

#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("LLM backend failed: {0}")]
    Backend(#[from] LlmError),

    #[error("Malformed judgment: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgeConfig {
    /// Extra attempts after a malformed answer
    pub max_retries: u32,
    /// Articles judged at once
    pub concurrency: usize,
    /// Backoff unit; attempt `n` waits `n * retry_backoff_secs`
    pub retry_backoff_secs: f64,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            concurrency: 5,
            retry_backoff_secs: 1.0,
        }
    }
}

/// Judgments in input order plus how many were fallbacks
#[derive(Debug, Clone, Default)]
pub struct JudgmentBatch {
    pub judgments: Vec<Judgment>,
    pub failed_count: usize,
}

#[async_trait]
pub trait ArticleJudge: Send + Sync {
    /// One judgment per article, in input order
    async fn judge_batch(&self, articles: &[Article]) -> JudgmentBatch;

    fn model_id(&self) -> &str;
}

pub type SharedJudge = Arc<dyn ArticleJudge>;

/// The fields the model must answer with
#[derive(Debug, Deserialize)]
struct Verdict {
    interest_label: InterestLabel,
    buzz_label: BuzzLabel,
    confidence: f64,
    reason: String,
}

pub struct LlmJudge {
    backend: SharedBackend,
    system_prompt: String,
    cache: Option<SharedCache>,
    config: JudgeConfig,
}

impl LlmJudge {
    pub fn new(backend: SharedBackend, profile: &InterestProfile, config: JudgeConfig) -> Self {
        Self {
            backend,
            system_prompt: JUDGE_SYSTEM_PROMPT.replace("{profile}", &profile.format_for_prompt()),
            cache: None,
            config,
        }
    }

    /// Write successful judgments to `cache`
    pub fn with_cache(mut self, cache: SharedCache) -> Self {
        self.cache = Some(cache);
        self
    }

    async fn judge_one(&self, article: &Article) -> Result<Judgment, JudgeError> {
        let prompt = article_prompt(article);
        let mut attempt = 0;
        loop {
            let answer = self.backend.generate(&self.system_prompt, &prompt).await?;
            match parse_verdict(&answer) {
                Ok(verdict) => {
                    let judgment = Judgment::new(
                        &article.url,
                        verdict.interest_label,
                        verdict.buzz_label,
                        verdict.confidence,
                        &verdict.reason,
                        self.backend.model_name(),
                    );
                    debug!(
                        "Judged {}: {:?}/{:?}",
                        article.url, judgment.interest_label, judgment.buzz_label
                    );
                    return Ok(judgment);
                }
                Err(e) if attempt < self.config.max_retries => {
                    attempt += 1;
                    warn!("Retrying {} (attempt {}): {}", article.url, attempt, e);
                    let backoff = self.config.retry_backoff_secs * f64::from(attempt);
                    tokio::time::sleep(Duration::from_secs_f64(backoff.max(0.0))).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl ArticleJudge for LlmJudge {
    async fn judge_batch(&self, articles: &[Article]) -> JudgmentBatch {
        info!("Judging {} articles with {}", articles.len(), self.backend.model_name());

        let pending: Vec<_> = articles.iter().map(|article| self.judge_one(article)).collect();
        let results: Vec<Result<Judgment, JudgeError>> = stream::iter(pending)
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;

        let mut batch = JudgmentBatch::default();
        for (article, result) in articles.iter().zip(results) {
            match result {
                Ok(judgment) => {
                    if let Some(cache) = &self.cache {
                        if let Err(e) = cache.put(&judgment).await {
                            error!("Cache write failed for {}: {}", article.url, e);
                        }
                    }
                    batch.judgments.push(judgment);
                }
                Err(e) => {
                    warn!("Judgment failed for {}: {}", article.url, e);
                    batch.failed_count += 1;
                    batch
                        .judgments
                        .push(Judgment::fallback(&article.url, self.backend.model_name()));
                }
            }
        }

        info!(
            "Judgment complete: {} ok, {} failed",
            batch.judgments.len() - batch.failed_count,
            batch.failed_count
        );
        batch
    }

    fn model_id(&self) -> &str {
        self.backend.model_name()
    }
}

fn article_prompt(article: &Article) -> String {
    format!(
        "Title: {}\nURL: {}\nSource: {}\nDescription: {}",
        article.title, article.url, article.source_name, article.description
    )
}

fn parse_verdict(answer: &str) -> Result<Verdict, JudgeError> {
    let trimmed = answer.trim();
    let json = FENCE_REGEX
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map_or(trimmed, |m| m.as_str());
    serde_json::from_str(json).map_err(|e| JudgeError::Parse(e.to_string()))
}
