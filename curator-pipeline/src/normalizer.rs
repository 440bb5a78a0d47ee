//! Raw record normalization
//!
//! Produces immutable `Article`s: canonical URL, plain-text title and
//! description, UTC timestamps. Records whose URL cannot be normalized are
//! dropped.

use chrono::Utc;
use curator_core::{normalize_url, Article, RawArticle, MAX_DESCRIPTION_CHARS};
use scraper::Html;
use tracing::{info, warn};

pub const EMPTY_TITLE: &str = "No Title";
pub const EMPTY_DESCRIPTION: &str = "No description";

#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer;

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn normalize(&self, raw: &[RawArticle]) -> Vec<Article> {
        let articles: Vec<Article> = raw.iter().filter_map(|r| self.normalize_one(r)).collect();
        info!("Normalized {} of {} articles", articles.len(), raw.len());
        articles
    }

    fn normalize_one(&self, raw: &RawArticle) -> Option<Article> {
        let normalized_url = match normalize_url(&raw.url) {
            Ok(url) => url,
            Err(e) => {
                warn!("Dropping article {:?}: {}", raw.url, e);
                return None;
            }
        };

        let title = plain_text(raw.title.as_deref().unwrap_or_default());
        let description: String = plain_text(raw.description.as_deref().unwrap_or_default())
            .chars()
            .take(MAX_DESCRIPTION_CHARS)
            .collect();
        let collected_at = raw.collected_at.unwrap_or_else(Utc::now);

        Some(Article {
            url: raw.url.trim().to_string(),
            normalized_url,
            title: non_empty(title, EMPTY_TITLE),
            description: non_empty(description.trim_end().to_string(), EMPTY_DESCRIPTION),
            source_name: raw.source_name.trim().to_string(),
            published_at: raw.published_at.unwrap_or(collected_at),
            collected_at,
        })
    }
}

/// Decode entities, strip tags and collapse whitespace
fn plain_text(input: &str) -> String {
    if !input.contains(['<', '&']) {
        return collapse_whitespace(input);
    }
    let fragment = Html::parse_fragment(input);
    let text: String = fragment.root_element().text().collect();
    collapse_whitespace(&text)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn non_empty(value: String, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value
    }
}
