//! Article records
//!
//! `RawArticle` is what feed collection hands over; `Article` is the
//! normalized, immutable form every later pipeline stage works on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An article record as collected from a feed, before normalization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawArticle {
    /// Link as it appeared in the feed
    pub url: String,
    /// Title, possibly HTML-escaped
    #[serde(default)]
    pub title: Option<String>,
    /// Summary or description, possibly HTML
    #[serde(default)]
    pub description: Option<String>,
    /// Name of the feed source that produced this record
    pub source_name: String,
    /// Publication time reported by the feed
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    /// When the record was collected
    #[serde(default)]
    pub collected_at: Option<DateTime<Utc>>,
}

/// A normalized article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub url: String,
    /// Unique key after normalization
    pub normalized_url: String,
    pub title: String,
    pub description: String,
    pub source_name: String,
    pub published_at: DateTime<Utc>,
    pub collected_at: DateTime<Utc>,
}
