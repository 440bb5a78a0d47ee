//! Feed sources and their authority
//!
//! Authority reflects how official a source is (vendor blogs and release
//! notes score highest) and feeds the authority component of the relevance
//! score.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Errors from source registry validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("Invalid source id {0:?}: use lowercase letters, digits and underscores")]
    InvalidId(String),

    #[error("Duplicate source id: {0}")]
    DuplicateId(String),

    #[error("Source {0} has an empty name")]
    EmptyName(String),
}

/// How authoritative a source is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorityLevel {
    Official,
    High,
    Medium,
    #[default]
    Low,
}

impl AuthorityLevel {
    pub fn score(self) -> f64 {
        match self {
            AuthorityLevel::Official => 100.0,
            AuthorityLevel::High => 80.0,
            AuthorityLevel::Medium => 50.0,
            AuthorityLevel::Low => 0.0,
        }
    }
}

/// One configured feed source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub source_id: String,
    pub name: String,
    pub feed_url: String,
    #[serde(default)]
    pub authority_level: AuthorityLevel,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Lookup of sources by display name
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    sources: Vec<SourceConfig>,
    by_name: HashMap<String, usize>,
}

impl SourceRegistry {
    /// Validate and index sources
    pub fn new(sources: Vec<SourceConfig>) -> Result<Self, SourceError> {
        let mut ids = HashSet::new();
        let mut by_name = HashMap::new();
        for (idx, source) in sources.iter().enumerate() {
            let valid_id = !source.source_id.is_empty()
                && source
                    .source_id
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
            if !valid_id {
                return Err(SourceError::InvalidId(source.source_id.clone()));
            }
            if !ids.insert(source.source_id.as_str()) {
                return Err(SourceError::DuplicateId(source.source_id.clone()));
            }
            if source.name.trim().is_empty() {
                return Err(SourceError::EmptyName(source.source_id.clone()));
            }
            by_name.entry(source.name.clone()).or_insert(idx);
        }
        Ok(Self { sources, by_name })
    }

    pub fn all(&self) -> &[SourceConfig] {
        &self.sources
    }

    pub fn enabled(&self) -> impl Iterator<Item = &SourceConfig> {
        self.sources.iter().filter(|s| s.enabled)
    }

    pub fn by_name(&self, name: &str) -> Option<&SourceConfig> {
        self.by_name.get(name).map(|&idx| &self.sources[idx])
    }

    /// Authority score for a source name; unknown sources score 0
    pub fn authority_score(&self, source_name: &str) -> f64 {
        self.by_name(source_name)
            .map(|s| s.authority_level.score())
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(id: &str, name: &str, level: AuthorityLevel) -> SourceConfig {
        SourceConfig {
            source_id: id.to_string(),
            name: name.to_string(),
            feed_url: format!("https://{id}.example.com/feed"),
            authority_level: level,
            enabled: true,
        }
    }

    #[test]
    fn test_authority_scores() {
        let registry = SourceRegistry::new(vec![
            source("aws_blog", "AWS Blog", AuthorityLevel::Official),
            source("hn", "Hacker News", AuthorityLevel::High),
            source("devto", "dev.to", AuthorityLevel::Medium),
            source("misc", "Misc", AuthorityLevel::Low),
        ])
        .unwrap();
        assert_eq!(registry.authority_score("AWS Blog"), 100.0);
        assert_eq!(registry.authority_score("Hacker News"), 80.0);
        assert_eq!(registry.authority_score("dev.to"), 50.0);
        assert_eq!(registry.authority_score("Misc"), 0.0);
        assert_eq!(registry.authority_score("Unknown"), 0.0);
    }

    #[test]
    fn test_validation() {
        assert_eq!(
            SourceRegistry::new(vec![source("Bad-Id", "x", AuthorityLevel::Low)]).unwrap_err(),
            SourceError::InvalidId("Bad-Id".to_string())
        );
        assert_eq!(
            SourceRegistry::new(vec![
                source("a", "A", AuthorityLevel::Low),
                source("a", "B", AuthorityLevel::Low),
            ])
            .unwrap_err(),
            SourceError::DuplicateId("a".to_string())
        );
    }

    #[test]
    fn test_enabled_filter() {
        let mut off = source("off", "Off", AuthorityLevel::High);
        off.enabled = false;
        let registry =
            SourceRegistry::new(vec![source("on", "On", AuthorityLevel::High), off]).unwrap();
        assert_eq!(registry.enabled().count(), 1);
    }
}
