//! Run configuration
//!
//! One TOML file, every section optional:
//! - `[policy]` outbound request pacing, concurrency and retries
//! - `[net]` proxy and user agent
//! - `[selection]` candidate and final caps
//! - `[judge]` LLM provider, model and retry settings
//! - `[interests]` interest profile tiers
//! - `[[sources]]` feed sources and their authority

use curator_core::{InterestProfile, SourceConfig, SourceError, SourceRegistry};
use curator_judge::{JudgeConfig, Provider};
use curator_net::{NetConfig, PolicyConfig, MAX_JITTER_SECS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid source: {0}")]
    Source(#[from] SourceError),

    #[error("Invalid setting: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub max_candidates: usize,
    pub max_final: usize,
    pub max_per_domain: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            max_candidates: 150,
            max_final: 12,
            max_per_domain: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgeSection {
    pub provider: Provider,
    /// Provider default when unset
    pub model: Option<String>,
    pub max_retries: u32,
    pub concurrency: usize,
}

impl Default for JudgeSection {
    fn default() -> Self {
        let defaults = JudgeConfig::default();
        Self {
            provider: Provider::default(),
            model: None,
            max_retries: defaults.max_retries,
            concurrency: defaults.concurrency,
        }
    }
}

impl JudgeSection {
    pub fn judge_config(&self) -> JudgeConfig {
        JudgeConfig {
            max_retries: self.max_retries,
            concurrency: self.concurrency,
            ..JudgeConfig::default()
        }
    }

    pub fn model_name(&self) -> &str {
        self.model
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(self.provider.default_model())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CuratorConfig {
    pub policy: PolicyConfig,
    pub net: NetConfig,
    pub selection: SelectionConfig,
    pub judge: JudgeSection,
    pub interests: InterestProfile,
    pub sources: Vec<SourceConfig>,
}

impl CuratorConfig {
    /// Read, parse and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.policy;
        if p.domain_concurrency == 0 || p.total_concurrency == 0 {
            return Err(ConfigError::Invalid("policy concurrency must be at least 1".into()));
        }
        if !p.jitter_is_valid() {
            return Err(ConfigError::Invalid(format!(
                "policy jitter range {}..{} must be finite, ordered and within 0..={}",
                p.jitter_min_secs, p.jitter_max_secs, MAX_JITTER_SECS
            )));
        }
        if p.timeout_secs == 0 {
            return Err(ConfigError::Invalid("policy timeout_secs must be positive".into()));
        }

        let s = &self.selection;
        if s.max_candidates == 0 || s.max_final == 0 || s.max_per_domain == 0 {
            return Err(ConfigError::Invalid("selection caps must be at least 1".into()));
        }
        if self.judge.concurrency == 0 {
            return Err(ConfigError::Invalid("judge concurrency must be at least 1".into()));
        }

        self.registry()?;
        Ok(())
    }

    /// Indexed source list
    pub fn registry(&self) -> Result<SourceRegistry, ConfigError> {
        Ok(SourceRegistry::new(self.sources.clone())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curator_core::AuthorityLevel;

    const SAMPLE: &str = r#"
[policy]
total_concurrency = 2
retry_delays_secs = [1, 2]

[selection]
max_final = 10

[judge]
provider = "openrouter"
model = "openai/gpt-4o-mini"
max_retries = 1

[interests]
summary = "Platform engineer"
max_interest = ["Rust (async, tokio)"]
ignore_interest = ["Gossip"]

[[sources]]
source_id = "aws_blog"
name = "AWS Blog"
feed_url = "https://aws.amazon.com/blogs/aws/feed/"
authority_level = "official"

[[sources]]
source_id = "hn"
name = "Hacker News"
feed_url = "https://news.ycombinator.com/rss"
enabled = false
"#;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = CuratorConfig::from_toml_str("").unwrap();
        assert_eq!(config.policy, PolicyConfig::default());
        assert_eq!(config.selection, SelectionConfig::default());
        assert_eq!(config.judge.provider, Provider::Anthropic);
        assert_eq!(config.judge.max_retries, 2);
        assert_eq!(config.judge.concurrency, 5);
        assert!(config.sources.is_empty());
    }

    #[test]
    fn test_sample_config() {
        let config = CuratorConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.policy.total_concurrency, 2);
        assert_eq!(config.policy.domain_concurrency, 1);
        assert_eq!(config.policy.retry_delays_secs, vec![1, 2]);
        assert_eq!(config.selection.max_final, 10);
        assert_eq!(config.selection.max_candidates, 150);
        assert_eq!(config.judge.provider, Provider::OpenRouter);
        assert_eq!(config.judge.model_name(), "openai/gpt-4o-mini");
        assert_eq!(config.judge.judge_config().max_retries, 1);
        assert_eq!(config.interests.max_interest, vec!["Rust (async, tokio)"]);

        let registry = config.registry().unwrap();
        assert_eq!(registry.all().len(), 2);
        assert_eq!(registry.enabled().count(), 1);
        assert_eq!(
            registry.by_name("AWS Blog").map(|s| s.authority_level),
            Some(AuthorityLevel::Official)
        );
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let err = CuratorConfig::from_toml_str("[policy]\njitter_min_secs = 5.0\njitter_max_secs = 1.0")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        for jitter in ["jitter_max_secs = inf", "jitter_max_secs = nan", "jitter_max_secs = 1e20", "jitter_min_secs = -1.0"] {
            let err = CuratorConfig::from_toml_str(&format!("[policy]\n{jitter}")).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{jitter} accepted");
        }

        let err = CuratorConfig::from_toml_str("[selection]\nmax_per_domain = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = CuratorConfig::from_toml_str("[judge]\nprovider = \"bedrock\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_bad_source_id_rejected() {
        let toml = r#"
[[sources]]
source_id = "Bad-Id"
name = "x"
feed_url = "https://example.com/feed"
"#;
        let err = CuratorConfig::from_toml_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::Source(SourceError::InvalidId(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = CuratorConfig::load("/nonexistent/curator.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
