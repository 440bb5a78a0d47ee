//! Judgment cache and run history
//!
//! Both are collaborators behind traits so the pipeline can run against a
//! file-backed store locally or anything else that honors the contract:
//! - `JudgmentCache`: get / put / batch_exists keyed by article URL
//! - `RunHistory`: append-only log of execution summaries

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::judgment::Judgment;
use crate::summary::ExecutionSummary;

/// Errors from cache and history stores
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store data is malformed: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Cache key for an article URL: `URL#` plus the first 16 hex digits of its SHA-256
pub fn cache_key(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    format!("URL#{}", &format!("{:x}", hasher.finalize())[..16])
}

/// Store of past judgments
#[async_trait]
pub trait JudgmentCache: Send + Sync {
    async fn get(&self, url: &str) -> Result<Option<Judgment>, StoreError>;

    async fn put(&self, judgment: &Judgment) -> Result<(), StoreError>;

    /// Which of `urls` already have a judgment
    async fn batch_exists(&self, urls: &[String]) -> Result<HashMap<String, bool>, StoreError>;
}

pub type SharedCache = Arc<dyn JudgmentCache>;

/// Append-only log of run summaries
#[async_trait]
pub trait RunHistory: Send + Sync {
    async fn append(&self, summary: &ExecutionSummary) -> Result<(), StoreError>;
}

pub type SharedHistory = Arc<dyn RunHistory>;

/// Concurrent in-memory judgment cache, optionally persisted as a JSON file
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: DashMap<String, Judgment>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a cache file; a missing file yields an empty cache
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let cache = Self::new();
        if !path.exists() {
            debug!("No cache file at {}, starting empty", path.display());
            return Ok(cache);
        }
        let content = fs::read_to_string(path)?;
        let judgments: Vec<Judgment> = serde_json::from_str(&content)?;
        for judgment in judgments {
            cache.insert(judgment);
        }
        info!("Loaded {} cached judgments from {}", cache.len(), path.display());
        Ok(cache)
    }

    /// Write every judgment to `path`, ordered by URL
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let mut judgments: Vec<Judgment> =
            self.entries.iter().map(|e| e.value().clone()).collect();
        judgments.sort_by(|a, b| a.url.cmp(&b.url));
        fs::write(path, serde_json::to_string_pretty(&judgments)?)?;
        info!("Saved {} cached judgments to {}", judgments.len(), path.display());
        Ok(())
    }

    pub fn insert(&self, judgment: Judgment) {
        self.entries.insert(cache_key(&judgment.url), judgment);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl JudgmentCache for InMemoryCache {
    async fn get(&self, url: &str) -> Result<Option<Judgment>, StoreError> {
        Ok(self.entries.get(&cache_key(url)).map(|e| e.value().clone()))
    }

    async fn put(&self, judgment: &Judgment) -> Result<(), StoreError> {
        self.insert(judgment.clone());
        debug!("Cached judgment for {}", judgment.url);
        Ok(())
    }

    async fn batch_exists(&self, urls: &[String]) -> Result<HashMap<String, bool>, StoreError> {
        Ok(urls
            .iter()
            .map(|url| (url.clone(), self.entries.contains_key(&cache_key(url))))
            .collect())
    }
}

/// One history line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub pk: String,
    pub sk: String,
    pub summary: ExecutionSummary,
}

impl From<&ExecutionSummary> for HistoryRecord {
    fn from(summary: &ExecutionSummary) -> Self {
        Self {
            pk: summary.run_key(),
            sk: format!("SUMMARY#{}", summary.executed_at.to_rfc3339()),
            summary: summary.clone(),
        }
    }
}

/// Run history stored as JSON lines
#[derive(Debug)]
pub struct JsonlHistory {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back every record in file order
    pub fn read_all(&self) -> Result<Vec<HistoryRecord>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        fs::read_to_string(&self.path)?
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).map_err(StoreError::from))
            .collect()
    }
}

#[async_trait]
impl RunHistory for JsonlHistory {
    async fn append(&self, summary: &ExecutionSummary) -> Result<(), StoreError> {
        let mut line = serde_json::to_string(&HistoryRecord::from(summary))?;
        line.push('\n');
        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        debug!("Appended run {} to {}", summary.run_id, self.path.display());
        Ok(())
    }
}
