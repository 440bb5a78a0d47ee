//! Per-run execution summary

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Statistics of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub run_id: Uuid,
    pub executed_at: DateTime<Utc>,
    pub collected_count: usize,
    pub normalized_count: usize,
    /// Articles left after URL dedup and cache filtering
    pub deduped_count: usize,
    pub duplicate_count: usize,
    pub cache_hit_count: usize,
    pub candidate_count: usize,
    pub judged_count: usize,
    pub judgment_failed_count: usize,
    pub final_selected_count: usize,
    pub dry_run: bool,
    pub execution_time_seconds: f64,
}

impl ExecutionSummary {
    /// Empty summary for a run starting now
    pub fn start(dry_run: bool) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            executed_at: Utc::now(),
            collected_count: 0,
            normalized_count: 0,
            deduped_count: 0,
            duplicate_count: 0,
            cache_hit_count: 0,
            candidate_count: 0,
            judged_count: 0,
            judgment_failed_count: 0,
            final_selected_count: 0,
            dry_run,
            execution_time_seconds: 0.0,
        }
    }

    /// History partition key, `RUN#<iso-year><iso-week>`
    pub fn run_key(&self) -> String {
        let week = self.executed_at.iso_week();
        format!("RUN#{:04}{:02}", week.year(), week.week())
    }
}
