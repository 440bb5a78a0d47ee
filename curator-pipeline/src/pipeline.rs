//! Pipeline runner
//!
//! normalize -> dedup -> score -> candidates -> judge -> final -> history
//!
//! Collaborator failures are absorbed by the stages themselves; the run
//! only refuses to start without a judge when one is needed.
//!
//! A dry run still judges and selects when a judge is attached but records
//! no history. Without a judge it stops after candidate selection.

use curator_core::{Article, ExecutionSummary, Judgment, RawArticle, SharedCache, SharedHistory};
use curator_judge::SharedJudge;
use serde::Serialize;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
    count_occurrences, CandidateSelector, ConfigError, CuratorConfig, Deduplicator,
    FinalSelector, Normalizer, RelevanceScorer, SharedPopularity,
};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("No judge configured for a non-dry run")]
    MissingJudge,
}

/// Outcome of one run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub summary: ExecutionSummary,
    /// Articles sent (or, without a judge, eligible) for judgment
    pub candidates: Vec<Article>,
    /// Final picks; empty when no judge is attached
    pub selected: Vec<Judgment>,
}

pub struct Pipeline {
    normalizer: Normalizer,
    dedup: Deduplicator,
    scorer: RelevanceScorer,
    candidates: CandidateSelector,
    final_selector: FinalSelector,
    judge: Option<SharedJudge>,
    history: Option<SharedHistory>,
}

impl Pipeline {
    pub fn new(
        scorer: RelevanceScorer,
        candidates: CandidateSelector,
        final_selector: FinalSelector,
    ) -> Self {
        Self {
            normalizer: Normalizer::new(),
            dedup: Deduplicator::default(),
            scorer,
            candidates,
            final_selector,
            judge: None,
            history: None,
        }
    }

    /// Scorer and selectors as configured, popularity from `popularity`
    pub fn from_config(config: &CuratorConfig, popularity: SharedPopularity) -> Result<Self, ConfigError> {
        let scorer = RelevanceScorer::new(config.interests.clone(), config.registry()?, popularity);
        let selection = &config.selection;
        Ok(Self::new(
            scorer,
            CandidateSelector::new(selection.max_candidates),
            FinalSelector::new(selection.max_final, selection.max_per_domain),
        ))
    }

    /// Skip already-judged articles
    pub fn with_cache(mut self, cache: SharedCache) -> Self {
        self.dedup = Deduplicator::new(Some(cache));
        self
    }

    pub fn with_judge(mut self, judge: SharedJudge) -> Self {
        self.judge = Some(judge);
        self
    }

    pub fn with_history(mut self, history: SharedHistory) -> Self {
        self.history = Some(history);
        self
    }

    /// Run every stage over `raw`
    ///
    /// A dry run appends no history; without a judge it stops after
    /// candidate selection.
    pub async fn run(&self, raw: &[RawArticle], dry_run: bool) -> Result<RunReport, PipelineError> {
        let judge = match (&self.judge, dry_run) {
            (Some(judge), _) => Some(judge),
            (None, true) => None,
            (None, false) => return Err(PipelineError::MissingJudge),
        };

        let started = Instant::now();
        let mut summary = ExecutionSummary::start(dry_run);
        info!("Run {} started (dry run: {})", summary.run_id, dry_run);

        summary.collected_count = raw.len();
        let normalized = self.normalizer.normalize(raw);
        summary.normalized_count = normalized.len();
        let occurrences = count_occurrences(&normalized);

        let deduped = self.dedup.deduplicate(normalized).await;
        summary.deduped_count = deduped.unique.len();
        summary.duplicate_count = deduped.duplicate_count;
        summary.cache_hit_count = deduped.cached_count;

        let scores = self
            .scorer
            .calculate_scores_with_occurrences(&deduped.unique, &occurrences)
            .await;
        let selection = self.candidates.select(&deduped.unique, &scores);
        summary.candidate_count = selection.candidates.len();

        let selected = match judge {
            Some(judge) => {
                let batch = judge.judge_batch(&selection.candidates).await;
                summary.judged_count = batch.judgments.len();
                summary.judgment_failed_count = batch.failed_count;
                let selected = self.final_selector.select(&batch.judgments);
                if selected.is_empty() {
                    warn!("No articles selected");
                }
                selected
            }
            None => {
                info!("No judge: stopping after {} candidates", selection.candidates.len());
                Vec::new()
            }
        };
        summary.final_selected_count = selected.len();

        summary.execution_time_seconds = started.elapsed().as_secs_f64();
        if !dry_run {
            if let Some(history) = &self.history {
                if let Err(e) = history.append(&summary).await {
                    error!("Failed to record run {}: {}", summary.run_id, e);
                }
            }
        }

        info!(
            "Run {} finished: {} collected, {} candidates, {} selected in {:.1}s",
            summary.run_id,
            summary.collected_count,
            summary.candidate_count,
            summary.final_selected_count,
            summary.execution_time_seconds
        );
        Ok(RunReport {
            summary,
            candidates: selection.candidates,
            selected,
        })
    }
}
