use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use tracing::{debug, error, info, warn};

use crate::models::job::JobRecord;
use crate::models::label::{MatchRule, PromptSpec};
use crate::services::inference::{Inference, InferenceError, InferenceInput};
use crate::services::matching;
use crate::services::prompts::{EvalInput, PromptEvaluator, NO_MATCH_LABEL};
use crate::services::queue::QueuedJob;
use crate::services::store::{DocumentStore, StoreError, JOB_COLLECTION};

/// Fixed instruction used to derive the caption from the source media.
const CAPTION_PROMPT: &str = "Extract a single-line transcript of the video, \
     punctuated, preserving the original language.";

/// Merge label contributions from the rule matcher and both prompt sets.
///
/// Aggregation is concatenation, not deduplication: the rule matcher already
/// dedupes per rule and the evaluator per prompt, so duplicates across
/// sources persist. The no-match sentinel never survives aggregation.
pub fn aggregate_labels<I>(sources: I) -> Vec<String>
where
    I: IntoIterator<Item = Vec<String>>,
{
    sources
        .into_iter()
        .flatten()
        .filter(|label| label != NO_MATCH_LABEL)
        .collect()
}

/// Owns the end-to-end processing of one job: caption fetch, rule matching,
/// two concurrent prompt-set evaluations, aggregation, and exactly one
/// terminal write.
pub struct Pipeline {
    store: Arc<dyn DocumentStore>,
    inference: Arc<dyn Inference>,
    evaluator: PromptEvaluator,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        inference: Arc<dyn Inference>,
        task_timeout: Duration,
    ) -> Self {
        let evaluator = PromptEvaluator::new(Arc::clone(&inference), task_timeout);
        Self {
            store,
            inference,
            evaluator,
        }
    }

    /// Run a queued job to a terminal state and persist it. Never returns an
    /// error: fatal step failures are captured on the record as
    /// `status=failed`, and a failed terminal write is surfaced via logging
    /// only. Returns the terminal record as persisted.
    pub async fn run(&self, queued: QueuedJob) -> JobRecord {
        let started = Instant::now();
        info!(msg_id = %queued.msg_id, game = %queued.game, "job processing started");

        let msg_id = queued.msg_id;
        let mut record = JobRecord::queued(queued.game, queued.url, queued.lang, queued.extra);
        record.msg_id = Some(msg_id.clone());

        match self.execute(&record).await {
            Ok(labels) => {
                record.mark_done(labels, started.elapsed());
                metrics::counter!("label_jobs_completed").increment(1);
                info!(
                    msg_id = %msg_id,
                    labels = record.labels.len(),
                    spend_time = record.spend_time.as_deref().unwrap_or(""),
                    "job done"
                );
            }
            Err(e) => {
                record.mark_failed(e.to_string(), started.elapsed());
                metrics::counter!("label_jobs_failed").increment(1);
                warn!(msg_id = %msg_id, error = %e, "job failed");
            }
        }
        metrics::histogram!("label_processing_seconds").record(started.elapsed().as_secs_f64());

        self.persist(&msg_id, &record).await;
        record
    }

    /// Steps 1-5: everything up to (but not including) the terminal write.
    async fn execute(&self, job: &JobRecord) -> Result<Vec<String>, PipelineError> {
        // 1. Derive the caption once; all text matching runs on it.
        let caption = self.fetch_caption(&job.url).await?;
        debug!(caption = %caption, "caption fetched");

        // 2. Substring rule matching, scoped by game.
        let rules: Vec<MatchRule> = self
            .load_collection(&format!("{}_match", job.game))
            .await
            .map_err(PipelineError::LoadRules)?;
        let rule_labels = matching::match_labels(&caption, &rules);
        debug!(labels = ?rule_labels, "rule matching complete");

        // 3 + 4. Text prompts against the caption, media prompts against the
        // URL. Unordered relative to each other; each fully joins internally.
        let text_collection = format!("{}_{}_text_prompts", job.game, job.lang);
        let media_collection = format!("{}_{}_video_prompts", job.game, job.lang);
        let caption_input = EvalInput::Caption(caption);
        let media_input = EvalInput::Media(job.url.clone());

        let (text_labels, media_labels) = tokio::join!(
            self.eval_prompt_set(&text_collection, &caption_input),
            self.eval_prompt_set(&media_collection, &media_input),
        );
        let text_labels = text_labels?;
        let media_labels = media_labels?;

        // 5. Aggregate all contributions.
        Ok(aggregate_labels([rule_labels, text_labels, media_labels]))
    }

    async fn fetch_caption(&self, url: &str) -> Result<String, PipelineError> {
        let response = self
            .inference
            .invoke(CAPTION_PROMPT, InferenceInput::Media(url))
            .await
            .map_err(PipelineError::Caption)?;
        Ok(response.label.to_lowercase())
    }

    async fn eval_prompt_set(
        &self,
        collection: &str,
        input: &EvalInput,
    ) -> Result<Vec<String>, PipelineError> {
        let prompts: Vec<PromptSpec> =
            self.load_collection(collection)
                .await
                .map_err(|source| PipelineError::LoadPrompts {
                    collection: collection.to_string(),
                    source,
                })?;
        Ok(self.evaluator.evaluate(&prompts, input).await)
    }

    /// List a collection and parse its documents, logging and skipping any
    /// that do not fit the expected shape.
    async fn load_collection<T: DeserializeOwned>(
        &self,
        collection: &str,
    ) -> Result<Vec<T>, StoreError> {
        let docs = self.store.list(collection).await?;
        Ok(docs
            .into_iter()
            .filter_map(|doc| match serde_json::from_value(doc) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    warn!(collection = %collection, error = %e, "skipping malformed document");
                    None
                }
            })
            .collect())
    }

    /// The single terminal write. Failures are logged, not retried.
    async fn persist(&self, msg_id: &str, record: &JobRecord) {
        let data = match serde_json::to_value(record) {
            Ok(data) => data,
            Err(e) => {
                error!(msg_id = %msg_id, error = %e, "failed to serialize terminal job record");
                return;
            }
        };
        if let Err(e) = self.store.set(JOB_COLLECTION, msg_id, &data).await {
            error!(msg_id = %msg_id, error = %e, "failed to persist terminal job record");
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("failed to fetch caption: {0}")]
    Caption(#[source] InferenceError),

    #[error("failed to load match rules: {0}")]
    LoadRules(#[source] StoreError),

    #[error("failed to load prompt set {collection}: {source}")]
    LoadPrompts {
        collection: String,
        source: StoreError,
    },
}
