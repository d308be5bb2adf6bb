use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::models::label::PromptSpec;
use crate::services::inference::{Inference, InferenceInput};

/// Sentinel label the prompts are instructed to answer when nothing applies.
/// Never surfaces in aggregated output.
pub const NO_MATCH_LABEL: &str = "other";

/// Input a whole prompt set is evaluated against.
#[derive(Debug, Clone)]
pub enum EvalInput {
    /// The derived caption, already lower-cased.
    Caption(String),
    /// The source media URL.
    Media(String),
}

impl EvalInput {
    fn as_inference_input(&self) -> InferenceInput<'_> {
        match self {
            EvalInput::Caption(caption) => InferenceInput::Text(caption),
            EvalInput::Media(url) => InferenceInput::Media(url),
        }
    }
}

/// Evaluates a prompt set by fanning out one inference task per prompt and
/// joining them all before returning.
///
/// A failed, unparsable, or timed-out task is logged and contributes zero
/// labels; siblings are unaffected and the evaluation itself never fails.
/// Result order is unspecified.
pub struct PromptEvaluator {
    inference: Arc<dyn Inference>,
    task_timeout: Duration,
}

impl PromptEvaluator {
    pub fn new(inference: Arc<dyn Inference>, task_timeout: Duration) -> Self {
        Self {
            inference,
            task_timeout,
        }
    }

    pub async fn evaluate(&self, prompts: &[PromptSpec], input: &EvalInput) -> Vec<String> {
        let mut tasks = JoinSet::new();

        for spec in prompts {
            let inference = Arc::clone(&self.inference);
            let content = spec.content.clone();
            let input = input.clone();
            let task_timeout = self.task_timeout;

            tasks.spawn(async move {
                let outcome = tokio::time::timeout(
                    task_timeout,
                    inference.invoke(&content, input.as_inference_input()),
                )
                .await;

                match outcome {
                    Ok(Ok(response)) => {
                        debug!(prompt = %content, label = %response.label, "prompt evaluated");
                        split_labels(&response.label)
                    }
                    Ok(Err(e)) => {
                        warn!(prompt = %content, error = %e, "prompt evaluation failed");
                        Vec::new()
                    }
                    Err(_) => {
                        warn!(prompt = %content, "prompt evaluation timed out");
                        Vec::new()
                    }
                }
            });
        }

        // Full join: every task lands its own result slot before the merge.
        let mut labels = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(partial) => labels.extend(partial),
                Err(e) => warn!(error = %e, "prompt task panicked"),
            }
        }
        labels
    }
}

/// Split a possibly comma-delimited label field, dropping empties and the
/// no-match sentinel.
fn split_labels(label: &str) -> Vec<String> {
    label
        .split(',')
        .filter(|l| !l.is_empty() && *l != NO_MATCH_LABEL)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio::time::Instant;

    use crate::models::label::LabelResponse;
    use crate::services::inference::InferenceError;

    /// Scripted backend: behavior is keyed on the prompt text.
    /// `"fail"` errors; `"slow <ms> <label>"` sleeps then answers; anything
    /// else answers with the prompt itself as the label.
    struct ScriptedInference;

    #[async_trait]
    impl Inference for ScriptedInference {
        async fn invoke(
            &self,
            prompt: &str,
            _input: InferenceInput<'_>,
        ) -> Result<LabelResponse, InferenceError> {
            if prompt == "fail" {
                return Err(InferenceError::EmptyResponse);
            }
            if let Some(rest) = prompt.strip_prefix("slow ") {
                let (ms, label) = rest.split_once(' ').unwrap();
                tokio::time::sleep(Duration::from_millis(ms.parse().unwrap())).await;
                return Ok(LabelResponse {
                    label: label.to_string(),
                });
            }
            Ok(LabelResponse {
                label: prompt.to_string(),
            })
        }
    }

    fn prompts(contents: &[&str]) -> Vec<PromptSpec> {
        contents
            .iter()
            .map(|c| PromptSpec {
                content: c.to_string(),
            })
            .collect()
    }

    fn evaluator() -> PromptEvaluator {
        PromptEvaluator::new(Arc::new(ScriptedInference), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn failed_task_does_not_abort_siblings() {
        let labels = evaluator()
            .evaluate(&prompts(&["action", "fail", "comedy"]), &EvalInput::Caption("c".into()))
            .await;

        let mut sorted = labels.clone();
        sorted.sort();
        assert_eq!(sorted, vec!["action", "comedy"]);
    }

    #[tokio::test]
    async fn all_failures_still_return_partial_results() {
        let labels = evaluator()
            .evaluate(&prompts(&["fail", "fail"]), &EvalInput::Media("gs://v".into()))
            .await;
        assert!(labels.is_empty());
    }

    #[tokio::test]
    async fn comma_delimited_labels_are_split_and_sentinel_dropped() {
        let labels = evaluator()
            .evaluate(&prompts(&["action,other,comedy"]), &EvalInput::Caption("c".into()))
            .await;
        assert_eq!(labels, vec!["action", "comedy"]);

        let labels = evaluator()
            .evaluate(&prompts(&["other"]), &EvalInput::Caption("c".into()))
            .await;
        assert!(labels.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn tasks_run_in_parallel_and_fully_join() {
        let start = Instant::now();
        let labels = evaluator()
            .evaluate(
                &prompts(&["slow 100 a", "slow 200 b", "slow 300 c"]),
                &EvalInput::Caption("c".into()),
            )
            .await;

        // Concurrent fan-out: bounded by the slowest task, not the sum.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(300));
        assert!(elapsed < Duration::from_millis(350));
        let mut sorted = labels.clone();
        sorted.sort();
        assert_eq!(sorted, vec!["a", "b", "c"]);
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_task_contributes_nothing() {
        let evaluator =
            PromptEvaluator::new(Arc::new(ScriptedInference), Duration::from_millis(50));
        let labels = evaluator
            .evaluate(
                &prompts(&["slow 1000 late", "fast"]),
                &EvalInput::Caption("c".into()),
            )
            .await;
        assert_eq!(labels, vec!["fast"]);
    }

    #[test]
    fn split_labels_keeps_order_and_drops_empties() {
        assert_eq!(split_labels("a,b"), vec!["a", "b"]);
        assert_eq!(split_labels("a,,b,other"), vec!["a", "b"]);
        assert!(split_labels("").is_empty());
        assert!(split_labels("other").is_empty());
    }
}
