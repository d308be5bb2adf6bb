use serde::{Deserialize, Serialize};

/// A substring match rule: the label is awarded when any of its substrings
/// appears in the caption. Stored in the `{game}_match` collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchRule {
    pub label: String,
    pub match_rules: Vec<String>,
}

/// A natural-language instruction evaluated by the inference backend against
/// either the caption or the source media. Stored in the
/// `{game}_{lang}_text_prompts` and `{game}_{lang}_video_prompts` collections.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptSpec {
    pub content: String,
}

/// Structured answer the inference backend is constrained to return. The
/// `label` field may be a comma-delimited composite for multi-label answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelResponse {
    pub label: String,
}
