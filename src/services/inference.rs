use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::config::AppConfig;
use crate::models::label::LabelResponse;

/// Input a prompt is evaluated against: the derived caption text, or the
/// source media by URL.
#[derive(Debug, Clone, Copy)]
pub enum InferenceInput<'a> {
    Text(&'a str),
    Media(&'a str),
}

/// The single operation the pipeline needs from the inference backend:
/// evaluate a prompt against an input and return the structured `{label}`
/// answer.
#[async_trait]
pub trait Inference: Send + Sync {
    async fn invoke(
        &self,
        prompt: &str,
        input: InferenceInput<'_>,
    ) -> Result<LabelResponse, InferenceError>;
}

/// Client for a Gemini-style generateContent REST API, constrained to a JSON
/// response schema of `{label: string}`.
pub struct GeminiClient {
    http: Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: String,
}

impl GeminiClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            http: Client::new(),
            endpoint: config.api_endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
        }
    }
}

#[async_trait]
impl Inference for GeminiClient {
    async fn invoke(
        &self,
        prompt: &str,
        input: InferenceInput<'_>,
    ) -> Result<LabelResponse, InferenceError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint, self.model
        );

        let input_part = match input {
            InferenceInput::Text(text) => serde_json::json!({ "text": text }),
            InferenceInput::Media(uri) => serde_json::json!({
                "file_data": { "file_uri": uri }
            }),
        };

        let request_body = serde_json::json!({
            "contents": [{
                "parts": [{ "text": prompt }, input_part]
            }],
            "generationConfig": {
                "temperature": self.temperature,
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "OBJECT",
                    "properties": { "label": { "type": "STRING" } },
                    "required": ["label"]
                }
            }
        });

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request_body)
            .send()
            .await
            .map_err(InferenceError::Http)?
            .error_for_status()
            .map_err(InferenceError::Http)?;

        let generated: GenerateResponse = response.json().await.map_err(InferenceError::Http)?;

        let text = generated
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.as_str())
            .ok_or(InferenceError::EmptyResponse)?;

        serde_json::from_str(text).map_err(InferenceError::Parse)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("model returned no candidates")]
    EmptyResponse,

    #[error("failed to parse model response as a label: {0}")]
    Parse(#[from] serde_json::Error),
}
