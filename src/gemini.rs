use crate::error::Error;
use crate::settings::Settings;
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens", skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

/// One response record: a full body for the single-shot endpoint, or one
/// element of the record stream for the streaming endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateRecord {
    pub candidates: Option<Vec<Candidate>>,
    #[serde(rename = "promptFeedback")]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<ResponseContent>,
    #[serde(rename = "finishReason")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponsePart {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PromptFeedback {
    #[serde(rename = "blockReason")]
    pub block_reason: Option<String>,
}

impl GenerateRecord {
    /// Every text delta carried by this record, in order.
    pub fn deltas(&self) -> impl Iterator<Item = &str> {
        self.candidates
            .iter()
            .flatten()
            .filter_map(|candidate| candidate.content.as_ref())
            .flat_map(|content| content.parts.iter())
            .map(|part| part.text.as_str())
    }

    /// True when a candidate reports the model's natural stop.
    pub fn is_stop(&self) -> bool {
        self.candidates
            .iter()
            .flatten()
            .filter_map(|candidate| candidate.finish_reason.as_deref())
            .any(|reason| reason.eq_ignore_ascii_case("stop"))
    }

    pub fn block_reason(&self) -> Option<&str> {
        self.prompt_feedback.as_ref()?.block_reason.as_deref()
    }
}

pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(settings: &Settings) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: settings.generation_base_url.trim_end_matches('/').to_string(),
            api_key: settings.generation_api_key.clone(),
            model: settings.generation_model.clone(),
        }
    }

    fn require_key(&self) -> Result<(), Error> {
        if self.api_key.trim().is_empty() {
            return Err(Error::Configuration(
                "generation API key is not set".to_string(),
            ));
        }
        Ok(())
    }

    fn request_body(prompt: &str) -> GenerateRequest {
        GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.4,
                max_output_tokens: Some(8192),
            },
        }
    }

    /// Start a streaming generation. The returned response body is the
    /// chunked record stream; the caller drives it through the assembler.
    pub async fn stream_generate(&self, prompt: &str) -> Result<reqwest::Response, Error> {
        self.require_key()?;

        let url = format!(
            "{}/v1beta/models/{}:streamGenerateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        debug!("Starting streaming generation with model {}", self.model);

        let response = self
            .http
            .post(&url)
            .json(&Self::request_body(prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::Transport(format!(
                "generation request failed with status {}: {}",
                status, error_text
            )));
        }

        Ok(response)
    }

    /// Single-shot generation, used when the stream dies before producing
    /// anything usable.
    pub async fn generate(&self, prompt: &str) -> Result<GenerateRecord, Error> {
        self.require_key()?;

        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        debug!("Starting single-shot generation with model {}", self.model);

        let response = self
            .http
            .post(&url)
            .json(&Self::request_body(prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::Transport(format!(
                "generation request failed with status {}: {}",
                status, error_text
            )));
        }

        let record: GenerateRecord = response
            .json()
            .await
            .map_err(|e| Error::MalformedResponse(format!("generation body: {}", e)))?;

        if let Some(reason) = record.block_reason() {
            return Err(Error::MalformedResponse(format!(
                "generation blocked: {}",
                reason
            )));
        }

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_uses_wire_names() {
        let body = serde_json::to_value(GeminiClient::request_body("summarize this")).unwrap();
        assert_eq!(body["contents"][0]["parts"][0]["text"], "summarize this");
        assert!(body.get("generationConfig").is_some());
        assert!(body["generationConfig"].get("maxOutputTokens").is_some());
    }

    #[test]
    fn test_deltas_in_order() {
        let record: GenerateRecord = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "one "}, {"text": "two"}]}}]}"#,
        )
        .unwrap();
        let text: String = record.deltas().collect();
        assert_eq!(text, "one two");
        assert!(!record.is_stop());
    }

    #[test]
    fn test_stop_is_case_insensitive() {
        let record: GenerateRecord = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": []}, "finishReason": "STOP"}]}"#,
        )
        .unwrap();
        assert!(record.is_stop());
    }

    #[test]
    fn test_record_without_parts() {
        let record: GenerateRecord =
            serde_json::from_str(r#"{"candidates": [{"finishReason": "STOP"}]}"#).unwrap();
        assert_eq!(record.deltas().count(), 0);
        assert!(record.is_stop());
    }

    #[test]
    fn test_blocked_prompt() {
        let record: GenerateRecord =
            serde_json::from_str(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap();
        assert_eq!(record.block_reason(), Some("SAFETY"));
        assert_eq!(record.deltas().count(), 0);
    }
}
