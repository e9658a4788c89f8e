use crate::error::Error;
use crate::settings::Settings;
use log::debug;
use serde::Deserialize;

/// One caption unit as the transcript provider returns it.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TranscriptItem {
    #[serde(default)]
    pub text: String,
    #[serde(rename = "startTimeText", default)]
    pub start_time_text: String,
    #[serde(rename = "startMs", default)]
    pub start_ms: u64,
    #[serde(rename = "endMs", default)]
    pub end_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct TranscriptResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub credits_remaining: Option<u64>,
    #[serde(default)]
    pub transcript: Vec<TranscriptItem>,
}

pub struct TranscriptClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl TranscriptClient {
    pub fn new(settings: &Settings) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: settings.transcript_base_url.trim_end_matches('/').to_string(),
            api_key: settings.transcript_api_key.clone(),
        }
    }

    /// Fetch the caption list for a canonical video URL.
    pub async fn fetch(&self, video_url: &str) -> Result<TranscriptResponse, Error> {
        if self.api_key.trim().is_empty() {
            return Err(Error::Configuration(
                "transcript API key is not set".to_string(),
            ));
        }

        let url = format!("{}/transcript", self.base_url);
        debug!("Fetching transcript from: {}", url);

        let response = self
            .http
            .get(&url)
            .query(&[("url", video_url), ("text", "false")])
            .header("x-api-key", &self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            return Err(Error::Transport(format!(
                "transcript request failed with status {}: {}",
                status, error_text
            )));
        }

        let parsed: TranscriptResponse = response
            .json()
            .await
            .map_err(|e| Error::MalformedResponse(format!("transcript body: {}", e)))?;

        if !parsed.success {
            return Err(Error::MalformedResponse(
                "transcript provider reported failure".to_string(),
            ));
        }

        debug!(
            "Fetched transcript: {} items, credits remaining: {:?}",
            parsed.transcript.len(),
            parsed.credits_remaining
        );

        Ok(parsed)
    }
}
