use crate::error::Error;
use crate::settings::Settings;
use log::debug;
use reqwest::header::AUTHORIZATION;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    voice: &'a str,
}

/// Client for the narration provider: one POST, binary audio back.
pub struct NarrationClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    voice: String,
}

impl NarrationClient {
    pub fn new(settings: &Settings) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: settings.narration_base_url.trim_end_matches('/').to_string(),
            api_key: settings.narration_api_key.clone(),
            voice: settings.voice.clone(),
        }
    }

    /// Synthesize speech for the given text, returning the raw audio payload.
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>, Error> {
        if self.api_key.trim().is_empty() {
            return Err(Error::Configuration(
                "narration API key is not set".to_string(),
            ));
        }

        let url = format!("{}/audio/speech", self.base_url);
        debug!("Requesting narration from {} (voice: {})", url, self.voice);

        let response = self
            .http
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&SpeechRequest {
                text,
                voice: &self.voice,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::Transport(format!(
                "narration request failed with status {}: {}",
                status, error_text
            )));
        }

        let payload = response.bytes().await?.to_vec();
        if payload.is_empty() {
            return Err(Error::MalformedResponse(
                "narration payload was empty".to_string(),
            ));
        }

        debug!("Received narration payload ({} bytes)", payload.len());
        Ok(payload)
    }
}
