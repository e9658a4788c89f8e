#![allow(dead_code)]

use recap::settings::Settings;
use recap::transcript::TranscriptItem;
use serde_json::{json, Value};

/// Settings with every provider pointed at the given mock server.
pub fn test_settings(base: &str) -> Settings {
    Settings {
        transcript_base_url: base.to_string(),
        transcript_api_key: "transcript-key".to_string(),
        generation_base_url: base.to_string(),
        generation_api_key: "generation-key".to_string(),
        narration_base_url: base.to_string(),
        narration_api_key: "narration-key".to_string(),
        ..Settings::default()
    }
}

pub fn items(texts: &[&str]) -> Vec<TranscriptItem> {
    texts
        .iter()
        .map(|text| TranscriptItem {
            text: text.to_string(),
            start_time_text: String::new(),
            start_ms: 0,
            end_ms: 0,
        })
        .collect()
}

/// One generation record in the provider's wire shape.
pub fn generation_record(text: &str, finish: Option<&str>) -> Value {
    let mut candidate = json!({
        "content": { "parts": [{ "text": text }] }
    });
    if let Some(reason) = finish {
        candidate["finishReason"] = Value::String(reason.to_string());
    }
    json!({ "candidates": [candidate] })
}

/// The streaming endpoint's body: a JSON array of records.
pub fn stream_body(records: &[Value]) -> String {
    Value::Array(records.to_vec()).to_string()
}

pub fn stream_path(settings: &Settings) -> String {
    format!(
        "/v1beta/models/{}:streamGenerateContent",
        settings.generation_model
    )
}

pub fn generate_path(settings: &Settings) -> String {
    format!(
        "/v1beta/models/{}:generateContent",
        settings.generation_model
    )
}
