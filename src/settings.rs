use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

fn default_transcript_base_url() -> String {
    "https://api.supadata.ai/v1".to_string()
}

fn default_generation_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_generation_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_narration_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_voice() -> String {
    "alloy".to_string()
}

fn default_volume() -> f32 {
    1.0
}

/// Application settings.
///
/// API keys default to the empty string; a module that needs one converts
/// the empty value into a configuration error at the call site, before any
/// network I/O. Every field can be supplied from the settings file or
/// overridden through a `RECAP_*` environment variable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_transcript_base_url")]
    pub transcript_base_url: String,
    #[serde(default)]
    pub transcript_api_key: String,

    #[serde(default = "default_generation_base_url")]
    pub generation_base_url: String,
    #[serde(default)]
    pub generation_api_key: String,
    #[serde(default = "default_generation_model")]
    pub generation_model: String,

    #[serde(default = "default_narration_base_url")]
    pub narration_base_url: String,
    #[serde(default)]
    pub narration_api_key: String,
    #[serde(default = "default_voice")]
    pub voice: String,

    /// Output device name for playback; `None` means the default device.
    #[serde(default)]
    pub output_device: Option<String>,
    /// Playback volume; values outside 0.0..=2.0 are clamped by `normalized`.
    #[serde(default = "default_volume")]
    pub volume: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            transcript_base_url: default_transcript_base_url(),
            transcript_api_key: String::new(),
            generation_base_url: default_generation_base_url(),
            generation_api_key: String::new(),
            generation_model: default_generation_model(),
            narration_base_url: default_narration_base_url(),
            narration_api_key: String::new(),
            voice: default_voice(),
            output_device: None,
            volume: default_volume(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file, falling back to defaults when the
    /// file is absent, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, String> {
        let mut settings = if path.exists() {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| format!("Failed to read settings file {:?}: {}", path, e))?;
            serde_json::from_str(&raw)
                .map_err(|e| format!("Invalid settings file {:?}: {}", path, e))?
        } else {
            debug!("No settings file at {:?}, using defaults", path);
            Settings::default()
        };
        settings.apply_env();
        Ok(settings)
    }

    /// Apply `RECAP_*` environment overrides. Called by `load`; exposed so a
    /// caller constructing `Settings` directly can opt in as well.
    pub fn apply_env(&mut self) {
        override_from_env("RECAP_TRANSCRIPT_BASE_URL", &mut self.transcript_base_url);
        override_from_env("RECAP_TRANSCRIPT_API_KEY", &mut self.transcript_api_key);
        override_from_env("RECAP_GENERATION_BASE_URL", &mut self.generation_base_url);
        override_from_env("RECAP_GENERATION_API_KEY", &mut self.generation_api_key);
        override_from_env("RECAP_GENERATION_MODEL", &mut self.generation_model);
        override_from_env("RECAP_NARRATION_BASE_URL", &mut self.narration_base_url);
        override_from_env("RECAP_NARRATION_API_KEY", &mut self.narration_api_key);
        override_from_env("RECAP_VOICE", &mut self.voice);

        if let Ok(device) = env::var("RECAP_OUTPUT_DEVICE") {
            let trimmed = device.trim();
            if !trimmed.is_empty() {
                self.output_device = Some(trimmed.to_string());
            }
        }
        if let Ok(volume) = env::var("RECAP_VOLUME") {
            match volume.trim().parse::<f32>() {
                Ok(v) => self.volume = v,
                Err(_) => warn!("Ignoring unparseable RECAP_VOLUME value '{}'", volume),
            }
        }
    }

    /// Base URLs get concatenated with paths all over; normalize away any
    /// trailing slash once here. The volume bound lives here too, so the
    /// file, environment, and command-line paths all funnel through it.
    pub fn normalized(mut self) -> Self {
        for url in [
            &mut self.transcript_base_url,
            &mut self.generation_base_url,
            &mut self.narration_base_url,
        ] {
            while url.ends_with('/') {
                url.pop();
            }
        }
        if !self.volume.is_finite() {
            warn!("Replacing unusable volume {} with {}", self.volume, default_volume());
            self.volume = default_volume();
        } else if !(0.0..=2.0).contains(&self.volume) {
            let clamped = self.volume.clamp(0.0, 2.0);
            warn!("Clamping volume {} to {}", self.volume, clamped);
            self.volume = clamped;
        }
        self
    }
}

fn override_from_env(name: &str, slot: &mut String) {
    if let Ok(value) = env::var(name) {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            debug!("Using {} from environment", name);
            *slot = trimmed.to_string();
        }
    }
}
