use reqwest::Client;
use serde_json::json;
use std::env;
use std::path::PathBuf;

/// Default narration voice ("Sarah", a calm read).
pub const DEFAULT_VOICE_ID: &str = "EXAVITQu4vr4xnSDxMaL";
const MODEL_ID: &str = "eleven_multilingual_v2";

// Fixed prosody for guided practices.
const STABILITY: f64 = 0.5;
const SIMILARITY_BOOST: f64 = 0.75;
const SPEED: f64 = 0.9;

/// Adapter for the text-to-speech API. Narration is strictly best-effort:
/// a missing key, an HTTP error, or a filesystem error all resolve to
/// `None` and the workflow continues without audio.
#[derive(Clone)]
pub struct ElevenLabsClient {
    client: Client,
    api_key: Option<String>,
    voice_id: String,
    audio_dir: PathBuf,
}

impl ElevenLabsClient {
    pub fn from_env() -> Self {
        let api_key = env::var("ELEVENLABS_API_KEY").ok();
        if api_key.is_none() {
            tracing::warn!("ELEVENLABS_API_KEY not set. Practices will be served without narration.");
        }
        let voice_id =
            env::var("ELEVENLABS_VOICE_ID").unwrap_or_else(|_| DEFAULT_VOICE_ID.to_string());
        let audio_dir = env::var("AUDIO_DIR").unwrap_or_else(|_| "audio".to_string());
        Self::new(api_key, voice_id, PathBuf::from(audio_dir))
    }

    pub fn new(api_key: Option<String>, voice_id: String, audio_dir: PathBuf) -> Self {
        Self {
            client: Client::new(),
            api_key,
            voice_id,
            audio_dir,
        }
    }

    pub fn audio_path(&self, file_name: &str) -> PathBuf {
        self.audio_dir.join(file_name)
    }

    /// Synthesize the practice description and save it under a filename
    /// derived from the practice id. The mood is kept for interface
    /// stability; voice selection no longer depends on it.
    pub async fn synthesize(&self, text: &str, practice_id: i32, mood: &str) -> Option<String> {
        let api_key = match self.api_key.as_deref() {
            Some(key) => key,
            None => return None,
        };

        let url = format!(
            "https://api.elevenlabs.io/v1/text-to-speech/{}",
            self.voice_id
        );
        let body = json!({
            "text": text,
            "model_id": MODEL_ID,
            "voice_settings": {
                "stability": STABILITY,
                "similarity_boost": SIMILARITY_BOOST,
                "speed": SPEED
            }
        });

        let res = match self
            .client
            .post(&url)
            .header("xi-api-key", api_key)
            .json(&body)
            .send()
            .await
        {
            Ok(res) => res,
            Err(e) => {
                tracing::error!(practice_id, "Narration request failed: {}", e);
                crate::metrics::increment_narration("failed");
                return None;
            }
        };

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            tracing::error!(practice_id, "Narration failed ({}): {}", status, text);
            crate::metrics::increment_narration("failed");
            return None;
        }

        let bytes = match res.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(practice_id, "Failed to read narration audio: {}", e);
                crate::metrics::increment_narration("failed");
                return None;
            }
        };

        if let Err(e) = tokio::fs::create_dir_all(&self.audio_dir).await {
            tracing::error!("Failed to create audio directory: {}", e);
            crate::metrics::increment_narration("failed");
            return None;
        }

        let file_name = audio_filename(practice_id);
        if let Err(e) = tokio::fs::write(self.audio_dir.join(&file_name), &bytes).await {
            tracing::error!(practice_id, "Failed to write narration audio: {}", e);
            crate::metrics::increment_narration("failed");
            return None;
        }

        tracing::info!(practice_id, mood, "Narration audio saved as {}", file_name);
        crate::metrics::increment_narration("saved");
        Some(file_name)
    }
}

pub fn audio_filename(practice_id: i32) -> String {
    format!("practice_{}.mp3", practice_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_derives_from_practice_id() {
        assert_eq!(audio_filename(42), "practice_42.mp3");
    }

    #[tokio::test]
    async fn synthesize_without_key_yields_no_audio() {
        let client = ElevenLabsClient::new(
            None,
            DEFAULT_VOICE_ID.to_string(),
            PathBuf::from("audio"),
        );
        let result = client.synthesize("Breathe in... breathe out.", 1, "Calm").await;
        assert!(result.is_none());
    }

    #[test]
    fn audio_path_lands_in_the_configured_directory() {
        let client = ElevenLabsClient::new(
            None,
            DEFAULT_VOICE_ID.to_string(),
            PathBuf::from("/tmp/narration"),
        );
        assert_eq!(
            client.audio_path("practice_7.mp3"),
            PathBuf::from("/tmp/narration/practice_7.mp3")
        );
    }
}
