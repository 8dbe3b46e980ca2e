//! OpenAI speech: Whisper transcription and `tts-1` synthesis

use super::SpeechEngine;
use crate::config::ApiKey;
use crate::error::{TutorError, TutorResult};
use async_trait::async_trait;
use reqwest::multipart;
use serde::Deserialize;
use tracing::{debug, warn};

const TRANSCRIBE_MODEL: &str = "whisper-1";
const SPEECH_MODEL: &str = "tts-1";
const DEFAULT_VOICE: &str = "alloy";

#[derive(Debug, Deserialize)]
struct Transcription {
    text: String,
}

#[derive(Debug, Clone)]
pub struct OpenAiSpeech {
    client: reqwest::Client,
    api_key: ApiKey,
    base_url: String,
    voice: String,
}

impl OpenAiSpeech {
    pub fn new(api_key: ApiKey, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            voice: DEFAULT_VOICE.to_string(),
        }
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = voice.into();
        self
    }

    async fn check(response: reqwest::Response, what: &str) -> TutorResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        warn!("❌ OpenAI {} error ({}): {}", what, status, body);
        Err(TutorError::SpeechProvider(format!(
            "{what} returned {status}: {body}"
        )))
    }
}

#[async_trait]
impl SpeechEngine for OpenAiSpeech {
    async fn transcribe(&self, audio: &[u8]) -> TutorResult<String> {
        if audio.is_empty() {
            return Err(TutorError::SpeechProvider("no audio captured".to_string()));
        }

        let part = multipart::Part::bytes(audio.to_vec())
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| TutorError::SpeechProvider(e.to_string()))?;
        let form = multipart::Form::new()
            .text("model", TRANSCRIBE_MODEL)
            .part("file", part);

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(self.api_key.expose())
            .multipart(form)
            .send()
            .await
            .map_err(|e| TutorError::SpeechProvider(format!("transcription failed: {e}")))?;
        let response = Self::check(response, "transcription").await?;

        let transcription: Transcription = response
            .json()
            .await
            .map_err(|e| TutorError::SpeechProvider(format!("bad transcription: {e}")))?;
        debug!("🎤 Heard: {}", transcription.text);
        Ok(transcription.text.trim().to_string())
    }

    async fn synthesize(&self, text: &str) -> TutorResult<Vec<u8>> {
        if text.trim().is_empty() {
            return Err(TutorError::SpeechProvider("nothing to speak".to_string()));
        }

        let response = self
            .client
            .post(format!("{}/audio/speech", self.base_url))
            .bearer_auth(self.api_key.expose())
            .json(&serde_json::json!({
                "model": SPEECH_MODEL,
                "voice": self.voice,
                "input": text,
            }))
            .send()
            .await
            .map_err(|e| TutorError::SpeechProvider(format!("synthesis failed: {e}")))?;
        let response = Self::check(response, "synthesis").await?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TutorError::SpeechProvider(format!("synthesis body: {e}")))?;
        Ok(bytes.to_vec())
    }

    fn name(&self) -> &str {
        "openai"
    }
}
