//! Mock speech engine for testing

use async_trait::async_trait;
use lingua_tutor::error::{TutorError, TutorResult};
use lingua_tutor::speech::SpeechEngine;
use std::sync::{Arc, Mutex};

/// Returns a fixed transcript and records synthesized text
#[derive(Debug)]
pub struct MockSpeech {
    pub transcript: String,
    pub spoken: Arc<Mutex<Vec<String>>>,
}

impl MockSpeech {
    pub fn new(transcript: &str) -> Self {
        Self {
            transcript: transcript.to_string(),
            spoken: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn was_spoken(&self, text: &str) -> bool {
        self.spoken.lock().unwrap().iter().any(|s| s.contains(text))
    }
}

#[async_trait]
impl SpeechEngine for MockSpeech {
    async fn transcribe(&self, audio: &[u8]) -> TutorResult<String> {
        if audio.is_empty() {
            return Err(TutorError::SpeechProvider("no audio captured".to_string()));
        }
        Ok(self.transcript.clone())
    }

    async fn synthesize(&self, text: &str) -> TutorResult<Vec<u8>> {
        self.spoken.lock().unwrap().push(text.to_string());
        Ok(text.as_bytes().to_vec())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
