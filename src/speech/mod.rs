//! Speech Module
//!
//! Speech-to-text and text-to-speech behind one interface. Only available
//! when the config resolved the speech capability.

use crate::config::Config;
use crate::error::TutorResult;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

pub mod openai;

pub use openai::OpenAiSpeech;

/// Trait for speech engines
#[async_trait]
pub trait SpeechEngine: Send + Sync + std::fmt::Debug {
    /// Transcribe WAV audio to text
    async fn transcribe(&self, audio: &[u8]) -> TutorResult<String>;

    /// Render text as audio bytes
    async fn synthesize(&self, text: &str) -> TutorResult<Vec<u8>>;

    /// Get the engine name
    fn name(&self) -> &str;
}

/// Factory to create the speech engine, `None` when speech is disabled
pub fn create_engine(config: &Config) -> Option<Arc<dyn SpeechEngine>> {
    if !config.speech_enabled {
        info!("🔇 Speech disabled (needs STT_PROVIDER=openai and OPENAI_API_KEY)");
        return None;
    }
    let key = config.openai_api_key.clone()?;
    let engine: Arc<dyn SpeechEngine> = Arc::new(
        OpenAiSpeech::new(key, config.openai_base_url.clone()).with_voice(&config.tts_voice),
    );
    info!("✅ Speech engine '{}' initialized", engine.name());
    Some(engine)
}
