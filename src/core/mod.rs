//! Language-model providers
//!
//! The tutor only sees [`ChatModel`]; which backend answers is decided once
//! from the config.

pub mod ollama;
pub mod openai;
pub mod provider;

pub use ollama::OllamaChat;
pub use openai::OpenAiChat;
pub use provider::{extract_json, ChatMessage, ChatModel, ChatRequest};

use crate::config::{Config, ProviderSettings};
use std::sync::Arc;
use tracing::info;

/// Factory to create the configured chat model
pub fn create_model(config: &Config) -> Arc<dyn ChatModel> {
    let model: Arc<dyn ChatModel> = match &config.provider {
        ProviderSettings::Cloud(cloud) => Arc::new(OpenAiChat::new(cloud)),
        ProviderSettings::Local(local) => Arc::new(OllamaChat::new(local)),
    };
    info!(
        "🤖 Using {} model '{}'",
        model.name(),
        config.provider.model()
    );
    model
}
