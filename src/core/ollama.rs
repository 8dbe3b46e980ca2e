//! Ollama chat client
//!
//! Talks to a locally hosted model through `/api/chat`.

use super::provider::{ChatModel, ChatRequest};
use crate::config::LocalSettings;
use crate::error::{TutorError, TutorResult};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

/// Ollama `/api/chat` response (non-streaming)
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    content: String,
}

/// Ollama `/api/tags` response
#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

/// Chat client for a local Ollama server
#[derive(Debug, Clone)]
pub struct OllamaChat {
    client: reqwest::Client,
    url: String,
    model: String,
    temperature: f32,
}

impl OllamaChat {
    pub fn new(settings: &LocalSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            temperature: settings.temperature,
        }
    }

    /// Health check - verify Ollama is reachable
    pub async fn health_check(&self) -> bool {
        match self
            .client
            .get(format!("{}/api/tags", self.url))
            .timeout(std::time::Duration::from_secs(2))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// Models pulled on the server
    pub async fn list_models(&self) -> TutorResult<Vec<String>> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.url))
            .timeout(std::time::Duration::from_secs(2))
            .send()
            .await
            .map_err(|e| TutorError::ModelProvider(format!("Ollama unreachable: {e}")))?;

        if !response.status().is_success() {
            return Err(TutorError::ModelProvider(format!(
                "Ollama model list failed ({})",
                response.status()
            )));
        }
        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| TutorError::ModelProvider(format!("Bad Ollama model list: {e}")))?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

#[async_trait]
impl ChatModel for OllamaChat {
    async fn complete(&self, request: &ChatRequest) -> TutorResult<String> {
        let response = self
            .client
            .post(format!("{}/api/chat", self.url))
            .json(&serde_json::json!({
                "model": self.model,
                "messages": request.wire_messages(),
                "stream": false,
                "options": {
                    "temperature": self.temperature
                }
            }))
            .send()
            .await
            .map_err(|e| TutorError::ModelProvider(format!("Ollama request failed: {e}")))?;

        let status = response.status();
        let body_text = response
            .text()
            .await
            .map_err(|e| TutorError::ModelProvider(format!("Ollama response unreadable: {e}")))?;

        if !status.is_success() {
            warn!("❌ Ollama API Error ({}): {}", status, body_text);
            return Err(TutorError::ModelProvider(format!(
                "Ollama returned {status}: {body_text}"
            )));
        }

        debug!("🧠 Ollama raw body: {}", body_text);

        let parsed: OllamaChatResponse = serde_json::from_str(&body_text).map_err(|e| {
            TutorError::ModelProvider(format!("Unexpected Ollama response: {e}"))
        })?;
        let content = parsed.message.content.trim().to_string();
        if content.is_empty() {
            return Err(TutorError::ModelProvider(
                "Ollama returned an empty reply".to_string(),
            ));
        }
        Ok(content)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
