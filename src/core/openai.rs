//! OpenAI-compatible chat client (`/chat/completions`)

use super::provider::{ChatModel, ChatRequest};
use crate::config::CloudSettings;
use crate::error::{TutorError, TutorResult};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Chat client for the cloud provider
#[derive(Debug, Clone)]
pub struct OpenAiChat {
    client: reqwest::Client,
    settings: CloudSettings,
}

impl OpenAiChat {
    pub fn new(settings: &CloudSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            settings: settings.clone(),
        }
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    async fn complete(&self, request: &ChatRequest) -> TutorResult<String> {
        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(self.settings.api_key.expose())
            .json(&serde_json::json!({
                "model": self.settings.model,
                "messages": request.wire_messages(),
                "temperature": self.settings.temperature,
            }))
            .send()
            .await
            .map_err(|e| TutorError::ModelProvider(format!("OpenAI request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("❌ OpenAI API Error ({}): {}", status, body);
            return Err(TutorError::ModelProvider(format!(
                "OpenAI returned {status}: {body}"
            )));
        }

        let body: CompletionResponse = response
            .json()
            .await
            .map_err(|e| TutorError::ModelProvider(format!("Unexpected OpenAI response: {e}")))?;
        debug!("🧠 OpenAI returned {} choice(s)", body.choices.len());

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| TutorError::ModelProvider("OpenAI returned an empty reply".to_string()))
    }

    fn name(&self) -> &str {
        "openai"
    }
}
