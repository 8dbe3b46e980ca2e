//! Chat model abstraction
//!
//! Both providers take the same request shape: a system instruction plus an
//! ordered list of turns.

use crate::error::TutorResult;
use crate::model::Role;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One turn sent to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn tutor(content: impl Into<String>) -> Self {
        Self {
            role: Role::Tutor,
            content: content.into(),
        }
    }
}

/// A complete prompt: system instruction plus turns, oldest first
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChatRequest {
    pub system: String,
    pub messages: Vec<ChatMessage>,
}

impl ChatRequest {
    /// A single-question prompt outside the conversation history
    pub fn single(system: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            messages: vec![ChatMessage::user(question)],
        }
    }

    /// Messages in the `{role, content}` wire shape shared by Ollama and OpenAI
    pub(crate) fn wire_messages(&self) -> Vec<serde_json::Value> {
        std::iter::once(serde_json::json!({"role": "system", "content": self.system}))
            .chain(self.messages.iter().map(|m| {
                let role = match m.role {
                    Role::User => "user",
                    Role::Tutor => "assistant",
                };
                serde_json::json!({"role": role, "content": m.content})
            }))
            .collect()
    }
}

/// Trait for language-model providers
#[async_trait]
pub trait ChatModel: Send + Sync + std::fmt::Debug {
    /// Send the request and return the completion text
    async fn complete(&self, request: &ChatRequest) -> TutorResult<String>;

    /// Provider name for logs
    fn name(&self) -> &str;
}

/// Pull the first `{...}` object out of a reply that may wrap it in prose
pub fn extract_json<T: serde::de::DeserializeOwned>(reply: &str) -> Option<T> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&reply[start..=end]).ok()
}
