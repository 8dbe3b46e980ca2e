//! HTTP provider tests against a mocked server
//!
//! Covers the Ollama and OpenAI chat clients and the OpenAI speech engine
//! without a real backend.

use lingua_tutor::config::{ApiKey, CloudSettings, Config, LocalSettings};
use lingua_tutor::core::{create_model, ChatMessage, ChatModel, ChatRequest, OllamaChat, OpenAiChat};
use lingua_tutor::error::TutorError;
use lingua_tutor::speech::{OpenAiSpeech, SpeechEngine};
use std::collections::HashMap;
use wiremock::{
    matchers::{body_partial_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

// =============================================================================
// Test Helpers
// =============================================================================

fn local_settings(base_url: &str) -> LocalSettings {
    LocalSettings {
        base_url: base_url.to_string(),
        model: "llama3.1".to_string(),
        temperature: 0.7,
    }
}

fn cloud_settings(base_url: &str) -> CloudSettings {
    CloudSettings {
        api_key: ApiKey::new("sk-test"),
        model: "gpt-4".to_string(),
        base_url: base_url.to_string(),
        temperature: 0.7,
    }
}

fn request() -> ChatRequest {
    ChatRequest {
        system: "You are a Spanish tutor.".to_string(),
        messages: vec![
            ChatMessage::user("Hola"),
            ChatMessage::tutor("¡Hola! ¿Cómo estás?"),
            ChatMessage::user("Bien, gracias"),
        ],
    }
}

// =============================================================================
// Ollama
// =============================================================================

mod ollama_tests {
    use super::*;

    #[tokio::test]
    async fn test_chat_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(serde_json::json!({
                "model": "llama3.1",
                "stream": false,
                "messages": [
                    {"role": "system", "content": "You are a Spanish tutor."},
                    {"role": "user", "content": "Hola"},
                    {"role": "assistant", "content": "¡Hola! ¿Cómo estás?"},
                    {"role": "user", "content": "Bien, gracias"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "llama3.1",
                "message": {"role": "assistant", "content": "  ¡Qué bueno!  "},
                "done": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let chat = OllamaChat::new(&local_settings(&server.uri()));
        let reply = chat.complete(&request()).await.unwrap();
        assert_eq!(reply, "¡Qué bueno!");
    }

    #[tokio::test]
    async fn test_chat_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
            .expect(1)
            .mount(&server)
            .await;

        let chat = OllamaChat::new(&local_settings(&server.uri()));
        let err = chat.complete(&request()).await.unwrap_err();
        match err {
            TutorError::ModelProvider(msg) => assert!(msg.contains("model not loaded")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_chat_empty_reply_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": {"role": "assistant", "content": ""}
            })))
            .mount(&server)
            .await;

        let chat = OllamaChat::new(&local_settings(&server.uri()));
        let result = chat.complete(&request()).await;
        assert!(matches!(result, Err(TutorError::ModelProvider(_))));
    }

    #[tokio::test]
    async fn test_health_and_models() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "models": [{"name": "llama3.1:latest"}, {"name": "mistral:7b"}]
            })))
            .mount(&server)
            .await;

        let chat = OllamaChat::new(&local_settings(&server.uri()));
        assert!(chat.health_check().await);
        assert_eq!(
            chat.list_models().await.unwrap(),
            vec!["llama3.1:latest", "mistral:7b"]
        );
    }

    #[tokio::test]
    async fn test_health_check_unreachable() {
        let chat = OllamaChat::new(&local_settings("http://127.0.0.1:9"));
        assert!(!chat.health_check().await);
        assert!(chat.list_models().await.is_err());
    }
}

// =============================================================================
// OpenAI chat
// =============================================================================

mod openai_tests {
    use super::*;

    #[tokio::test]
    async fn test_chat_success_with_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({"model": "gpt-4"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "chatcmpl-1",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "¡Perfecto!"},
                    "finish_reason": "stop"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let chat = OpenAiChat::new(&cloud_settings(&server.uri()));
        assert_eq!(chat.complete(&request()).await.unwrap(), "¡Perfecto!");
    }

    #[tokio::test]
    async fn test_chat_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(serde_json::json!({"error": {"message": "bad key"}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let chat = OpenAiChat::new(&cloud_settings(&server.uri()));
        let result = chat.complete(&request()).await;
        assert!(matches!(result, Err(TutorError::ModelProvider(msg)) if msg.contains("401")));
    }

    #[tokio::test]
    async fn test_chat_no_choices() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})),
            )
            .mount(&server)
            .await;

        let chat = OpenAiChat::new(&cloud_settings(&server.uri()));
        let result = chat.complete(&request()).await;
        assert!(matches!(result, Err(TutorError::ModelProvider(_))));
    }

    #[tokio::test]
    async fn test_factory_picks_configured_provider() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "cloud"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let vars: HashMap<&str, String> = HashMap::from([
            ("MODEL_PROVIDER", "openai".to_string()),
            ("OPENAI_API_KEY", "sk-test".to_string()),
            ("OPENAI_BASE_URL", server.uri()),
        ]);
        let config = Config::from_lookup(|key| vars.get(key).cloned()).unwrap();
        let model = create_model(&config);
        assert_eq!(model.name(), "openai");
        assert_eq!(model.complete(&request()).await.unwrap(), "cloud");
    }
}

// =============================================================================
// OpenAI speech
// =============================================================================

mod speech_tests {
    use super::*;

    #[tokio::test]
    async fn test_transcribe() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/audio/transcriptions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"text": " Buenos días "})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let speech = OpenAiSpeech::new(ApiKey::new("sk-test"), server.uri());
        let text = speech.transcribe(b"RIFF\0\0\0\0WAVEfmt ").await.unwrap();
        assert_eq!(text, "Buenos días");
    }

    #[tokio::test]
    async fn test_synthesize() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/audio/speech"))
            .and(body_partial_json(serde_json::json!({
                "model": "tts-1",
                "voice": "alloy",
                "input": "Hola"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3, 4]))
            .expect(1)
            .mount(&server)
            .await;

        let speech = OpenAiSpeech::new(ApiKey::new("sk-test"), server.uri());
        assert_eq!(speech.synthesize("Hola").await.unwrap(), vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_configured_voice_is_sent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/audio/speech"))
            .and(body_partial_json(serde_json::json!({"voice": "nova"})))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![9u8]))
            .expect(1)
            .mount(&server)
            .await;

        let vars: HashMap<&str, String> = HashMap::from([
            ("STT_PROVIDER", "openai".to_string()),
            ("OPENAI_API_KEY", "sk-test".to_string()),
            ("OPENAI_BASE_URL", server.uri()),
            ("TTS_VOICE", "nova".to_string()),
        ]);
        let config = Config::from_lookup(|key| vars.get(key).cloned()).unwrap();
        let speech = lingua_tutor::speech::create_engine(&config).expect("speech enabled");
        assert_eq!(speech.synthesize("Hola").await.unwrap(), vec![9]);
    }

    #[tokio::test]
    async fn test_speech_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/audio/speech"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let speech = OpenAiSpeech::new(ApiKey::new("sk-test"), server.uri());
        let result = speech.synthesize("Hola").await;
        assert!(matches!(result, Err(TutorError::SpeechProvider(msg)) if msg.contains("429")));
    }
}
