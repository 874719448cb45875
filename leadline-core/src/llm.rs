//! Chat-model client for Leadline — Gemini `generateContent` over REST
//!
//! Provides a `ChatBackend` trait with a single implementation:
//! - **Gemini** — cloud chat completions via the Gemini API
//!
//! There is deliberately no retry layer: a failed turn collapses once into
//! the canned fallback reply at the request handler, never a second attempt.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::models::ChatMessage;

// ============================================================================
// ChatBackend trait
// ============================================================================

/// Abstraction over conversational model providers.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Generate a reply to `message` given the prior conversation turns.
    /// History is ordered oldest-first and already capped by the caller.
    async fn reply(&self, history: &[ChatMessage], message: &str) -> Result<String, ChatError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

// ============================================================================
// Error types
// ============================================================================

/// Chat generation errors
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Model returned no text candidates")]
    EmptyReply,

    #[error("Missing API key")]
    MissingApiKey,
}

// ============================================================================
// Config
// ============================================================================

/// Gemini chat client configuration
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub api_key: String,
    pub model: String,
    pub timeout_seconds: u64,
    pub max_output_tokens: u32,
}

impl ChatConfig {
    /// Resolve the API key from the argument or `GOOGLE_API_KEY`.
    /// An empty key is rejected at client construction, not here.
    pub fn new(api_key: Option<String>, llm: &crate::config::LlmConfig) -> Self {
        let api_key = api_key
            .or_else(|| std::env::var("GOOGLE_API_KEY").ok())
            .unwrap_or_default();

        Self {
            api_key,
            model: llm.model.clone(),
            timeout_seconds: llm.timeout_seconds,
            max_output_tokens: llm.max_output_tokens,
        }
    }
}

// ============================================================================
// Gemini API structs (private)
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    parts: Option<Vec<GeminiCandidatePart>>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: Option<GeminiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    code: u16,
    message: String,
}

// ============================================================================
// GeminiChatClient
// ============================================================================

/// Gemini chat client — calls the Gemini `generateContent` API.
#[derive(Debug, Clone)]
pub struct GeminiChatClient {
    client: Client,
    config: ChatConfig,
    base_url: String,
    system_instruction: Option<String>,
}

impl GeminiChatClient {
    pub fn new(config: ChatConfig) -> Result<Self, ChatError> {
        Self::with_base_url(
            config,
            "https://generativelanguage.googleapis.com/v1beta".to_string(),
        )
    }

    /// Create a client with a custom base URL (for testing / integration)
    pub fn with_base_url(config: ChatConfig, base_url: String) -> Result<Self, ChatError> {
        if config.api_key.is_empty() {
            return Err(ChatError::MissingApiKey);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            config,
            base_url,
            system_instruction: None,
        })
    }

    /// Fix the persona sent with every request as `systemInstruction`.
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    fn build_request(&self, history: &[ChatMessage], message: &str) -> GeminiRequest {
        // Gemini names the assistant role "model"
        let mut contents: Vec<GeminiContent> = history
            .iter()
            .map(|m| GeminiContent {
                role: if m.role == "assistant" { "model" } else { "user" }.to_string(),
                parts: vec![GeminiPart {
                    text: m.content.clone(),
                }],
            })
            .collect();

        contents.push(GeminiContent {
            role: "user".to_string(),
            parts: vec![GeminiPart {
                text: message.to_string(),
            }],
        });

        GeminiRequest {
            contents,
            system_instruction: self.system_instruction.as_ref().map(|text| GeminiContent {
                role: "system".to_string(),
                parts: vec![GeminiPart { text: text.clone() }],
            }),
            generation_config: GeminiGenerationConfig {
                max_output_tokens: self.config.max_output_tokens,
            },
        }
    }

    async fn generate_once(
        &self,
        history: &[ChatMessage],
        message: &str,
    ) -> Result<String, ChatError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.config.model, self.config.api_key
        );

        let request = self.build_request(history, message);

        let response = self.client.post(&url).json(&request).send().await?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let error_detail = serde_json::from_str::<GeminiErrorResponse>(&error_body)
                .ok()
                .and_then(|e| e.error);

            let (code, message) = error_detail
                .map(|e| (e.code, e.message))
                .unwrap_or((status.as_u16(), error_body));

            tracing::error!(code = code, message = %message, "Gemini API error");

            return Err(ChatError::Api { code, message });
        }

        let gemini_response: GeminiResponse = response.json().await?;

        extract_reply_text(gemini_response).ok_or(ChatError::EmptyReply)
    }
}

/// Pull the first text part out of the first candidate, if any.
fn extract_reply_text(response: GeminiResponse) -> Option<String> {
    response
        .candidates?
        .into_iter()
        .next()?
        .content?
        .parts?
        .into_iter()
        .find_map(|part| part.text)
}

#[async_trait]
impl ChatBackend for GeminiChatClient {
    async fn reply(&self, history: &[ChatMessage], message: &str) -> Result<String, ChatError> {
        self.generate_once(history, message).await
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(api_key: &str) -> ChatConfig {
        ChatConfig {
            api_key: api_key.to_string(),
            model: "gemini-2.5-flash".to_string(),
            timeout_seconds: 5,
            max_output_tokens: 256,
        }
    }

    fn mock_reply_response(text: &str) -> serde_json::Value {
        serde_json::json!({
            "candidates": [
                {
                    "content": {
                        "role": "model",
                        "parts": [{ "text": text }]
                    },
                    "finishReason": "STOP"
                }
            ]
        })
    }

    #[tokio::test]
    async fn test_reply_calls_api_and_returns_candidate_text() {
        let mock_server = MockServer::start().await;
        let client = GeminiChatClient::with_base_url(test_config("test-api-key"), mock_server.uri())
            .expect("Failed to create client");

        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash:generateContent"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(mock_reply_response("Bonjour ! Comment puis-je vous aider ?")),
            )
            .mount(&mock_server)
            .await;

        let result = client.reply(&[], "Bonjour").await;

        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result.err());
        assert_eq!(result.unwrap(), "Bonjour ! Comment puis-je vous aider ?");
    }

    #[tokio::test]
    async fn test_reply_maps_assistant_history_to_model_role() {
        let mock_server = MockServer::start().await;
        let client = GeminiChatClient::with_base_url(test_config("test-api-key"), mock_server.uri())
            .expect("Failed to create client")
            .with_system_instruction("Tu es un consultant digital.");

        // history assistant turn must be sent as role "model"
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({
                "contents": [
                    { "role": "user", "parts": [{ "text": "Bonjour" }] },
                    { "role": "model", "parts": [{ "text": "Bonjour, parlez-moi de votre projet." }] },
                    { "role": "user", "parts": [{ "text": "Et le budget ?" }] }
                ],
                "systemInstruction": { "parts": [{ "text": "Tu es un consultant digital." }] }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(mock_reply_response("ok")))
            .mount(&mock_server)
            .await;

        let history = vec![
            ChatMessage::user("Bonjour"),
            ChatMessage::assistant("Bonjour, parlez-moi de votre projet."),
        ];
        let result = client.reply(&history, "Et le budget ?").await;
        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result.err());
    }

    #[tokio::test]
    async fn test_reply_returns_api_error_on_500_without_retry() {
        let mock_server = MockServer::start().await;
        let client = GeminiChatClient::with_base_url(test_config("test-api-key"), mock_server.uri())
            .expect("Failed to create client");

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "error": { "code": 500, "message": "Internal server error" }
            })))
            .expect(1) // single attempt, no retry
            .mount(&mock_server)
            .await;

        let result = client.reply(&[], "hello").await;

        match result {
            Err(ChatError::Api { code, message }) => {
                assert_eq!(code, 500);
                assert_eq!(message, "Internal server error");
            }
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reply_fails_with_missing_api_key() {
        let result = GeminiChatClient::new(test_config(""));

        match result {
            Err(ChatError::MissingApiKey) => {}
            _ => panic!("Expected MissingApiKey error"),
        }
    }

    #[tokio::test]
    async fn test_reply_returns_empty_reply_when_no_candidates() {
        let mock_server = MockServer::start().await;
        let client = GeminiChatClient::with_base_url(test_config("test-api-key"), mock_server.uri())
            .expect("Failed to create client");

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": []
            })))
            .mount(&mock_server)
            .await;

        let result = client.reply(&[], "hello").await;

        match result {
            Err(ChatError::EmptyReply) => {}
            other => panic!("Expected EmptyReply, got {:?}", other),
        }
    }

    #[test]
    fn test_backend_name() {
        let client = GeminiChatClient::new(test_config("k")).unwrap();
        assert_eq!(client.name(), "gemini");
    }
}
