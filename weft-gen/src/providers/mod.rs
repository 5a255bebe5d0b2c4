//! Model provider clients
//!
//! Streaming completions from the supported model families, behind a
//! trait so the orchestrator (and its tests) never depend on a live
//! HTTP endpoint. Each provider pushes incremental text chunks into an
//! mpsc channel; a closed channel means the consumer is gone and the
//! stream is abandoned quietly.

pub mod anthropic;
pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAiProvider;

/// Supported model families
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    /// Anthropic messages API
    Claude,
    /// OpenAI chat-completions API
    Gpt,
}

impl ModelFamily {
    /// Determine the family from a model name, if recognized
    pub fn from_model(model: &str) -> Option<Self> {
        let model = model.trim().to_ascii_lowercase();
        if model.starts_with("claude") {
            Some(ModelFamily::Claude)
        } else if model.starts_with("gpt") || model.starts_with("chatgpt") || model.starts_with("o1") || model.starts_with("o3") || model.starts_with("o4") {
            Some(ModelFamily::Gpt)
        } else {
            None
        }
    }

    /// Environment variable holding this family's API key
    pub fn api_key_env_var(&self) -> &'static str {
        match self {
            ModelFamily::Claude => "ANTHROPIC_API_KEY",
            ModelFamily::Gpt => "OPENAI_API_KEY",
        }
    }
}

/// One message of chat history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// "user" or "assistant"
    pub role: String,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// Convenience constructor for a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// One streaming completion request
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Model name as requested by the client
    pub model: String,
    /// System prompt
    pub system: String,
    /// Conversation, ending with the instruction for this attempt
    pub messages: Vec<ChatMessage>,
    /// Completion token budget
    pub max_tokens: u32,
}

/// Provider transport/API errors, classified for user display
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// Credential rejected
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Requested model unavailable
    #[error("Model not available: {0}")]
    ModelNotFound(String),

    /// Rate limit hit
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Network-level failure
    #[error("Network error: {0}")]
    Network(String),

    /// Other API error (generic passthrough)
    #[error("API error {0}: {1}")]
    Api(u16, String),
}

impl ProviderError {
    /// Classify an HTTP error status + body into a provider error
    ///
    /// Status codes decide first; known substrings in the body catch
    /// providers that wrap everything in a 400.
    pub fn classify(status: u16, body: &str) -> Self {
        let lowered = body.to_ascii_lowercase();
        match status {
            401 | 403 => ProviderError::Auth(body.to_string()),
            404 => ProviderError::ModelNotFound(body.to_string()),
            429 => ProviderError::RateLimited(body.to_string()),
            _ if lowered.contains("authentication") || lowered.contains("invalid x-api-key") || lowered.contains("invalid api key") => {
                ProviderError::Auth(body.to_string())
            }
            _ if lowered.contains("model_not_found") || lowered.contains("not_found_error") => {
                ProviderError::ModelNotFound(body.to_string())
            }
            _ => ProviderError::Api(status, body.to_string()),
        }
    }

    /// User-facing message in the error taxonomy's categories
    pub fn user_message(&self) -> String {
        match self {
            ProviderError::Auth(_) => {
                "Authentication failed; check your API key".to_string()
            }
            ProviderError::ModelNotFound(_) => {
                "The requested model is not available".to_string()
            }
            ProviderError::RateLimited(_) => {
                "Rate limited by the model provider; try again shortly".to_string()
            }
            ProviderError::Network(detail) => format!("Network error: {}", detail),
            ProviderError::Api(status, detail) => format!("Provider error ({}): {}", status, detail),
        }
    }
}

/// A streaming model provider
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Stream one completion, pushing text chunks into `chunk_tx` as
    /// they arrive. Returns when the provider closes the stream. A
    /// closed `chunk_tx` (consumer gone) ends the stream early and is
    /// not an error.
    async fn stream_completion(
        &self,
        request: &CompletionRequest,
        chunk_tx: mpsc::Sender<String>,
    ) -> Result<(), ProviderError>;
}

/// Creates providers per model family
///
/// The seam that lets tests swap in scripted providers without any
/// HTTP involved.
pub trait ProviderFactory: Send + Sync {
    /// Build a provider for `family` authenticated with `api_key`
    fn provider(&self, family: ModelFamily, api_key: &str) -> Arc<dyn ModelProvider>;
}

/// Default factory building real HTTP providers
pub struct HttpProviderFactory;

impl ProviderFactory for HttpProviderFactory {
    fn provider(&self, family: ModelFamily, api_key: &str) -> Arc<dyn ModelProvider> {
        match family {
            ModelFamily::Claude => Arc::new(AnthropicProvider::new(api_key)),
            ModelFamily::Gpt => Arc::new(OpenAiProvider::new(api_key)),
        }
    }
}
