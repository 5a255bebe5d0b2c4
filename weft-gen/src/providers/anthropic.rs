//! Anthropic messages API streaming client

use super::{ChatMessage, CompletionRequest, ModelProvider, ProviderError};
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Streaming client for the Anthropic messages API
pub struct AnthropicProvider {
    http_client: reqwest::Client,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

/// One SSE frame from the messages stream (only the fields we consume)
#[derive(Debug, Deserialize)]
struct StreamFrame {
    #[serde(rename = "type")]
    frame_type: String,
    #[serde(default)]
    delta: Option<FrameDelta>,
}

#[derive(Debug, Deserialize)]
struct FrameDelta {
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicProvider {
    /// Create a client authenticated with `api_key`
    pub fn new(api_key: &str) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http_client,
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl ModelProvider for AnthropicProvider {
    async fn stream_completion(
        &self,
        request: &CompletionRequest,
        chunk_tx: mpsc::Sender<String>,
    ) -> Result<(), ProviderError> {
        let body = MessagesRequest {
            model: &request.model,
            max_tokens: request.max_tokens,
            system: &request.system,
            messages: &request.messages,
            stream: true,
        };

        let response = self
            .http_client
            .post(API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ProviderError::classify(status.as_u16(), &error_body));
        }

        let mut stream = response.bytes_stream();
        let mut buffer = String::new();

        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(|e| ProviderError::Network(e.to_string()))?;
            buffer.push_str(&String::from_utf8_lossy(&bytes));

            // SSE frames are newline-delimited; process complete lines
            // and keep any partial tail in the buffer.
            while let Some(newline) = buffer.find('\n') {
                let line = buffer[..newline].trim().to_string();
                buffer.drain(..=newline);

                let Some(data) = line.strip_prefix("data:") else {
                    continue;
                };
                let frame: StreamFrame = match serde_json::from_str(data.trim()) {
                    Ok(frame) => frame,
                    Err(e) => {
                        debug!("Skipping unparseable stream frame: {}", e);
                        continue;
                    }
                };

                match frame.frame_type.as_str() {
                    "content_block_delta" => {
                        if let Some(text) = frame.delta.and_then(|d| d.text) {
                            if chunk_tx.send(text).await.is_err() {
                                // Consumer gone; abandon the stream.
                                return Ok(());
                            }
                        }
                    }
                    "message_stop" => return Ok(()),
                    "error" => {
                        return Err(ProviderError::classify(status.as_u16(), data));
                    }
                    _ => {}
                }
            }
        }

        Ok(())
    }
}
