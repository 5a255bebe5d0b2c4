//! Generation workflow: the two-attempt state machine
//!
//! One request is processed end-to-end by one asynchronous task:
//!
//! ```text
//! Idle -> Streaming(1) -> Validating -> Accepted
//!                                    -> Retrying -> Streaming(2) -> Done
//! any stage -> Failed (transport/provider error)
//! ```
//!
//! The contract is at-most-one validation pass and at-most-one retry:
//! a first attempt that fails validation triggers exactly one
//! corrective regeneration whose output is accepted without
//! re-validation. Bounding retries keeps latency and cost predictable
//! and avoids correction loops against a model that keeps violating
//! the same constraint. Extraction failures are terminal on either
//! attempt; a response with no code block is usually a refusal, and
//! repeating the prompt will not fix that.

use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use weft_common::config::TomlConfig;
use weft_common::events::StreamEvent;

use crate::extract::{extract_code, normalize_code};
use crate::prompt::PromptBuilder;
use crate::providers::{
    ChatMessage, CompletionRequest, ModelFamily, ModelProvider, ProviderError, ProviderFactory,
};
use crate::validators::{self, ValidationPolicy};

/// Completion token budget per attempt
const MAX_TOKENS: u32 = 4096;

/// Generation mode requested by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    /// Compose from scratch
    #[default]
    New,
    /// Modify the session's current code
    Edit,
}

/// Inbound generation request (client JSON is camelCase)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    /// Natural-language request
    pub prompt: String,
    /// "new" or "edit"
    #[serde(default)]
    pub mode: GenerationMode,
    /// Current session code, required for meaningful edits
    #[serde(default)]
    pub current_code: Option<String>,
    /// Prior conversation, oldest first
    #[serde(default)]
    pub chat_history: Vec<ChatMessage>,
    /// Model name; server default when unset
    #[serde(default)]
    pub model: Option<String>,
    /// Request-supplied credential (highest priority tier)
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Workflow phases, made explicit so the retry contract is visible in
/// the logs and testable without the transport layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Streaming(u8),
    Validating,
    Retrying,
}

/// Terminal success of one workflow run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutcome {
    /// The accepted artifact. Normalized when validated; verbatim
    /// extracted text when produced by the unvalidated second attempt.
    pub code: String,
    /// Whether the corrective retry produced this code
    pub retried: bool,
    /// Issues from the failed first attempt (empty when not retried)
    pub issues: Vec<String>,
}

/// Terminal failure of one workflow run
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// Request arrived without a prompt
    #[error("missing prompt")]
    MissingPrompt,

    /// Credential/model configuration problem, rejected before streaming
    #[error("configuration error: {0}")]
    Config(String),

    /// No artifact could be extracted from the model response
    #[error("{message}")]
    Extraction {
        /// Extraction failure description, surfaced verbatim
        message: String,
        /// Raw model response, retained for diagnostics
        raw_response: String,
    },

    /// Provider/transport failure
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Client went away mid-stream
    #[error("client disconnected")]
    ClientDisconnected,

    /// Internal task failure
    #[error("internal error: {0}")]
    Internal(String),
}

impl WorkflowError {
    /// Classified, user-facing message
    pub fn user_message(&self) -> String {
        match self {
            WorkflowError::Provider(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

/// Run one generation request end-to-end
///
/// Emits `content_block_delta`, `status`, and `clear` events into
/// `events` as the attempts progress. The caller owns terminal
/// framing: it converts an `Err` into an `error` event and always
/// closes the stream with the `done` sentinel.
pub async fn run_generation(
    request: GenerateRequest,
    config: &TomlConfig,
    prompts: &PromptBuilder,
    factory: &dyn ProviderFactory,
    events: &mpsc::Sender<StreamEvent>,
) -> Result<GenerationOutcome, WorkflowError> {
    if request.prompt.trim().is_empty() {
        return Err(WorkflowError::MissingPrompt);
    }

    let model = request
        .model
        .clone()
        .unwrap_or_else(|| config.default_model().to_string());
    let family = ModelFamily::from_model(&model)
        .ok_or_else(|| WorkflowError::Config(format!("unsupported model family: {}", model)))?;
    let api_key = crate::config::resolve_api_key(family, request.api_key.as_deref(), config)?;
    let provider = factory.provider(family, &api_key);

    // mode="edit" without current code degrades to "new".
    let mode = match request.mode {
        GenerationMode::Edit
            if request
                .current_code
                .as_deref()
                .is_some_and(|c| !c.trim().is_empty()) =>
        {
            GenerationMode::Edit
        }
        GenerationMode::Edit => {
            warn!("Edit requested without current code; generating from scratch");
            GenerationMode::New
        }
        GenerationMode::New => GenerationMode::New,
    };

    let instruction = match mode {
        GenerationMode::New => prompts.build_new(&request.prompt),
        GenerationMode::Edit => prompts.build_edit(
            request.current_code.as_deref().unwrap_or_default(),
            &request.prompt,
        ),
    };

    let mut phase = Phase::Streaming(1);
    debug!(?phase, model = %model, "Generation started");
    let raw = stream_attempt(
        provider.clone(),
        completion_request(&model, prompts, &request.chat_history, instruction),
        events,
    )
    .await?;

    phase = Phase::Validating;
    debug!(?phase, response_len = raw.len(), "Stream complete, extracting artifact");

    // Extraction failures are terminal: only validation failures retry.
    let parsed = extract_code(&raw);
    let code = match parsed.code {
        Some(code) => code,
        None => {
            return Err(WorkflowError::Extraction {
                message: parsed
                    .error
                    .unwrap_or_else(|| "no code block found".to_string()),
                raw_response: raw,
            });
        }
    };

    let policy = ValidationPolicy::default().with_overrides(&config.validation);
    let result = validators::validate(&code, &policy);

    if result.valid {
        info!("Artifact accepted on first attempt");
        send(events, StreamEvent::status("validation passed")).await?;
        return Ok(GenerationOutcome {
            code: normalize_code(&code),
            retried: false,
            issues: Vec::new(),
        });
    }

    phase = Phase::Retrying;
    info!(
        ?phase,
        issue_count = result.issues.len(),
        "Validation failed, starting corrective retry"
    );
    send(
        events,
        StreamEvent::status(format!(
            "validation failed ({} issue{}); regenerating",
            result.issues.len(),
            if result.issues.len() == 1 { "" } else { "s" }
        )),
    )
    .await?;
    // Discard the partially-streamed invalid text client-side.
    send(events, StreamEvent::Clear).await?;

    // The retry prompt is built from the ORIGINAL request plus the
    // issue list, not from the failed output.
    let retry_instruction = prompts.build_retry(&request.prompt, &result.issues);

    phase = Phase::Streaming(2);
    debug!(?phase, "Second attempt streaming");
    let raw = stream_attempt(
        provider,
        completion_request(&model, prompts, &request.chat_history, retry_instruction),
        events,
    )
    .await?;

    // Second attempt: extracted and applied WITHOUT re-validation.
    let parsed = extract_code(&raw);
    match parsed.code {
        Some(code) => {
            info!("Retry artifact applied without re-validation");
            Ok(GenerationOutcome {
                code,
                retried: true,
                issues: result.issues,
            })
        }
        None => Err(WorkflowError::Extraction {
            message: parsed
                .error
                .unwrap_or_else(|| "no code block found".to_string()),
            raw_response: raw,
        }),
    }
}

fn completion_request(
    model: &str,
    prompts: &PromptBuilder,
    chat_history: &[ChatMessage],
    instruction: String,
) -> CompletionRequest {
    let mut messages = chat_history.to_vec();
    messages.push(ChatMessage::user(instruction));
    CompletionRequest {
        model: model.to_string(),
        system: prompts.system_prompt(),
        messages,
        max_tokens: MAX_TOKENS,
    }
}

/// Stream one attempt, forwarding every chunk to the client while
/// accumulating it locally. Returns the full accumulated text.
async fn stream_attempt(
    provider: Arc<dyn ModelProvider>,
    request: CompletionRequest,
    events: &mpsc::Sender<StreamEvent>,
) -> Result<String, WorkflowError> {
    let (chunk_tx, mut chunk_rx) = mpsc::channel::<String>(32);
    let task =
        tokio::spawn(async move { provider.stream_completion(&request, chunk_tx).await });

    let mut accumulated = String::new();
    while let Some(chunk) = chunk_rx.recv().await {
        accumulated.push_str(&chunk);
        if events.send(StreamEvent::delta(chunk)).await.is_err() {
            // Client gone: abort the provider stream, nothing to persist.
            task.abort();
            return Err(WorkflowError::ClientDisconnected);
        }
    }

    task.await
        .map_err(|e| WorkflowError::Internal(format!("stream task failed: {}", e)))??;
    Ok(accumulated)
}

async fn send(
    events: &mpsc::Sender<StreamEvent>,
    event: StreamEvent,
) -> Result<(), WorkflowError> {
    events
        .send(event)
        .await
        .map_err(|_| WorkflowError::ClientDisconnected)
}
