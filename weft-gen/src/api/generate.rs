//! Generation endpoint: one SSE stream per request
//!
//! Each request is handled by its own asynchronous task with its own
//! accumulation buffer; there is no shared mutable state between
//! concurrent generations. Provider chunks fan out one-to-one into
//! outbound `content_block_delta` frames; the only buffering boundary
//! is the validation step after a stream completes. If the client
//! disconnects, the event channel closes and the workflow aborts the
//! provider stream.

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::post,
    Json, Router,
};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use weft_common::events::StreamEvent;

use crate::workflow::{run_generation, GenerateRequest, WorkflowError};
use crate::AppState;

/// POST /api/generate - stream one generation as SSE
///
/// Frames emitted, in protocol order:
/// - `content_block_delta` for each model chunk
/// - `status` / `clear` around the corrective retry
/// - `error` on terminal failure
/// - `done` sentinel closing every stream
pub async fn generate(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let request_id = Uuid::new_v4();
    info!(request_id = %request_id, mode = ?request.mode, "New generation request");

    let (tx, mut rx) = mpsc::channel::<StreamEvent>(64);

    tokio::spawn(async move {
        let outcome = run_generation(
            request,
            &state.config,
            &state.prompts,
            state.provider_factory.as_ref(),
            &tx,
        )
        .await;

        match outcome {
            Ok(outcome) => {
                info!(
                    request_id = %request_id,
                    retried = outcome.retried,
                    code_len = outcome.code.len(),
                    "Generation complete"
                );
            }
            Err(WorkflowError::ClientDisconnected) => {
                debug!(request_id = %request_id, "Client disconnected mid-stream");
                return;
            }
            Err(e) => {
                warn!(request_id = %request_id, error = %e, "Generation failed");
                tx.send(StreamEvent::error(e.user_message())).await.ok();
            }
        }
        tx.send(StreamEvent::Done).await.ok();
    });

    let stream = async_stream::stream! {
        while let Some(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => {
                    yield Ok(Event::default().event(event.event_type()).data(json));
                }
                Err(e) => {
                    warn!("Failed to serialize stream event: {}", e);
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    )
}

/// Build generation routes
pub fn generate_routes() -> Router<AppState> {
    Router::new().route("/api/generate", post(generate))
}
