//! Wire events for the generation stream
//!
//! Provides the framed event types sent from the generation service to
//! the client over Server-Sent Events. The client protocol is fixed:
//! every frame is a JSON object with a `type` tag, and the shapes below
//! must not change without a matching client update.

use serde::{Deserialize, Serialize};

/// Incremental text payload for a `content_block_delta` frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delta {
    /// Text chunk as received from the model provider
    pub text: String,
}

/// Error payload for an `error` frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// User-facing classified error message
    pub message: String,
}

/// Events streamed to the client during one generation request
///
/// Serialized forms:
/// - `{"type":"content_block_delta","delta":{"text":"..."}}`
/// - `{"type":"status","status":"..."}`
/// - `{"type":"clear"}`
/// - `{"type":"error","error":{"message":"..."}}`
/// - `{"type":"done"}`
///
/// `Clear` instructs the client to discard any partially-rendered
/// output from the current attempt. `Done` is the sentinel terminal
/// marker; exactly one of `Done`/`Error` closes every stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Incremental generated text
    ContentBlockDelta {
        /// Chunk payload
        delta: Delta,
    },
    /// Human-readable progress note
    Status {
        /// Progress description (e.g. "validation failed, retrying")
        status: String,
    },
    /// Discard partially-rendered output from the current attempt
    Clear,
    /// Terminal failure
    Error {
        /// Classified failure payload
        error: ErrorBody,
    },
    /// Sentinel terminal marker closing the stream
    Done,
}

impl StreamEvent {
    /// Convenience constructor for a text delta
    pub fn delta(text: impl Into<String>) -> Self {
        StreamEvent::ContentBlockDelta {
            delta: Delta { text: text.into() },
        }
    }

    /// Convenience constructor for a status note
    pub fn status(status: impl Into<String>) -> Self {
        StreamEvent::Status {
            status: status.into(),
        }
    }

    /// Convenience constructor for a terminal error
    pub fn error(message: impl Into<String>) -> Self {
        StreamEvent::Error {
            error: ErrorBody {
                message: message.into(),
            },
        }
    }

    /// Returns the wire tag for this event
    pub fn event_type(&self) -> &'static str {
        match self {
            StreamEvent::ContentBlockDelta { .. } => "content_block_delta",
            StreamEvent::Status { .. } => "status",
            StreamEvent::Clear => "clear",
            StreamEvent::Error { .. } => "error",
            StreamEvent::Done => "done",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn delta_wire_shape() {
        let event = StreamEvent::delta("setcpm(30)");
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({"type": "content_block_delta", "delta": {"text": "setcpm(30)"}})
        );
    }

    #[test]
    fn status_wire_shape() {
        let event = StreamEvent::status("validating");
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value, json!({"type": "status", "status": "validating"}));
    }

    #[test]
    fn clear_wire_shape() {
        let value = serde_json::to_value(StreamEvent::Clear).unwrap();
        assert_eq!(value, json!({"type": "clear"}));
    }

    #[test]
    fn error_wire_shape() {
        let event = StreamEvent::error("no API key configured");
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({"type": "error", "error": {"message": "no API key configured"}})
        );
    }

    #[test]
    fn done_wire_shape() {
        let value = serde_json::to_value(StreamEvent::Done).unwrap();
        assert_eq!(value, json!({"type": "done"}));
    }

    #[test]
    fn event_type_matches_tag() {
        assert_eq!(StreamEvent::delta("x").event_type(), "content_block_delta");
        assert_eq!(StreamEvent::Clear.event_type(), "clear");
        assert_eq!(StreamEvent::Done.event_type(), "done");
    }

    #[test]
    fn round_trips_through_json() {
        let event = StreamEvent::error("model not found");
        let text = serde_json::to_string(&event).unwrap();
        let back: StreamEvent = serde_json::from_str(&text).unwrap();
        assert_eq!(back, event);
    }
}
