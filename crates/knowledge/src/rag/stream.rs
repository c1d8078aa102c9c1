//! Progress events for streaming searches.
//!
//! Events travel over a bounded channel from the producer task to exactly
//! one consumer and are rendered on the wire as `data: <json>\n\n` frames.

use deepsearch_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;

/// One step of a streaming search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    Start { content: String },
    Analysis { content: String },
    Retrieval { content: String },
    Iteration { content: String },
    Thinking { content: String },
    Result { content: String, consume_token: u64 },
    Error { content: String },
    End { content: String },
}

impl StreamEvent {
    pub fn start() -> Self {
        Self::Start {
            content: "Starting query processing...".to_string(),
        }
    }

    pub fn analysis(original_query: &str) -> Self {
        Self::Analysis {
            content: format!("Analyzing query: {}", original_query),
        }
    }

    pub fn retrieval() -> Self {
        Self::Retrieval {
            content: "Retrieving relevant documents...".to_string(),
        }
    }

    /// `iteration` is 0-based; the content is 1-based.
    pub fn iteration(iteration: usize, max_iter: usize) -> Self {
        Self::Iteration {
            content: format!("Iteration {} of {}", iteration + 1, max_iter),
        }
    }

    pub fn thinking(content: impl Into<String>) -> Self {
        Self::Thinking {
            content: content.into(),
        }
    }

    pub fn result(answer: impl Into<String>, consume_token: u64) -> Self {
        Self::Result {
            content: answer.into(),
            consume_token,
        }
    }

    /// Error event; the content starts with the failing stage.
    pub fn error(stage: SearchStage, err: &AppError) -> Self {
        Self::Error {
            content: format!("{} failed: {}", stage, err),
        }
    }

    pub fn end() -> Self {
        Self::End {
            content: "Processing complete".to_string(),
        }
    }

    /// Wire name of the event type.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::Analysis { .. } => "analysis",
            Self::Retrieval { .. } => "retrieval",
            Self::Iteration { .. } => "iteration",
            Self::Thinking { .. } => "thinking",
            Self::Result { .. } => "result",
            Self::Error { .. } => "error",
            Self::End { .. } => "end",
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Self::Start { content }
            | Self::Analysis { content }
            | Self::Retrieval { content }
            | Self::Iteration { content }
            | Self::Thinking { content }
            | Self::Result { content, .. }
            | Self::Error { content }
            | Self::End { content } => content,
        }
    }

    /// `result` or `error`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Result { .. } | Self::Error { .. })
    }

    /// JSON body of the event.
    pub fn to_json(&self) -> String {
        match serde_json::to_string(self) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Failed to serialize stream event: {}", e);
                serde_json::json!({"type": "error", "content": e.to_string()}).to_string()
            }
        }
    }

    /// Server-sent-events frame: `data: <json>\n\n`.
    pub fn to_frame(&self) -> String {
        format!("data: {}\n\n", self.to_json())
    }
}

/// Where a streaming search failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStage {
    /// Argument checks before any external call
    Validation,
    /// Planning, embedding, index lookups and sufficiency checks
    Retrieval,
    /// Final answer composition
    Synthesis,
}

impl SearchStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Retrieval => "retrieval",
            Self::Synthesis => "synthesis",
        }
    }
}

impl fmt::Display for SearchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Producer end of the event channel.
///
/// A disabled sink (used by the blocking API) accepts and drops events.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: Option<mpsc::Sender<StreamEvent>>,
}

impl EventSink {
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// A sink and its receiver with room for `capacity` pending events.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<StreamEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx: Some(tx) }, rx)
    }

    /// True once the consumer has dropped its receiver.
    pub fn is_closed(&self) -> bool {
        self.tx.as_ref().is_some_and(|tx| tx.is_closed())
    }

    /// Push an event, waiting for room.
    ///
    /// Fails with `Cancelled` when the consumer is gone.
    pub async fn emit(&self, event: StreamEvent) -> AppResult<()> {
        let Some(tx) = &self.tx else {
            return Ok(());
        };

        tracing::trace!(kind = event.kind(), "Emitting stream event");
        tx.send(event)
            .await
            .map_err(|_| AppError::Cancelled("stream consumer detached".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_format() {
        let frame = StreamEvent::result("Paris", 42).to_frame();
        assert_eq!(
            frame,
            "data: {\"type\":\"result\",\"content\":\"Paris\",\"consume_token\":42}\n\n"
        );

        let frame = StreamEvent::end().to_frame();
        assert!(frame.starts_with("data: {\"type\":\"end\",\"content\":"));
        assert!(frame.ends_with("}\n\n"));
    }

    #[test]
    fn test_frame_escapes_content() {
        let frame = StreamEvent::thinking("say \"hi\"\nnow").to_frame();
        let json = frame.trim_start_matches("data: ").trim_end();
        let parsed: StreamEvent = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.content(), "say \"hi\"\nnow");
        assert_eq!(frame.matches('\n').count(), 2);
    }

    #[test]
    fn test_error_content_names_stage() {
        let event = StreamEvent::error(SearchStage::Synthesis, &AppError::Llm("timeout".into()));
        assert!(event.content().starts_with("synthesis"));
        assert!(event.is_terminal());
        assert_eq!(event.kind(), "error");
    }

    #[test]
    fn test_iteration_is_one_based() {
        assert_eq!(StreamEvent::iteration(0, 3).content(), "Iteration 1 of 3");
    }

    #[tokio::test]
    async fn test_disabled_sink_accepts_everything() {
        let sink = EventSink::disabled();
        assert!(!sink.is_closed());
        sink.emit(StreamEvent::start()).await.unwrap();
    }

    #[tokio::test]
    async fn test_emit_after_receiver_dropped_is_cancelled() {
        let (sink, rx) = EventSink::channel(4);
        drop(rx);
        assert!(sink.is_closed());
        assert!(matches!(
            sink.emit(StreamEvent::start()).await,
            Err(AppError::Cancelled(_))
        ));
    }
}
