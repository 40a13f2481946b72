//! Presentation events
//!
//! The engine never renders anything; it sends [`ExecutionEvent`]s on an
//! unbounded channel and whoever holds the receiver decides what to show.

use serde::Serialize;
use tokio::sync::mpsc;

use super::result::{ErrorKind, ExecutionResult, Severity};

/// How a call name was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallSource {
    Capability,
    TileFunction,
    Subroutine,
}

/// User-facing error report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorEvent {
    pub message: String,
    pub suggestion: String,
    pub concept: String,
    pub severity: Severity,
}

impl ErrorEvent {
    pub fn from_failure(
        kind: ErrorKind,
        message: &str,
    ) -> Self {
        Self {
            message: message.to_string(),
            suggestion: kind.suggestion().to_string(),
            concept: kind.concept().to_string(),
            severity: kind.severity(),
        }
    }
}

/// Signals emitted toward the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExecutionEvent {
    Started {
        actor: String,
    },
    Completed {
        actor: String,
        message: String,
    },
    Failed {
        actor: String,
        message: String,
    },
    Stopped {
        actor: String,
    },
    Statement {
        actor: String,
        subroutine: String,
        line: usize,
        text: String,
    },
    Call {
        actor: String,
        name: String,
        args: Vec<String>,
        source: CallSource,
    },
    Log {
        actor: String,
        severity: Severity,
        message: String,
    },
    Error {
        actor: String,
        #[serde(flatten)]
        error: ErrorEvent,
    },
}

/// Sending half of the event channel; a sink without a channel drops events
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<ExecutionEvent>>,
}

impl EventSink {
    /// A sink paired with its receiver
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ExecutionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn emit(
        &self,
        event: ExecutionEvent,
    ) {
        if let Some(tx) = &self.tx {
            // receiver gone: nobody is watching
            let _ = tx.send(event);
        }
    }

    /// Emit the error and failed events for a failing result
    pub fn report_failure(
        &self,
        actor: &str,
        result: &ExecutionResult,
    ) {
        match result {
            ExecutionResult::Failure {
                kind: ErrorKind::Stopped,
                ..
            } => self.emit(ExecutionEvent::Stopped {
                actor: actor.to_string(),
            }),
            ExecutionResult::Failure { message, kind } => {
                self.emit(ExecutionEvent::Error {
                    actor: actor.to_string(),
                    error: ErrorEvent::from_failure(*kind, message),
                });
                self.emit(ExecutionEvent::Failed {
                    actor: actor.to_string(),
                    message: message.clone(),
                });
            }
            ExecutionResult::Success { .. } => {}
        }
    }
}
