//! Execution results
//!
//! Every capability, tile function and statement reports through
//! [`ExecutionResult`]; nothing on the script path panics or raises.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use super::value::Value;

/// Failure classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Target outside the world dimensions
    Bounds,
    /// Actor or tile already mid-task
    Blocked,
    /// Wrong tile type, actor not co-located, collection before production
    Precondition,
    /// Insufficient energy or global resource
    Resource,
    /// Unknown capability, subroutine, tile function or entry script
    NotFound,
    /// Script could not be tokenized
    Syntax,
    /// Internal error caught at a subroutine boundary
    Execution,
    /// Execution was stopped by the user
    Stopped,
}

/// Severity of a reported error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

impl ErrorKind {
    /// Concept a learner should read about
    pub fn concept(self) -> &'static str {
        match self {
            ErrorKind::Bounds => "coordinates",
            ErrorKind::Blocked => "tasks",
            ErrorKind::Precondition => "tiles",
            ErrorKind::Resource => "energy",
            ErrorKind::NotFound => "functions",
            ErrorKind::Syntax => "syntax",
            ErrorKind::Execution => "expressions",
            ErrorKind::Stopped => "execution",
        }
    }

    pub fn suggestion(self) -> &'static str {
        match self {
            ErrorKind::Bounds => "Check the world size before moving; x and y start at 0.",
            ErrorKind::Blocked => "Run the next action after the current task finishes.",
            ErrorKind::Precondition => "Move onto the right kind of tile first.",
            ErrorKind::Resource => "Eat something to restore energy before trying again.",
            ErrorKind::NotFound => "Check the spelling, or define a subroutine with that name.",
            ErrorKind::Syntax => "Check quotes and indentation on the reported line.",
            ErrorKind::Execution => "Check the types of the values used in the expression.",
            ErrorKind::Stopped => "Run the script again when ready.",
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            ErrorKind::Stopped => Severity::Info,
            ErrorKind::Blocked => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

/// Outcome of one capability, tile function, statement or subroutine
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionResult {
    Success {
        message: Option<String>,
        data: Option<Value>,
        /// Length of the task this call started
        duration: Option<Duration>,
        /// Energy the interpreter debits after the call
        energy_cost: Option<u32>,
    },
    Failure {
        message: String,
        kind: ErrorKind,
    },
}

impl ExecutionResult {
    pub fn ok() -> Self {
        ExecutionResult::Success {
            message: None,
            data: None,
            duration: None,
            energy_cost: None,
        }
    }

    pub fn ok_msg(message: impl Into<String>) -> Self {
        Self::ok().with_message(message)
    }

    pub fn fail(
        kind: ErrorKind,
        message: impl Into<String>,
    ) -> Self {
        ExecutionResult::Failure {
            message: message.into(),
            kind,
        }
    }

    /// Wrap an unexpected internal error
    pub fn execution_error(error: impl fmt::Display) -> Self {
        Self::fail(ErrorKind::Execution, format!("execution error: {}", error))
    }

    pub fn with_message(
        mut self,
        text: impl Into<String>,
    ) -> Self {
        if let ExecutionResult::Success { message, .. } = &mut self {
            *message = Some(text.into());
        }
        self
    }

    pub fn with_data(
        mut self,
        value: Value,
    ) -> Self {
        if let ExecutionResult::Success { data, .. } = &mut self {
            *data = Some(value);
        }
        self
    }

    pub fn with_duration(
        mut self,
        d: Duration,
    ) -> Self {
        if let ExecutionResult::Success { duration, .. } = &mut self {
            *duration = Some(d);
        }
        self
    }

    pub fn with_energy_cost(
        mut self,
        cost: u32,
    ) -> Self {
        if let ExecutionResult::Success { energy_cost, .. } = &mut self {
            *energy_cost = Some(cost);
        }
        self
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionResult::Success { .. })
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ExecutionResult::Success { message, .. } => message.as_deref(),
            ExecutionResult::Failure { message, .. } => Some(message),
        }
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ExecutionResult::Failure { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            ExecutionResult::Success { data, .. } => data.as_ref(),
            _ => None,
        }
    }

    pub fn duration(&self) -> Option<Duration> {
        match self {
            ExecutionResult::Success { duration, .. } => *duration,
            _ => None,
        }
    }

    pub fn energy_cost(&self) -> Option<u32> {
        match self {
            ExecutionResult::Success { energy_cost, .. } => *energy_cost,
            _ => None,
        }
    }
}

impl fmt::Display for ExecutionResult {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            ExecutionResult::Success { message, .. } => {
                write!(f, "ok: {}", message.as_deref().unwrap_or("done"))
            }
            ExecutionResult::Failure { message, kind } => write!(f, "{:?}: {}", kind, message),
        }
    }
}
