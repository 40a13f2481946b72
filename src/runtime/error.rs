//! Internal script errors
//!
//! These never reach a script author as-is: at subroutine and top-level
//! boundaries they become `ExecutionResult::Failure`.

use thiserror::Error;

use super::result::{ErrorKind, ExecutionResult};
use crate::frontend::{LexError, ScriptFileError};
use crate::world::WorldError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptError {
    #[error(transparent)]
    World(#[from] WorldError),

    #[error("in `{subroutine}`: {source}")]
    Syntax {
        subroutine: String,
        #[source]
        source: LexError,
    },

    #[error(transparent)]
    ScriptFile(#[from] ScriptFileError),

    #[error("loop limit exceeded: more than {0} iterations")]
    LoopLimit(usize),

    #[error("call depth exceeded: more than {0} nested calls")]
    CallDepth(usize),

    #[error("unsupported operand types for {op}: {left} and {right}")]
    TypeMismatch {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    #[error("bad operand type for {op}: {operand}")]
    BadOperand {
        op: &'static str,
        operand: &'static str,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("integer overflow")]
    Overflow,

    #[error("result too large: more than {0} items")]
    TooLarge(usize),

    #[error("undefined variable: {0}")]
    UndefinedVariable(String),

    #[error("{0} is not iterable")]
    NotIterable(&'static str),

    #[error("cannot index {container} with {index}")]
    BadIndex {
        container: &'static str,
        index: &'static str,
    },

    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("`{0}` outside a loop")]
    JumpOutsideLoop(&'static str),
}

impl From<ScriptError> for ExecutionResult {
    fn from(error: ScriptError) -> Self {
        match error {
            ScriptError::Syntax { .. } | ScriptError::ScriptFile(_) => {
                ExecutionResult::fail(ErrorKind::Syntax, error.to_string())
            }
            other => ExecutionResult::execution_error(other),
        }
    }
}
