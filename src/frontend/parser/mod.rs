//! Parser module
//!
//! A Pratt parser for expressions on top of a recursive-descent statement
//! parser. Parsing never fails as a whole: a line that cannot be parsed is
//! kept as `StmtKind::Unclassified` and the reason is recorded alongside the
//! program, so `check` can report it while `run` treats it as a no-op.

pub mod ast;
mod expr;
mod led;
mod nud;
mod state;
mod stmt;

pub use state::{ParserState, BP_HIGHEST, BP_LOWEST};

use crate::frontend::lexer::tokens::*;
use crate::util::span::SourceLines;
use ast::*;
use tracing::debug;

/// Parse result: the program plus any lines that were left unclassified
#[derive(Debug, Clone, Default)]
pub struct ParseOutput {
    pub program: Program,
    /// Parse errors with their line numbers
    pub errors: Vec<(usize, ParseError)>,
}

impl ParseOutput {
    #[inline]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Parse tokens into a program
///
/// # Arguments
/// * `tokens` - Token stream from the lexer
/// * `source` - Source text, for the text of unclassified lines
///
/// # Example
/// ```text
/// for i in range(3):
///     move_right()
/// ```
pub fn parse(
    tokens: &[Token],
    source: &str,
) -> ParseOutput {
    let lines = SourceLines::new(source);
    let mut state = ParserState::new(tokens, &lines);
    let mut body = Block::new();

    while !state.at_end() {
        // no stray Dedent at the top level
        if state.skip(&TokenKind::Dedent) {
            continue;
        }
        body.push(state.parse_stmt());
    }

    let errors = state.into_errors();
    debug!("Parsed {} statements, {} errors", body.len(), errors.len());
    ParseOutput {
        program: Program { body },
        errors,
    }
}

/// Parse a single expression
pub fn parse_expression(tokens: &[Token]) -> Result<Expr, ParseError> {
    let lines = SourceLines::new("");
    let mut state = ParserState::new(tokens, &lines);
    let expr = state.parse_expression(BP_LOWEST);
    let mut errors = state.into_errors();
    match expr {
        Some(e) if errors.is_empty() => Ok(e),
        _ if !errors.is_empty() => Err(errors.remove(0).1),
        _ => Err(ParseError::InvalidExpression),
    }
}

/// Parse error types
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token: {0:?}")]
    UnexpectedToken(TokenKind),

    #[error("Expected token: {0:?}, found: {1:?}")]
    ExpectedToken(TokenKind, TokenKind),

    #[error("Expected an indented block")]
    ExpectedBlock,

    #[error("Unexpected indent")]
    UnexpectedIndent,

    #[error("Invalid expression")]
    InvalidExpression,
}
