//! Parser state and token stream management

use super::super::lexer::tokens::*;
use crate::util::span::{SourceLines, Span};

/// Binding power levels for the expression parser
pub const BP_LOWEST: u8 = 0;
pub const BP_OR: u8 = 20;
pub const BP_AND: u8 = 30;
pub const BP_NOT: u8 = 35;
pub const BP_EQ: u8 = 40;
pub const BP_CMP: u8 = 50;
pub const BP_ADD: u8 = 60;
pub const BP_MUL: u8 = 70;
pub const BP_UNARY: u8 = 80;
pub const BP_CALL: u8 = 90;
pub const BP_HIGHEST: u8 = 100;

/// Parser state for tracking position and errors
#[derive(Debug)]
pub struct ParserState<'a> {
    /// Token stream
    tokens: &'a [Token],
    /// Source lines, for the text of unclassified lines
    lines: &'a SourceLines,
    /// Current position in token stream
    pos: usize,
    /// Parsing errors with the line they occurred on
    errors: Vec<(usize, super::ParseError)>,
}

impl<'a> ParserState<'a> {
    /// Create a new parser state
    #[inline]
    pub fn new(
        tokens: &'a [Token],
        lines: &'a SourceLines,
    ) -> Self {
        Self {
            tokens,
            lines,
            pos: 0,
            errors: Vec::new(),
        }
    }

    /// Check if at end of token stream
    #[inline]
    pub fn at_end(&self) -> bool {
        self.pos >= self.tokens.len() || matches!(self.tokens[self.pos].kind, TokenKind::Eof)
    }

    /// Get current token
    #[inline]
    pub fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    #[inline]
    pub fn current_kind(&self) -> Option<&TokenKind> {
        self.current().map(|t| &t.kind)
    }

    /// Check the current token kind
    #[inline]
    pub fn at(
        &self,
        kind: &TokenKind,
    ) -> bool {
        matches!(self.current(), Some(t) if &t.kind == kind)
    }

    /// Peek at next token
    #[inline]
    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos + 1)
    }

    /// Span of the current token
    #[inline]
    pub fn span(&self) -> Span {
        self.current().map(|t| t.span).unwrap_or_else(Span::dummy)
    }

    /// Span of the previously consumed token
    #[inline]
    pub fn prev_span(&self) -> Span {
        self.pos
            .checked_sub(1)
            .and_then(|idx| self.tokens.get(idx))
            .map(|t| t.span)
            .unwrap_or_else(Span::dummy)
    }

    /// Advance to next token
    #[inline]
    pub fn bump(&mut self) {
        if !self.at_end() {
            self.pos += 1;
        }
    }

    /// Skip a specific token
    #[inline]
    pub fn skip(
        &mut self,
        kind: &TokenKind,
    ) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Expect a specific token, report error if not found
    pub fn expect(
        &mut self,
        kind: &TokenKind,
    ) -> Option<()> {
        if self.skip(kind) {
            return Some(());
        }
        let found = self.current_kind().cloned().unwrap_or(TokenKind::Eof);
        self.error(super::ParseError::ExpectedToken(kind.clone(), found));
        None
    }

    /// Add a parse error at the current line
    pub fn error(
        &mut self,
        error: super::ParseError,
    ) {
        let line = self.span().line();
        self.errors.push((line, error));
    }

    /// Take collected errors
    pub fn into_errors(self) -> Vec<(usize, super::ParseError)> {
        self.errors
    }

    /// Trimmed source text of a line
    pub fn line_text(
        &self,
        line: usize,
    ) -> String {
        self.lines.line(line).unwrap_or_default().to_string()
    }

    /// Skip the rest of the current line, and any block nested under it
    pub fn synchronize(&mut self) {
        while !self.at_end() {
            match self.current_kind() {
                Some(TokenKind::Newline) => {
                    self.bump();
                    break;
                }
                Some(TokenKind::Dedent) => return,
                _ => self.bump(),
            }
        }
        if self.at(&TokenKind::Indent) {
            self.skip_block();
        }
    }

    /// Skip an indented block including its closing dedent
    pub fn skip_block(&mut self) {
        let mut depth = 0usize;
        while !self.at_end() {
            match self.current_kind() {
                Some(TokenKind::Indent) => depth += 1,
                Some(TokenKind::Dedent) => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.bump();
                        return;
                    }
                }
                _ => {}
            }
            self.bump();
        }
    }
}
