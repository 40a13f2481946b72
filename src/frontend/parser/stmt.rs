//! Statement parsing

use super::ast::*;
use super::state::*;
use super::super::lexer::tokens::*;
use crate::util::span::Span;

impl<'a> ParserState<'a> {
    /// Parse a statement, turning a malformed line into `Unclassified`
    pub fn parse_stmt(&mut self) -> Stmt {
        let start_span = self.span();

        // unexpected indent: the whole block is unclassified
        if self.at(&TokenKind::Indent) {
            self.error(super::ParseError::UnexpectedIndent);
            self.skip_block();
            return self.unclassified(start_span);
        }

        match self.parse_stmt_inner(start_span) {
            Some(stmt) => stmt,
            None => {
                self.synchronize();
                self.unclassified(start_span)
            }
        }
    }

    fn unclassified(
        &self,
        span: Span,
    ) -> Stmt {
        Stmt {
            kind: StmtKind::Unclassified(self.line_text(span.line())),
            span,
        }
    }

    fn parse_stmt_inner(
        &mut self,
        span: Span,
    ) -> Option<Stmt> {
        match self.current_kind()? {
            TokenKind::KwIf => self.parse_if_stmt(span),
            TokenKind::KwWhile => self.parse_while_stmt(span),
            TokenKind::KwFor => self.parse_for_stmt(span),
            TokenKind::KwReturn => self.parse_return_stmt(span),
            TokenKind::KwBreak => self.parse_keyword_stmt(span, StmtKind::Break),
            TokenKind::KwContinue => self.parse_keyword_stmt(span, StmtKind::Continue),
            TokenKind::KwPass => self.parse_keyword_stmt(span, StmtKind::Pass),
            TokenKind::Identifier(_) if self.peek_is_assign() => self.parse_assign_stmt(span),
            _ => self.parse_expr_stmt(span),
        }
    }

    fn peek_is_assign(&self) -> bool {
        matches!(
            self.peek().map(|t| &t.kind),
            Some(TokenKind::Eq | TokenKind::PlusEq | TokenKind::MinusEq)
        )
    }

    /// Parse `name = expr`, `name += expr` or `name -= expr`
    fn parse_assign_stmt(
        &mut self,
        span: Span,
    ) -> Option<Stmt> {
        let name = match self.current_kind()? {
            TokenKind::Identifier(name) => name.clone(),
            _ => return None,
        };
        self.bump();

        let op = match self.current_kind()? {
            TokenKind::Eq => AssignOp::Set,
            TokenKind::PlusEq => AssignOp::Add,
            TokenKind::MinusEq => AssignOp::Sub,
            _ => return None,
        };
        self.bump();

        let value = self.parse_expression(BP_LOWEST)?;
        self.expect(&TokenKind::Newline)?;

        Some(Stmt {
            kind: StmtKind::Assign { name, op, value },
            span: span.to(self.prev_span()),
        })
    }

    fn parse_expr_stmt(
        &mut self,
        span: Span,
    ) -> Option<Stmt> {
        let expr = self.parse_expression(BP_LOWEST)?;
        self.expect(&TokenKind::Newline)?;
        Some(Stmt {
            kind: StmtKind::Expr(expr),
            span: span.to(self.prev_span()),
        })
    }

    /// `break`, `continue` and `pass` stand alone on their line
    fn parse_keyword_stmt(
        &mut self,
        span: Span,
        kind: StmtKind,
    ) -> Option<Stmt> {
        self.bump();
        self.expect(&TokenKind::Newline)?;
        Some(Stmt { kind, span })
    }

    fn parse_return_stmt(
        &mut self,
        span: Span,
    ) -> Option<Stmt> {
        self.bump();
        let value = if self.at(&TokenKind::Newline) {
            None
        } else {
            Some(self.parse_expression(BP_LOWEST)?)
        };
        self.expect(&TokenKind::Newline)?;
        Some(Stmt {
            kind: StmtKind::Return(value),
            span: span.to(self.prev_span()),
        })
    }

    /// Parse `if cond:` with any `elif cond:` and a final `else:`
    fn parse_if_stmt(
        &mut self,
        span: Span,
    ) -> Option<Stmt> {
        self.bump();
        let condition = self.parse_header_expr()?;
        let body = self.parse_block();
        let mut branches = vec![(condition, body)];

        while self.at(&TokenKind::KwElif) {
            self.bump();
            let condition = self.parse_header_expr()?;
            let body = self.parse_block();
            branches.push((condition, body));
        }

        let else_branch = if self.skip(&TokenKind::KwElse) {
            self.expect(&TokenKind::Colon)?;
            self.expect(&TokenKind::Newline)?;
            Some(self.parse_block())
        } else {
            None
        };

        Some(Stmt {
            kind: StmtKind::If {
                branches,
                else_branch,
            },
            span,
        })
    }

    fn parse_while_stmt(
        &mut self,
        span: Span,
    ) -> Option<Stmt> {
        self.bump();
        let condition = self.parse_header_expr()?;
        let body = self.parse_block();
        Some(Stmt {
            kind: StmtKind::While { condition, body },
            span,
        })
    }

    /// Parse `for VAR in EXPR:`
    fn parse_for_stmt(
        &mut self,
        span: Span,
    ) -> Option<Stmt> {
        self.bump();
        let var = match self.current_kind() {
            Some(TokenKind::Identifier(name)) => name.clone(),
            other => {
                let found = other.cloned().unwrap_or(TokenKind::Eof);
                self.error(super::ParseError::UnexpectedToken(found));
                return None;
            }
        };
        self.bump();
        self.expect(&TokenKind::KwIn)?;
        let iterable = self.parse_header_expr()?;
        let body = self.parse_block();
        Some(Stmt {
            kind: StmtKind::For {
                var,
                iterable,
                body,
            },
            span,
        })
    }

    /// Parse `EXPR :` NEWLINE of a compound statement header
    fn parse_header_expr(&mut self) -> Option<Expr> {
        let expr = self.parse_expression(BP_LOWEST)?;
        self.expect(&TokenKind::Colon)?;
        self.expect(&TokenKind::Newline)?;
        Some(expr)
    }

    /// Parse an indented block; a missing indent yields an empty block
    pub fn parse_block(&mut self) -> Block {
        if !self.skip(&TokenKind::Indent) {
            self.error(super::ParseError::ExpectedBlock);
            return Block::new();
        }
        let body = self.parse_block_body();
        self.skip(&TokenKind::Dedent);
        body
    }

    /// Parse statements until the enclosing block ends
    pub fn parse_block_body(&mut self) -> Block {
        let mut body = Block::new();
        while !self.at_end() && !self.at(&TokenKind::Dedent) {
            body.push(self.parse_stmt());
        }
        body
    }
}
