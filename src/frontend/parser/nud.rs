//! Prefix expression parsing (nud - null denotation)

use super::ast::*;
use super::state::*;
use super::super::lexer::tokens::*;

impl<'a> ParserState<'a> {
    /// Get the prefix parser for current token
    #[inline]
    pub(crate) fn prefix_info(&self) -> Option<fn(&mut Self) -> Option<Expr>> {
        match self.current_kind() {
            Some(TokenKind::Minus | TokenKind::Plus | TokenKind::KwNot) => Some(Self::parse_unary),
            Some(
                TokenKind::IntLiteral(_)
                | TokenKind::FloatLiteral(_)
                | TokenKind::StringLiteral(_)
                | TokenKind::BoolLiteral(_)
                | TokenKind::NoneLiteral,
            ) => Some(Self::parse_literal),
            Some(TokenKind::Identifier(_)) => Some(Self::parse_identifier),
            Some(TokenKind::LParen) => Some(Self::parse_group),
            Some(TokenKind::LBracket) => Some(Self::parse_list),
            _ => None,
        }
    }

    /// Parse unary operator expression
    fn parse_unary(&mut self) -> Option<Expr> {
        let span = self.span();
        let (op, bp) = match self.current_kind() {
            Some(TokenKind::Minus) => (Some(UnOp::Neg), BP_UNARY),
            Some(TokenKind::Plus) => (None, BP_UNARY),
            Some(TokenKind::KwNot) => (Some(UnOp::Not), BP_NOT),
            _ => return None,
        };
        self.bump();

        let operand = self.parse_expression(bp)?;
        Some(match op {
            Some(op) => Expr::UnOp {
                op,
                span: span.to(operand.span()),
                expr: Box::new(operand),
            },
            // unary plus is the identity
            None => operand,
        })
    }

    fn parse_literal(&mut self) -> Option<Expr> {
        let span = self.span();
        let lit = match self.current_kind()? {
            TokenKind::IntLiteral(n) => Literal::Int(*n),
            TokenKind::FloatLiteral(f) => Literal::Float(*f),
            TokenKind::StringLiteral(s) => Literal::Str(s.clone()),
            TokenKind::BoolLiteral(b) => Literal::Bool(*b),
            TokenKind::NoneLiteral => Literal::None,
            _ => return None,
        };
        self.bump();
        Some(Expr::Lit(lit, span))
    }

    /// Parse identifier: variable reference or call by name
    fn parse_identifier(&mut self) -> Option<Expr> {
        let span = self.span();
        let name = match self.current_kind()? {
            TokenKind::Identifier(name) => name.clone(),
            _ => return None,
        };
        self.bump();

        if !self.at(&TokenKind::LParen) {
            return Some(Expr::Var(name, span));
        }
        self.bump();

        let mut args = Vec::new();
        if !self.at(&TokenKind::RParen) {
            loop {
                args.push(self.parse_expression(BP_LOWEST)?);
                if !self.skip(&TokenKind::Comma) {
                    break;
                }
                // trailing comma
                if self.at(&TokenKind::RParen) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen)?;

        Some(Expr::Call {
            name,
            args,
            span: span.to(self.prev_span()),
        })
    }

    /// Parse parenthesized expression
    fn parse_group(&mut self) -> Option<Expr> {
        self.bump();
        let expr = self.parse_expression(BP_LOWEST)?;
        self.expect(&TokenKind::RParen)?;
        Some(expr)
    }

    /// Parse list literal `[a, b, c]`
    fn parse_list(&mut self) -> Option<Expr> {
        let span = self.span();
        self.bump();

        let mut items = Vec::new();
        while !self.at(&TokenKind::RBracket) {
            items.push(self.parse_expression(BP_LOWEST)?);
            if !self.skip(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RBracket)?;

        Some(Expr::List(items, span.to(self.prev_span())))
    }
}
