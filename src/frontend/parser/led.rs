//! Infix expression parsing (led - left denotation)

use super::ast::*;
use super::state::*;
use super::super::lexer::tokens::*;

type InfixFn<'a> = fn(&mut ParserState<'a>, Expr, u8) -> Option<Expr>;

impl<'a> ParserState<'a> {
    /// Get infix binding power and parser for current token
    #[inline]
    pub(crate) fn infix_info(&self) -> Option<(u8, InfixFn<'a>)> {
        match self.current_kind() {
            Some(TokenKind::KwOr) => Some((BP_OR, Self::parse_binary)),
            Some(TokenKind::KwAnd) => Some((BP_AND, Self::parse_binary)),
            Some(TokenKind::EqEq | TokenKind::Neq) => Some((BP_EQ, Self::parse_binary)),
            Some(TokenKind::Lt | TokenKind::Le | TokenKind::Gt | TokenKind::Ge) => {
                Some((BP_CMP, Self::parse_binary))
            }
            Some(TokenKind::Plus | TokenKind::Minus) => Some((BP_ADD, Self::parse_binary)),
            Some(
                TokenKind::Star | TokenKind::Slash | TokenKind::SlashSlash | TokenKind::Percent,
            ) => Some((BP_MUL, Self::parse_binary)),
            Some(TokenKind::LBracket) => Some((BP_CALL, Self::parse_index)),
            _ => None,
        }
    }

    /// Parse binary operator expression
    fn parse_binary(
        &mut self,
        lhs: Expr,
        bp: u8,
    ) -> Option<Expr> {
        let op = match self.current_kind()? {
            TokenKind::KwOr => BinOp::Or,
            TokenKind::KwAnd => BinOp::And,
            TokenKind::EqEq => BinOp::Eq,
            TokenKind::Neq => BinOp::Neq,
            TokenKind::Lt => BinOp::Lt,
            TokenKind::Le => BinOp::Le,
            TokenKind::Gt => BinOp::Gt,
            TokenKind::Ge => BinOp::Ge,
            TokenKind::Plus => BinOp::Add,
            TokenKind::Minus => BinOp::Sub,
            TokenKind::Star => BinOp::Mul,
            TokenKind::Slash => BinOp::Div,
            TokenKind::SlashSlash => BinOp::FloorDiv,
            TokenKind::Percent => BinOp::Mod,
            _ => return None,
        };
        self.bump();

        let rhs = self.parse_expression(bp)?;
        let span = lhs.span().to(rhs.span());
        Some(Expr::BinOp {
            op,
            left: Box::new(lhs),
            right: Box::new(rhs),
            span,
        })
    }

    /// Parse indexing `expr[index]`
    fn parse_index(
        &mut self,
        lhs: Expr,
        _bp: u8,
    ) -> Option<Expr> {
        self.bump();
        let index = self.parse_expression(BP_LOWEST)?;
        self.expect(&TokenKind::RBracket)?;
        let span = lhs.span().to(self.prev_span());
        Some(Expr::Index {
            expr: Box::new(lhs),
            index: Box::new(index),
            span,
        })
    }
}
