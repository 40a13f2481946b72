//! Pratt Parser expression parsing

use super::ast::*;
use super::state::*;

impl<'a> ParserState<'a> {
    /// Parse an expression using Pratt parser
    ///
    /// # Algorithm
    /// 1. Parse prefix expression (nud)
    /// 2. While next token is infix operator with binding power > min_bp,
    ///    parse infix expression (led)
    #[inline]
    pub fn parse_expression(
        &mut self,
        min_bp: u8,
    ) -> Option<Expr> {
        let prefix_fn = match self.prefix_info() {
            Some(f) => f,
            None => {
                let found = self
                    .current_kind()
                    .cloned()
                    .unwrap_or(crate::frontend::lexer::tokens::TokenKind::Eof);
                self.error(super::ParseError::UnexpectedToken(found));
                return None;
            }
        };
        let mut lhs = (prefix_fn)(self)?;

        loop {
            if self.at_end() {
                break;
            }
            let (bp, infix_fn) = match self.infix_info() {
                Some(info) => info,
                None => break,
            };
            // left-associative: same-level operators go back to the outer loop
            if bp <= min_bp {
                break;
            }
            lhs = (infix_fn)(self, lhs, bp)?;
        }

        Some(lhs)
    }
}
