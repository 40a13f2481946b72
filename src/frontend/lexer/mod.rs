//! Lexer module
//!
//! Scripts are line oriented. Each non-blank, non-comment line becomes a run
//! of tokens closed by `Newline`; changes in leading whitespace become
//! `Indent`/`Dedent` tokens. Characters the lexer cannot classify become
//! `Error` tokens instead of failing, so one bad line never hides the rest of
//! a script. Only inconsistent indentation is a hard error.

pub mod tokens;

use tokens::*;

pub use tokenizer::tokenize;

/// Tab stops count as this many columns of indentation
pub const TAB_WIDTH: usize = 4;

/// Lexer error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LexError {
    #[error("line {line}: unindent does not match any outer indentation level")]
    InconsistentIndent { line: usize },
}

/// Tokenize source code
mod tokenizer {
    use super::*;
    use crate::util::span::{Position, Span};
    use std::iter::Peekable;
    use std::str::Chars;

    pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        let mut indents: Vec<usize> = vec![0];
        let mut last_line = 0;

        for (idx, raw) in source.lines().enumerate() {
            let line = idx + 1;
            let (width, body_start) = measure_indent(raw);
            let body = &raw[body_start..];
            let trimmed = body.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let layout = Span::new(Position::new(line, 1), Position::new(line, body_start + 1));
            let top = indents.last().copied().unwrap_or(0);
            if width > top {
                indents.push(width);
                tokens.push(Token {
                    kind: TokenKind::Indent,
                    span: layout,
                });
            } else if width < top {
                while indents.last().copied().unwrap_or(0) > width {
                    indents.pop();
                    tokens.push(Token {
                        kind: TokenKind::Dedent,
                        span: layout,
                    });
                }
                if indents.last().copied().unwrap_or(0) != width {
                    return Err(LexError::InconsistentIndent { line });
                }
            }

            let mut lexer = LineLexer::new(body, line, body_start + 1);
            while let Some(token) = lexer.next_token() {
                tokens.push(token);
            }
            tokens.push(Token {
                kind: TokenKind::Newline,
                span: Span::new(lexer.position(), lexer.position()),
            });
            last_line = line;
        }

        let end = Span::new(Position::new(last_line + 1, 1), Position::new(last_line + 1, 1));
        for _ in 1..indents.len() {
            tokens.push(Token {
                kind: TokenKind::Dedent,
                span: end,
            });
        }
        tokens.push(Token {
            kind: TokenKind::Eof,
            span: end,
        });
        Ok(tokens)
    }

    /// Indentation width and the byte index where the line body starts
    fn measure_indent(line: &str) -> (usize, usize) {
        let mut width = 0;
        for (idx, c) in line.char_indices() {
            match c {
                ' ' => width += 1,
                '\t' => width += TAB_WIDTH - width % TAB_WIDTH,
                _ => return (width, idx),
            }
        }
        (width, line.len())
    }

    struct LineLexer<'a> {
        chars: Peekable<Chars<'a>>,
        line: usize,
        column: usize,
        start_column: usize,
    }

    impl<'a> LineLexer<'a> {
        fn new(
            body: &'a str,
            line: usize,
            column: usize,
        ) -> Self {
            Self {
                chars: body.chars().peekable(),
                line,
                column,
                start_column: column,
            }
        }

        fn position(&self) -> Position {
            Position::new(self.line, self.column)
        }

        fn span(&self) -> Span {
            Span::new(Position::new(self.line, self.start_column), self.position())
        }

        fn advance(&mut self) -> Option<char> {
            let c = self.chars.next()?;
            self.column += 1;
            Some(c)
        }

        fn peek(&mut self) -> Option<&char> {
            self.chars.peek()
        }

        fn make_token(
            &self,
            kind: TokenKind,
        ) -> Token {
            Token {
                kind,
                span: self.span(),
            }
        }

        /// Consume the next char when it matches
        fn eat(
            &mut self,
            expected: char,
        ) -> bool {
            if self.peek() == Some(&expected) {
                self.advance();
                true
            } else {
                false
            }
        }

        fn next_token(&mut self) -> Option<Token> {
            while matches!(self.peek(), Some(' ' | '\t' | '\r')) {
                self.advance();
            }

            self.start_column = self.column;
            let c = self.advance()?;

            let kind = match c {
                '#' => {
                    // trailing comment: swallow the rest of the line
                    while self.advance().is_some() {}
                    return None;
                }
                c if is_identifier_start(c) => return Some(self.scan_identifier(c)),
                c if c.is_ascii_digit() => return Some(self.scan_number(c)),
                '"' | '\'' => return Some(self.scan_string(c)),
                '+' => {
                    if self.eat('=') {
                        TokenKind::PlusEq
                    } else {
                        TokenKind::Plus
                    }
                }
                '-' => {
                    if self.eat('=') {
                        TokenKind::MinusEq
                    } else {
                        TokenKind::Minus
                    }
                }
                '*' => TokenKind::Star,
                '/' => {
                    if self.eat('/') {
                        TokenKind::SlashSlash
                    } else {
                        TokenKind::Slash
                    }
                }
                '%' => TokenKind::Percent,
                '=' => {
                    if self.eat('=') {
                        TokenKind::EqEq
                    } else {
                        TokenKind::Eq
                    }
                }
                '!' => {
                    if self.eat('=') {
                        TokenKind::Neq
                    } else {
                        TokenKind::Error("!".to_string())
                    }
                }
                '<' => {
                    if self.eat('=') {
                        TokenKind::Le
                    } else {
                        TokenKind::Lt
                    }
                }
                '>' => {
                    if self.eat('=') {
                        TokenKind::Ge
                    } else {
                        TokenKind::Gt
                    }
                }
                '(' => TokenKind::LParen,
                ')' => TokenKind::RParen,
                '[' => TokenKind::LBracket,
                ']' => TokenKind::RBracket,
                ',' => TokenKind::Comma,
                ':' => TokenKind::Colon,
                other => TokenKind::Error(other.to_string()),
            };
            Some(self.make_token(kind))
        }

        fn scan_identifier(
            &mut self,
            first_char: char,
        ) -> Token {
            let mut value = String::new();
            value.push(first_char);

            while let Some(&c) = self.peek() {
                if is_identifier_char(c) {
                    value.push(c);
                    self.advance();
                } else {
                    break;
                }
            }

            let kind = keyword_from_str(&value).unwrap_or(TokenKind::Identifier(value));
            self.make_token(kind)
        }

        fn scan_number(
            &mut self,
            first_char: char,
        ) -> Token {
            let mut value = String::new();
            value.push(first_char);
            let mut is_float = false;

            while let Some(&c) = self.peek() {
                if c.is_ascii_digit() {
                    value.push(c);
                    self.advance();
                } else if c == '_' {
                    self.advance();
                } else if c == '.' && !is_float {
                    is_float = true;
                    value.push(c);
                    self.advance();
                } else {
                    break;
                }
            }

            let kind = if is_float {
                value
                    .parse::<f64>()
                    .map(TokenKind::FloatLiteral)
                    .unwrap_or(TokenKind::Error(value))
            } else {
                value
                    .parse::<i64>()
                    .map(TokenKind::IntLiteral)
                    .unwrap_or(TokenKind::Error(value))
            };
            self.make_token(kind)
        }

        fn scan_string(
            &mut self,
            quote: char,
        ) -> Token {
            let mut value = String::new();

            while let Some(c) = self.advance() {
                match c {
                    c if c == quote => return self.make_token(TokenKind::StringLiteral(value)),
                    '\\' => match self.advance() {
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some(other) => value.push(other),
                        None => break,
                    },
                    c => value.push(c),
                }
            }

            // unterminated string
            let mut text = String::new();
            text.push(quote);
            text.push_str(&value);
            self.make_token(TokenKind::Error(text))
        }
    }

    fn keyword_from_str(word: &str) -> Option<TokenKind> {
        let kind = match word {
            "if" => TokenKind::KwIf,
            "elif" => TokenKind::KwElif,
            "else" => TokenKind::KwElse,
            "while" => TokenKind::KwWhile,
            "for" => TokenKind::KwFor,
            "in" => TokenKind::KwIn,
            "return" => TokenKind::KwReturn,
            "break" => TokenKind::KwBreak,
            "continue" => TokenKind::KwContinue,
            "pass" => TokenKind::KwPass,
            "and" => TokenKind::KwAnd,
            "or" => TokenKind::KwOr,
            "not" => TokenKind::KwNot,
            "True" | "true" => TokenKind::BoolLiteral(true),
            "False" | "false" => TokenKind::BoolLiteral(false),
            "None" | "none" | "null" => TokenKind::NoneLiteral,
            _ => return None,
        };
        Some(kind)
    }

    fn is_identifier_start(c: char) -> bool {
        c.is_alphabetic() || c == '_'
    }

    fn is_identifier_char(c: char) -> bool {
        c.is_alphanumeric() || c == '_'
    }
}
