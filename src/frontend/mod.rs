//! Script frontend
//!
//! Turns script text into a statement tree: the lexer produces an
//! indentation-aware token stream, the parser builds the tree. `script`
//! splits a script file into named subroutines.

use tracing::debug;

pub mod lexer;
pub mod parser;
pub mod script;

pub use lexer::LexError;
pub use parser::ast::{Program, Stmt, StmtKind};
pub use parser::{ParseError, ParseOutput};
pub use script::{split_subroutines, ScriptFileError, MAIN};

/// Compile script source into a program
///
/// Only inconsistent indentation is fatal. Lines the parser cannot make
/// sense of are kept as unclassified no-ops and listed in `errors`.
pub fn compile(source: &str) -> Result<ParseOutput, LexError> {
    let tokens = lexer::tokenize(source)?;
    debug!("Tokenized into {} tokens", tokens.len());
    Ok(parser::parse(&tokens, source))
}
