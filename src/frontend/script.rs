//! Script files
//!
//! A script file holds the entry script and any number of subroutines:
//!
//! ```text
//! def harvest_row:
//!     for i in range(3):
//!         harvest()
//!         move_right()
//!
//! move_to(0, 2)
//! harvest_row()
//! ```
//!
//! `def NAME:` headers at column 0 open a subroutine whose body is the
//! indented lines below it. Every other column-0 line belongs to `main`.
//! Each source keeps the file's line numbering (lines owned by other
//! sections are blanked), so diagnostics point into the file.

use indexmap::IndexMap;
use thiserror::Error;

/// Name of the entry subroutine
pub const MAIN: &str = "main";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptFileError {
    #[error("line {line}: malformed subroutine header `{text}`, expected `def NAME:`")]
    InvalidHeader { line: usize, text: String },

    #[error("line {line}: subroutine `{name}` is defined twice")]
    Duplicate { line: usize, name: String },
}

/// Split a script file into named subroutine sources
///
/// `main` is present only when the file has top-level statements.
pub fn split_subroutines(source: &str) -> Result<IndexMap<String, String>, ScriptFileError> {
    let lines: Vec<&str> = source.lines().collect();
    // owner[i] = section index for line i; None for main
    let mut owner: Vec<Option<usize>> = Vec::with_capacity(lines.len());
    let mut sections: Vec<(String, usize)> = Vec::new();
    let mut current: Option<usize> = None;

    for (idx, line) in lines.iter().enumerate() {
        let is_code = !line.trim().is_empty() && !line.trim_start().starts_with('#');
        let at_column_zero = !line.starts_with([' ', '\t']);

        if is_code && at_column_zero {
            if let Some(rest) = line.strip_prefix("def ") {
                let name = parse_header(rest).ok_or_else(|| ScriptFileError::InvalidHeader {
                    line: idx + 1,
                    text: line.trim().to_string(),
                })?;
                if name == MAIN || sections.iter().any(|(n, _)| *n == name) {
                    return Err(ScriptFileError::Duplicate {
                        line: idx + 1,
                        name,
                    });
                }
                sections.push((name, idx));
                current = Some(sections.len() - 1);
                // the header itself belongs to no section
                owner.push(Some(usize::MAX));
                continue;
            }
            current = None;
        }
        owner.push(current);
    }

    let mut result = IndexMap::new();

    let has_main = lines
        .iter()
        .zip(&owner)
        .any(|(line, o)| o.is_none() && !line.trim().is_empty());
    if has_main {
        let text = render(&lines, &owner, None, 0);
        result.insert(MAIN.to_string(), text);
    }

    for (section, (name, _)) in sections.iter().enumerate() {
        let indent = lines
            .iter()
            .zip(&owner)
            .filter(|(line, o)| **o == Some(section) && !line.trim().is_empty())
            .map(|(line, _)| leading_whitespace(line))
            .min()
            .unwrap_or(0);
        let text = render(&lines, &owner, Some(section), indent);
        result.insert(name.clone(), text);
    }

    Ok(result)
}

/// `NAME:` or `NAME():`
fn parse_header(rest: &str) -> Option<String> {
    let rest = rest.trim();
    let name = rest.strip_suffix(':')?.trim_end();
    let name = name.strip_suffix("()").unwrap_or(name).trim_end();
    let mut chars = name.chars();
    let first = chars.next()?;
    if !(first.is_alphabetic() || first == '_') {
        return None;
    }
    if !chars.all(|c| c.is_alphanumeric() || c == '_') {
        return None;
    }
    Some(name.to_string())
}

fn leading_whitespace(line: &str) -> usize {
    line.chars().take_while(|c| *c == ' ' || *c == '\t').count()
}

/// Lines owned by `section`, dedented by `indent`; others blanked
fn render(
    lines: &[&str],
    owner: &[Option<usize>],
    section: Option<usize>,
    indent: usize,
) -> String {
    let mut out = String::new();
    for (line, o) in lines.iter().zip(owner) {
        if *o == section {
            let skip: usize = line.chars().take(indent).map(char::len_utf8).sum();
            if leading_whitespace(line) >= indent {
                out.push_str(&line[skip..]);
            } else {
                out.push_str(line.trim_start());
            }
        }
        out.push('\n');
    }
    out
}
