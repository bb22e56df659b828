//! Java syntax tree, parser and printer used by the advice migrator.
//!
//! The tree is an owned, mutable model of a compilation unit. Rewrites edit it
//! in place and [`print`] turns it back into source text. Declarations and
//! statements the rewrites never touch are emitted from their original text,
//! along with the blank lines and comments around them, so an edit to one
//! statement leaves the rest of the file byte-for-byte intact.
//!
//! Entry points:
//! - [`parse_java`]: text to [`CompilationUnit`].
//! - [`print`] / [`print_with`]: [`CompilationUnit`] back to text.
//! - [`visit`]: read-only and mutable tree walkers.
//! - [`StmtPath`]: stable addresses of statements for two-phase edits.

mod ast;
mod ids;
mod lexer;
mod parser;
mod path;
mod printer;
pub mod visit;

pub use ast::*;
pub use ids::NodeId;
pub use lexer::{lex, Token, TokenKind};
pub use path::{Step, StmtPath};
pub use printer::{print, print_canonical, print_with, PrintOptions};

use serde::Serialize;
use text_size::{TextRange, TextSize};

/// A syntax error with a human readable location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{line}:{column}: {message}")]
pub struct ParseError {
    pub message: String,
    /// Byte offset of the offending token.
    pub offset: u32,
    /// 1-based line.
    pub line: u32,
    /// 1-based column, counted in characters.
    pub column: u32,
}

impl ParseError {
    pub(crate) fn at(text: &str, range: TextRange, message: impl Into<String>) -> Self {
        let offset = u32::from(range.start()).min(text.len() as u32);
        let (line, column) = line_col(text, TextSize::from(offset));
        Self {
            message: message.into(),
            offset,
            line,
            column,
        }
    }
}

fn line_col(text: &str, offset: TextSize) -> (u32, u32) {
    let offset = usize::from(offset);
    let before = text.get(..offset).unwrap_or(text);
    let line = before.matches('\n').count() as u32 + 1;
    let line_start = before.rfind('\n').map(|idx| idx + 1).unwrap_or(0);
    let column = before[line_start..].chars().count() as u32 + 1;
    (line, column)
}

/// Parses a whole compilation unit.
///
/// The parser stops at the first error; there is no recovery since a
/// partially understood file must never be rewritten.
pub fn parse_java(text: &str) -> Result<CompilationUnit, ParseError> {
    let tokens = lexer::lex(text)?;
    let unit = parser::Parser::new(text, tokens).parse_compilation_unit()?;
    tracing::trace!(
        target = "indy.syntax",
        types = unit.types.len(),
        imports = unit.imports.len(),
        "parsed compilation unit"
    );
    Ok(unit)
}

#[cfg(test)]
mod tests;
