//! Lightweight CSS syntax layer for the ICSS pipeline backend.

mod ast;
mod parser;
mod printer;
pub mod scan;

pub use ast::{unquote, AtRule, Comment, Declaration, Node, Rule, Stylesheet};
pub use parser::parse;
pub use printer::{print, Printed};

use tessera_grout::LineIndex;

use crate::error::TransformError;

/// Build a parse error pointing at `offset` in `source`.
pub(crate) fn error_at(
    source: &str,
    file: &str,
    offset: usize,
    message: impl Into<String>,
) -> TransformError {
    let (line, column) = LineIndex::new(source).line_col(offset);
    TransformError::Parse {
        file: file.to_string(),
        line: line + 1,
        column: column + 1,
        message: message.into(),
    }
}
