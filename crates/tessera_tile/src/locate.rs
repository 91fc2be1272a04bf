//! First-declaration positions of class selectors in raw CSS.
//!
//! Works on the original text rather than a parsed tree so positions stay
//! exact for either backend and even for input the lightweight parser
//! rejects.

use tessera_grout::{IndexMap, LineIndex};

use crate::syntax::scan::{ident_end, string_end};

/// Byte offset of the `.` of each class's first selector occurrence, in
/// source order.
pub fn class_offsets(css: &str) -> IndexMap<String, usize> {
    let bytes = css.as_bytes();
    let mut offsets = IndexMap::default();
    let mut candidates: Vec<(usize, usize)> = Vec::new();
    let mut prelude_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = memchr::memmem::find(&bytes[i + 2..], b"*/").map_or(bytes.len(), |end| i + 2 + end + 2);
            }
            b'"' | b'\'' => i = string_end(bytes, i),
            b'{' => {
                let is_at_rule = css[prelude_start..i].trim_start().starts_with('@');
                if !is_at_rule {
                    for &(dot, end) in &candidates {
                        offsets.entry(css[dot + 1..end].to_string()).or_insert(dot);
                    }
                }
                candidates.clear();
                i += 1;
                prelude_start = i;
            }
            b';' | b'}' => {
                candidates.clear();
                i += 1;
                prelude_start = i;
            }
            b'.' => {
                let end = ident_end(bytes, i + 1);
                let starts_name = bytes
                    .get(i + 1)
                    .is_some_and(|b| !b.is_ascii_digit());
                if end > i + 1 && starts_name {
                    candidates.push((i, end));
                }
                i = end.max(i + 1);
            }
            b'\\' => i += 2,
            _ => i += 1,
        }
    }
    offsets
}

/// `(line, column)` of each class's first selector occurrence, 0-based with
/// UTF-16 columns.
pub fn class_positions(css: &str) -> IndexMap<String, (u32, u32)> {
    let index = LineIndex::new(css);
    class_offsets(css)
        .into_iter()
        .map(|(name, offset)| (name, index.line_col(offset)))
        .collect()
}
