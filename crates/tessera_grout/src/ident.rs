//! JavaScript identifier rules.
//!
//! Generated ES modules bind every export to a `const`, so export names
//! coming from CSS (`btn-primary`, `2col`, `class`) have to be turned into
//! legal binding identifiers, and the original name surfaced through
//! `export { id as "btn-primary" }` where the target runtime allows it.

use phf::phf_set;

/// Words that can never be used as a binding identifier in module (strict) code.
static RESERVED_WORDS_SET: phf::Set<&'static str> = phf_set! {
    // Keywords
    "break", "case", "catch", "class", "const", "continue", "debugger",
    "default", "delete", "do", "else", "export", "extends", "finally",
    "for", "function", "if", "import", "in", "instanceof", "new",
    "return", "super", "switch", "this", "throw", "try", "typeof",
    "var", "void", "while", "with",
    // Module code is always strict
    "await", "yield", "let", "static", "implements", "interface",
    "package", "private", "protected", "public", "enum",
    // Literals
    "null", "true", "false",
    // Not assignable in strict mode
    "arguments", "eval",
};

/// Check if a word is reserved in ES module code.
#[inline]
pub fn is_reserved_word(word: &str) -> bool {
    RESERVED_WORDS_SET.contains(word)
}

#[inline]
fn is_id_start(c: char) -> bool {
    c == '$' || c == '_' || c.is_ascii_alphabetic() || (!c.is_ascii() && c.is_alphabetic())
}

#[inline]
fn is_id_continue(c: char) -> bool {
    is_id_start(c) || c.is_ascii_digit() || (!c.is_ascii() && c.is_alphanumeric())
}

/// Check if `name` is an IdentifierName (reserved words included).
///
/// `export { a as class }` is legal because export names only need to be
/// IdentifierNames, not binding identifiers.
pub fn is_identifier_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if is_id_start(c) => chars.all(is_id_continue),
        _ => false,
    }
}

/// Check if `name` can be used as a binding identifier.
pub fn is_valid_identifier(name: &str) -> bool {
    is_identifier_name(name) && !is_reserved_word(name)
}

/// Turn an arbitrary string into a binding identifier.
///
/// Illegal characters become `_`, a leading digit or a reserved word gets a
/// `_` prefix, and an empty input becomes `_`.
pub fn sanitize_identifier(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 1);
    for (i, c) in name.chars().enumerate() {
        let legal = if i == 0 {
            is_id_start(c)
        } else {
            is_id_continue(c)
        };
        if legal {
            out.push(c);
        } else if i == 0 && c.is_ascii_digit() {
            out.push('_');
            out.push(c);
        } else {
            out.push('_');
        }
    }

    if out.is_empty() || is_reserved_word(&out) {
        out.insert(0, '_');
    }
    out
}

/// Quote a string as a JavaScript string literal (double quotes).
pub fn quote(value: &str) -> String {
    // JSON string syntax is a subset of JS string literal syntax, except for
    // U+2028/U+2029 which serde_json leaves raw but older engines reject.
    let json = serde_json::to_string(value).unwrap_or_else(|_| String::from("\"\""));
    json.replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}
