//! Byte-level helpers shared by the selector and value rewriters.
//!
//! Every function here copies text it does not understand verbatim, so a
//! rewrite never corrupts an unusual selector; at worst it leaves a name
//! unscoped.

/// Byte length of the UTF-8 sequence starting with `lead`.
#[inline]
fn utf8_len(lead: u8) -> usize {
    match lead {
        0x00..=0x7F => 1,
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        _ => 4,
    }
}

#[inline]
fn is_ident_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' || byte >= 0x80
}

/// End of the identifier starting at `start` (escapes included).
pub fn ident_end(bytes: &[u8], start: usize) -> usize {
    let mut i = start;
    while i < bytes.len() {
        let byte = bytes[i];
        if byte == b'\\' {
            i += 1;
            if i < bytes.len() {
                i += utf8_len(bytes[i]);
            }
        } else if is_ident_byte(byte) {
            i += 1;
        } else {
            break;
        }
    }
    i.min(bytes.len())
}

/// Index just past the string literal opened at `start`.
pub fn string_end(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            byte if byte == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Index of the `)` or `]` closing the bracket opened at `open`,
/// or `bytes.len()` when unbalanced.
pub fn matching_close(bytes: &[u8], open: usize) -> usize {
    let (opener, closer) = match bytes[open] {
        b'[' => (b'[', b']'),
        _ => (b'(', b')'),
    };
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                i = string_end(bytes, i);
                continue;
            }
            b'\\' => i += 1,
            byte if byte == opener => depth += 1,
            byte if byte == closer => {
                depth -= 1;
                if depth == 0 {
                    return i;
                }
            }
            _ => {}
        }
        i += 1;
    }
    bytes.len()
}

/// Split on `separator` outside of brackets and strings.
pub fn split_top_level(text: &str, separator: u8) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut parts = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'(' | b'[' => {
                i = matching_close(bytes, i) + 1;
                continue;
            }
            b'"' | b'\'' => {
                i = string_end(bytes, i);
                continue;
            }
            b'\\' => i += 1,
            byte if byte == separator => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    parts.push(&text[start.min(text.len())..]);
    parts
}

/// Rewrite identifier tokens in a value or prelude.
///
/// `replace` receives each identifier together with the byte just before it
/// and returns `Some(replacement)` to substitute it. Strings and `url(...)`
/// contents are never touched.
pub fn replace_idents(
    text: &str,
    mut replace: impl FnMut(&str, Option<u8>) -> Option<String>,
) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < bytes.len() {
        let byte = bytes[i];
        if byte == b'"' || byte == b'\'' {
            let end = string_end(bytes, i);
            out.push_str(&text[i..end]);
            i = end;
        } else if is_ident_byte(byte) || byte == b'\\' {
            let end = ident_end(bytes, i);
            let ident = &text[i..end];
            if ident.eq_ignore_ascii_case("url") && bytes.get(end) == Some(&b'(') {
                let close = (matching_close(bytes, end) + 1).min(bytes.len());
                out.push_str(&text[i..close]);
                i = close;
                continue;
            }
            let prev = i.checked_sub(1).map(|p| bytes[p]);
            match replace(ident, prev) {
                Some(replacement) => out.push_str(&replacement),
                None => out.push_str(ident),
            }
            i = end;
        } else {
            let len = utf8_len(byte);
            out.push_str(&text[i..i + len]);
            i += len;
        }
    }
    out
}

/// Replace every `:local(...)` marker with `scoped(name)`, keeping a
/// leading `.` or `#`. Returns the rewritten text and the local names in
/// encounter order.
pub fn replace_local_markers(
    text: &str,
    mut scoped: impl FnMut(&str) -> String,
) -> (String, Vec<String>) {
    const MARKER: &str = ":local(";
    let mut out = String::with_capacity(text.len());
    let mut locals = Vec::new();
    let mut rest = text;

    while let Some(pos) = rest.find(MARKER) {
        out.push_str(&rest[..pos]);
        let inner_start = pos + MARKER.len() - 1;
        let close = matching_close(rest.as_bytes(), inner_start);
        if close >= rest.len() {
            out.push_str(&rest[pos..]);
            rest = "";
            break;
        }
        let inner = rest[inner_start + 1..close].trim();
        let (prefix, name) = match inner.as_bytes().first() {
            Some(b'.') | Some(b'#') => inner.split_at(1),
            _ => ("", inner),
        };
        out.push_str(prefix);
        out.push_str(&scoped(name));
        locals.push(name.to_string());
        rest = &rest[close + 1..];
    }
    out.push_str(rest);
    (out, locals)
}
