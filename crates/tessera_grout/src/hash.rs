//! Fast hashing utilities using xxHash3.
//!
//! Provides the hash component of scoped class names and content hashes
//! used to skip rewriting unchanged output files.

use xxhash_rust::xxh3::{xxh3_128, xxh3_64};

/// Alphabet used for scoped-name hashes. Every character is legal inside a
/// CSS identifier, so the digest can be spliced into a class name as-is.
const SCOPE_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// Compute a 64-bit hash of the given string using xxHash3.
#[inline]
pub fn hash_str(data: &str) -> u64 {
    xxh3_64(data.as_bytes())
}

/// Convert a hash to a hex string (16 characters).
#[inline]
pub fn hash_to_hex(hash: u64) -> String {
    format!("{:016x}", hash)
}

/// Compute hash of a string and return as hex.
#[inline]
pub fn content_hash(content: &str) -> String {
    hash_to_hex(hash_str(content))
}

/// Compute a CSS-identifier-safe digest of `parts`, truncated to `len` characters.
///
/// The parts are hashed with a separator so that `("ab", "c")` and
/// `("a", "bc")` produce different digests. At most 21 characters are
/// available (128 bits / 6 bits per character).
pub fn scope_hash(parts: &[&str], len: usize) -> String {
    let mut input = String::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            input.push('\u{0}');
        }
        input.push_str(part);
    }

    let mut value = xxh3_128(input.as_bytes());
    let len = len.clamp(1, 21);
    let mut out = String::with_capacity(len);
    for _ in 0..len {
        out.push(SCOPE_ALPHABET[(value & 0x3f) as usize] as char);
        value >>= 6;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_consistency() {
        let content = "Hello, World!";
        assert_eq!(hash_str(content), hash_str(content));
    }

    #[test]
    fn test_hex_format() {
        let hex = hash_to_hex(hash_str("test"));
        assert_eq!(hex.len(), 16);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_scope_hash_is_stable_and_sized() {
        let a = scope_hash(&["src/button.css", "primary"], 5);
        let b = scope_hash(&["src/button.css", "primary"], 5);
        assert_eq!(a, b);
        assert_eq!(a.len(), 5);
        assert!(a
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_scope_hash_separates_parts() {
        assert_ne!(scope_hash(&["ab", "c"], 8), scope_hash(&["a", "bc"], 8));
    }

    #[test]
    fn test_scope_hash_clamps_length() {
        assert_eq!(scope_hash(&["x"], 64).len(), 21);
        assert_eq!(scope_hash(&["x"], 0).len(), 1);
    }
}
