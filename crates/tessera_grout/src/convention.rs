//! Naming conventions for export aliases.

/// Convert a CSS class name to camelCase.
///
/// Words are split on any non-alphanumeric character and on lower-to-upper
/// case boundaries. The first word is lowercased, later words are
/// capitalized: `btn-primary` -> `btnPrimary`, `Nav_Item` -> `navItem`.
pub fn camel_case(name: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in name.chars() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }

    let mut out = String::with_capacity(name.len());
    for (i, word) in words.iter().enumerate() {
        let lower = word.to_lowercase();
        if i == 0 {
            out.push_str(&lower);
            continue;
        }
        let mut chars = lower.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// Convert only dashes to camelCase: `btn-primary_x` -> `btnPrimary_x`.
///
/// Characters other than `-` are kept untouched, and runs of dashes collapse.
pub fn dashes_camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for c in name.chars() {
        if c == '-' {
            upper_next = !out.is_empty();
            continue;
        }
        if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("btn-primary"), "btnPrimary");
        assert_eq!(camel_case("btn_primary"), "btnPrimary");
        assert_eq!(camel_case("Nav-Item"), "navItem");
        assert_eq!(camel_case("fooBar"), "fooBar");
        assert_eq!(camel_case("button"), "button");
        assert_eq!(camel_case("col-2x"), "col2x");
    }

    #[test]
    fn test_dashes_camel_case() {
        assert_eq!(dashes_camel_case("btn-primary"), "btnPrimary");
        assert_eq!(dashes_camel_case("btn-primary_x"), "btnPrimary_x");
        assert_eq!(dashes_camel_case("a--b"), "aB");
        assert_eq!(dashes_camel_case("-leading"), "leading");
    }
}
