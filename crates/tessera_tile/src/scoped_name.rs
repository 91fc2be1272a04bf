//! Scoped name generation.

use tessera_grout::hash::scope_hash;
use tessera_grout::IndexMap;

use crate::options::{ModuleOptions, ScopedNameGenerator};

/// Default `[hash]` length when no explicit `:N` is given.
const DEFAULT_HASH_LENGTH: usize = 8;

/// Strip a query/hash suffix (`a.css?module` -> `a.css`).
pub fn clean_id(id: &str) -> &str {
    id.split(['?', '#']).next().unwrap_or(id)
}

/// `[name]` value: file name up to its first dot, made identifier-safe.
pub fn file_stem(id: &str) -> String {
    let path = clean_id(id);
    let base = path.rsplit(['/', '\\']).next().unwrap_or(path);
    let stem = base.split('.').next().unwrap_or(base);
    stem.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Render a name template for one local identifier.
pub fn render_template(template: &str, local: &str, id: &str, hash_prefix: &str) -> String {
    let mut out = String::with_capacity(template.len() + local.len() + 8);
    let mut rest = template;

    while let Some(open) = rest.find('[') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find(']') else {
            out.push_str(&rest[open..]);
            rest = "";
            break;
        };
        let token = &after[..close];
        match token {
            "name" => out.push_str(&file_stem(id)),
            "local" => out.push_str(local),
            "hash" => out.push_str(&scope_hash(&[hash_prefix, clean_id(id), local], DEFAULT_HASH_LENGTH)),
            _ => match token.strip_prefix("hash:").and_then(|n| n.parse::<usize>().ok()) {
                Some(len) => out.push_str(&scope_hash(&[hash_prefix, clean_id(id), local], len)),
                None => {
                    out.push('[');
                    out.push_str(token);
                    out.push(']');
                }
            },
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);

    ensure_valid_start(out)
}

/// A class name may not start with a digit, or with `-` followed by a digit or `-`.
fn ensure_valid_start(name: String) -> String {
    let bytes = name.as_bytes();
    let invalid = match bytes.first() {
        Some(b) if b.is_ascii_digit() => true,
        Some(b'-') => matches!(bytes.get(1), Some(b) if b.is_ascii_digit() || *b == b'-'),
        _ => false,
    };
    if invalid {
        let mut fixed = String::with_capacity(name.len() + 1);
        fixed.push('_');
        fixed.push_str(&name);
        fixed
    } else {
        name
    }
}

/// Assigns scoped names for one file and remembers them in generation order.
pub struct ScopedNames<'a> {
    generator: &'a ScopedNameGenerator,
    options: &'a ModuleOptions,
    id: &'a str,
    css: &'a str,
    names: IndexMap<String, String>,
}

impl<'a> ScopedNames<'a> {
    pub fn new(
        generator: &'a ScopedNameGenerator,
        options: &'a ModuleOptions,
        id: &'a str,
        css: &'a str,
    ) -> Self {
        Self {
            generator,
            options,
            id,
            css,
            names: IndexMap::default(),
        }
    }

    /// Scoped name for `local`, generating it on first use.
    pub fn get(&mut self, local: &str) -> String {
        if let Some(scoped) = self.names.get(local) {
            return scoped.clone();
        }
        let scoped = match self.generator {
            ScopedNameGenerator::Template(template) => {
                render_template(template, local, self.id, &self.options.hash_prefix)
            }
            ScopedNameGenerator::Function(generate) => generate(local, self.id, self.css),
        };
        self.names.insert(local.to_string(), scoped.clone());
        scoped
    }

    /// Every generated scoped name, in generation order.
    pub fn local_classes(&self) -> Vec<String> {
        self.names.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("/src/button.module.css"), "button");
        assert_eq!(file_stem("C:\\src\\nav bar.css?inline"), "nav_bar");
    }

    #[test]
    fn test_render_template() {
        let name = render_template("[name]_[local]_[hash:5]", "primary", "/src/button.module.css", "");
        assert!(name.starts_with("button_primary_"));
        assert_eq!(name.len(), "button_primary_".len() + 5);
    }

    #[test]
    fn test_hash_prefix_salts_hash() {
        let a = render_template("[hash:8]", "x", "a.css", "");
        let b = render_template("[hash:8]", "x", "a.css", "salt");
        assert_ne!(a, b);
    }

    #[test]
    fn test_query_does_not_change_hash() {
        let a = render_template("[local]_[hash]", "x", "a.css", "");
        let b = render_template("[local]_[hash]", "x", "a.css?used", "");
        assert_eq!(a, b);
    }

    #[test]
    fn test_unknown_placeholder_is_kept() {
        assert_eq!(render_template("[folder]-[local]", "x", "a.css", ""), "[folder]-x");
    }

    #[test]
    fn test_leading_digit_is_escaped() {
        assert_eq!(render_template("[local]", "1col", "a.css", ""), "_1col");
        assert_eq!(render_template("[local]", "-2", "a.css", ""), "_-2");
        assert_eq!(render_template("[local]", "-a", "a.css", ""), "-a");
    }

    #[test]
    fn test_function_generator_is_memoized() {
        let generator = ScopedNameGenerator::Function(Arc::new(|name, file, _| {
            format!("{}__{}", file_stem(file), name)
        }));
        let options = ModuleOptions::default();
        let mut names = ScopedNames::new(&generator, &options, "/x/card.css", ".a{}");
        assert_eq!(names.get("a"), "card__a");
        assert_eq!(names.get("b"), "card__b");
        assert_eq!(names.get("a"), "card__a");
        assert_eq!(names.local_classes(), vec!["card__a", "card__b"]);
    }
}
