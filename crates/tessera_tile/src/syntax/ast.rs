//! Minimal CSS tree.
//!
//! Just enough structure for the ICSS pipeline: rules, at-rules,
//! declarations and comments. Selectors, params and values stay raw text.
//! `source` is the byte offset of the node in the original input, or `None`
//! for nodes synthesized by a pipeline stage.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stylesheet {
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Rule(Rule),
    AtRule(AtRule),
    Decl(Declaration),
    Comment(Comment),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub selector: String,
    pub nodes: Vec<Node>,
    pub source: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtRule {
    pub name: String,
    pub params: String,
    /// `None` for statement at-rules (`@import ...;`).
    pub nodes: Option<Vec<Node>>,
    pub source: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub prop: String,
    pub value: String,
    pub source: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub text: String,
    pub source: Option<usize>,
}

impl Rule {
    pub fn new(selector: impl Into<String>, nodes: Vec<Node>) -> Self {
        Self {
            selector: selector.into(),
            nodes,
            source: None,
        }
    }

    /// `:import(...)` rule: returns the unquoted specifier.
    pub fn icss_import_specifier(&self) -> Option<&str> {
        let inner = self
            .selector
            .trim()
            .strip_prefix(":import(")?
            .strip_suffix(')')?
            .trim();
        Some(unquote(inner))
    }

    pub fn is_icss_export(&self) -> bool {
        self.selector.trim() == ":export"
    }

    pub fn is_icss(&self) -> bool {
        self.is_icss_export() || self.icss_import_specifier().is_some()
    }

    /// Declarations directly inside this rule.
    pub fn declarations(&self) -> impl Iterator<Item = &Declaration> {
        self.nodes.iter().filter_map(|node| match node {
            Node::Decl(decl) => Some(decl),
            _ => None,
        })
    }
}

impl AtRule {
    pub fn is_keyframes(&self) -> bool {
        self.name.eq_ignore_ascii_case("keyframes") || self.name.ends_with("-keyframes")
    }
}

impl Declaration {
    pub fn new(prop: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            prop: prop.into(),
            value: value.into(),
            source: None,
        }
    }
}

/// Strip one pair of matching quotes.
pub fn unquote(text: &str) -> &str {
    let bytes = text.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        if (first == b'"' || first == b'\'') && bytes[bytes.len() - 1] == first {
            return &text[1..text.len() - 1];
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icss_import_specifier() {
        let rule = Rule::new(":import(\"./b.css\")", vec![]);
        assert_eq!(rule.icss_import_specifier(), Some("./b.css"));
        let rule = Rule::new(":import('./b.css')", vec![]);
        assert_eq!(rule.icss_import_specifier(), Some("./b.css"));
        let rule = Rule::new(":import(./b.css)", vec![]);
        assert_eq!(rule.icss_import_specifier(), Some("./b.css"));
        assert!(Rule::new(":export", vec![]).is_icss());
        assert!(!Rule::new(".a", vec![]).is_icss());
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("\"a\""), "a");
        assert_eq!(unquote("'a'"), "a");
        assert_eq!(unquote("\"a'"), "\"a'");
        assert_eq!(unquote("a"), "a");
    }
}
