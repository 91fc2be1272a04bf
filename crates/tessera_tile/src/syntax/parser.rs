//! CSS parser producing the minimal tree in [`super::ast`].
//!
//! Byte-oriented scanner in the same spirit as the scoped-style scanner:
//! strings, comments and bracket nesting are tracked so that `;`, `{` and
//! `}` only terminate a statement at nesting depth zero. There is no error
//! recovery; the first problem is reported with its line and column.

use super::ast::{AtRule, Comment, Declaration, Node, Rule, Stylesheet};
use crate::error::{TransformError, TransformResult};

/// Parse `source` into a [`Stylesheet`]. `file` is used for error messages only.
pub fn parse(source: &str, file: &str) -> TransformResult<Stylesheet> {
    let mut parser = Parser {
        source,
        bytes: source.as_bytes(),
        pos: 0,
        file,
    };
    let nodes = parser.parse_block(None)?;
    Ok(Stylesheet { nodes })
}

struct Parser<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    file: &'a str,
}

impl<'a> Parser<'a> {
    fn error(&self, offset: usize, message: impl Into<String>) -> TransformError {
        super::error_at(self.source, self.file, offset, message)
    }

    #[inline]
    fn peek(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(0), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    /// Parse nodes until the closing `}` of the block opened at `open`
    /// (or until EOF at the top level).
    fn parse_block(&mut self, open: Option<usize>) -> TransformResult<Vec<Node>> {
        let mut nodes = Vec::new();
        loop {
            self.skip_whitespace();
            let Some(byte) = self.peek(0) else {
                return match open {
                    Some(start) => Err(self.error(start, "Unclosed block")),
                    None => Ok(nodes),
                };
            };

            match byte {
                b'}' => {
                    if open.is_none() {
                        return Err(self.error(self.pos, "Unexpected }"));
                    }
                    self.pos += 1;
                    return Ok(nodes);
                }
                b';' => self.pos += 1,
                b'/' if self.peek(1) == Some(b'*') => {
                    let start = self.pos;
                    let text = self.read_comment()?;
                    nodes.push(Node::Comment(Comment {
                        text: text.to_string(),
                        source: Some(start),
                    }));
                }
                _ => nodes.push(self.parse_statement()?),
            }
        }
    }

    /// Read `/* ... */` and return the text between the delimiters.
    fn read_comment(&mut self) -> TransformResult<&'a str> {
        let start = self.pos;
        let body_start = start + 2;
        match memchr::memmem::find(&self.bytes[body_start..], b"*/") {
            Some(len) => {
                self.pos = body_start + len + 2;
                Ok(&self.source[body_start..body_start + len])
            }
            None => Err(self.error(start, "Unclosed comment")),
        }
    }

    fn parse_statement(&mut self) -> TransformResult<Node> {
        let start = self.pos;
        let (prelude, terminator) = self.read_prelude()?;
        let prelude = prelude.trim();

        if let Some(rest) = prelude.strip_prefix('@') {
            let name_len = rest
                .find(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_'))
                .unwrap_or(rest.len());
            if name_len == 0 {
                return Err(self.error(start, "At-rule without name"));
            }
            let name = rest[..name_len].to_string();
            let params = rest[name_len..].trim().to_string();
            let nodes = if terminator == Some(b'{') {
                self.pos += 1;
                Some(self.parse_block(Some(start))?)
            } else {
                self.consume_semicolon(terminator);
                None
            };
            return Ok(Node::AtRule(AtRule {
                name,
                params,
                nodes,
                source: Some(start),
            }));
        }

        if terminator == Some(b'{') {
            if prelude.is_empty() {
                return Err(self.error(start, "Rule without selector"));
            }
            self.pos += 1;
            let nodes = self.parse_block(Some(start))?;
            return Ok(Node::Rule(Rule {
                selector: prelude.to_string(),
                nodes,
                source: Some(start),
            }));
        }

        self.consume_semicolon(terminator);
        let Some(colon) = prelude.find(':') else {
            let word = prelude.split_whitespace().next().unwrap_or(prelude);
            return Err(self.error(start, format!("Unknown word {word}")));
        };
        let prop = prelude[..colon].trim();
        if prop.is_empty() || prop.contains(char::is_whitespace) {
            return Err(self.error(start, format!("Unknown word {prop}")));
        }
        Ok(Node::Decl(Declaration {
            prop: prop.to_string(),
            value: prelude[colon + 1..].trim().to_string(),
            source: Some(start),
        }))
    }

    fn consume_semicolon(&mut self, terminator: Option<u8>) {
        if terminator == Some(b';') {
            self.pos += 1;
        }
    }

    /// Read up to (not including) the next top-level `{`, `;` or `}`.
    ///
    /// Comments inside the prelude are dropped. Returns the terminator byte,
    /// or `None` at EOF.
    fn read_prelude(&mut self) -> TransformResult<(String, Option<u8>)> {
        let mut text = String::new();
        let mut depth = 0u32;
        let mut segment_start = self.pos;

        while let Some(byte) = self.peek(0) {
            match byte {
                b'{' | b';' | b'}' if depth == 0 => {
                    text.push_str(&self.source[segment_start..self.pos]);
                    return Ok((text, Some(byte)));
                }
                b'(' | b'[' => {
                    depth += 1;
                    self.pos += 1;
                }
                b')' | b']' => {
                    depth = depth.saturating_sub(1);
                    self.pos += 1;
                }
                b'"' | b'\'' => self.skip_string(byte)?,
                b'\\' => self.pos = (self.pos + 2).min(self.bytes.len()),
                b'/' if self.peek(1) == Some(b'*') => {
                    text.push_str(&self.source[segment_start..self.pos]);
                    self.read_comment()?;
                    segment_start = self.pos;
                }
                _ => self.pos += 1,
            }
        }

        text.push_str(&self.source[segment_start..self.pos]);
        Ok((text, None))
    }

    fn skip_string(&mut self, quote: u8) -> TransformResult<()> {
        let start = self.pos;
        self.pos += 1;
        while let Some(byte) = self.peek(0) {
            match byte {
                b'\\' => self.pos += 2,
                b'\n' => break,
                _ if byte == quote => {
                    self.pos += 1;
                    return Ok(());
                }
                _ => self.pos += 1,
            }
        }
        Err(self.error(start, "Unclosed string"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> Stylesheet {
        parse(source, "test.css").unwrap()
    }

    #[test]
    fn test_parse_rule_with_declarations() {
        let sheet = parse_ok(".a { color: red; background: url(\"x;y.png\") }");
        let Node::Rule(rule) = &sheet.nodes[0] else {
            panic!("expected rule");
        };
        assert_eq!(rule.selector, ".a");
        let decls: Vec<_> = rule.declarations().collect();
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[0].prop, "color");
        assert_eq!(decls[0].value, "red");
        assert_eq!(decls[1].value, "url(\"x;y.png\")");
    }

    #[test]
    fn test_parse_at_rules() {
        let sheet = parse_ok("@import './x.css';\n@media (max-width: 10px) { .a { color: red } }");
        let Node::AtRule(import) = &sheet.nodes[0] else {
            panic!("expected at-rule");
        };
        assert_eq!(import.name, "import");
        assert_eq!(import.params, "'./x.css'");
        assert!(import.nodes.is_none());

        let Node::AtRule(media) = &sheet.nodes[1] else {
            panic!("expected at-rule");
        };
        assert_eq!(media.params, "(max-width: 10px)");
        assert_eq!(media.nodes.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn test_parse_comments() {
        let sheet = parse_ok("/* top */\n.a /* inner */ .b { color: red }");
        assert!(matches!(&sheet.nodes[0], Node::Comment(c) if c.text == " top "));
        let Node::Rule(rule) = &sheet.nodes[1] else {
            panic!("expected rule");
        };
        assert_eq!(rule.selector, ".a  .b");
    }

    #[test]
    fn test_records_source_offsets() {
        let sheet = parse_ok("\n.foo {\n\tcolor:red;\n}\n");
        let Node::Rule(rule) = &sheet.nodes[0] else {
            panic!("expected rule");
        };
        assert_eq!(rule.source, Some(1));
    }

    #[test]
    fn test_unclosed_block_reports_position() {
        let err = parse(".a {\n  color: red;\n", "broken.css").unwrap_err();
        assert_eq!(
            err,
            TransformError::Parse {
                file: "broken.css".into(),
                line: 1,
                column: 1,
                message: "Unclosed block".into(),
            }
        );
    }

    #[test]
    fn test_unexpected_close_brace() {
        let err = parse(".a {}\n}", "broken.css").unwrap_err();
        assert_eq!(err.to_string(), "broken.css:2:1: Unexpected }");
    }

    #[test]
    fn test_unknown_word() {
        let err = parse(".a { color red }", "broken.css").unwrap_err();
        assert!(err.to_string().contains("Unknown word color"));
    }

    #[test]
    fn test_unclosed_string() {
        let err = parse(".a { content: \"oops }", "broken.css").unwrap_err();
        assert!(err.to_string().contains("Unclosed string"));
    }
}
