//! Serializes the CSS tree back to text.
//!
//! Output is normalized (two-space indentation, one node per line) and every
//! node that came from the input records a mapping from its printed position
//! to its original byte offset.

use super::ast::{Node, Stylesheet};

/// Printed CSS plus `(generated line, generated column, original offset)` triples.
#[derive(Debug, Default)]
pub struct Printed {
    pub code: String,
    pub mappings: Vec<(u32, u32, usize)>,
}

pub fn print(sheet: &Stylesheet) -> Printed {
    let mut printer = Printer::default();
    for (i, node) in sheet.nodes.iter().enumerate() {
        if i > 0 {
            printer.blank_line();
        }
        printer.node(node, 0);
    }
    Printed {
        code: printer.out,
        mappings: printer.mappings,
    }
}

#[derive(Default)]
struct Printer {
    out: String,
    line: u32,
    mappings: Vec<(u32, u32, usize)>,
}

impl Printer {
    fn blank_line(&mut self) {
        self.out.push('\n');
        self.line += 1;
    }

    fn line(&mut self, depth: usize, text: &str, source: Option<usize>) {
        if let Some(offset) = source {
            self.mappings.push((self.line, (depth * 2) as u32, offset));
        }
        for _ in 0..depth {
            self.out.push_str("  ");
        }
        self.out.push_str(text);
        self.out.push('\n');
        self.line += 1 + text.matches('\n').count() as u32;
    }

    fn node(&mut self, node: &Node, depth: usize) {
        match node {
            Node::Rule(rule) => {
                self.line(depth, &format!("{} {{", rule.selector), rule.source);
                self.children(&rule.nodes, depth);
            }
            Node::AtRule(at_rule) => {
                let mut head = String::with_capacity(at_rule.name.len() + at_rule.params.len() + 4);
                head.push('@');
                head.push_str(&at_rule.name);
                if !at_rule.params.is_empty() {
                    head.push(' ');
                    head.push_str(&at_rule.params);
                }
                match &at_rule.nodes {
                    Some(nodes) => {
                        head.push_str(" {");
                        self.line(depth, &head, at_rule.source);
                        self.children(nodes, depth);
                    }
                    None => {
                        head.push(';');
                        self.line(depth, &head, at_rule.source);
                    }
                }
            }
            Node::Decl(decl) => {
                self.line(depth, &format!("{}: {};", decl.prop, decl.value), decl.source);
            }
            Node::Comment(comment) => {
                self.line(depth, &format!("/*{}*/", comment.text), comment.source);
            }
        }
    }

    fn children(&mut self, nodes: &[Node], depth: usize) {
        for node in nodes {
            self.node(node, depth + 1);
        }
        self.line(depth, "}", None);
    }
}

#[cfg(test)]
mod tests {
    use super::super::parser::parse;
    use super::*;

    #[test]
    fn test_print_normalizes_layout() {
        let sheet = parse(".a{color:red}@media print{.b{color:blue}}", "t.css").unwrap();
        let printed = print(&sheet);
        insta::assert_snapshot!(printed.code, @r"
        .a {
          color: red;
        }

        @media print {
          .b {
            color: blue;
          }
        }
        ");
    }

    #[test]
    fn test_print_records_mappings() {
        let sheet = parse("\n.foo {\n\tcolor:red;\n}\n", "t.css").unwrap();
        let printed = print(&sheet);
        assert_eq!(printed.mappings, vec![(0, 0, 1), (1, 2, 9)]);
    }

    #[test]
    fn test_print_empty() {
        assert_eq!(print(&Stylesheet::default()).code, "");
    }
}
