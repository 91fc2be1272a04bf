//! `composes ... from` stage.
//!
//! Rewrites `composes: a b from "./x.css"` into placeholder tokens backed by
//! generated `:import` rules, and `composes: a from global` into
//! `global(a)` tokens for the scope stage. The same `(specifier, name)`
//! pair always maps to the same placeholder.

use once_cell::sync::Lazy;
use regex::Regex;
use tessera_grout::ident::sanitize_identifier;
use tessera_grout::{FxHashMap, IndexMap};

use crate::syntax::{unquote, Declaration, Node, Rule, Stylesheet};

static COMPOSES_FROM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)^(.+?)\s+from\s+("[^"]*"|'[^']*'|global)\s*$"#).unwrap()
});

pub(crate) fn is_composes(prop: &str) -> bool {
    prop == "composes" || prop == "compose-with"
}

#[derive(Default)]
struct Imports {
    by_specifier: IndexMap<String, IndexMap<String, String>>,
    seen: FxHashMap<(String, String), String>,
    counter: usize,
}

impl Imports {
    fn placeholder(&mut self, specifier: &str, name: &str) -> String {
        let key = (specifier.to_string(), name.to_string());
        if let Some(existing) = self.seen.get(&key) {
            return existing.clone();
        }
        let placeholder = format!("i__imported_{}_{}", sanitize_identifier(name), self.counter);
        self.counter += 1;
        self.by_specifier
            .entry(key.0.clone())
            .or_default()
            .insert(placeholder.clone(), key.1.clone());
        self.seen.insert(key, placeholder.clone());
        placeholder
    }
}

/// Rewrite cross-file and global compositions throughout `sheet`.
pub fn extract_composes_imports(sheet: &mut Stylesheet) {
    let mut imports = Imports::default();
    rewrite_nodes(&mut sheet.nodes, &mut imports);

    if imports.by_specifier.is_empty() {
        return;
    }
    let rules: Vec<Node> = imports
        .by_specifier
        .into_iter()
        .map(|(specifier, names)| {
            let decls = names
                .into_iter()
                .map(|(placeholder, name)| Node::Decl(Declaration::new(placeholder, name)))
                .collect();
            Node::Rule(Rule::new(format!(":import(\"{specifier}\")"), decls))
        })
        .collect();
    sheet.nodes.splice(0..0, rules);
}

fn rewrite_nodes(nodes: &mut [Node], imports: &mut Imports) {
    for node in nodes {
        match node {
            Node::Rule(rule) if rule.is_icss() => {}
            Node::Rule(rule) => rewrite_nodes(&mut rule.nodes, imports),
            Node::AtRule(at_rule) => {
                if let Some(children) = &mut at_rule.nodes {
                    rewrite_nodes(children, imports);
                }
            }
            Node::Decl(decl) if is_composes(&decl.prop) => {
                let Some(caps) = COMPOSES_FROM.captures(&decl.value) else {
                    continue;
                };
                let names = caps[1].split_whitespace();
                let from = &caps[2];
                decl.value = if from == "global" {
                    names
                        .map(|name| format!("global({name})"))
                        .collect::<Vec<_>>()
                        .join(" ")
                } else {
                    let specifier = unquote(from);
                    names
                        .map(|name| imports.placeholder(specifier, name))
                        .collect::<Vec<_>>()
                        .join(" ")
                };
            }
            Node::Decl(_) | Node::Comment(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{parse, print};

    #[test]
    fn test_imports_are_hoisted_and_deduplicated() {
        let mut sheet = parse(
            ".a { composes: x y from \"./b.css\"; }\n.c { composes: y from './b.css'; composes: z from \"./d.css\" }",
            "a.css",
        )
        .unwrap();
        extract_composes_imports(&mut sheet);
        insta::assert_snapshot!(print(&sheet).code, @r#"
        :import("./b.css") {
          i__imported_x_0: x;
          i__imported_y_1: y;
        }

        :import("./d.css") {
          i__imported_z_2: z;
        }

        .a {
          composes: i__imported_x_0 i__imported_y_1;
        }

        .c {
          composes: i__imported_y_1;
          composes: i__imported_z_2;
        }
        "#);
    }

    #[test]
    fn test_global_composition() {
        let mut sheet = parse(".a { composes: btn card from global }", "a.css").unwrap();
        extract_composes_imports(&mut sheet);
        let Node::Rule(rule) = &sheet.nodes[0] else {
            panic!("expected rule");
        };
        assert_eq!(rule.declarations().next().unwrap().value, "global(btn) global(card)");
    }

    #[test]
    fn test_local_composition_is_untouched() {
        let mut sheet = parse(".a { composes: b c }", "a.css").unwrap();
        extract_composes_imports(&mut sheet);
        assert_eq!(sheet.nodes.len(), 1);
    }
}
