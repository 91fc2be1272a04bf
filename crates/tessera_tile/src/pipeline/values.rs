//! `@value` stage.
//!
//! ```css
//! @value gap: 4px;
//! @value primary, secondary as accent from "./colors.css";
//! ```
//!
//! Local definitions are inlined wherever their name appears as a whole
//! token. Imported values become `:import` placeholders that the resolver
//! later swaps for the dependency's exported value. Every value is also
//! exported under its own name.

use once_cell::sync::Lazy;
use regex::Regex;
use tessera_grout::ident::sanitize_identifier;
use tessera_grout::IndexMap;

use crate::error::TransformResult;
use crate::syntax::scan::replace_idents;
use crate::syntax::{error_at, unquote, Declaration, Node, Rule, Stylesheet};

static VALUE_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)^\(?\s*(.+?)\s*\)?\s+from\s+("[^"]*"|'[^']*'|[^\s"']+)\s*$"#).unwrap()
});

static VALUE_DEFINITION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^([\w-]+)(?:\s*:\s*|\s+)(.*?)\s*$").unwrap());

static IMPORT_ALIAS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([\w-]+)(?:\s+as\s+([\w-]+))?$").unwrap());

/// Resolve every top-level `@value` at-rule in `sheet`.
pub fn inline_values(sheet: &mut Stylesheet, source: &str, file: &str) -> TransformResult<()> {
    let mut definitions: IndexMap<String, String> = IndexMap::default();
    let mut imports: IndexMap<String, IndexMap<String, String>> = IndexMap::default();
    let mut counter = 0usize;

    let mut kept = Vec::with_capacity(sheet.nodes.len());
    for node in std::mem::take(&mut sheet.nodes) {
        let Node::AtRule(at_rule) = &node else {
            kept.push(node);
            continue;
        };
        if at_rule.name != "value" || at_rule.nodes.is_some() {
            kept.push(node);
            continue;
        }
        let offset = at_rule.source.unwrap_or(0);

        if let Some(caps) = VALUE_IMPORT.captures(&at_rule.params) {
            let specifier = unquote(&caps[2]).to_string();
            for item in caps[1].split(',').map(str::trim).filter(|s| !s.is_empty()) {
                let Some(alias) = IMPORT_ALIAS.captures(item) else {
                    return Err(error_at(
                        source,
                        file,
                        offset,
                        format!("Invalid value import \"{item}\""),
                    ));
                };
                let imported = alias[1].to_string();
                let local = alias.get(2).map_or(imported.as_str(), |m| m.as_str());
                let placeholder = format!("i__value_{}_{counter}", sanitize_identifier(local));
                counter += 1;
                imports
                    .entry(specifier.clone())
                    .or_default()
                    .insert(placeholder.clone(), imported.clone());
                definitions.insert(local.to_string(), placeholder);
            }
            continue;
        }

        let Some(caps) = VALUE_DEFINITION.captures(&at_rule.params) else {
            return Err(error_at(
                source,
                file,
                offset,
                format!("Invalid value definition \"{}\"", at_rule.params),
            ));
        };
        let value = substitute(&caps[2], &definitions, false);
        definitions.insert(caps[1].to_string(), value);
    }
    sheet.nodes = kept;

    if definitions.is_empty() {
        return Ok(());
    }

    substitute_nodes(&mut sheet.nodes, &definitions);

    let mut prelude: Vec<Node> = imports
        .into_iter()
        .map(|(specifier, names)| {
            let decls = names
                .into_iter()
                .map(|(placeholder, name)| Node::Decl(Declaration::new(placeholder, name)))
                .collect();
            Node::Rule(Rule::new(format!(":import(\"{specifier}\")"), decls))
        })
        .collect();
    let exports = definitions
        .into_iter()
        .map(|(name, value)| Node::Decl(Declaration::new(name, value)))
        .collect();
    prelude.push(Node::Rule(Rule::new(":export", exports)));

    sheet.nodes.splice(0..0, prelude);
    Ok(())
}

fn substitute(text: &str, definitions: &IndexMap<String, String>, in_selector: bool) -> String {
    replace_idents(text, |ident, prev| {
        if in_selector && matches!(prev, Some(b'.') | Some(b'#') | Some(b':') | Some(b'@')) {
            return None;
        }
        definitions.get(ident).cloned()
    })
}

fn substitute_nodes(nodes: &mut [Node], definitions: &IndexMap<String, String>) {
    for node in nodes {
        match node {
            Node::Rule(rule) if rule.is_icss() => {}
            Node::Rule(rule) => {
                rule.selector = substitute(&rule.selector, definitions, true);
                substitute_nodes(&mut rule.nodes, definitions);
            }
            Node::AtRule(at_rule) => {
                if !at_rule.is_keyframes() {
                    at_rule.params = substitute(&at_rule.params, definitions, false);
                }
                if let Some(children) = &mut at_rule.nodes {
                    substitute_nodes(children, definitions);
                }
            }
            Node::Decl(decl) => decl.value = substitute(&decl.value, definitions, false),
            Node::Comment(_) => {}
        }
    }
}
