//! Scope stage.
//!
//! Swaps every `:local(...)` marker for its scoped name, folds `composes`
//! declarations into the owning class's export and appends one `:export`
//! rule describing every local name.

use tessera_grout::{FxHashSet, IndexMap, IndexSet};

use super::extract_imports::is_composes;
use crate::error::{TransformError, TransformResult};
use crate::scoped_name::ScopedNames;
use crate::syntax::scan::replace_local_markers;
use crate::syntax::{Declaration, Node, Rule, Stylesheet};

struct Scope<'n, 'a> {
    names: &'n mut ScopedNames<'a>,
    placeholders: FxHashSet<String>,
    exports: IndexMap<String, Vec<String>>,
    file: &'n str,
}

/// Scope `sheet` in place. `globals` are exported under their literal
/// names when `export_globals` is set.
pub fn scope(
    sheet: &mut Stylesheet,
    names: &mut ScopedNames<'_>,
    globals: &IndexSet<String>,
    export_globals: bool,
    file: &str,
) -> TransformResult<()> {
    let placeholders = sheet
        .nodes
        .iter()
        .filter_map(|node| match node {
            Node::Rule(rule) if rule.icss_import_specifier().is_some() => Some(rule),
            _ => None,
        })
        .flat_map(|rule| rule.declarations().map(|decl| decl.prop.clone()))
        .collect();

    let mut scope = Scope {
        names,
        placeholders,
        exports: IndexMap::default(),
        file,
    };
    scope.nodes(&mut sheet.nodes)?;

    let mut exports = scope.exports;
    if export_globals {
        for global in globals {
            exports
                .entry(global.clone())
                .or_insert_with(|| vec![global.clone()]);
        }
    }
    if !exports.is_empty() {
        let decls = exports
            .into_iter()
            .map(|(name, tokens)| Node::Decl(Declaration::new(name, tokens.join(" "))))
            .collect();
        sheet.nodes.push(Node::Rule(Rule::new(":export", decls)));
    }
    Ok(())
}

impl Scope<'_, '_> {
    fn scoped(&mut self, text: &str) -> (String, Vec<String>) {
        let names = &mut *self.names;
        let (rewritten, locals) = replace_local_markers(text, |name| names.get(name));
        for local in &locals {
            if !self.exports.contains_key(local) {
                let scoped = self.names.get(local);
                self.exports.insert(local.clone(), vec![scoped]);
            }
        }
        (rewritten, locals)
    }

    fn nodes(&mut self, nodes: &mut Vec<Node>) -> TransformResult<()> {
        for node in nodes.iter_mut() {
            match node {
                Node::Rule(rule) if rule.is_icss() => {}
                Node::Rule(rule) => self.rule(rule)?,
                Node::AtRule(at_rule) => {
                    if at_rule.params.contains(":local(") {
                        at_rule.params = self.scoped(&at_rule.params).0;
                    }
                    if let Some(children) = &mut at_rule.nodes {
                        self.nodes(children)?;
                    }
                }
                Node::Decl(decl) => {
                    if decl.value.contains(":local(") {
                        let names = &mut *self.names;
                        decl.value = replace_local_markers(&decl.value, |name| names.get(name)).0;
                    }
                }
                Node::Comment(_) => {}
            }
        }
        Ok(())
    }

    fn rule(&mut self, rule: &mut Rule) -> TransformResult<()> {
        let (selector, locals) = self.scoped(&rule.selector);

        let mut composed = Vec::new();
        let mut has_composes = false;
        rule.nodes.retain(|node| match node {
            Node::Decl(decl) if is_composes(&decl.prop) => {
                has_composes = true;
                composed.extend(decl.value.split_whitespace().map(str::to_string));
                false
            }
            _ => true,
        });

        if has_composes {
            let [class] = locals.as_slice() else {
                return Err(TransformError::Composition {
                    file: self.file.to_string(),
                    message: format!(
                        "composition is only allowed when selector is single local class name, got \"{}\"",
                        rule.selector
                    ),
                });
            };
            let tokens: Vec<String> = composed
                .iter()
                .map(|token| self.composed_token(token))
                .collect();
            if let Some(entry) = self.exports.get_mut(class) {
                for token in tokens {
                    if !entry.contains(&token) {
                        entry.push(token);
                    }
                }
            }
        }

        rule.selector = selector;
        self.nodes(&mut rule.nodes)
    }

    fn composed_token(&mut self, token: &str) -> String {
        if let Some(global) = token
            .strip_prefix("global(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return global.to_string();
        }
        if self.placeholders.contains(token) {
            return token.to_string();
        }
        self.names.get(token)
    }
}
