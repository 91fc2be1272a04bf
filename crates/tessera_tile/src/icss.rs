//! ICSS extraction.
//!
//! Pulls `:import` / `:export` pseudo-rules out of a tree whose classes are
//! already scoped, then classifies every exported value as a bare export, a
//! composition chain, or a whole-value reference to another file.

use tessera_grout::{FxHashMap, IndexMap};

use crate::syntax::{Node, Stylesheet};
use crate::types::{ComposedRef, DependencyReference, ExportEntry, Extracted};

/// `specifier -> (placeholder token -> imported name)`
pub type IcssImports = IndexMap<String, IndexMap<String, String>>;

/// `exported name -> raw value`, in declaration order.
pub type IcssExports = IndexMap<String, String>;

/// Remove every top-level `:import`/`:export` rule from `sheet` and return
/// their contents. Later declarations of the same key overwrite earlier ones
/// but keep the first position.
pub fn take_icss(sheet: &mut Stylesheet) -> (IcssImports, IcssExports) {
    let mut imports = IcssImports::default();
    let mut exports = IcssExports::default();

    sheet.nodes.retain(|node| {
        let Node::Rule(rule) = node else {
            return true;
        };
        if let Some(specifier) = rule.icss_import_specifier() {
            let entry = imports.entry(specifier.to_string()).or_default();
            for decl in rule.declarations() {
                entry.insert(decl.prop.clone(), decl.value.clone());
            }
            return false;
        }
        if rule.is_icss_export() {
            for decl in rule.declarations() {
                exports.insert(decl.prop.clone(), decl.value.clone());
            }
            return false;
        }
        true
    });

    (imports, exports)
}

/// Classify ICSS exports.
///
/// A value containing any token from `local_classes` is a composition: its
/// first token is the class itself, later tokens resolve to a local class,
/// an imported placeholder, or a global literal, in that order. A value that
/// is exactly an imported placeholder becomes a reference. Anything else is
/// a bare export.
pub fn extract(imports: &IcssImports, exports: &IcssExports, local_classes: &[String]) -> Extracted {
    let mut dependencies: FxHashMap<&str, DependencyReference> = FxHashMap::default();
    for (specifier, names) in imports {
        for (placeholder, name) in names {
            dependencies.insert(
                placeholder.as_str(),
                DependencyReference {
                    specifier: specifier.clone(),
                    name: name.clone(),
                },
            );
        }
    }
    let is_local = |token: &str| local_classes.iter().any(|local| local == token);

    let mut extracted = Extracted::default();
    for (exported_as, value) in exports {
        let tokens: Vec<&str> = value.split_whitespace().collect();

        if tokens.iter().any(|&token| is_local(token)) {
            let composes = tokens[1..]
                .iter()
                .map(|&token| {
                    if is_local(token) {
                        ComposedRef::Local {
                            name: token.to_string(),
                        }
                    } else if let Some(dependency) = dependencies.get(token) {
                        ComposedRef::Dependency {
                            name: dependency.name.clone(),
                            specifier: dependency.specifier.clone(),
                        }
                    } else {
                        ComposedRef::Global {
                            name: token.to_string(),
                        }
                    }
                })
                .collect::<Vec<_>>();

            let name = tokens[0].to_string();
            let entry = if composes.is_empty() {
                ExportEntry::Bare(name)
            } else {
                ExportEntry::Composed { name, composes }
            };
            extracted.exports.insert(exported_as.clone(), entry);
            continue;
        }

        let trimmed = value.trim();
        if let Some(dependency) = dependencies.get(trimmed) {
            extracted
                .references
                .insert(trimmed.to_string(), dependency.clone());
            continue;
        }

        extracted
            .exports
            .insert(exported_as.clone(), ExportEntry::Bare(value.clone()));
    }

    extracted
}
