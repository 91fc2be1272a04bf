//! Transform result types shared by every backend.

use serde::{Deserialize, Serialize};
use tessera_grout::IndexMap;

/// A class composed into an exported class.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ComposedRef {
    /// Scoped name defined in the same file.
    Local { name: String },
    /// Author-supplied literal, emitted as-is.
    Global { name: String },
    /// Export `name` of the file reached through `specifier`.
    Dependency { name: String, specifier: String },
}

/// Value exported for one original name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExportEntry {
    /// A class (or `@value`) with no composition.
    Bare(String),
    /// A scoped class plus the classes it composes.
    Composed {
        name: String,
        composes: Vec<ComposedRef>,
    },
}

impl ExportEntry {
    /// The entry's own class name (or literal value).
    pub fn name(&self) -> &str {
        match self {
            ExportEntry::Bare(name) => name,
            ExportEntry::Composed { name, .. } => name,
        }
    }

    pub fn composes(&self) -> &[ComposedRef] {
        match self {
            ExportEntry::Bare(_) => &[],
            ExportEntry::Composed { composes, .. } => composes,
        }
    }
}

/// A value whose text comes wholly from another file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyReference {
    pub specifier: String,
    pub name: String,
}

/// Exports keyed by exported name, in source declaration order.
pub type CssModuleExports = IndexMap<String, ExportEntry>;

/// Placeholder token (present in the CSS text) -> where its value comes from.
pub type CssModuleReferences = IndexMap<String, DependencyReference>;

/// Output of ICSS extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extracted {
    pub exports: CssModuleExports,
    pub references: CssModuleReferences,
}

/// Output of a [`Transformer`](crate::Transformer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutput {
    /// Scoped CSS with every `:import`/`:export` rule removed.
    pub code: String,
    /// Source Map v3 JSON, when requested and supported by the backend.
    pub map: Option<String>,
    pub exports: CssModuleExports,
    pub references: CssModuleReferences,
}

impl TransformOutput {
    /// Specifiers this file depends on, deduplicated, in first-use order.
    pub fn dependency_specifiers(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        let composed = self.exports.values().flat_map(|entry| entry.composes());
        for reference in composed {
            if let ComposedRef::Dependency { specifier, .. } = reference {
                if !out.contains(&specifier.as_str()) {
                    out.push(specifier);
                }
            }
        }
        for reference in self.references.values() {
            if !out.contains(&reference.specifier.as_str()) {
                out.push(&reference.specifier);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composed_ref_serde_shape() {
        let reference = ComposedRef::Dependency {
            name: "y".into(),
            specifier: "./b.css".into(),
        };
        let json = serde_json::to_string(&reference).unwrap();
        assert_eq!(json, r#"{"type":"dependency","name":"y","specifier":"./b.css"}"#);
    }

    #[test]
    fn test_export_entry_untagged() {
        let bare: ExportEntry = serde_json::from_str(r#""_a_1""#).unwrap();
        assert_eq!(bare, ExportEntry::Bare("_a_1".into()));
        assert!(bare.composes().is_empty());
    }

    #[test]
    fn test_dependency_specifiers_dedup() {
        let mut exports = CssModuleExports::default();
        exports.insert(
            "x".into(),
            ExportEntry::Composed {
                name: "_x".into(),
                composes: vec![
                    ComposedRef::Dependency {
                        name: "y".into(),
                        specifier: "./b.css".into(),
                    },
                    ComposedRef::Dependency {
                        name: "z".into(),
                        specifier: "./b.css".into(),
                    },
                ],
            },
        );
        let mut references = CssModuleReferences::default();
        references.insert(
            "i__value_c_0".into(),
            DependencyReference {
                specifier: "./c.css".into(),
                name: "c".into(),
            },
        );
        let output = TransformOutput {
            code: String::new(),
            map: None,
            exports,
            references,
        };
        assert_eq!(output.dependency_specifiers(), vec!["./b.css", "./c.css"]);
    }
}
