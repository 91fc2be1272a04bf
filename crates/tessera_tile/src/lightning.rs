//! LightningCSS backend.
//!
//! Delegates scoping to LightningCSS's built-in CSS modules support and
//! converts its unordered export tables into the shared result types.

use std::fmt::Display;

use lightningcss::css_modules::{self, CssModuleReference, Pattern};
use lightningcss::error::Error as LightningError;
use lightningcss::printer::PrinterOptions;
use lightningcss::stylesheet::{ParserOptions, StyleSheet};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{TransformError, TransformResult};
use crate::locate::class_offsets;
use crate::options::{ModuleOptions, ScopeBehaviour, ScopedNameGenerator};
use crate::types::{
    ComposedRef, CssModuleExports, CssModuleReferences, DependencyReference, ExportEntry,
    TransformOutput,
};
use crate::Transformer;

/// Default scoped name pattern of the LightningCSS backend.
pub const DEFAULT_PATTERN: &str = "[hash]_[local]";

const BACKEND: &str = "lightningcss";

static SIZED_HASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[hash:\d+\]").unwrap());

/// Transformer backed by LightningCSS.
#[derive(Debug, Default, Clone, Copy)]
pub struct LightningTransformer;

impl Transformer for LightningTransformer {
    fn name(&self) -> &'static str {
        BACKEND
    }

    fn transform(
        &self,
        code: &str,
        id: &str,
        options: &ModuleOptions,
        source_map: bool,
    ) -> TransformResult<TransformOutput> {
        if source_map {
            tracing::debug!(id, "lightningcss backend does not produce CSS source maps");
        }

        let template = pattern_template(options.generate_scoped_name.as_ref())?;
        let filename = if options.hash_prefix.is_empty() {
            id.to_string()
        } else {
            format!("{}/{id}", options.hash_prefix)
        };

        let local = options.mode_for(id) == ScopeBehaviour::Local;
        let css_modules = if local {
            let pattern = Pattern::parse(&template).map_err(|e| TransformError::Unsupported {
                backend: BACKEND,
                message: format!("invalid scoped name pattern \"{template}\": {e:?}"),
            })?;
            Some(css_modules::Config {
                pattern,
                dashed_idents: true,
                ..Default::default()
            })
        } else {
            None
        };

        let parser_options = ParserOptions {
            filename,
            css_modules,
            ..ParserOptions::default()
        };
        let stylesheet =
            StyleSheet::parse(code, parser_options).map_err(|e| parse_error(id, code, e))?;
        let result = stylesheet
            .to_css(PrinterOptions::default())
            .map_err(|e| parse_error(id, code, e))?;

        let offsets = class_offsets(code);
        let exports = match result.exports {
            Some(raw) => convert_exports(raw, code, &offsets),
            None if options.exports_globals_for(id) => offsets
                .keys()
                .map(|name| (name.clone(), ExportEntry::Bare(name.clone())))
                .collect(),
            None => CssModuleExports::default(),
        };

        let mut code = result.code;
        let mut references: Vec<(String, DependencyReference)> = Vec::new();
        for (placeholder, reference) in result.references.unwrap_or_default() {
            match reference {
                CssModuleReference::Dependency { name, specifier } => {
                    references.push((placeholder, DependencyReference { specifier, name }));
                }
                // Same-file and global names are already known; fill them in here.
                CssModuleReference::Local { name } | CssModuleReference::Global { name } => {
                    code = code.replace(&placeholder, &name);
                }
            }
        }
        references.sort_by_cached_key(|(placeholder, _)| {
            (code.find(placeholder.as_str()).unwrap_or(usize::MAX), placeholder.clone())
        });

        tracing::debug!(id, exports = exports.len(), "lightningcss transform");

        Ok(TransformOutput {
            code,
            map: None,
            exports,
            references: references.into_iter().collect::<CssModuleReferences>(),
        })
    }
}

/// LightningCSS patterns have no sized hash and no callback form.
fn pattern_template(generator: Option<&ScopedNameGenerator>) -> TransformResult<String> {
    match generator {
        None => Ok(DEFAULT_PATTERN.to_string()),
        Some(ScopedNameGenerator::Template(template)) => {
            if SIZED_HASH.is_match(template) {
                tracing::debug!(template, "lightningcss ignores [hash:N] length");
            }
            Ok(SIZED_HASH.replace_all(template, "[hash]").into_owned())
        }
        Some(ScopedNameGenerator::Function(_)) => Err(TransformError::Unsupported {
            backend: BACKEND,
            message: "generateScopedName must be a template string".to_string(),
        }),
    }
}

fn convert_exports(
    raw: css_modules::CssModuleExports,
    code: &str,
    offsets: &tessera_grout::IndexMap<String, usize>,
) -> CssModuleExports {
    let mut entries: Vec<(String, css_modules::CssModuleExport)> = raw.into_iter().collect();
    entries.sort_by_cached_key(|(name, _)| {
        let position = offsets
            .get(name)
            .copied()
            .or_else(|| code.find(name.as_str()))
            .unwrap_or(usize::MAX);
        (position, name.clone())
    });

    entries
        .into_iter()
        .map(|(name, export)| {
            let composes: Vec<ComposedRef> = export
                .composes
                .into_iter()
                .map(|reference| match reference {
                    CssModuleReference::Local { name } => ComposedRef::Local { name },
                    CssModuleReference::Global { name } => ComposedRef::Global { name },
                    CssModuleReference::Dependency { name, specifier } => {
                        ComposedRef::Dependency { name, specifier }
                    }
                })
                .collect();
            let entry = if composes.is_empty() {
                ExportEntry::Bare(export.name)
            } else {
                ExportEntry::Composed {
                    name: export.name,
                    composes,
                }
            };
            (name, entry)
        })
        .collect()
}

fn parse_error<T: Display>(id: &str, code: &str, error: LightningError<T>) -> TransformError {
    match error.loc {
        Some(loc) => TransformError::Parse {
            file: id.to_string(),
            line: loc.line + 1,
            column: loc.column,
            message: error.kind.to_string(),
        },
        None => crate::syntax::error_at(code, id, 0, error.kind.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transform(code: &str, options: &ModuleOptions) -> TransformOutput {
        LightningTransformer
            .transform(code, "/src/card.module.css", options, false)
            .unwrap()
    }

    #[test]
    fn test_exports_follow_source_order() {
        let out = transform(
            ".zeta { color: red }\n.alpha { color: blue }",
            &ModuleOptions::default(),
        );
        let keys: Vec<_> = out.exports.keys().cloned().collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
        assert!(out.exports["zeta"].name().ends_with("_zeta"));
        assert!(out.map.is_none());
    }

    #[test]
    fn test_composition_kinds() {
        let out = transform(
            ".a { color: red }\n.b { composes: a; composes: g from global; composes: y from \"./y.css\" }",
            &ModuleOptions::default(),
        );
        let composes = out.exports["b"].composes();
        assert!(matches!(&composes[0], ComposedRef::Local { name } if name.ends_with("_a")));
        assert_eq!(composes[1], ComposedRef::Global { name: "g".into() });
        assert_eq!(
            composes[2],
            ComposedRef::Dependency {
                name: "y".into(),
                specifier: "./y.css".into()
            }
        );
    }

    #[test]
    fn test_sized_hash_template_is_accepted() {
        let options = ModuleOptions {
            generate_scoped_name: Some("[local]-[hash:5]".into()),
            ..Default::default()
        };
        let out = transform(".a {}", &options);
        assert!(out.exports["a"].name().starts_with("a-"));
    }

    #[test]
    fn test_function_generator_is_unsupported() {
        let options = ModuleOptions {
            generate_scoped_name: Some(ScopedNameGenerator::Function(std::sync::Arc::new(
                |name, _, _| name.to_string(),
            ))),
            ..Default::default()
        };
        let err = LightningTransformer
            .transform(".a {}", "a.css", &options, false)
            .unwrap_err();
        assert!(matches!(err, TransformError::Unsupported { backend: "lightningcss", .. }));
    }

    #[test]
    fn test_global_module_paths() {
        let options = ModuleOptions {
            global_module_paths: vec![Regex::new(r"global\.css$").unwrap()],
            ..Default::default()
        };
        let out = LightningTransformer
            .transform(".btn { color: red }", "/src/global.css", &options, false)
            .unwrap();
        assert!(out.code.contains(".btn"));
        assert_eq!(out.exports["btn"], ExportEntry::Bare("btn".into()));
    }

    #[test]
    fn test_parse_error_has_location() {
        let err = LightningTransformer
            .transform(
                ".a { color: red; }\n%b { color: blue }",
                "bad.css",
                &ModuleOptions::default(),
                false,
            )
            .unwrap_err();
        assert!(
            matches!(&err, TransformError::Parse { file, line: 2, column: 1, .. } if file == "bad.css"),
            "{err:?}"
        );
    }

    #[test]
    fn test_dashed_ident_dependency_reference() {
        let out = transform(
            ".a { color: var(--brand from \"./theme.css\") }",
            &ModuleOptions::default(),
        );
        assert_eq!(out.references.len(), 1);
        let (placeholder, reference) = out.references.iter().next().unwrap();
        assert_eq!(
            reference,
            &DependencyReference {
                specifier: "./theme.css".into(),
                name: "--brand".into(),
            }
        );
        assert!(out.code.contains(placeholder.as_str()), "{}", out.code);
        assert_eq!(out.dependency_specifiers(), vec!["./theme.css"]);
    }
}
