//! The host loader contract.
//!
//! The resolver never reads other files itself. It asks the host (a bundler
//! plugin, the CLI's filesystem host, a test double) to resolve specifiers and
//! load modules, then reads the metadata this system attached to them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tessera_grout::IndexMap;

use crate::error::{ResolveError, ResolveResult};

/// Key under which module metadata lives in [`LoadedModule::meta`].
pub const NAMESPACE: &str = "tessera";

/// Query marker selecting the CSS-module variant of a stylesheet.
pub const MODULE_MARKER: &str = "tessera-module";

/// `specifier` with the CSS-module marker appended.
pub fn module_specifier(specifier: &str) -> String {
    let sep = if specifier.contains('?') { '&' } else { '?' };
    format!("{specifier}{sep}{MODULE_MARKER}")
}

/// Remove a marker added by [`module_specifier`], if present.
pub fn strip_module_marker(specifier: &str) -> &str {
    specifier
        .strip_suffix(MODULE_MARKER)
        .and_then(|rest| rest.strip_suffix(['?', '&']))
        .unwrap_or(specifier)
}

/// A resolved module identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedId {
    pub id: String,
}

/// What a host returns from [`HostLoader::load`].
#[derive(Debug, Clone, Default)]
pub struct LoadedModule {
    /// Plugin metadata keyed by namespace.
    pub meta: IndexMap<String, serde_json::Value>,
}

impl LoadedModule {
    /// Module carrying `meta` under [`NAMESPACE`].
    pub fn with_css_module(meta: &CssModuleMeta) -> ResolveResult<Self> {
        let value = serde_json::to_value(meta).map_err(|e| ResolveError::InvalidMeta {
            id: String::new(),
            message: e.to_string(),
        })?;
        let mut module = LoadedModule::default();
        module.meta.insert(NAMESPACE.to_string(), value);
        Ok(module)
    }

    /// Read back this system's metadata for module `id`.
    pub fn css_module(&self, id: &str) -> ResolveResult<CssModuleMeta> {
        let value = self.meta.get(NAMESPACE).ok_or_else(|| ResolveError::NotACssModule {
            id: id.to_string(),
            namespace: NAMESPACE,
        })?;
        CssModuleMeta::deserialize(value).map_err(|e| ResolveError::InvalidMeta {
            id: id.to_string(),
            message: e.to_string(),
        })
    }
}

/// One export as seen by importers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaExport {
    /// Fully resolved, space-separated class string.
    pub resolved: String,
    /// Names the export is reachable under in the generated module.
    pub export_as: Vec<String>,
}

/// Metadata attached to every processed CSS module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CssModuleMeta {
    pub css: String,
    pub exports: IndexMap<String, MetaExport>,
}

impl CssModuleMeta {
    /// Name to import `name` under: the first alias an importer can use.
    pub fn import_name<'a>(&'a self, name: &'a str, allow_arbitrary_names: bool) -> &'a str {
        let Some(export) = self.exports.get(name) else {
            return name;
        };
        export
            .export_as
            .iter()
            .find(|alias| tessera_glaze::naming::is_importable(alias, allow_arbitrary_names))
            .or_else(|| export.export_as.first())
            .map(String::as_str)
            .unwrap_or(name)
    }
}

/// Module resolution and loading provided by the embedding host.
#[async_trait]
pub trait HostLoader: Send + Sync {
    /// Resolve `specifier` relative to `from_id`; `None` when unresolvable.
    async fn resolve(&self, specifier: &str, from_id: &str) -> Option<ResolvedId>;

    /// Load (transforming if needed) the module `id`.
    async fn load(&self, id: &ResolvedId) -> ResolveResult<LoadedModule>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_specifier_marker() {
        assert_eq!(module_specifier("./b.css"), "./b.css?tessera-module");
        assert_eq!(module_specifier("./b.css?v=1"), "./b.css?v=1&tessera-module");
        assert_eq!(strip_module_marker("./b.css?tessera-module"), "./b.css");
        assert_eq!(strip_module_marker("./b.css?v=1&tessera-module"), "./b.css?v=1");
        assert_eq!(strip_module_marker("./b.css"), "./b.css");
    }

    #[test]
    fn test_missing_namespace() {
        let err = LoadedModule::default().css_module("/b.css").unwrap_err();
        assert!(matches!(err, ResolveError::NotACssModule { .. }));
    }

    #[test]
    fn test_meta_round_trips_through_loaded_module() {
        let mut meta = CssModuleMeta::default();
        meta.exports.insert(
            "btn-primary".into(),
            MetaExport {
                resolved: "b_btn-primary".into(),
                export_as: vec!["btn-primary".into(), "btnPrimary".into()],
            },
        );
        let loaded = LoadedModule::with_css_module(&meta).unwrap();
        let back = loaded.css_module("/b.css").unwrap();
        assert_eq!(back, meta);
        assert_eq!(back.import_name("btn-primary", false), "btnPrimary");
        assert_eq!(back.import_name("btn-primary", true), "btn-primary");
    }
}
