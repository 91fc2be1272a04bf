//! Composition resolver.
//!
//! Drives one CSS module from raw text to emitted artifacts:
//!
//! ```text
//! Pending -> Transformed -> Resolving -> Resolved -> Emitted
//!                                  \-> Failed
//! ```
//!
//! Every cross-file reference is looked up through the [`HostLoader`]. A
//! composed class from another file is referenced through an import of that
//! file's module, so its rule is only ever emitted by its own file.

use std::fmt;
use std::sync::Arc;

use futures::future::try_join_all;
use tessera_glaze::{
    generate_types, synthesize, BindingId, ClassExpr, DeclarationMap, ExportMode, Exports,
    Imports, LocalsConvention, ResolvedExport, Target,
};
use tessera_grout::{Diagnostic, FxHashMap, FxHashSet, IndexMap, SourceMap};
use tessera_tile::scoped_name::clean_id;
use tessera_tile::{
    ComposedRef, CssModuleExports, ExportEntry, ModuleOptions, TransformOutput, Transformer,
};

use crate::error::{ResolveError, ResolveResult};
use crate::graph;
use crate::host::{module_specifier, CssModuleMeta, HostLoader, LoadedModule, MetaExport};
use crate::state::{ModuleState, StateTable};

/// `(importer id, dependency id) -> module specifier` used in generated imports.
pub type ImportPathFn = Arc<dyn Fn(&str, &str) -> String + Send + Sync>;

/// Options shared by every module a resolver processes.
#[derive(Clone, Default)]
pub struct ResolverOptions {
    pub module: ModuleOptions,
    pub locals_convention: LocalsConvention,
    pub export_mode: ExportMode,
    pub target: Target,
    /// Produce a CSS source map (backends without map support ignore it).
    pub css_source_map: bool,
    /// Produce `.d.ts` text.
    pub generate_source_types: bool,
    /// Embed a source map in the `.d.ts` text.
    pub declaration_map: bool,
    /// Rewrites dependency ids in generated imports; ids are used as-is
    /// when unset.
    pub import_path: Option<ImportPathFn>,
}

impl fmt::Debug for ResolverOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverOptions")
            .field("module", &self.module)
            .field("locals_convention", &self.locals_convention)
            .field("export_mode", &self.export_mode)
            .field("target", &self.target)
            .field("css_source_map", &self.css_source_map)
            .field("generate_source_types", &self.generate_source_types)
            .field("declaration_map", &self.declaration_map)
            .field("import_path", &self.import_path.as_ref().map(|_| ".."))
            .finish()
    }
}

/// Artifacts of one fully resolved module.
#[derive(Debug, Clone)]
pub struct ProcessedModule {
    pub id: String,
    /// CSS with every reference placeholder substituted.
    pub css: String,
    pub css_map: Option<String>,
    pub exports: Exports,
    pub imports: Imports,
    /// ESM binding module.
    pub js: String,
    pub dts: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
    /// Resolved ids of every dependency, in first-use order.
    pub dependencies: Vec<String>,
}

impl ProcessedModule {
    /// Metadata importers read back through the host.
    pub fn meta(&self) -> CssModuleMeta {
        CssModuleMeta {
            css: self.css.clone(),
            exports: self
                .exports
                .iter()
                .map(|(name, export)| {
                    let meta = MetaExport {
                        resolved: export.resolved.clone(),
                        export_as: export.export_as.iter().cloned().collect(),
                    };
                    (name.clone(), meta)
                })
                .collect(),
        }
    }

    pub fn to_loaded(&self) -> ResolveResult<LoadedModule> {
        LoadedModule::with_css_module(&self.meta())
    }
}

/// A dependency after resolution and load.
struct Dependency {
    id: String,
    meta: CssModuleMeta,
}

/// Resolves CSS modules against their dependencies and emits artifacts.
pub struct CompositionResolver {
    transformer: Arc<dyn Transformer>,
    options: ResolverOptions,
    states: StateTable,
}

impl CompositionResolver {
    pub fn new(transformer: Arc<dyn Transformer>, options: ResolverOptions) -> Self {
        Self {
            transformer,
            options,
            states: StateTable::new(),
        }
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    pub fn transformer(&self) -> &dyn Transformer {
        self.transformer.as_ref()
    }

    /// Latest state of module `id`.
    pub fn state(&self, id: &str) -> Option<ModuleState> {
        self.states.get(id)
    }

    /// Forget everything known about `id` (its file changed).
    pub fn invalidate(&self, id: &str) {
        self.states.forget(id);
    }

    /// Run the per-file transform only.
    pub fn transform(&self, id: &str, code: &str) -> ResolveResult<TransformOutput> {
        self.states.set(id, ModuleState::Pending);
        match self
            .transformer
            .transform(code, id, &self.options.module, self.options.css_source_map)
        {
            Ok(output) => {
                self.states.set(id, ModuleState::Transformed);
                Ok(output)
            }
            Err(error) => {
                self.states.set(id, ModuleState::Failed);
                Err(error.into())
            }
        }
    }

    /// Transform, resolve and emit module `id`.
    pub async fn process(
        &self,
        loader: &dyn HostLoader,
        id: &str,
        code: &str,
    ) -> ResolveResult<ProcessedModule> {
        let output = self.transform(id, code)?;
        self.resolve(loader, id, code, output).await
    }

    /// Resolve an already transformed module. `source` is the CSS the
    /// transform ran on.
    pub async fn resolve(
        &self,
        loader: &dyn HostLoader,
        id: &str,
        source: &str,
        output: TransformOutput,
    ) -> ResolveResult<ProcessedModule> {
        let result = graph::within(id, self.resolve_transformed(loader, id, source, output)).await;
        match &result {
            Ok(_) => self.states.set(id, ModuleState::Emitted),
            Err(error) => {
                tracing::debug!(id, %error, "resolution failed");
                self.states.set(id, ModuleState::Failed);
            }
        }
        result
    }

    async fn resolve_transformed(
        &self,
        loader: &dyn HostLoader,
        id: &str,
        source: &str,
        output: TransformOutput,
    ) -> ResolveResult<ProcessedModule> {
        self.states.set(id, ModuleState::Resolving);

        let specifiers: Vec<String> = output
            .dependency_specifiers()
            .into_iter()
            .map(str::to_string)
            .collect();
        let fetched = try_join_all(
            specifiers
                .iter()
                .map(|specifier| self.fetch(loader, specifier, id)),
        )
        .await?;
        let dependencies: Vec<String> = fetched.iter().map(|dep| dep.id.clone()).collect();
        let deps: FxHashMap<String, Dependency> = specifiers.into_iter().zip(fetched).collect();

        let mut substitutions = Vec::with_capacity(output.references.len());
        for (placeholder, reference) in &output.references {
            let export = lookup(&deps, &reference.specifier, &reference.name, id)?;
            substitutions.push((placeholder.as_str(), export.resolved.as_str()));
        }

        let allow_arbitrary_names = self.options.target.allows_arbitrary_names();
        let mut imports = Imports::new();
        let mut exports = Exports::default();
        for (name, entry) in &output.exports {
            let mut builder = ExprBuilder {
                all: &output.exports,
                deps: &deps,
                importer: id,
                import_path: self.options.import_path.as_ref(),
                allow_arbitrary_names,
                imports: &mut imports,
                expr: ClassExpr::default(),
                texts: FxHashSet::default(),
                bindings: FxHashSet::default(),
                expanded: FxHashSet::default(),
            };
            match entry {
                ExportEntry::Bare(value) => builder.text(&substitute(value, &substitutions).0),
                ExportEntry::Composed { name: own, composes } => {
                    builder.text(own);
                    builder.expanded.insert(own.as_str());
                    for reference in composes {
                        builder.reference(reference)?;
                    }
                }
            }
            let code = builder.expr;
            exports.insert(
                name.clone(),
                ResolvedExport {
                    resolved: code.resolve(&imports),
                    code,
                    export_as: self.options.locals_convention.export_names(name, entry.name(), id),
                },
            );
        }

        let (css, edits) = substitute(&output.code, &substitutions);
        let css_map = match output.map {
            Some(map) if !edits.is_empty() => remap(&map, &output.code, &css, &edits),
            map => map,
        };
        self.states.set(id, ModuleState::Resolved);

        let mode = self.options.export_mode;
        let synth = synthesize(&imports, &exports, mode, allow_arbitrary_names);
        let dts = self.options.generate_source_types.then(|| {
            let file = clean_id(id).rsplit(['/', '\\']).next().unwrap_or(id);
            let map = DeclarationMap {
                css: source,
                source: file.to_string(),
                file: Some(format!("{file}.d.ts")),
            };
            let map = self.options.declaration_map.then_some(&map);
            generate_types(&exports, mode, allow_arbitrary_names, map)
        });

        for diagnostic in &synth.diagnostics {
            tracing::debug!(id, %diagnostic, "diagnostic");
        }
        tracing::debug!(
            id,
            exports = exports.len(),
            imports = imports.len(),
            "module resolved"
        );

        Ok(ProcessedModule {
            id: id.to_string(),
            css,
            css_map,
            exports,
            imports,
            js: synth.code,
            dts,
            diagnostics: synth.diagnostics,
            dependencies,
        })
    }

    async fn fetch(
        &self,
        loader: &dyn HostLoader,
        specifier: &str,
        importer: &str,
    ) -> ResolveResult<Dependency> {
        let resolved = loader
            .resolve(&module_specifier(specifier), importer)
            .await
            .ok_or_else(|| ResolveError::Unresolved {
                specifier: specifier.to_string(),
                importer: importer.to_string(),
            })?;
        graph::ensure_acyclic(&resolved.id)?;

        let loaded = loader.load(&resolved).await?;
        let meta = loaded.css_module(&resolved.id)?;
        tracing::debug!(specifier, id = %resolved.id, exports = meta.exports.len(), "dependency loaded");
        Ok(Dependency {
            id: resolved.id,
            meta,
        })
    }
}

fn lookup<'d>(
    deps: &'d FxHashMap<String, Dependency>,
    specifier: &str,
    name: &str,
    importer: &str,
) -> ResolveResult<&'d MetaExport> {
    deps.get(specifier)
        .and_then(|dep| dep.meta.exports.get(name))
        .ok_or_else(|| ResolveError::MissingExport {
            name: name.to_string(),
            specifier: specifier.to_string(),
            importer: importer.to_string(),
        })
}

/// Accumulates one export's class expression without repeats.
struct ExprBuilder<'a> {
    all: &'a CssModuleExports,
    deps: &'a FxHashMap<String, Dependency>,
    importer: &'a str,
    import_path: Option<&'a ImportPathFn>,
    allow_arbitrary_names: bool,
    imports: &'a mut Imports,
    expr: ClassExpr,
    texts: FxHashSet<String>,
    bindings: FxHashSet<BindingId>,
    expanded: FxHashSet<&'a str>,
}

impl<'a> ExprBuilder<'a> {
    fn text(&mut self, text: &str) {
        if !text.is_empty() && self.texts.insert(text.to_string()) {
            self.expr.push_text(text);
        }
    }

    fn reference(&mut self, reference: &'a ComposedRef) -> ResolveResult<()> {
        match reference {
            ComposedRef::Global { name } => self.text(name),
            ComposedRef::Local { name } => {
                self.text(name);
                // Pull in whatever the composed local class composes itself.
                if self.expanded.insert(name.as_str()) {
                    let all = self.all;
                    let nested = all.values().find(|entry| entry.name() == name);
                    if let Some(entry) = nested {
                        for nested in entry.composes() {
                            self.reference(nested)?;
                        }
                    }
                }
            }
            ComposedRef::Dependency { name, specifier } => {
                let export = lookup(self.deps, specifier, name, self.importer)?;
                let (id, import_name) = match self.deps.get(specifier) {
                    Some(dep) => (
                        dep.id.as_str(),
                        dep.meta.import_name(name, self.allow_arbitrary_names),
                    ),
                    None => (specifier.as_str(), name.as_str()),
                };
                let file = match self.import_path {
                    Some(import_path) => import_path(self.importer, id),
                    None => id.to_string(),
                };
                let binding = self.imports.register(&file, import_name, &export.resolved);
                if self.bindings.insert(binding) {
                    self.expr.push_import(binding);
                }
            }
        }
        Ok(())
    }
}

/// One replaced span of the original text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Edit {
    start: usize,
    old_len: usize,
    new_len: usize,
}

fn is_ident_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-'
}

/// Replace every whole-token occurrence of each placeholder.
fn substitute(text: &str, substitutions: &[(&str, &str)]) -> (String, Vec<Edit>) {
    if substitutions.is_empty() {
        return (text.to_string(), Vec::new());
    }
    let bytes = text.as_bytes();
    let mut hits: Vec<(usize, &str, &str)> = Vec::new();
    for (placeholder, value) in substitutions {
        for (start, _) in text.match_indices(placeholder) {
            let end = start + placeholder.len();
            let bounded = (start == 0 || !is_ident_byte(bytes[start - 1]))
                && bytes.get(end).map_or(true, |byte| !is_ident_byte(*byte));
            if bounded {
                hits.push((start, placeholder, value));
            }
        }
    }
    hits.sort_by_key(|(start, ..)| *start);

    let mut out = String::with_capacity(text.len());
    let mut edits = Vec::with_capacity(hits.len());
    let mut copied = 0;
    for (start, placeholder, value) in hits {
        if start < copied {
            continue;
        }
        out.push_str(&text[copied..start]);
        out.push_str(value);
        edits.push(Edit {
            start,
            old_len: placeholder.len(),
            new_len: value.len(),
        });
        copied = start + placeholder.len();
    }
    out.push_str(&text[copied..]);
    (out, edits)
}

/// Offset in the substituted text for `offset` in the original.
fn shift(edits: &[Edit], offset: usize) -> usize {
    let mut delta: isize = 0;
    for edit in edits {
        if offset < edit.start {
            break;
        }
        if offset < edit.start + edit.old_len {
            return edit.start.saturating_add_signed(delta);
        }
        delta += edit.new_len as isize - edit.old_len as isize;
    }
    offset.saturating_add_signed(delta)
}

fn remap(map: &str, old: &str, new: &str, edits: &[Edit]) -> Option<String> {
    let remapped = SourceMap::from_json(map)
        .and_then(|map| map.remap_generated(old, new, |offset| shift(edits, offset)));
    match remapped {
        Ok(map) => Some(map.to_json()),
        Err(error) => {
            tracing::warn!(%error, "dropping CSS source map after substitution");
            None
        }
    }
}

/// Exports in the shape the JSON sidecar reports them.
pub fn resolved_exports(exports: &Exports) -> IndexMap<String, String> {
    exports
        .iter()
        .map(|(name, export)| (name.clone(), export.resolved.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitute_respects_token_boundaries() {
        let (out, edits) = substitute(
            "a: i__value_a_1; b: i__value_a_10;",
            &[("i__value_a_1", "red"), ("i__value_a_10", "blue")],
        );
        assert_eq!(out, "a: red; b: blue;");
        assert_eq!(edits.len(), 2);
    }

    #[test]
    fn test_shift_offsets() {
        let edits = [Edit {
            start: 3,
            old_len: 12,
            new_len: 3,
        }];
        assert_eq!(shift(&edits, 0), 0);
        assert_eq!(shift(&edits, 5), 3);
        assert_eq!(shift(&edits, 15), 6);
    }
}
