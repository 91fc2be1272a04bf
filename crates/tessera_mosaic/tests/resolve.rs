//! Resolution against an in-memory host.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tessera_glaze::ExportMode;
use tessera_grout::IndexMap;
use tessera_mosaic::{
    strip_module_marker, CompositionResolver, HostLoader, LoadedModule, ModuleState,
    ResolveError, ResolveResult, ResolvedId, ResolverOptions,
};
use tessera_tile::{IcssTransformer, ModuleOptions, Transformer};

struct MemoryHost {
    files: IndexMap<String, String>,
    resolver: CompositionResolver,
    loads: AtomicUsize,
}

impl MemoryHost {
    fn new(files: &[(&str, &str)], options: ResolverOptions) -> Self {
        Self::with_transformer(files, Arc::new(IcssTransformer), options)
    }

    fn with_transformer(
        files: &[(&str, &str)],
        transformer: Arc<dyn Transformer>,
        options: ResolverOptions,
    ) -> Self {
        Self {
            files: files
                .iter()
                .map(|(id, code)| (id.to_string(), code.to_string()))
                .collect(),
            resolver: CompositionResolver::new(transformer, options),
            loads: AtomicUsize::new(0),
        }
    }

    async fn process(&self, id: &str) -> ResolveResult<tessera_mosaic::ProcessedModule> {
        self.resolver.process(self, id, &self.files[id]).await
    }
}

#[async_trait]
impl HostLoader for MemoryHost {
    async fn resolve(&self, specifier: &str, from_id: &str) -> Option<ResolvedId> {
        let specifier = strip_module_marker(specifier);
        let dir = from_id.rsplit_once('/').map_or("", |(dir, _)| dir);
        let id = format!("{dir}/{}", specifier.trim_start_matches("./"));
        self.files.contains_key(&id).then_some(ResolvedId { id })
    }

    async fn load(&self, id: &ResolvedId) -> ResolveResult<LoadedModule> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let Some(code) = self.files.get(&id.id) else {
            return Err(ResolveError::Load {
                id: id.id.clone(),
                message: "no such file".into(),
            });
        };
        self.resolver.process(self, &id.id, code).await?.to_loaded()
    }
}

fn options() -> ResolverOptions {
    ResolverOptions {
        module: ModuleOptions {
            generate_scoped_name: Some("[name]_[local]".into()),
            ..Default::default()
        },
        ..Default::default()
    }
}

#[tokio::test]
async fn composition_imports_dependency_once() {
    let host = MemoryHost::new(
        &[
            (
                "/src/a.css",
                ".x { composes: y from './b.css'; color: red }\n.x2 { composes: y from './b.css' }",
            ),
            ("/src/b.css", ".y { color: blue }"),
        ],
        options(),
    );

    let module = host.process("/src/a.css").await.unwrap();
    insta::assert_snapshot!(module.js, @r#"
    import { y as _0 } from "/src/b.css";
    const x = `a_x ${_0}`;
    const x2 = `a_x2 ${_0}`;
    export {
      x,
      x2,
    };
    export default {
      "x": x,
      "x2": x2,
    };
    "#);
    assert_eq!(module.exports["x"].resolved, "a_x b_y");
    assert_eq!(module.dependencies, vec!["/src/b.css"]);
    assert!(module.css.contains(".a_x"));
    assert!(!module.css.contains("b_y"));
    assert!(!module.css.contains(":import"));
    assert_eq!(host.loads.load(Ordering::SeqCst), 1);
    assert_eq!(host.resolver.state("/src/a.css"), Some(ModuleState::Emitted));
}

#[tokio::test]
async fn missing_export_names_export_and_specifier() {
    let host = MemoryHost::new(
        &[
            ("/src/a.css", ".x { composes: z from './b.css' }"),
            ("/src/b.css", ".y { color: blue }"),
        ],
        ResolverOptions {
            generate_source_types: true,
            ..options()
        },
    );

    let error = host.process("/src/a.css").await.unwrap_err();
    let message = error.to_string();
    assert!(message.contains("\"z\""), "{message}");
    assert!(message.contains("\"./b.css\""), "{message}");
    assert!(matches!(error, ResolveError::MissingExport { .. }));
    assert_eq!(host.resolver.state("/src/a.css"), Some(ModuleState::Failed));
    assert_eq!(host.resolver.state("/src/b.css"), Some(ModuleState::Emitted));
}

#[tokio::test]
async fn unresolved_specifier() {
    let host = MemoryHost::new(&[("/src/a.css", ".x { composes: y from './nope.css' }")], options());
    let error = host.process("/src/a.css").await.unwrap_err();
    assert!(matches!(error, ResolveError::Unresolved { ref specifier, .. } if specifier == "./nope.css"));
}

#[tokio::test]
async fn cycle_is_reported() {
    let host = MemoryHost::new(
        &[
            ("/src/a.css", ".x { composes: y from './b.css' }"),
            ("/src/b.css", ".y { composes: x from './a.css' }"),
        ],
        options(),
    );

    match host.process("/src/a.css").await.unwrap_err() {
        ResolveError::Cycle { chain } => {
            assert_eq!(chain, vec!["/src/a.css", "/src/b.css", "/src/a.css"]);
        }
        other => panic!("expected a cycle, got {other}"),
    }
}

#[tokio::test]
async fn value_references_are_substituted() {
    let host = MemoryHost::new(
        &[
            (
                "/src/a.css",
                "@value primary from './colors.css';\n.x { color: primary }",
            ),
            ("/src/colors.css", "@value primary: #f00;"),
        ],
        options(),
    );

    let module = host.process("/src/a.css").await.unwrap();
    assert!(module.css.contains("color: #f00"), "{}", module.css);
    assert!(!module.css.contains("i__value"));
    assert!(!module.exports.contains_key("primary"));
    assert_eq!(module.exports["x"].resolved, "a_x");
}

#[tokio::test]
async fn local_composition_is_expanded() {
    let host = MemoryHost::new(
        &[
            (
                "/src/a.css",
                ".base { composes: y from './b.css' }\n.x { composes: base; color: red }",
            ),
            ("/src/b.css", ".y { color: blue }"),
        ],
        options(),
    );

    let module = host.process("/src/a.css").await.unwrap();
    assert_eq!(module.exports["x"].resolved, "a_x a_base b_y");
    assert_eq!(module.imports.len(), 1);
}

#[tokio::test]
async fn declarations_follow_options() {
    let host = MemoryHost::new(
        &[("/src/a.css", ".btn-primary { color: red }")],
        ResolverOptions {
            export_mode: ExportMode::Named,
            locals_convention: tessera_glaze::LocalsConvention::CamelCaseOnly,
            generate_source_types: true,
            declaration_map: true,
            ..options()
        },
    );

    let module = host.process("/src/a.css").await.unwrap();
    let dts = module.dts.unwrap();
    assert!(dts.contains("declare const btnPrimary: string;"));
    assert!(dts.contains("  btnPrimary,\n"));
    assert!(dts
        .lines()
        .last()
        .unwrap()
        .starts_with("//# sourceMappingURL=data:application/json"));
    assert!(module.js.contains("const btnPrimary = \"a_btn-primary\";"));
}

#[tokio::test]
async fn concurrent_files_resolve_independently() {
    let host = Arc::new(MemoryHost::new(
        &[
            ("/src/a.css", ".x { composes: y from './b.css' }"),
            ("/src/bad.css", ".x { composes: nope from './b.css' }"),
            ("/src/b.css", ".y { color: blue }"),
        ],
        options(),
    ));

    let (a, bad) = tokio::join!(host.process("/src/a.css"), host.process("/src/bad.css"));
    assert!(a.is_ok());
    assert!(bad.is_err());
}

#[cfg(feature = "native")]
#[tokio::test]
async fn lightningcss_backend_resolves_compositions_and_dashed_idents() {
    let host = MemoryHost::with_transformer(
        &[
            (
                "/src/a.css",
                ".x { composes: y from './b.css'; color: var(--brand from \"./theme.css\") }",
            ),
            ("/src/b.css", ".y { color: blue }"),
            ("/src/theme.css", ":root { --brand: red }"),
        ],
        Arc::new(tessera_tile::LightningTransformer),
        ResolverOptions {
            module: ModuleOptions {
                generate_scoped_name: Some("[name]_[local]".into()),
                ..Default::default()
            },
            ..Default::default()
        },
    );

    let theme = host.process("/src/theme.css").await.unwrap();
    let brand = &theme.exports["--brand"].resolved;
    assert_ne!(brand, "--brand");

    let module = host.process("/src/a.css").await.unwrap();
    assert_eq!(module.exports["x"].resolved, "a_x b_y");
    assert!(
        module.css.contains(&format!("var({brand})")),
        "{}",
        module.css
    );
    assert!(module.js.contains("from \"/src/b.css\";"), "{}", module.js);
    assert_eq!(module.dependencies, vec!["/src/b.css", "/src/theme.css"]);
    assert_eq!(host.resolver.state("/src/a.css"), Some(ModuleState::Emitted));
}
