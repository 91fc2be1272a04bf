//! End-to-end tests for the ICSS pipeline backend.

use std::sync::Arc;

use regex::Regex;
use tessera_grout::SourceMap;
use tessera_tile::{
    ComposedRef, DependencyReference, ExportEntry, IcssTransformer, ModuleOptions,
    ScopeBehaviour, ScopedNameGenerator, TransformError, Transformer,
};

fn named(template: &str) -> ModuleOptions {
    ModuleOptions {
        generate_scoped_name: Some(template.into()),
        ..Default::default()
    }
}

#[test]
fn test_full_pipeline() {
    let css = r#"@value primary from "./colors.css";
.x { composes: y from "./b.css"; color: primary }
.z { composes: x; }
"#;
    let out = IcssTransformer
        .transform(css, "/src/a.module.css", &named("[name]_[local]"), false)
        .unwrap();

    insta::assert_snapshot!(out.code, @r"
    .a_x {
      color: i__value_primary_0;
    }

    .a_z {
    }
    ");

    let keys: Vec<_> = out.exports.keys().cloned().collect();
    assert_eq!(keys, vec!["x", "z"]);
    assert_eq!(
        out.exports["x"],
        ExportEntry::Composed {
            name: "a_x".into(),
            composes: vec![ComposedRef::Dependency {
                name: "y".into(),
                specifier: "./b.css".into(),
            }],
        }
    );
    assert_eq!(
        out.exports["z"].composes(),
        &[ComposedRef::Local { name: "a_x".into() }]
    );
    assert_eq!(
        out.references["i__value_primary_0"],
        DependencyReference {
            specifier: "./colors.css".into(),
            name: "primary".into(),
        }
    );
    assert_eq!(out.dependency_specifiers(), vec!["./b.css", "./colors.css"]);
}

#[test]
fn test_deterministic_output() {
    let css = ".b { color: red }\n.a { composes: b; }\n@keyframes spin {}\n";
    let options = ModuleOptions::default();
    let first = IcssTransformer
        .transform(css, "/src/card.css", &options, true)
        .unwrap();
    let second = IcssTransformer
        .transform(css, "/src/card.css", &options, true)
        .unwrap();
    assert_eq!(first, second);
    assert!(first.exports["b"].name().starts_with("card__b___"));
}

#[test]
fn test_different_files_get_different_names() {
    let css = ".a {}";
    let options = ModuleOptions::default();
    let one = IcssTransformer.transform(css, "/x/one.css", &options, false).unwrap();
    let two = IcssTransformer.transform(css, "/y/one.css", &options, false).unwrap();
    assert_ne!(one.exports["a"], two.exports["a"]);
}

#[test]
fn test_global_module_paths_export_literal_names() {
    let options = ModuleOptions {
        global_module_paths: vec![Regex::new(r"\.global\.css$").unwrap()],
        ..Default::default()
    };
    let out = IcssTransformer
        .transform(".btn { color: red }\n.btn:hover {}", "/src/base.global.css", &options, false)
        .unwrap();
    assert!(out.code.starts_with(".btn {"));
    assert_eq!(out.exports.len(), 1);
    assert_eq!(out.exports["btn"], ExportEntry::Bare("btn".into()));
}

#[test]
fn test_global_scope_behaviour_without_export_globals() {
    let options = ModuleOptions {
        scope_behaviour: ScopeBehaviour::Global,
        ..named("[local]_x")
    };
    let out = IcssTransformer
        .transform(".g {}\n:local(.l) {}", "a.css", &options, false)
        .unwrap();
    assert!(out.code.contains(".g {"));
    assert!(out.code.contains(".l_x {"));
    let keys: Vec<_> = out.exports.keys().cloned().collect();
    assert_eq!(keys, vec!["l"]);
}

#[test]
fn test_authored_icss_rules() {
    let css = ":import(\"./theme.css\") { t_accent: accent }\n:export { accent: t_accent; size: 12px }\n.a { color: t_accent }";
    let out = IcssTransformer
        .transform(css, "a.css", &named("[local]"), false)
        .unwrap();
    assert!(!out.code.contains(":import"));
    assert!(!out.code.contains(":export"));
    assert_eq!(out.references["t_accent"].name, "accent");
    assert_eq!(out.exports["size"], ExportEntry::Bare("12px".into()));
}

#[test]
fn test_function_generator_receives_raw_css() {
    let generator = ScopedNameGenerator::Function(Arc::new(|name, file, css| {
        format!("{name}_{}_{}", file.len(), css.len())
    }));
    let options = ModuleOptions {
        generate_scoped_name: Some(generator),
        ..Default::default()
    };
    let out = IcssTransformer.transform(".a {}", "f.css", &options, false).unwrap();
    assert_eq!(out.exports["a"].name(), "a_5_5");
}

#[test]
fn test_parse_error_is_fatal() {
    let err = IcssTransformer
        .transform(".a { color: red", "bad.css", &ModuleOptions::default(), false)
        .unwrap_err();
    assert_eq!(err.to_string(), "bad.css:1:1: Unclosed block");
}

#[test]
fn test_composition_error() {
    let err = IcssTransformer
        .transform("div { composes: a }", "bad.css", &ModuleOptions::default(), false)
        .unwrap_err();
    assert!(matches!(err, TransformError::Composition { .. }));
}

#[test]
fn test_css_source_map() {
    let out = IcssTransformer
        .transform("\n.foo {\n\tcolor:red;\n}\n", "a.css?module", &named("[local]"), true)
        .unwrap();
    let map = SourceMap::from_json(out.map.as_deref().unwrap()).unwrap();
    assert_eq!(map.sources, vec!["a.css"]);
    let mappings = map.decode().unwrap();
    assert_eq!(
        mappings
            .iter()
            .map(|m| (m.generated_line, m.generated_column, m.original_line, m.original_column))
            .collect::<Vec<_>>(),
        vec![(0, 0, 1, 0), (1, 2, 2, 1)]
    );
}
