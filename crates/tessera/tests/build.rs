//! End-to-end batch builds over a temporary project.

use std::fs;
use std::path::Path;

use tempfile::TempDir;
use tessera::batch::{build, collect_files, BuildOptions, OutputFormat, DEFAULT_PATTERNS};
use tessera::config::{ConfigError, TesseraConfig};
use tessera::mosaic::ErrorCategory;
use tessera::report::FileStatus;

fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (path, content) in files {
        let path = dir.path().join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    dir
}

fn options(root: &Path, config: TesseraConfig) -> BuildOptions {
    BuildOptions {
        root: root.to_path_buf(),
        out_dir: "dist".into(),
        patterns: DEFAULT_PATTERNS.iter().map(|p| p.to_string()).collect(),
        format: OutputFormat::Js,
        config,
    }
}

fn scoped_config() -> TesseraConfig {
    TesseraConfig {
        generate_scoped_name: Some("[name]_[local]".into()),
        ..Default::default()
    }
}

fn read(root: &Path, path: &str) -> String {
    fs::read_to_string(root.join(path)).unwrap()
}

#[tokio::test]
async fn composition_across_files() {
    let dir = project(&[
        (
            "src/pages/a.module.css",
            ".title { composes: heading from '../shared/b.module.css'; color: red }",
        ),
        ("src/shared/b.module.css", ".heading { font-weight: bold }"),
    ]);

    let report = build(&options(dir.path(), scoped_config())).await.unwrap();
    assert_eq!(report.exit_code(), 0, "{}", report.render());
    assert_eq!(report.files.len(), 2);

    let js = read(dir.path(), "dist/src/pages/a.module.css.js");
    assert!(
        js.contains("from \"../shared/b.module.css.js\";"),
        "{js}"
    );
    let css = read(dir.path(), "dist/src/pages/a.module.css");
    assert!(!css.contains("composes"), "{css}");
    assert!(!css.contains(":import"), "{css}");
    assert!(dir.path().join("dist/src/shared/b.module.css.js").is_file());
    assert!(!dir.path().join("dist/src/shared/b.module.css.d.ts").exists());
}

#[tokio::test]
async fn missing_export_fails_only_the_importer() {
    let dir = project(&[
        ("a.module.css", ".x { composes: nope from './b.module.css' }"),
        ("b.module.css", ".y { color: blue }"),
    ]);

    let report = build(&options(dir.path(), scoped_config())).await.unwrap();
    assert_eq!(report.exit_code(), 1);
    assert_eq!(report.failed(), 1);

    let FileStatus::Failed { category, message } = &report.files[0].status else {
        panic!("expected a.module.css to fail");
    };
    assert_eq!(*category, ErrorCategory::UnresolvedDependency);
    assert!(message.contains("\"nope\""), "{message}");
    assert!(message.contains("\"./b.module.css\""), "{message}");
    assert_eq!(report.files[1].status, FileStatus::Written);
    assert!(report.render().ends_with("1 file(s) failed, 1 built"));
}

#[tokio::test]
async fn cycles_fail_without_blocking_other_files() {
    let dir = project(&[
        ("a.module.css", ".x { composes: y from './b.module.css' }"),
        ("b.module.css", ".y { composes: x from './a.module.css' }"),
        ("c.module.css", ".z { composes: x from './a.module.css' }"),
        ("d.module.css", ".w { color: green }"),
    ]);

    let report = build(&options(dir.path(), scoped_config())).await.unwrap();
    assert_eq!(report.failed(), 3);
    for file in &report.files[..3] {
        let FileStatus::Failed { message, .. } = &file.status else {
            panic!("expected {} to fail", file.id);
        };
        assert!(message.starts_with("Circular composition: "), "{message}");
    }
    assert_eq!(report.files[3].id, "d.module.css");
    assert_eq!(report.files[3].status, FileStatus::Written);
}

#[tokio::test]
async fn unchanged_outputs_are_not_rewritten() {
    let dir = project(&[("src/a.module.css", ".x { color: red }")]);
    let config = TesseraConfig {
        generate_source_types: true,
        ..scoped_config()
    };

    let first = build(&options(dir.path(), config.clone())).await.unwrap();
    assert_eq!(first.written(), 1);
    assert!(dir.path().join("dist/src/a.module.css.d.ts").is_file());

    // Outputs under dist/ must not be picked up as inputs.
    let second = build(&options(dir.path(), config)).await.unwrap();
    assert_eq!(second.files.len(), 1);
    assert_eq!(second.files[0].status, FileStatus::Unchanged);
}

#[tokio::test]
async fn json_format_lists_resolved_exports() {
    let dir = project(&[
        ("a.module.css", ".x { composes: y from './b.module.css' }"),
        ("b.module.css", ".y { color: blue }"),
    ]);
    let options = BuildOptions {
        format: OutputFormat::Json,
        ..options(dir.path(), scoped_config())
    };

    let report = build(&options).await.unwrap();
    assert_eq!(report.exit_code(), 0, "{}", report.render());

    let json: serde_json::Value =
        serde_json::from_str(&read(dir.path(), "dist/a.module.css.json")).unwrap();
    assert_eq!(json["file"], "a.module.css");
    assert_eq!(json["exports"]["x"], "a_x b_y");
}

#[tokio::test]
async fn contradictory_config_aborts_before_reading() {
    let dir = project(&[("a.module.css", ".x {")]);
    let config = TesseraConfig {
        declaration_map: true,
        ..Default::default()
    };

    let error = build(&options(dir.path(), config)).await.unwrap_err();
    assert!(matches!(error, ConfigError::DeclarationMapWithoutTypes));
    assert!(!dir.path().join("dist").exists());
}

#[test]
fn collects_matching_files_sorted() {
    let dir = project(&[
        ("src/b.module.css", ""),
        ("src/a.module.scss", ""),
        ("src/plain.css", ""),
        ("dist/src/b.module.css", ""),
    ]);
    let patterns: Vec<String> = DEFAULT_PATTERNS.iter().map(|p| p.to_string()).collect();
    let files = collect_files(dir.path(), &patterns, &dir.path().join("dist"));
    assert_eq!(files, vec!["src/a.module.scss", "src/b.module.css"]);
}

#[tokio::test]
async fn dependencies_outside_patterns_are_emitted_once() {
    let dir = project(&[
        ("src/a.module.css", ".x { composes: base from '../shared/base.css' }"),
        ("src/b.module.css", ".y { composes: base from '../shared/base.css' }"),
        ("shared/base.css", ".base { composes: reset from './reset.css'; margin: 0 }"),
        ("shared/reset.css", ".reset { padding: 0 }"),
    ]);

    let report = build(&options(dir.path(), scoped_config())).await.unwrap();
    assert_eq!(report.exit_code(), 0, "{}", report.render());
    let ids: Vec<&str> = report.files.iter().map(|file| file.id.as_str()).collect();
    assert_eq!(
        ids,
        vec!["shared/base.css", "shared/reset.css", "src/a.module.css", "src/b.module.css"]
    );

    let js = read(dir.path(), "dist/src/a.module.css.js");
    assert!(js.contains("from \"../shared/base.css.js\";"), "{js}");
    assert!(read(dir.path(), "dist/shared/base.css.js").contains("from \"./reset.css.js\";"));

    // The composed rule lives only in its own file's CSS.
    let emitted: Vec<String> = ["src/a.module.css", "src/b.module.css", "shared/base.css"]
        .iter()
        .map(|id| read(dir.path(), &format!("dist/{id}")))
        .collect();
    let rules = emitted.iter().filter(|css| css.contains(".base_base")).count();
    assert_eq!(rules, 1, "{emitted:?}");
    assert!(read(dir.path(), "dist/shared/reset.css").contains(".reset_reset"));
}

#[tokio::test]
async fn only_warning_diagnostics_reach_the_report() {
    let dir = project(&[
        ("a.module.css", ".default { color: red }"),
        ("b.module.css", ".btn-primary { color: red }"),
    ]);
    let config = TesseraConfig {
        target: tessera::glaze::Target::Es2020,
        ..scoped_config()
    };

    let report = build(&options(dir.path(), config)).await.unwrap();
    assert_eq!(report.exit_code(), 0, "{}", report.render());
    assert_eq!(report.files[0].warnings.len(), 1);
    assert!(report.files[0].warnings[0].contains("\"default\""));
    assert!(report.files[1].warnings.is_empty(), "{:?}", report.files[1].warnings);
}

#[tokio::test]
async fn unwritable_output_is_an_io_failure() {
    let dir = project(&[("a.module.css", ".x { color: red }"), ("dist", "not a directory")]);

    let report = build(&options(dir.path(), scoped_config())).await.unwrap();
    assert_eq!(report.exit_code(), 1);
    let FileStatus::Failed { category, message } = &report.files[0].status else {
        panic!("expected a.module.css to fail");
    };
    assert_eq!(*category, ErrorCategory::Io);
    assert!(message.starts_with("Failed to write "), "{message}");
}
