//! Batch build: discover, transform, resolve and write every CSS module.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use glob::Pattern;
use ignore::WalkBuilder;
use rayon::prelude::*;
use serde::Serialize;
use tessera_grout::{FxHashSet, IndexMap, Severity};
use tessera_mosaic::{
    resolved_exports, CompositionResolver, DependencyGraph, ResolveError, ResolveResult, Syntax,
};
use tessera_tile::transformer_for;

use crate::config::{ConfigError, TesseraConfig};
use crate::fs_host::{module_id, relative_import, Built, FsHost, Seed};
use crate::report::{BuildReport, FileReport, FileStatus};

/// Patterns used when neither the command line nor the config names any.
pub const DEFAULT_PATTERNS: &[&str] = &["**/*.module.css", "**/*.module.scss", "**/*.module.sass"];

/// What gets written per module.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// `.js`, `.css` and (optionally) `.d.ts` files
    #[default]
    Js,
    /// One JSON file per module with the CSS and resolved exports
    Json,
}

#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Project root; module ids are relative to it.
    pub root: PathBuf,
    pub out_dir: PathBuf,
    /// Glob patterns relative to `root`.
    pub patterns: Vec<String>,
    pub format: OutputFormat,
    pub config: TesseraConfig,
}

#[derive(Debug, Serialize)]
struct JsonOutput<'a> {
    file: &'a str,
    css: &'a str,
    exports: IndexMap<String, String>,
}

/// Module ids under `root` matching any of `patterns`, sorted.
///
/// Honors `.gitignore` and never descends into `exclude`.
pub fn collect_files(root: &Path, patterns: &[String], exclude: &Path) -> Vec<String> {
    let patterns: Vec<Pattern> = patterns
        .iter()
        .filter_map(|pattern| {
            let pattern = pattern.trim_start_matches("./");
            match Pattern::new(pattern) {
                Ok(compiled) => Some(compiled),
                Err(e) => {
                    eprintln!("\x1b[33mWarning:\x1b[0m Invalid pattern {pattern}: {e}");
                    None
                }
            }
        })
        .collect();

    let exclude = exclude.to_path_buf();
    let walker = WalkBuilder::new(root)
        .filter_entry(move |entry| !entry.path().starts_with(&exclude))
        .build();

    let mut files: Vec<String> = walker
        .flatten()
        .filter(|entry| entry.file_type().is_some_and(|ty| ty.is_file()))
        .filter_map(|entry| module_id(root, entry.path()))
        .filter(|id| patterns.iter().any(|pattern| pattern.matches(id)))
        .collect();

    files.sort();
    files.dedup();
    files
}

/// Run a full build and report every file's outcome.
///
/// Configuration errors abort before any file is read. Per-file failures
/// never stop sibling files.
pub async fn build(options: &BuildOptions) -> Result<BuildReport, ConfigError> {
    let start = Instant::now();

    let mut resolver_options = options.config.resolver_options()?;
    resolver_options.import_path = Some(Arc::new(relative_import));
    let transformer =
        transformer_for(options.config.backend).map_err(|e| ConfigError::InvalidOption {
            key: "backend",
            message: e.to_string(),
        })?;
    let host = FsHost::new(
        &options.root,
        CompositionResolver::new(transformer, resolver_options),
    );

    let out_dir = if options.out_dir.is_absolute() {
        options.out_dir.clone()
    } else {
        options.root.join(&options.out_dir)
    };
    let ids = collect_files(&options.root, &options.patterns, &out_dir);
    tracing::debug!(files = ids.len(), "collected files");

    // Read and preprocess
    let host = &host;
    let sources = join_all(ids.iter().map(|id| async move {
        let path = host.path_of(id);
        let source = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ResolveError::Load {
                id: id.clone(),
                message: e.to_string(),
            })?;
        let pre = host.preprocessor().preprocess(&path, &source).await?;
        ResolveResult::Ok(pre)
    }))
    .await;

    // Transform in parallel
    let seeds: Vec<ResolveResult<Seed>> = ids
        .par_iter()
        .zip(sources)
        .map(|(id, source)| -> ResolveResult<Seed> {
            let pre = source?;
            let output = host.resolver().transform(id, &pre.css)?;
            Ok(Seed {
                css: pre.css,
                output: Some(output),
                degraded: pre.degraded,
            })
        })
        .collect();

    // Fail cycles up front
    let mut graph = DependencyGraph::new();
    for (id, seed) in ids.iter().zip(&seeds) {
        graph.add_module(id);
        let Ok(Seed {
            output: Some(output),
            ..
        }) = seed
        else {
            continue;
        };
        for specifier in output.dependency_specifiers() {
            if let Some(dependency) = host.resolve_specifier(specifier, id) {
                graph.add_edge(id, &dependency);
            }
        }
    }
    let blocked = graph.blocked_by_cycles();

    let mut reports = Vec::with_capacity(ids.len());
    let mut pending = Vec::new();
    for (id, seed) in ids.iter().zip(seeds) {
        let seed = match seed {
            Ok(seed) => seed,
            Err(error) => {
                reports.push(FileReport::failed(id, &error));
                continue;
            }
        };
        if let Some(chain) = blocked.get(id) {
            let error = ResolveError::Cycle {
                chain: chain.clone(),
            };
            reports.push(FileReport::failed(id, &error));
            continue;
        }
        host.seed(id, seed);
        pending.push(id);
    }

    // Resolve
    let built = join_all(pending.iter().map(|id| host.build(id))).await;

    // Write
    let mut queue: Vec<String> = Vec::new();
    for (id, result) in pending.into_iter().zip(built) {
        let report = match result {
            Ok(built) => {
                queue.extend(built.module.dependencies.iter().cloned());
                write_outputs(&out_dir, id, &built, options.format)
            }
            Err(error) => FileReport::failed(id, &error),
        };
        reports.push(report);
    }

    // Dependencies outside the patterns are emitted too, once each, so every
    // generated import points at a written module.
    let mut emitted: FxHashSet<String> = ids.iter().cloned().collect();
    while let Some(id) = queue.pop() {
        if !emitted.insert(id.clone()) {
            continue;
        }
        tracing::debug!(id, "emitting dependency outside the include patterns");
        let report = match host.build(&id).await {
            Ok(built) => {
                queue.extend(built.module.dependencies.iter().cloned());
                write_outputs(&out_dir, &id, &built, options.format)
            }
            Err(error) => FileReport::failed(&id, &error),
        };
        reports.push(report);
    }

    Ok(BuildReport::new(reports, start.elapsed()))
}

fn write_outputs(out_dir: &Path, id: &str, built: &Built, format: OutputFormat) -> FileReport {
    let module = &built.module;
    let mut files: Vec<(PathBuf, String)> = Vec::new();

    match format {
        OutputFormat::Js => {
            let css_name = if Syntax::from_path(Path::new(id)).needs_compiler() {
                Path::new(id).with_extension("css")
            } else {
                PathBuf::from(id)
            };
            files.push((out_dir.join(css_name), module.css.clone()));
            files.push((out_dir.join(format!("{id}.js")), module.js.clone()));
            if let Some(dts) = &module.dts {
                files.push((out_dir.join(format!("{id}.d.ts")), dts.clone()));
            }
        }
        OutputFormat::Json => {
            let output = JsonOutput {
                file: id,
                css: &module.css,
                exports: resolved_exports(&module.exports),
            };
            match serde_json::to_string_pretty(&output) {
                Ok(json) => files.push((out_dir.join(format!("{id}.json")), json)),
                Err(e) => {
                    return FileReport::io_failed(id, format!("Failed to serialize JSON output: {e}"))
                }
            }
        }
    }

    let mut changed = false;
    for (path, content) in files {
        match write_if_changed(&path, &content) {
            Ok(written) => changed |= written,
            Err(e) => {
                return FileReport::io_failed(
                    id,
                    format!("Failed to write {}: {e}", path.display()),
                )
            }
        }
    }

    FileReport {
        id: id.to_string(),
        status: if changed {
            FileStatus::Written
        } else {
            FileStatus::Unchanged
        },
        degraded: built.degraded.as_ref().map(|error| error.display_message()),
        warnings: module
            .diagnostics
            .iter()
            .filter(|diagnostic| {
                if diagnostic.severity == Severity::Info {
                    tracing::debug!(file = id, %diagnostic, "info");
                    return false;
                }
                true
            })
            .map(ToString::to_string)
            .collect(),
    }
}

/// Write `content` unless the file already holds exactly it.
fn write_if_changed(path: &Path, content: &str) -> std::io::Result<bool> {
    if fs::read(path).is_ok_and(|existing| existing == content.as_bytes()) {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(true)
}
