//! Build command - Compile CSS module files

use std::path::PathBuf;

use clap::Args;
use tessera::batch::{self, BuildOptions, OutputFormat, DEFAULT_PATTERNS};
use tessera::config::load_config;
use tessera::glaze::{ExportMode, Target};
use tessera::tile::Backend;

#[derive(Args, Default)]
pub struct BuildArgs {
    /// Glob pattern(s) of files to build (default: config `include`, then **/*.module.{css,scss,sass})
    pub patterns: Vec<String>,

    /// Output directory (default: config `outDir`, then ./dist)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "js")]
    pub format: OutputFormat,

    /// Project root (default: current directory)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Config file (default: <root>/tessera.config.json)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Transformer backend: icss or lightningcss
    #[arg(long)]
    pub backend: Option<Backend>,

    /// Export mode: both, named or default
    #[arg(long)]
    pub export_mode: Option<ExportMode>,

    /// JavaScript target, e.g. es2020 or esnext
    #[arg(long)]
    pub target: Option<Target>,

    /// Locals convention: camelCase, camelCaseOnly, dashes or dashesOnly
    #[arg(long)]
    pub locals_convention: Option<String>,

    /// Emit .d.ts declarations
    #[arg(long)]
    pub types: bool,

    /// Append an inline source map to each .d.ts
    #[arg(long)]
    pub declaration_map: bool,

    /// Number of threads (default: number of CPUs)
    #[arg(short = 'j', long)]
    pub threads: Option<usize>,
}

pub fn run(args: BuildArgs) {
    if let Some(threads) = args.threads {
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
        {
            eprintln!("\x1b[33mWarning:\x1b[0m Failed to configure thread pool: {e}");
        }
    }

    let root = match args.root.clone().map_or_else(std::env::current_dir, Ok) {
        Ok(root) => root,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m Cannot determine project root: {e}");
            std::process::exit(1);
        }
    };

    let mut config = load_config(&root, args.config.as_deref());
    if let Some(backend) = args.backend {
        config.backend = backend;
    }
    if let Some(export_mode) = args.export_mode {
        config.export_mode = export_mode;
    }
    if let Some(target) = args.target {
        config.target = target;
    }
    if args.locals_convention.is_some() {
        config.locals_convention = args.locals_convention.clone();
    }
    config.generate_source_types |= args.types;
    config.declaration_map |= args.declaration_map;

    let patterns = if !args.patterns.is_empty() {
        args.patterns.clone()
    } else if !config.include.is_empty() {
        config.include.clone()
    } else {
        DEFAULT_PATTERNS.iter().map(|p| p.to_string()).collect()
    };
    let out_dir = args
        .output
        .clone()
        .or_else(|| config.out_dir.clone())
        .unwrap_or_else(|| PathBuf::from("dist"));

    let options = BuildOptions {
        root,
        out_dir,
        patterns,
        format: args.format,
        config,
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m Failed to start async runtime: {e}");
            std::process::exit(1);
        }
    };

    let report = match runtime.block_on(batch::build(&options)) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}: {}", e.category().label(), e);
            eprintln!("  \x1b[33mHint:\x1b[0m {}", e.category().hint());
            std::process::exit(1);
        }
    };

    if report.files.is_empty() {
        eprintln!("No CSS module files found matching the patterns");
        std::process::exit(1);
    }

    eprintln!("{}", report.render());
    std::process::exit(report.exit_code());
}
