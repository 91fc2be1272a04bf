//! Mosaic - Cross-file composition for Tessera.
//!
//! A single tile is scoped CSS plus an export map. The mosaic appears once
//! every `composes ... from` and `@value ... from` reference has been looked
//! up in the file it points at. This crate does that lookup:
//!
//! - **resolver**: per-file state machine from transform to emitted
//!   JavaScript, CSS and declaration text
//! - **host**: the loader contract an embedding host implements
//! - **graph**: cycle detection (task-local chain and batch graph)
//! - **preprocess**: `.scss`/`.sass` pre-pass with a per-root compiler cache
//!
//! The resolver keeps no cache of other files' exports. Everything it knows
//! about a dependency comes back through [`HostLoader::load`].

pub mod error;
pub mod graph;
pub mod host;
pub mod preprocess;
pub mod resolver;
pub mod state;

pub use error::{
    detect_package_manager, CompilerNotFoundError, ErrorCategory, PackageManager,
    PreprocessError, ResolveError, ResolveResult,
};
pub use graph::DependencyGraph;
pub use host::{
    module_specifier, strip_module_marker, CssModuleMeta, HostLoader, LoadedModule, MetaExport,
    ResolvedId, MODULE_MARKER, NAMESPACE,
};
pub use preprocess::{Compiler, CompilerCache, Preprocessed, Preprocessor, Syntax};
pub use resolver::{
    resolved_exports, CompositionResolver, ImportPathFn, ProcessedModule, ResolverOptions,
};
pub use state::{ModuleState, StateTable};
