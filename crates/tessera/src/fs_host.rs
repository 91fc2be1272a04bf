//! Filesystem host for batch builds.
//!
//! Module ids are paths relative to the project root with `/` separators,
//! so scoped name hashes do not depend on where the project is checked out.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tessera_mosaic::{
    strip_module_marker, CompilerNotFoundError, CompositionResolver, HostLoader, LoadedModule,
    Preprocessor, ProcessedModule, ResolveError, ResolveResult, ResolvedId,
};
use tessera_tile::scoped_name::clean_id;
use tessera_tile::TransformOutput;
use tokio::sync::OnceCell;

/// A module built by the host.
#[derive(Debug)]
pub struct Built {
    pub module: ProcessedModule,
    /// Set when the source needed a compiler that was not found.
    pub degraded: Option<CompilerNotFoundError>,
}

/// Source already read (and possibly transformed) by an earlier pass.
#[derive(Debug, Clone)]
pub struct Seed {
    pub css: String,
    pub output: Option<TransformOutput>,
    pub degraded: Option<CompilerNotFoundError>,
}

type Slot = Arc<OnceCell<Arc<Built>>>;

/// [`HostLoader`] over the local filesystem with a per-module build memo.
pub struct FsHost {
    root: PathBuf,
    resolver: CompositionResolver,
    preprocessor: Preprocessor,
    seeds: DashMap<String, Seed>,
    modules: DashMap<String, Slot>,
}

impl FsHost {
    pub fn new(root: impl Into<PathBuf>, resolver: CompositionResolver) -> Self {
        Self {
            root: root.into(),
            resolver,
            preprocessor: Preprocessor::new(),
            seeds: DashMap::new(),
            modules: DashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolver(&self) -> &CompositionResolver {
        &self.resolver
    }

    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    pub fn path_of(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }

    /// Provide the source of `id` up front instead of reading it on load.
    pub fn seed(&self, id: &str, seed: Seed) {
        self.seeds.insert(id.to_string(), seed);
    }

    /// Drop everything built for `id`; the next load rebuilds it.
    pub fn invalidate(&self, id: &str) {
        self.modules.remove(id);
        self.seeds.remove(id);
        self.resolver.invalidate(id);
    }

    /// Id of the file `specifier` points at from module `from_id`.
    pub fn resolve_specifier(&self, specifier: &str, from_id: &str) -> Option<String> {
        let specifier = clean_id(strip_module_marker(specifier));
        let path = if specifier.starts_with("./") || specifier.starts_with("../") {
            let dir = Path::new(from_id).parent().unwrap_or(Path::new(""));
            self.root.join(dir).join(specifier)
        } else if let Some(absolute) = specifier.strip_prefix('/') {
            self.root.join(absolute)
        } else {
            self.root.join("node_modules").join(specifier)
        };

        let path = normalize(&path);
        if !path.is_file() {
            return None;
        }
        module_id(&self.root, &path)
    }

    /// Build module `id`, or return the memoized result.
    ///
    /// Only successes are memoized; a failed build is retried by the next
    /// caller.
    pub async fn build(&self, id: &str) -> ResolveResult<Arc<Built>> {
        let slot: Slot = self.modules.entry(id.to_string()).or_default().clone();
        slot.get_or_try_init(|| self.build_uncached(id)).await.cloned()
    }

    async fn build_uncached(&self, id: &str) -> ResolveResult<Arc<Built>> {
        let seed = self.seeds.get(id).map(|seed| seed.clone());
        let (css, output, degraded) = match seed {
            Some(seed) => (seed.css, seed.output, seed.degraded),
            None => {
                let path = self.path_of(id);
                let source = tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|e| ResolveError::Load {
                        id: id.to_string(),
                        message: e.to_string(),
                    })?;
                let pre = self.preprocessor.preprocess(&path, &source).await?;
                (pre.css, None, pre.degraded)
            }
        };

        let module = match output {
            Some(output) => self.resolver.resolve(self, id, &css, output).await?,
            None => self.resolver.process(self, id, &css).await?,
        };
        Ok(Arc::new(Built { module, degraded }))
    }
}

#[async_trait]
impl HostLoader for FsHost {
    async fn resolve(&self, specifier: &str, from_id: &str) -> Option<ResolvedId> {
        self.resolve_specifier(specifier, from_id)
            .map(|id| ResolvedId { id })
    }

    async fn load(&self, id: &ResolvedId) -> ResolveResult<LoadedModule> {
        self.build(&id.id).await?.module.to_loaded()
    }
}

/// Lexically resolve `.` and `..` components.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Root-relative id of `path`, `None` when it lies outside `root`.
pub fn module_id(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect();
    Some(parts.join("/"))
}

/// Relative import specifier from the output of `importer` to the output of
/// `dependency`, both given as module ids.
pub fn relative_import(importer: &str, dependency: &str) -> String {
    let from: Vec<&str> = importer.split('/').collect();
    let from_dir = &from[..from.len().saturating_sub(1)];
    let to: Vec<&str> = dependency.split('/').collect();

    let common = from_dir
        .iter()
        .zip(&to)
        .take_while(|(a, b)| a == b)
        .count();
    let mut parts: Vec<&str> = vec![".."; from_dir.len() - common];
    parts.extend(&to[common..]);

    let path = parts.join("/");
    if path.starts_with("..") {
        format!("{path}.js")
    } else {
        format!("./{path}.js")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_import() {
        assert_eq!(relative_import("src/a.css", "src/b.css"), "./b.css.js");
        assert_eq!(
            relative_import("src/pages/a.css", "src/shared/b.css"),
            "../shared/b.css.js"
        );
        assert_eq!(relative_import("a.css", "lib/b.css"), "./lib/b.css.js");
        assert_eq!(relative_import("src/a.css", "b.css"), "../b.css.js");
    }

    #[test]
    fn test_normalize_and_module_id() {
        let root = Path::new("/project");
        let path = normalize(Path::new("/project/src/pages/../shared/./b.css"));
        assert_eq!(path, PathBuf::from("/project/src/shared/b.css"));
        assert_eq!(module_id(root, &path).as_deref(), Some("src/shared/b.css"));
        assert_eq!(module_id(root, Path::new("/elsewhere/b.css")), None);
    }
}
