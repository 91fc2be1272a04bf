//! Stylesheet preprocessor pre-pass.
//!
//! `.scss` and `.sass` sources are compiled to CSS by an external `sass`
//! executable before the CSS modules transform runs. The executable is
//! discovered once per package root; concurrent first requests for the same
//! root wait on one latch and share its result.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::OnceCell;

use crate::error::{CompilerNotFoundError, PreprocessError};

const COMPILER: &str = "sass";
const PACKAGE: &str = "sass";

/// Source syntax, from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    Css,
    Scss,
    /// Indented syntax.
    Sass,
}

impl Syntax {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("scss") => Syntax::Scss,
            Some("sass") => Syntax::Sass,
            _ => Syntax::Css,
        }
    }

    pub fn needs_compiler(self) -> bool {
        self != Syntax::Css
    }
}

/// A discovered compiler executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compiler {
    pub path: PathBuf,
}

impl Compiler {
    /// Compile `source` (the contents of `file`) to CSS.
    pub async fn compile(
        &self,
        file: &Path,
        source: &str,
        syntax: Syntax,
    ) -> Result<String, PreprocessError> {
        let mut command = Command::new(&self.path);
        command.arg("--stdin").arg("--no-source-map");
        if syntax == Syntax::Sass {
            command.arg("--indented");
        }
        if let Some(dir) = file.parent() {
            command.arg(format!("--load-path={}", dir.display()));
        }
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        tracing::debug!(compiler = %self.path.display(), file = %file.display(), "compiling stylesheet");
        let mut child = command.spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(source.as_bytes()).await?;
        }
        let output = child.wait_with_output().await?;

        if !output.status.success() {
            return Err(PreprocessError::Compile {
                compiler: COMPILER,
                path: file.to_path_buf(),
                exit_code: output.status.code().unwrap_or(-1),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Discover `sass` for the package rooted at `root`.
///
/// Order: the package's own `node_modules/.bin`, then `PATH`, then mise shims.
pub fn discover_compiler(root: &Path) -> Option<Compiler> {
    // 1. Local node_modules/.bin
    let bin = root.join("node_modules").join(".bin");
    for name in [COMPILER, "sass.cmd"] {
        let local = bin.join(name);
        if local.exists() {
            return Some(Compiler { path: local });
        }
    }

    #[cfg(feature = "native")]
    {
        // 2. PATH
        if let Ok(global) = which::which(COMPILER) {
            return Some(Compiler { path: global });
        }

        // 3. mise shims
        if let Some(shim) = find_mise_shim(COMPILER) {
            return Some(Compiler { path: shim });
        }
    }

    None
}

#[cfg(feature = "native")]
fn find_mise_shim(name: &str) -> Option<PathBuf> {
    let mise_data_dir = std::env::var("MISE_DATA_DIR")
        .ok()
        .map(PathBuf::from)
        .or_else(|| dirs::data_local_dir().map(|dir| dir.join("mise")));
    if let Some(dir) = mise_data_dir {
        let shim = dir.join("shims").join(name);
        if shim.exists() {
            return Some(shim);
        }
    }

    if let Some(xdg_data) = std::env::var("XDG_DATA_HOME").ok().map(PathBuf::from) {
        let shim = xdg_data.join("mise").join("shims").join(name);
        if shim.exists() {
            return Some(shim);
        }
    }

    let shim = dirs::home_dir()?.join(".local/share/mise/shims").join(name);
    shim.exists().then_some(shim)
}

/// Nearest ancestor directory of `file` holding a `package.json`, else the
/// file's own directory.
pub fn package_root(file: &Path) -> PathBuf {
    let dir = file.parent().unwrap_or(Path::new("."));
    dir.ancestors()
        .find(|ancestor| ancestor.join("package.json").exists())
        .unwrap_or(dir)
        .to_path_buf()
}

type Slot = Arc<OnceCell<Option<Arc<Compiler>>>>;

/// Compiler handles keyed by package root. Written once per key.
#[derive(Debug, Default)]
pub struct CompilerCache {
    entries: DashMap<PathBuf, Slot>,
}

impl CompilerCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiler for `root`, discovering it on first request.
    pub async fn get(&self, root: &Path) -> Option<Arc<Compiler>> {
        // Clone the slot out so no map guard is held across the await.
        let slot: Slot = self.entries.entry(root.to_path_buf()).or_default().clone();
        slot.get_or_init(|| async {
            let found = discover_compiler(root).map(Arc::new);
            tracing::debug!(root = %root.display(), found = found.is_some(), "compiler discovery");
            found
        })
        .await
        .clone()
    }

    /// Pre-seed `root` with a known compiler (or its absence).
    pub fn insert(&self, root: &Path, compiler: Option<Compiler>) {
        let slot = OnceCell::new_with(Some(compiler.map(Arc::new)));
        self.entries.insert(root.to_path_buf(), Arc::new(slot));
    }
}

/// Result of the pre-pass.
#[derive(Debug, Clone)]
pub struct Preprocessed {
    pub css: String,
    /// Set when no compiler was found and the source was only stripped of
    /// comments.
    pub degraded: Option<CompilerNotFoundError>,
}

impl Preprocessed {
    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }
}

/// Runs the pre-pass for any source syntax.
#[derive(Debug, Default)]
pub struct Preprocessor {
    compilers: CompilerCache,
}

impl Preprocessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache(compilers: CompilerCache) -> Self {
        Self { compilers }
    }

    pub async fn preprocess(&self, path: &Path, source: &str) -> Result<Preprocessed, PreprocessError> {
        let syntax = Syntax::from_path(path);
        if !syntax.needs_compiler() {
            return Ok(Preprocessed {
                css: source.to_string(),
                degraded: None,
            });
        }

        let root = package_root(path);
        match self.compilers.get(&root).await {
            Some(compiler) => Ok(Preprocessed {
                css: compiler.compile(path, source, syntax).await?,
                degraded: None,
            }),
            None => {
                tracing::warn!(file = %path.display(), "{COMPILER} not found, stripping comments only");
                Ok(Preprocessed {
                    css: strip_comments(source),
                    degraded: Some(CompilerNotFoundError::new(COMPILER, PACKAGE, &root)),
                })
            }
        }
    }
}

/// Remove `/* */` and `//` comments outside strings and `url(...)`.
///
/// Newlines inside block comments are kept so line numbers stay put.
pub fn strip_comments(source: &str) -> String {
    let bytes = source.as_bytes();
    let mut out = String::with_capacity(source.len());
    let mut i = 0;
    let mut copied = 0;

    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'"' | b'\'') => {
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                i += 1;
            }
            b'(' if i >= 3 && bytes[i - 3..i].eq_ignore_ascii_case(b"url") => {
                while i < bytes.len() && bytes[i] != b')' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                out.push_str(&source[copied..i]);
                let end = source[i + 2..].find("*/").map_or(bytes.len(), |pos| i + 2 + pos + 2);
                out.extend(source[i..end].chars().filter(|c| *c == '\n'));
                i = end;
                copied = end;
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                out.push_str(&source[copied..i]);
                let end = source[i..].find('\n').map_or(bytes.len(), |pos| i + pos);
                i = end;
                copied = end;
            }
            _ => i += 1,
        }
    }
    out.push_str(&source[copied.min(bytes.len())..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_syntax_from_path() {
        assert_eq!(Syntax::from_path(Path::new("a.module.scss")), Syntax::Scss);
        assert_eq!(Syntax::from_path(Path::new("a.module.sass")), Syntax::Sass);
        assert_eq!(Syntax::from_path(Path::new("a.module.css")), Syntax::Css);
    }

    #[test]
    fn test_strip_comments() {
        let source = "/* a\nb */.x { // note\n  background: url(http://x/y.png); content: \"//\"; }";
        assert_eq!(
            strip_comments(source),
            "\n.x { \n  background: url(http://x/y.png); content: \"//\"; }"
        );
    }

    #[test]
    fn test_strip_unterminated_comment() {
        assert_eq!(strip_comments(".a {}\n/* open"), ".a {}\n");
    }

    #[test]
    fn test_package_root() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("package.json"), "{}").unwrap();
        let nested = dir.path().join("src/styles");
        std::fs::create_dir_all(&nested).unwrap();
        assert_eq!(package_root(&nested.join("a.scss")), dir.path());
    }

    #[test]
    fn test_discover_local_bin() {
        let dir = TempDir::new().unwrap();
        let bin = dir.path().join("node_modules/.bin");
        std::fs::create_dir_all(&bin).unwrap();
        std::fs::write(bin.join("sass"), "").unwrap();
        assert_eq!(
            discover_compiler(dir.path()),
            Some(Compiler { path: bin.join("sass") })
        );
    }

    #[tokio::test]
    async fn test_degraded_without_compiler() {
        let dir = TempDir::new().unwrap();
        let cache = CompilerCache::new();
        cache.insert(dir.path(), None);
        let preprocessor = Preprocessor::with_cache(cache);

        let file = dir.path().join("a.module.scss");
        let out = preprocessor.preprocess(&file, "// c\n.a { color: red }").await.unwrap();
        assert!(out.is_degraded());
        assert_eq!(out.css, "\n.a { color: red }");

        let css = dir.path().join("b.module.css");
        let out = preprocessor.preprocess(&css, "/* kept */").await.unwrap();
        assert!(!out.is_degraded());
        assert_eq!(out.css, "/* kept */");
    }

    #[tokio::test]
    async fn test_cache_latches_per_root() {
        let dir = TempDir::new().unwrap();
        let cache = Arc::new(CompilerCache::new());
        cache.insert(dir.path(), Some(Compiler { path: PathBuf::from("/bin/sass") }));

        let lookups = (0..8).map(|_| {
            let cache = cache.clone();
            let root = dir.path().to_path_buf();
            tokio::spawn(async move { cache.get(&root).await })
        });
        for handle in futures::future::join_all(lookups).await {
            let compiler = handle.unwrap().unwrap();
            assert_eq!(compiler.path, PathBuf::from("/bin/sass"));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_first_lookup_discovers_once() {
        let dir = TempDir::new().unwrap();
        let bin = dir.path().join("node_modules/.bin");
        std::fs::create_dir_all(&bin).unwrap();
        std::fs::write(bin.join("sass"), "").unwrap();
        let cache = Arc::new(CompilerCache::new());

        let lookups = (0..8).map(|_| {
            let cache = cache.clone();
            let root = dir.path().to_path_buf();
            tokio::spawn(async move { cache.get(&root).await })
        });
        let found: Vec<Arc<Compiler>> = futures::future::join_all(lookups)
            .await
            .into_iter()
            .map(|handle| handle.unwrap().unwrap())
            .collect();

        assert_eq!(found[0].path, bin.join("sass"));
        assert!(found.iter().all(|compiler| Arc::ptr_eq(compiler, &found[0])));

        // The handle stays latched after the binary disappears.
        std::fs::remove_file(bin.join("sass")).unwrap();
        let again = cache.get(dir.path()).await.unwrap();
        assert!(Arc::ptr_eq(&again, &found[0]));
    }
}
