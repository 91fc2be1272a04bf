//! Error types for resolution and preprocessing.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tessera_tile::TransformError;

/// Coarse error class used to partition batch reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCategory {
    Parse,
    UnresolvedDependency,
    PreprocessorUnavailable,
    Configuration,
    Io,
}

impl ErrorCategory {
    /// Human label used in report headings.
    pub fn label(self) -> &'static str {
        match self {
            ErrorCategory::Parse => "parse error",
            ErrorCategory::UnresolvedDependency => "unresolved dependency",
            ErrorCategory::PreprocessorUnavailable => "preprocessor unavailable",
            ErrorCategory::Configuration => "configuration error",
            ErrorCategory::Io => "I/O error",
        }
    }

    /// One-line advice printed under a category's failures.
    pub fn hint(self) -> &'static str {
        match self {
            ErrorCategory::Parse => "fix the CSS syntax at the reported position",
            ErrorCategory::UnresolvedDependency => {
                "check the `composes ... from` and `@value ... from` specifiers and the exported class names"
            }
            ErrorCategory::PreprocessorUnavailable => {
                "install the stylesheet compiler listed above, or rename the file to .css"
            }
            ErrorCategory::Configuration => "fix tessera.config.json or the command line flags",
            ErrorCategory::Io => "check that the file exists and is readable",
        }
    }
}

/// Category of a per-file transform failure.
pub fn transform_category(error: &TransformError) -> ErrorCategory {
    match error {
        TransformError::Parse { .. } | TransformError::Composition { .. } => ErrorCategory::Parse,
        TransformError::Unsupported { .. } => ErrorCategory::Configuration,
    }
}

/// Error raised while resolving one CSS module against its dependencies.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Transform(#[from] TransformError),

    /// The host could not resolve a specifier.
    #[error("Cannot resolve \"{specifier}\" (imported from {importer})")]
    Unresolved { specifier: String, importer: String },

    /// The resolved module does not export the requested name.
    #[error("Cannot find export \"{name}\" in \"{specifier}\" (imported from {importer})")]
    MissingExport {
        name: String,
        specifier: String,
        importer: String,
    },

    /// The loaded module carries no metadata from this system.
    #[error("\"{id}\" is not a CSS module (no \"{namespace}\" metadata)")]
    NotACssModule { id: String, namespace: &'static str },

    /// Metadata was present but malformed.
    #[error("Invalid CSS module metadata for \"{id}\": {message}")]
    InvalidMeta { id: String, message: String },

    /// A module transitively composes from itself.
    #[error("Circular composition: {}", chain.join(" -> "))]
    Cycle { chain: Vec<String> },

    /// The host failed to load a module.
    #[error("Failed to load \"{id}\": {message}")]
    Load { id: String, message: String },

    #[error(transparent)]
    Preprocess(#[from] PreprocessError),
}

impl ResolveError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ResolveError::Transform(error) => transform_category(error),
            ResolveError::Unresolved { .. }
            | ResolveError::MissingExport { .. }
            | ResolveError::NotACssModule { .. }
            | ResolveError::InvalidMeta { .. }
            | ResolveError::Cycle { .. } => ErrorCategory::UnresolvedDependency,
            ResolveError::Load { .. } => ErrorCategory::Io,
            ResolveError::Preprocess(error) => error.category(),
        }
    }
}

/// Result type for resolution.
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Error raised by the stylesheet preprocessor pre-pass.
#[derive(Debug, thiserror::Error)]
pub enum PreprocessError {
    /// No compiler executable could be located.
    #[error("{0}")]
    CompilerNotFound(#[from] CompilerNotFoundError),

    /// The compiler ran and rejected the input.
    #[error("{compiler} failed on {path} (exit code {exit_code}): {message}")]
    Compile {
        compiler: &'static str,
        path: PathBuf,
        exit_code: i32,
        message: String,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PreprocessError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            PreprocessError::CompilerNotFound(_) => ErrorCategory::PreprocessorUnavailable,
            PreprocessError::Compile { .. } => ErrorCategory::Parse,
            PreprocessError::Io(_) => ErrorCategory::Io,
        }
    }
}

/// Package manager type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Pnpm,
    Npm,
    Yarn,
    Bun,
}

/// Error when a stylesheet compiler is not installed.
#[derive(Debug, Clone)]
pub struct CompilerNotFoundError {
    /// Executable name, e.g. `sass`.
    pub compiler: &'static str,
    /// npm package providing the executable.
    pub package: &'static str,
    detected_pm: Option<PackageManager>,
}

impl CompilerNotFoundError {
    pub fn new(compiler: &'static str, package: &'static str, project_root: &Path) -> Self {
        Self {
            compiler,
            package,
            detected_pm: detect_package_manager(project_root),
        }
    }

    pub fn detected_package_manager(&self) -> Option<PackageManager> {
        self.detected_pm
    }

    /// Message with installation instructions.
    pub fn display_message(&self) -> String {
        let mut msg = format!(
            "{} not found; the stylesheet was only stripped of comments.\n",
            self.compiler
        );

        if let Some(pm) = self.detected_pm {
            msg.push_str("To install, run:\n\n");
            msg.push_str(&format!("  {}\n", self.install_command(pm)));
        } else {
            msg.push_str("To install, run one of the following:\n\n");
            for (pm, label) in [
                (PackageManager::Npm, "npm"),
                (PackageManager::Pnpm, "pnpm"),
                (PackageManager::Yarn, "yarn"),
                (PackageManager::Bun, "bun"),
            ] {
                msg.push_str(&format!("  {}  # {label}\n", self.install_command(pm)));
            }
        }

        msg
    }

    fn install_command(&self, pm: PackageManager) -> String {
        let package = self.package;
        match pm {
            PackageManager::Npm => format!("npm install -D {package}"),
            PackageManager::Pnpm => format!("pnpm add -D {package}"),
            PackageManager::Yarn => format!("yarn add -D {package}"),
            PackageManager::Bun => format!("bun add -D {package}"),
        }
    }
}

impl std::fmt::Display for CompilerNotFoundError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_message())
    }
}

impl std::error::Error for CompilerNotFoundError {}

/// Detect the project's package manager.
pub fn detect_package_manager(project_root: &Path) -> Option<PackageManager> {
    // 1. Lockfiles, in priority order
    if project_root.join("pnpm-lock.yaml").exists() {
        return Some(PackageManager::Pnpm);
    }
    if project_root.join("bun.lockb").exists() || project_root.join("bun.lock").exists() {
        return Some(PackageManager::Bun);
    }
    if project_root.join("yarn.lock").exists() {
        return Some(PackageManager::Yarn);
    }
    if project_root.join("package-lock.json").exists() {
        return Some(PackageManager::Npm);
    }

    // 2. package.json `packageManager` field
    let content = std::fs::read_to_string(project_root.join("package.json")).ok()?;
    let json = serde_json::from_str::<serde_json::Value>(&content).ok()?;
    let pm = json.get("packageManager")?.as_str()?;
    if pm.starts_with("pnpm") {
        Some(PackageManager::Pnpm)
    } else if pm.starts_with("yarn") {
        Some(PackageManager::Yarn)
    } else if pm.starts_with("bun") {
        Some(PackageManager::Bun)
    } else if pm.starts_with("npm") {
        Some(PackageManager::Npm)
    } else {
        None
    }
}
