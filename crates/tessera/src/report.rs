//! Build report: per-file outcomes grouped for terminal output.

use std::fmt::Write as _;
use std::time::Duration;

use tessera_grout::IndexMap;
use tessera_mosaic::{ErrorCategory, ResolveError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    Written,
    /// Every output already held the generated content.
    Unchanged,
    Failed {
        category: ErrorCategory,
        message: String,
    },
}

#[derive(Debug, Clone)]
pub struct FileReport {
    pub id: String,
    pub status: FileStatus,
    /// Install guidance when the file was built without the preprocessor
    /// it asked for.
    pub degraded: Option<String>,
    pub warnings: Vec<String>,
}

impl FileReport {
    pub fn failed(id: &str, error: &ResolveError) -> Self {
        tracing::debug!(file = id, %error, "build failed");
        Self {
            id: id.to_string(),
            status: FileStatus::Failed {
                category: error.category(),
                message: error.to_string(),
            },
            degraded: None,
            warnings: Vec::new(),
        }
    }

    /// Output could not be produced or written.
    pub fn io_failed(id: &str, message: String) -> Self {
        tracing::debug!(file = id, %message, "write failed");
        Self {
            id: id.to_string(),
            status: FileStatus::Failed {
                category: ErrorCategory::Io,
                message,
            },
            degraded: None,
            warnings: Vec::new(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, FileStatus::Failed { .. })
    }
}

#[derive(Debug, Clone)]
pub struct BuildReport {
    /// Sorted by module id.
    pub files: Vec<FileReport>,
    pub elapsed: Duration,
}

impl BuildReport {
    pub fn new(mut files: Vec<FileReport>, elapsed: Duration) -> Self {
        files.sort_by(|a, b| a.id.cmp(&b.id));
        Self { files, elapsed }
    }

    pub fn failed(&self) -> usize {
        self.files.iter().filter(|file| file.is_failed()).count()
    }

    pub fn succeeded(&self) -> usize {
        self.files.len() - self.failed()
    }

    pub fn written(&self) -> usize {
        self.files
            .iter()
            .filter(|file| file.status == FileStatus::Written)
            .count()
    }

    pub fn exit_code(&self) -> i32 {
        if self.failed() > 0 {
            1
        } else {
            0
        }
    }

    /// Failures by category, categories in declaration order.
    pub fn failures_by_category(&self) -> IndexMap<ErrorCategory, Vec<(&str, &str)>> {
        let mut groups: IndexMap<ErrorCategory, Vec<(&str, &str)>> = IndexMap::default();
        for file in &self.files {
            if let FileStatus::Failed { category, message } = &file.status {
                groups
                    .entry(*category)
                    .or_default()
                    .push((file.id.as_str(), message.as_str()));
            }
        }
        groups.sort_keys();
        groups
    }

    /// Human-readable summary for the terminal.
    pub fn render(&self) -> String {
        let mut out = String::new();

        for file in &self.files {
            for warning in &file.warnings {
                let _ = writeln!(out, "\x1b[33mWarning:\x1b[0m {}: {}", file.id, warning);
            }
        }

        let degraded: Vec<&FileReport> = self
            .files
            .iter()
            .filter(|file| file.degraded.is_some())
            .collect();
        if let Some(guidance) = degraded.first().and_then(|file| file.degraded.as_deref()) {
            let category = ErrorCategory::PreprocessorUnavailable;
            let _ = writeln!(
                out,
                "\x1b[33mWarning:\x1b[0m {} ({}), built with comments stripped only",
                category.label(),
                degraded.len()
            );
            for file in &degraded {
                let _ = writeln!(out, "  {}", file.id);
            }
            for line in guidance.lines() {
                let _ = writeln!(out, "  {line}");
            }
        }

        for (category, failures) in self.failures_by_category() {
            let _ = writeln!(
                out,
                "\x1b[31mError:\x1b[0m {} ({})",
                category.label(),
                failures.len()
            );
            for (id, message) in failures {
                let _ = writeln!(out, "  {id}: {message}");
            }
            let _ = writeln!(out, "  \x1b[33mHint:\x1b[0m {}", category.hint());
        }

        let failed = self.failed();
        if failed == 0 {
            let _ = write!(
                out,
                "\x1b[32m✓\x1b[0m {} files built in {:.4}s",
                self.files.len(),
                self.elapsed.as_secs_f64()
            );
            let unchanged = self.files.len() - self.written();
            if unchanged > 0 {
                let _ = write!(out, " ({unchanged} unchanged)");
            }
        } else {
            let _ = write!(
                out,
                "\x1b[31m✗\x1b[0m {} file(s) failed, {} built",
                failed,
                self.succeeded()
            );
        }
        out
    }
}
