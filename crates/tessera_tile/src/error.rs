//! Error types for the per-file transform.

use thiserror::Error;

/// Errors that can occur while transforming one CSS module.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    /// Malformed CSS. Line and column are 1-based.
    #[error("{file}:{line}:{column}: {message}")]
    Parse {
        file: String,
        line: u32,
        column: u32,
        message: String,
    },

    /// `composes` used where it cannot apply.
    #[error("{file}: {message}")]
    Composition { file: String, message: String },

    /// Option combination the selected backend cannot honor.
    #[error("{backend} backend: {message}")]
    Unsupported {
        backend: &'static str,
        message: String,
    },
}

/// Result type for transform operations.
pub type TransformResult<T> = Result<T, TransformError>;
