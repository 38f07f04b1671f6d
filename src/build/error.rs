//! Error types for the build pipeline.
//!
//! Two tiers: a [`TransformError`] is a compile failure in one asset and is
//! logged and skipped; everything else in [`BuildError`] aborts the run.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// A compile failure in a single source file, with location when known.
#[derive(Debug, Clone)]
pub struct TransformError {
    /// Path to the file containing the error
    pub file: PathBuf,
    /// Line number (1-indexed, None if unknown)
    pub line: Option<usize>,
    /// Column number (1-indexed, None if unknown)
    pub column: Option<usize>,
    /// Error message
    pub message: String,
}

impl TransformError {
    /// Create a new transform error with file and message
    pub fn new(file: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self { file: file.into(), line: None, column: None, message: message.into() }
    }

    /// Create a transform error with full location information
    pub fn with_location(
        file: impl Into<PathBuf>,
        line: usize,
        column: usize,
        message: impl Into<String>,
    ) -> Self {
        Self { file: file.into(), line: Some(line), column: Some(column), message: message.into() }
    }
}

impl std::fmt::Display for TransformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Error in {}", self.file.display())?;
        if let Some(line) = self.line {
            write!(f, ":{}", line)?;
            if let Some(col) = self.column {
                write!(f, ":{}", col)?;
            }
        }
        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for TransformError {}

/// Error during build execution.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Filesystem failure; never recovered
    #[error("IO error at {}: {source}", path.display())]
    Io {
        /// Path being read, written or removed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
    /// Compile failure in one step; the pipeline logs it and moves on
    #[error(transparent)]
    Transform(#[from] TransformError),
}

impl BuildError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        BuildError::Io { path: path.to_path_buf(), source }
    }

    /// Whether the pipeline should log this error and continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, BuildError::Transform(_))
    }
}

impl From<glob::GlobError> for BuildError {
    fn from(e: glob::GlobError) -> Self {
        let path = e.path().to_path_buf();
        BuildError::Io { path, source: e.into_error() }
    }
}
