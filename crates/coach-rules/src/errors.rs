//! Rules error type.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading instruction files.
#[derive(Debug, Error)]
pub enum RulesError {
    /// A file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Result type for rules operations.
pub type Result<T> = std::result::Result<T, RulesError>;
