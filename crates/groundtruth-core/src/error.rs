//! Error types for the analysis layer.
//!
//! Most of these never reach a caller: per-file and per-folder failures are
//! swallowed where they happen and turned into empty facts. They exist so the
//! internal steps can use `?` and so the few fatal conditions (a broken config
//! file) have something precise to report.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience type for functions that can fail during analysis.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Things that can go wrong while reading or analyzing a tree.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Couldn't read a file or directory from disk.
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File extension doesn't map to any supported language.
    #[error("unsupported language for file '{0}'")]
    UnsupportedLanguage(PathBuf),

    /// Structural parsing failed. The line scans still run.
    #[error("parser error: {0}")]
    Parser(String),

    /// The project config exists but isn't valid JSON for our schema.
    #[error("invalid config '{path}': {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The project config parsed but holds a value that can't be used.
    #[error("invalid config '{path}': {message}")]
    InvalidConfig { path: PathBuf, message: String },
}

impl AnalysisError {
    /// Creates an IO error with the path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
