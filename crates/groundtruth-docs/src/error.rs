//! Error types for document generation.

use groundtruth_core::AnalysisError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DocError>;

#[derive(Error, Debug)]
pub enum DocError {
    /// Writing the artifact failed.
    #[error("failed to write '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The folder couldn't be listed.
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("'{0}' is outside the project root")]
    OutsideRoot(PathBuf),
}

impl DocError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
