//! Ground Truth Core - ignore matching, source analysis and aggregation
//!
//! This crate decides which paths take part in documentation, pulls
//! structural facts (imports, exports, TODOs, environment variables, API
//! endpoints) out of source files, and folds them into per-folder totals.
//!
//! # Example
//!
//! ```no_run
//! use groundtruth_core::{aggregate_folder, Config};
//! use std::path::Path;
//!
//! let root = Path::new(".");
//! let matcher = Config::load(root).unwrap().matcher(root);
//! let facts = aggregate_folder(Path::new("./src"), &matcher);
//! for export in &facts.exports {
//!     println!("{}", export);
//! }
//! ```

pub mod aggregate;
pub mod analyzer;
pub mod config;
pub mod error;
pub mod facts;
pub mod folder;
pub mod ignore;
pub mod languages;
pub mod scan;

pub use aggregate::aggregate_folder;
pub use analyzer::{analyze_bytes, analyze_file, analyze_source, detect_language, try_analyze_file};
pub use config::Config;
pub use error::{AnalysisError, Result};
pub use facts::{
    Endpoint, ExportDecl, ExportKind, FileFact, FolderFacts, HttpMethod, TaggedExport,
    TaggedTodo, TodoMarker, TodoTag,
};
pub use folder::{FileEntry, FolderInfo};
pub use ignore::{IgnoreRuleSet, IgnoreRuleSetBuilder, PathMatcher};
pub use languages::{Language, LanguageAnalyzer};

/// File name of the generated per-folder document.
pub const ARTIFACT_FILE_NAME: &str = "GROUND_TRUTH.md";

/// Prefix of the scratch file an artifact is written to before it is
/// renamed into place.
pub const ARTIFACT_TEMP_PREFIX: &str = ".GROUND_TRUTH.md.";

/// True for the artifact itself and for its in-progress scratch files.
pub fn is_artifact_name(name: &str) -> bool {
    name == ARTIFACT_FILE_NAME || name.starts_with(ARTIFACT_TEMP_PREFIX)
}
