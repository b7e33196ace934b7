//! Ground Truth Docs - renders and writes GROUND_TRUTH.md
//!
//! Takes a folder's metadata, its aggregated facts and its recent history
//! and turns them into the per-folder markdown artifact. A hand-edited
//! critical-information section is carried over between regenerations.

pub mod builder;
pub mod error;
pub mod generator;
pub mod history;

pub use builder::{format_size, preserved_critical, render, DocumentInput, CRITICAL_HEADING};
pub use error::{DocError, Result};
pub use generator::DocGenerator;
pub use history::{parse_log, GitHistory, HistoryEntry, HistorySource, NoHistory};
