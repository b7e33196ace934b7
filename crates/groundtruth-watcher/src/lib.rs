//! Ground Truth Watcher - batch generation and live updates
//!
//! This crate handles the file system side of things:
//! - Walking the tree to regenerate every folder's artifact
//! - Watching for changes
//! - Debouncing per folder and driving regeneration
//!
//! Ignored paths never trigger work.

mod batch;
mod error;
mod runtime;
mod scheduler;
mod watcher;

pub use batch::{generate_all, generate_all_blocking, generate_all_with_progress, BatchReport};
pub use error::{Result, WatchError};
pub use runtime::{
    refresh_folder, watch, watch_changes, RefreshOutcome, WatchOptions, WatchSummary,
};
pub use scheduler::{FolderPhase, UpdateScheduler};
pub use watcher::{FileChange, FileWatcher};
