//! File watcher for live updates.
//!
//! Uses the notify crate to watch the root recursively and forwards each
//! change into a tokio channel, so the event callback never does more than
//! enqueue.

use crate::error::Result;
use notify::event::{CreateKind, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

/// Type of filesystem change detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    Created { path: PathBuf, is_dir: bool },
    Modified { path: PathBuf, is_dir: bool },
    Deleted(PathBuf),
    Moved { from: PathBuf, to: PathBuf },
}

impl FileChange {
    /// Translates one notify event into changes.
    ///
    /// Renames that arrive as a single event with both paths become one
    /// `Moved`. Halves of a split rename become a delete and a create.
    pub fn from_event(event: &Event) -> Vec<FileChange> {
        match &event.kind {
            EventKind::Create(kind) => event
                .paths
                .iter()
                .map(|path| FileChange::Created {
                    is_dir: *kind == CreateKind::Folder || path.is_dir(),
                    path: path.clone(),
                })
                .collect(),

            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if event.paths.len() == 2 => {
                vec![FileChange::Moved {
                    from: event.paths[0].clone(),
                    to: event.paths[1].clone(),
                }]
            }

            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
                event.paths.iter().cloned().map(FileChange::Deleted).collect()
            }

            EventKind::Modify(ModifyKind::Name(_)) => event
                .paths
                .iter()
                .map(|path| {
                    if path.exists() {
                        FileChange::Created {
                            is_dir: path.is_dir(),
                            path: path.clone(),
                        }
                    } else {
                        FileChange::Deleted(path.clone())
                    }
                })
                .collect(),

            EventKind::Modify(_) => event
                .paths
                .iter()
                .map(|path| FileChange::Modified {
                    is_dir: path.is_dir(),
                    path: path.clone(),
                })
                .collect(),

            EventKind::Remove(_) => event.paths.iter().cloned().map(FileChange::Deleted).collect(),

            _ => Vec::new(),
        }
    }
}

/// Watches a directory tree for changes.
///
/// Events flow until this value is dropped.
pub struct FileWatcher {
    _watcher: notify::RecommendedWatcher,
}

impl FileWatcher {
    /// Starts watching `root` recursively, sending every change to `sender`.
    pub fn new(root: &Path, sender: UnboundedSender<FileChange>) -> Result<Self> {
        let mut watcher =
            notify::recommended_watcher(move |res: std::result::Result<Event, notify::Error>| {
                match res {
                    Ok(event) => {
                        for change in FileChange::from_event(&event) {
                            debug!("{:?}", change);
                            if sender.send(change).is_err() {
                                debug!("Change receiver closed");
                                return;
                            }
                        }
                    }
                    Err(e) => warn!("Watch error: {}", e),
                }
            })?;

        watcher.watch(root, RecursiveMode::Recursive)?;

        info!("Watching {} for changes", root.display());

        Ok(Self { _watcher: watcher })
    }
}
