//! Recent change history for a folder.
//!
//! The default source shells out to `git log`. Anything that goes wrong
//! (no git binary, not a repository, a path git doesn't know) simply means
//! no history.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Longest commit message kept, in characters.
pub const MESSAGE_LIMIT: usize = 100;

/// One recent change touching a folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    /// Abbreviated commit id.
    pub hash: String,
    /// `YYYY-MM-DD`.
    pub date: String,
    pub message: String,
}

/// Where change history comes from.
pub trait HistorySource: Send + Sync {
    /// Up to `limit` records for `folder`, newest first. Never fails.
    fn recent(&self, folder: &Path, limit: usize) -> Vec<HistoryEntry>;
}

/// History read from the git repository containing the root.
#[derive(Debug, Clone)]
pub struct GitHistory {
    root: PathBuf,
}

impl GitHistory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl HistorySource for GitHistory {
    fn recent(&self, folder: &Path, limit: usize) -> Vec<HistoryEntry> {
        let relative = match folder.strip_prefix(&self.root) {
            Ok(rel) if rel.as_os_str().is_empty() => Path::new("."),
            Ok(rel) => rel,
            Err(_) => return Vec::new(),
        };

        let output = Command::new("git")
            .arg("log")
            .arg("--pretty=format:%H|%ai|%s")
            .arg("-n")
            .arg(limit.to_string())
            .arg("--")
            .arg(relative)
            .current_dir(&self.root)
            .output();

        match output {
            Ok(out) if out.status.success() => parse_log(&String::from_utf8_lossy(&out.stdout)),
            Ok(out) => {
                debug!(
                    "git log failed for {}: {}",
                    folder.display(),
                    String::from_utf8_lossy(&out.stderr).trim()
                );
                Vec::new()
            }
            Err(e) => {
                debug!("git unavailable: {}", e);
                Vec::new()
            }
        }
    }
}

/// A source with nothing in it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHistory;

impl HistorySource for NoHistory {
    fn recent(&self, _folder: &Path, _limit: usize) -> Vec<HistoryEntry> {
        Vec::new()
    }
}

/// Parses `%H|%ai|%s` lines. Malformed lines are dropped.
pub fn parse_log(output: &str) -> Vec<HistoryEntry> {
    output
        .lines()
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let mut parts = line.splitn(3, '|');
            let hash = parts.next()?;
            let date = parts.next()?;
            let message = parts.next()?;

            Some(HistoryEntry {
                hash: hash.chars().take(7).collect(),
                date: date.split_whitespace().next().unwrap_or_default().to_string(),
                message: message.chars().take(MESSAGE_LIMIT).collect(),
            })
        })
        .collect()
}
