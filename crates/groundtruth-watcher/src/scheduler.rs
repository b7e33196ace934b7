//! Per-folder debounce.
//!
//! Every change resolves to one or two target folders. A target whose last
//! run is older than the debounce window runs now; otherwise it is marked
//! pending, and any number of deferred requests collapse into the single
//! run the next sweep performs once the window has elapsed.
//!
//! The scheduler only decides. Callers pass the current [`Instant`] and run
//! whatever folders come back.

use crate::watcher::FileChange;
use groundtruth_core::{is_artifact_name, PathMatcher, ARTIFACT_TEMP_PREFIX};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

/// Where a folder stands relative to its debounce window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderPhase {
    /// Nothing pending.
    Idle,
    /// Ran within the window. Further requests are deferred.
    Cooling,
    /// Window elapsed with a deferred request waiting for the sweep.
    ReadyToRun,
}

#[derive(Debug, Default)]
struct DebounceState {
    last_run: Option<Instant>,
    pending: bool,
}

impl DebounceState {
    fn cooling(&self, now: Instant, window: Duration) -> bool {
        self.last_run
            .map_or(false, |last| now.saturating_duration_since(last) < window)
    }
}

pub struct UpdateScheduler {
    matcher: PathMatcher,
    debounce: Duration,
    states: Mutex<HashMap<PathBuf, DebounceState>>,
}

impl UpdateScheduler {
    pub fn new(matcher: PathMatcher, debounce: Duration) -> Self {
        Self {
            matcher,
            debounce,
            states: Mutex::new(HashMap::new()),
        }
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Folders a change concerns, before debouncing.
    ///
    /// Modify and create events on a file target its folder, on a directory
    /// the directory itself. Deletes target the parent, moves both parents.
    /// Writes of the artifact file, including the rename of its scratch
    /// file into place, and changes to ignored paths or anything outside
    /// the root concern nobody. Deleting the artifact still targets its
    /// folder so it gets recreated.
    pub fn targets(&self, change: &FileChange) -> Vec<PathBuf> {
        let mut targets = Vec::new();

        match change {
            FileChange::Created { path, is_dir } | FileChange::Modified { path, is_dir } => {
                if is_artifact(path) || self.matcher.should_ignore(path) {
                    return targets;
                }
                if *is_dir {
                    targets.push(path.clone());
                } else if let Some(parent) = path.parent() {
                    targets.push(parent.to_path_buf());
                }
            }
            FileChange::Deleted(path) => {
                if !is_scratch(path) && !self.matcher.should_ignore(path) {
                    targets.extend(path.parent().map(Path::to_path_buf));
                }
            }
            FileChange::Moved { from, to } => {
                for path in [from, to] {
                    if is_artifact(path) || self.matcher.should_ignore(path) {
                        continue;
                    }
                    if let Some(parent) = path.parent() {
                        if !targets.iter().any(|t| t == parent) {
                            targets.push(parent.to_path_buf());
                        }
                    }
                }
            }
        }

        targets.retain(|folder| !self.matcher.should_ignore(folder));
        targets
    }

    /// Resolves a change and returns the folders to run right away.
    ///
    /// Targets inside their window are marked pending instead.
    pub fn on_change(&self, change: &FileChange, now: Instant) -> Vec<PathBuf> {
        self.targets(change)
            .into_iter()
            .filter(|folder| self.request(folder, now))
            .collect()
    }

    /// Asks to run `folder`. Returns true if it should run now, in which
    /// case its window restarts at `now`.
    pub fn request(&self, folder: &Path, now: Instant) -> bool {
        let mut states = self.lock();
        let state = states.entry(folder.to_path_buf()).or_default();

        if state.cooling(now, self.debounce) {
            debug!("Deferring {}", folder.display());
            state.pending = true;
            return false;
        }

        state.last_run = Some(now);
        state.pending = false;
        true
    }

    /// Drains pending folders whose window has elapsed.
    ///
    /// Each comes back once, sorted, with its flag cleared and its window
    /// restarted at `now`. Folders still cooling stay pending.
    pub fn sweep(&self, now: Instant) -> Vec<PathBuf> {
        let mut states = self.lock();
        let mut due: Vec<PathBuf> = states
            .iter_mut()
            .filter(|(_, state)| state.pending && !state.cooling(now, self.debounce))
            .map(|(folder, state)| {
                state.pending = false;
                state.last_run = Some(now);
                folder.clone()
            })
            .collect();

        due.sort();
        due
    }

    pub fn phase(&self, folder: &Path, now: Instant) -> FolderPhase {
        let states = self.lock();
        match states.get(folder) {
            Some(state) if state.cooling(now, self.debounce) => FolderPhase::Cooling,
            Some(state) if state.pending => FolderPhase::ReadyToRun,
            _ => FolderPhase::Idle,
        }
    }

    /// Number of folders with a deferred request.
    pub fn pending_count(&self) -> usize {
        self.lock().values().filter(|state| state.pending).count()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, DebounceState>> {
        self.states.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn is_artifact(path: &Path) -> bool {
    path.file_name()
        .map_or(false, |name| is_artifact_name(&name.to_string_lossy()))
}

fn is_scratch(path: &Path) -> bool {
    path.file_name()
        .map_or(false, |name| name.to_string_lossy().starts_with(ARTIFACT_TEMP_PREFIX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use groundtruth_core::IgnoreRuleSet;

    const WINDOW: Duration = Duration::from_secs(2);

    fn scheduler() -> UpdateScheduler {
        UpdateScheduler::new(
            PathMatcher::new("/repo", &IgnoreRuleSet::defaults()),
            WINDOW,
        )
    }

    fn modified(path: &str) -> FileChange {
        FileChange::Modified {
            path: PathBuf::from(path),
            is_dir: false,
        }
    }

    #[test]
    fn test_two_quick_events_run_once_then_once_more() {
        let s = scheduler();
        let t0 = Instant::now();
        let change = modified("/repo/api/users.py");

        assert_eq!(s.on_change(&change, t0), vec![PathBuf::from("/repo/api")]);
        assert!(s.on_change(&change, t0 + Duration::from_millis(500)).is_empty());
        assert_eq!(s.phase(Path::new("/repo/api"), t0 + Duration::from_secs(1)), FolderPhase::Cooling);

        // Still inside the window: nothing drains.
        assert!(s.sweep(t0 + Duration::from_secs(1)).is_empty());
        assert_eq!(s.pending_count(), 1);

        let later = t0 + Duration::from_secs(3);
        assert_eq!(s.phase(Path::new("/repo/api"), later), FolderPhase::ReadyToRun);
        assert_eq!(s.sweep(later), vec![PathBuf::from("/repo/api")]);
        assert!(s.sweep(later + Duration::from_secs(10)).is_empty());
        assert_eq!(s.phase(Path::new("/repo/api"), later + Duration::from_secs(10)), FolderPhase::Idle);
    }

    #[test]
    fn test_many_deferred_requests_collapse() {
        let s = scheduler();
        let t0 = Instant::now();
        s.on_change(&modified("/repo/api/a.py"), t0);
        for i in 1..10 {
            s.on_change(&modified("/repo/api/b.py"), t0 + Duration::from_millis(i * 100));
        }
        assert_eq!(s.sweep(t0 + WINDOW).len(), 1);
    }

    #[test]
    fn test_event_after_window_runs_immediately() {
        let s = scheduler();
        let t0 = Instant::now();
        let change = modified("/repo/api/users.py");
        s.on_change(&change, t0);
        s.on_change(&change, t0 + Duration::from_secs(1));

        let ran = s.on_change(&change, t0 + Duration::from_secs(3));
        assert_eq!(ran.len(), 1);
        // The immediate run absorbed the deferred one.
        assert!(s.sweep(t0 + Duration::from_secs(10)).is_empty());
    }

    #[test]
    fn test_folders_debounce_independently() {
        let s = scheduler();
        let t0 = Instant::now();
        assert_eq!(s.on_change(&modified("/repo/a/x.py"), t0).len(), 1);
        assert_eq!(s.on_change(&modified("/repo/b/y.py"), t0).len(), 1);
    }

    #[test]
    fn test_move_targets_both_parents() {
        let s = scheduler();
        let change = FileChange::Moved {
            from: PathBuf::from("/repo/a/x.py"),
            to: PathBuf::from("/repo/b/x.py"),
        };
        assert_eq!(
            s.targets(&change),
            vec![PathBuf::from("/repo/a"), PathBuf::from("/repo/b")]
        );

        let within = FileChange::Moved {
            from: PathBuf::from("/repo/a/x.py"),
            to: PathBuf::from("/repo/a/y.py"),
        };
        assert_eq!(s.targets(&within), vec![PathBuf::from("/repo/a")]);
    }

    #[test]
    fn test_directory_events_target_the_directory() {
        let s = scheduler();
        let created = FileChange::Created {
            path: PathBuf::from("/repo/api/v2"),
            is_dir: true,
        };
        assert_eq!(s.targets(&created), vec![PathBuf::from("/repo/api/v2")]);
        assert_eq!(
            s.targets(&FileChange::Deleted(PathBuf::from("/repo/api/v2"))),
            vec![PathBuf::from("/repo/api")]
        );
    }

    #[test]
    fn test_new_directory_runs_even_while_parent_cools() {
        let s = scheduler();
        let t0 = Instant::now();
        s.on_change(&modified("/repo/api/users.py"), t0);

        let created = FileChange::Created {
            path: PathBuf::from("/repo/api/v2"),
            is_dir: true,
        };
        assert_eq!(
            s.on_change(&created, t0 + Duration::from_millis(10)),
            vec![PathBuf::from("/repo/api/v2")]
        );
    }

    #[test]
    fn test_artifact_and_ignored_changes_are_dropped() {
        let s = scheduler();
        assert!(s.targets(&modified("/repo/api/GROUND_TRUTH.md")).is_empty());
        assert!(s.targets(&modified("/repo/.git/index")).is_empty());
        assert!(s.targets(&modified("/repo/node_modules/x/index.js")).is_empty());
        assert!(s.targets(&modified("/elsewhere/a.py")).is_empty());
        assert!(s
            .targets(&FileChange::Deleted(PathBuf::from("/repo/build/out.js")))
            .is_empty());
    }

    #[test]
    fn test_artifact_writes_do_not_retrigger() {
        let s = scheduler();
        let scratch = "/repo/api/.GROUND_TRUTH.md.x7Kq2z";
        let created = FileChange::Created {
            path: PathBuf::from(scratch),
            is_dir: false,
        };
        assert!(s.targets(&created).is_empty());
        assert!(s.targets(&modified(scratch)).is_empty());
        assert!(s.targets(&FileChange::Deleted(PathBuf::from(scratch))).is_empty());

        let renamed = FileChange::Moved {
            from: PathBuf::from(scratch),
            to: PathBuf::from("/repo/api/GROUND_TRUTH.md"),
        };
        assert!(s.targets(&renamed).is_empty());

        // A removed artifact is regenerated.
        assert_eq!(
            s.targets(&FileChange::Deleted(PathBuf::from("/repo/api/GROUND_TRUTH.md"))),
            vec![PathBuf::from("/repo/api")]
        );
    }

    #[test]
    fn test_root_level_file_targets_root() {
        let s = scheduler();
        assert_eq!(s.targets(&modified("/repo/setup.py")), vec![PathBuf::from("/repo")]);
        // Deleting the root itself would target its parent, outside the root.
        assert!(s.targets(&FileChange::Deleted(PathBuf::from("/repo"))).is_empty());
    }
}
