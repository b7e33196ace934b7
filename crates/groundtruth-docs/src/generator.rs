//! The per-folder pipeline: metadata, facts and history into one artifact.

use crate::builder::{render, DocumentInput};
use crate::error::{DocError, Result};
use crate::history::{GitHistory, HistorySource};
use chrono::{DateTime, Local};
use groundtruth_core::{
    aggregate_folder, Config, FolderInfo, PathMatcher, ARTIFACT_FILE_NAME, ARTIFACT_TEMP_PREFIX,
};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tempfile::NamedTempFile;
use tracing::debug;

/// Regenerates GROUND_TRUTH.md for folders under one root.
///
/// One generator can be shared between threads. Regenerations of the same
/// folder are serialized from the read of the previous artifact to the
/// rename of the new one, so a hand-edited critical section is never read
/// from a half-written file. Different folders proceed in parallel.
pub struct DocGenerator {
    matcher: PathMatcher,
    history: Box<dyn HistorySource>,
    history_limit: usize,
    folder_locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl DocGenerator {
    /// A generator reading history from git at the matcher's root.
    pub fn new(matcher: PathMatcher) -> Self {
        let history = GitHistory::new(matcher.root());
        Self {
            matcher,
            history: Box::new(history),
            history_limit: Config::default().history_limit,
            folder_locks: Mutex::new(HashMap::new()),
        }
    }

    /// A generator set up from a loaded project config.
    pub fn from_config(root: &Path, config: &Config) -> Self {
        Self::new(config.matcher(root)).with_history_limit(config.history_limit)
    }

    /// Swaps the history source.
    pub fn with_history(mut self, history: impl HistorySource + 'static) -> Self {
        self.history = Box::new(history);
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn root(&self) -> &Path {
        self.matcher.root()
    }

    pub fn matcher(&self) -> &PathMatcher {
        &self.matcher
    }

    /// Where the artifact for `folder` lives.
    pub fn artifact_path(folder: &Path) -> PathBuf {
        folder.join(ARTIFACT_FILE_NAME)
    }

    /// Regenerates the artifact for `folder`.
    ///
    /// Returns `Ok(None)` when the folder is ignored or no longer exists.
    pub fn generate(&self, folder: &Path) -> Result<Option<PathBuf>> {
        self.generate_at(folder, Local::now())
    }

    /// Same as [`generate`](Self::generate) with a fixed timestamp.
    pub fn generate_at(&self, folder: &Path, now: DateTime<Local>) -> Result<Option<PathBuf>> {
        let relative = folder
            .strip_prefix(self.root())
            .map_err(|_| DocError::OutsideRoot(folder.to_path_buf()))?;

        if self.matcher.should_ignore(folder) {
            debug!("Not documenting ignored folder {}", folder.display());
            return Ok(None);
        }
        if !folder.is_dir() {
            debug!("Folder {} is gone", folder.display());
            return Ok(None);
        }

        let lock = self.folder_lock(folder);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let info = FolderInfo::collect(folder, &self.matcher)?;
        let facts = aggregate_folder(folder, &self.matcher);
        let history = self.history.recent(folder, self.history_limit);

        let path = Self::artifact_path(folder);
        let previous = fs::read_to_string(&path).ok();

        let input = DocumentInput {
            relative_path: relative,
            info: &info,
            facts: &facts,
            history: &history,
            generated_at: now,
        };
        let content = render(&input, previous.as_deref());

        write_atomically(folder, &path, &content)?;
        debug!("Wrote {}", path.display());

        Ok(Some(path))
    }

    fn folder_lock(&self, folder: &Path) -> Arc<Mutex<()>> {
        let mut locks: MutexGuard<'_, _> =
            self.folder_locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(folder.to_path_buf()).or_default())
    }
}

/// Writes to a scratch file next to `path` and renames it over `path`.
///
/// Readers see either the old artifact or the new one, never a truncated
/// file.
fn write_atomically(folder: &Path, path: &Path, content: &str) -> Result<()> {
    let mut scratch = tempfile::Builder::new()
        .prefix(ARTIFACT_TEMP_PREFIX)
        .tempfile_in(folder)
        .map_err(|e| DocError::io(folder, e))?;

    scratch
        .write_all(content.as_bytes())
        .map_err(|e| DocError::io(scratch.path(), e))?;

    if let Some(permissions) = artifact_permissions(path) {
        scratch
            .as_file()
            .set_permissions(permissions)
            .map_err(|e| DocError::io(scratch.path(), e))?;
    }

    persist(scratch, path)
}

fn persist(scratch: NamedTempFile, path: &Path) -> Result<()> {
    scratch
        .persist(path)
        .map(|_| ())
        .map_err(|e| DocError::io(path, e.error))
}

/// Keeps the mode of an existing artifact. New ones get the usual 0644
/// instead of the scratch file's owner-only mode.
fn artifact_permissions(path: &Path) -> Option<fs::Permissions> {
    match fs::metadata(path) {
        Ok(metadata) if metadata.is_file() => Some(metadata.permissions()),
        _ => default_permissions(),
    }
}

#[cfg(unix)]
fn default_permissions() -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<fs::Permissions> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{HistoryEntry, NoHistory};
    use chrono::TimeZone;
    use groundtruth_core::IgnoreRuleSet;
    use tempfile::tempdir;

    struct FixedHistory;

    impl HistorySource for FixedHistory {
        fn recent(&self, _folder: &Path, limit: usize) -> Vec<HistoryEntry> {
            assert_eq!(limit, 3);
            vec![HistoryEntry {
                hash: "deadbee".to_string(),
                date: "2024-04-01".to_string(),
                message: "Add billing".to_string(),
            }]
        }
    }

    fn generator(root: &Path) -> DocGenerator {
        DocGenerator::new(PathMatcher::new(root, &IgnoreRuleSet::defaults())).with_history(NoHistory)
    }

    #[test]
    fn test_generate_writes_artifact() {
        let dir = tempdir().unwrap();
        let api = dir.path().join("api");
        fs::create_dir(&api).unwrap();
        fs::write(
            api.join("service.py"),
            "import os\n\ndef foo(a, b):\n    # TODO: fix auth bug\n    return os.environ.get(\"API_KEY\")\n",
        )
        .unwrap();

        let written = generator(dir.path()).generate(&api).unwrap();
        assert_eq!(written, Some(api.join(ARTIFACT_FILE_NAME)));

        let doc = fs::read_to_string(api.join(ARTIFACT_FILE_NAME)).unwrap();
        assert!(doc.starts_with("# GROUND_TRUTH.md for api\n"));
        assert!(doc.contains("- service.py: def foo(a, b)"));
        assert!(doc.contains("- service.py line 4: TODO: fix auth bug"));
        assert!(doc.contains("- API_KEY"));
    }

    #[test]
    fn test_regeneration_is_stable_and_keeps_edits() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("app.py"), "def run():\n    pass\n").unwrap();
        let gen = generator(dir.path());
        let now = Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();

        gen.generate_at(dir.path(), now).unwrap();
        let path = dir.path().join(ARTIFACT_FILE_NAME);
        let edited = fs::read_to_string(&path)
            .unwrap()
            .replace("- Changes are automatically logged via git hooks", "- Never edit run()");
        fs::write(&path, &edited).unwrap();

        gen.generate_at(dir.path(), now).unwrap();
        let second = fs::read_to_string(&path).unwrap();
        assert!(second.contains("- Never edit run()"));
        assert!(!second.contains("- Changes are automatically logged"));
        // The artifact lists itself once it exists.
        assert!(second.contains("- `GROUND_TRUTH.md` - Documentation"));

        gen.generate_at(dir.path(), now).unwrap();
        let third = fs::read_to_string(&path).unwrap();
        assert!(third.contains("- Never edit run()"));
        assert_eq!(second.lines().count(), third.lines().count());
    }

    #[test]
    fn test_ignored_and_missing_folders_are_skipped() {
        let dir = tempdir().unwrap();
        let cache = dir.path().join("node_modules");
        fs::create_dir(&cache).unwrap();
        let gen = generator(dir.path());

        assert_eq!(gen.generate(&cache).unwrap(), None);
        assert!(!cache.join(ARTIFACT_FILE_NAME).exists());
        assert_eq!(gen.generate(&dir.path().join("gone")).unwrap(), None);
    }

    #[test]
    fn test_outside_root_is_an_error() {
        let dir = tempdir().unwrap();
        let other = tempdir().unwrap();
        let result = generator(dir.path()).generate(other.path());
        assert!(matches!(result, Err(DocError::OutsideRoot(_))));
    }

    #[test]
    fn test_concurrent_regeneration_keeps_edits() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir(root.join("a")).unwrap();
        fs::write(root.join("a/app.py"), "def run():\n    pass\n").unwrap();
        let gen = generator(root);

        gen.generate(root).unwrap();
        let path = root.join(ARTIFACT_FILE_NAME);
        let edited = fs::read_to_string(&path).unwrap().replace(
            "- This folder is tracked by ground truth system",
            "- Payments cron reads this folder",
        );
        fs::write(&path, edited).unwrap();

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..50 {
                        gen.generate(root).unwrap();
                    }
                });
            }
        });

        let doc = fs::read_to_string(&path).unwrap();
        assert!(doc.contains("- Payments cron reads this folder"));
        assert!(!doc.contains("- This folder is tracked by ground truth system"));

        let leftovers: Vec<_> = fs::read_dir(root)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(ARTIFACT_TEMP_PREFIX))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_artifact_path_taken_by_directory_fails() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join(ARTIFACT_FILE_NAME)).unwrap();

        let result = generator(dir.path()).generate(dir.path());
        assert!(matches!(result, Err(DocError::Io { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_new_artifact_is_world_readable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        generator(dir.path()).generate(dir.path()).unwrap();
        let mode = fs::metadata(dir.path().join(ARTIFACT_FILE_NAME))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[test]
    fn test_history_source_and_limit() {
        let dir = tempdir().unwrap();
        let gen = generator(dir.path())
            .with_history(FixedHistory)
            .with_history_limit(3);

        gen.generate(dir.path()).unwrap();
        let doc = fs::read_to_string(dir.path().join(ARTIFACT_FILE_NAME)).unwrap();
        assert!(doc.contains("- [2024-04-01] Add billing (deadbee)"));
    }
}
