//! Folder metadata: which files a folder tracks and what they're for.

use crate::error::{AnalysisError, Result};
use crate::ignore::PathMatcher;
use crate::ARTIFACT_TEMP_PREFIX;
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One tracked file in a folder.
#[derive(Debug, Clone, PartialEq)]
pub struct FileEntry {
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    pub modified: DateTime<Local>,
    pub purpose: &'static str,
}

/// Metadata for the direct files of one folder.
#[derive(Debug, Clone, PartialEq)]
pub struct FolderInfo {
    pub path: PathBuf,
    /// Sorted by name.
    pub files: Vec<FileEntry>,
    pub purpose: &'static str,
    pub total_size: u64,
    /// Newest modification time among the tracked files.
    pub last_modified: Option<DateTime<Local>>,
}

impl FolderInfo {
    /// Lists the folder's non-ignored files.
    ///
    /// Fails only if the folder itself can't be read. A file that vanishes
    /// between listing and stat is left out.
    pub fn collect(folder: &Path, matcher: &PathMatcher) -> Result<Self> {
        let mut files = Vec::new();
        let mut total_size = 0;
        let mut last_modified: Option<DateTime<Local>> = None;

        for path in list_files(folder, matcher)? {
            let metadata = match fs::metadata(&path) {
                Ok(m) => m,
                Err(e) => {
                    debug!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            };

            let name = file_name(&path);
            let modified = metadata
                .modified()
                .map(DateTime::<Local>::from)
                .unwrap_or_else(|_| Local::now());

            total_size += metadata.len();
            if last_modified.map_or(true, |latest| modified > latest) {
                last_modified = Some(modified);
            }

            files.push(FileEntry {
                purpose: infer_file_purpose(&name),
                name,
                size: metadata.len(),
                modified,
            });
        }

        Ok(Self {
            path: folder.to_path_buf(),
            files,
            purpose: infer_folder_purpose(&file_name(folder)),
            total_size,
            last_modified,
        })
    }
}

/// Direct child files of `folder` that aren't ignored, sorted by name.
pub fn list_files(folder: &Path, matcher: &PathMatcher) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(folder).map_err(|e| AnalysisError::io(folder, e))?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && !matcher.should_ignore(path))
        .filter(|path| !file_name(path).starts_with(ARTIFACT_TEMP_PREFIX))
        .collect();

    files.sort_by_key(|path| file_name(path));
    Ok(files)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Guesses what a folder is for from its name.
pub fn infer_folder_purpose(folder_name: &str) -> &'static str {
    match folder_name.to_lowercase().as_str() {
        "src" => "Source code",
        "tests" | "test" => "Test files",
        "docs" => "Documentation",
        "scripts" => "Utility scripts",
        "config" => "Configuration files",
        "public" => "Public static files",
        "static" => "Static files",
        "templates" => "Template files",
        "migrations" => "Database migrations",
        "components" => "UI components",
        "api" => "API implementation",
        "endpoints" => "API endpoints",
        "models" => "Data models",
        "schemas" => "Data schemas",
        "services" => "Business logic services",
        "utils" => "Utility functions",
        "lib" => "Library code",
        "routes" => "Application routes",
        "assets" => "Static assets",
        "crud" => "Database CRUD operations",
        "core" => "Core functionality",
        "auth" => "Authentication logic",
        _ => "Project files",
    }
}

/// Guesses what a file is for from its name, then its extension.
pub fn infer_file_purpose(file_name: &str) -> &'static str {
    let lower = file_name.to_lowercase();

    match lower.as_str() {
        "readme.md" => return "Documentation",
        "dockerfile" => return "Docker configuration",
        "package.json" => return "Node.js package manifest",
        "requirements.txt" => return "Python dependencies",
        "makefile" => return "Build automation",
        _ => {}
    }

    let extension = Path::new(&lower)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");

    match extension {
        "py" => "Python module",
        "js" => "JavaScript module",
        "ts" => "TypeScript module",
        "jsx" => "React component",
        "tsx" => "React TypeScript component",
        "svelte" => "Svelte component",
        "vue" => "Vue component",
        "html" => "HTML template",
        "css" => "Stylesheet",
        "json" => "JSON data",
        "yaml" | "yml" => "YAML configuration",
        "toml" => "TOML configuration",
        "sql" => "SQL script",
        "sh" => "Shell script",
        "md" => "Documentation",
        "txt" => "Text file",
        "env" => "Environment variables",
        _ => "Unknown purpose",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ignore::IgnoreRuleSet;
    use tempfile::tempdir;

    #[test]
    fn test_folder_purpose() {
        assert_eq!(infer_folder_purpose("src"), "Source code");
        assert_eq!(infer_folder_purpose("Tests"), "Test files");
        assert_eq!(infer_folder_purpose("random"), "Project files");
    }

    #[test]
    fn test_file_purpose() {
        assert_eq!(infer_file_purpose("README.md"), "Documentation");
        assert_eq!(infer_file_purpose("Dockerfile"), "Docker configuration");
        assert_eq!(infer_file_purpose("app.tsx"), "React TypeScript component");
        assert_eq!(infer_file_purpose("config.YML"), "YAML configuration");
        assert_eq!(infer_file_purpose("blob.bin"), "Unknown purpose");
        // A bare dotfile has no extension.
        assert_eq!(infer_file_purpose(".env"), "Unknown purpose");
    }

    #[test]
    fn test_collect_lists_sorted_non_ignored_files() {
        let dir = tempdir().unwrap();
        let api = dir.path().join("api");
        fs::create_dir(&api).unwrap();
        fs::write(api.join("users.py"), "x = 1\n").unwrap();
        fs::write(api.join("auth.py"), "y = 22\n").unwrap();
        fs::write(api.join("debug.log"), "noise").unwrap();
        fs::create_dir(api.join("nested")).unwrap();

        let matcher = PathMatcher::new(dir.path(), &IgnoreRuleSet::defaults());
        let info = FolderInfo::collect(&api, &matcher).unwrap();

        let names: Vec<&str> = info.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["auth.py", "users.py"]);
        assert_eq!(info.purpose, "API implementation");
        assert_eq!(info.total_size, 13);
        assert!(info.last_modified.is_some());
        assert_eq!(info.files[0].purpose, "Python module");
    }

    #[test]
    fn test_collect_skips_artifact_scratch_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("GROUND_TRUTH.md"), "# doc\n").unwrap();
        fs::write(dir.path().join(".GROUND_TRUTH.md.a1B2c3"), "# half").unwrap();

        let matcher = PathMatcher::new(dir.path(), &IgnoreRuleSet::defaults());
        let info = FolderInfo::collect(dir.path(), &matcher).unwrap();

        let names: Vec<&str> = info.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["GROUND_TRUTH.md"]);
    }

    #[test]
    fn test_collect_missing_folder_fails() {
        let dir = tempdir().unwrap();
        let matcher = PathMatcher::new(dir.path(), &IgnoreRuleSet::defaults());
        let result = FolderInfo::collect(&dir.path().join("gone"), &matcher);
        assert!(matches!(result, Err(AnalysisError::Io { .. })));
    }

    #[test]
    fn test_empty_folder() {
        let dir = tempdir().unwrap();
        let matcher = PathMatcher::new(dir.path(), &IgnoreRuleSet::defaults());
        let info = FolderInfo::collect(dir.path(), &matcher).unwrap();
        assert!(info.files.is_empty());
        assert_eq!(info.total_size, 0);
        assert!(info.last_modified.is_none());
    }
}
