//! File analysis entry points.
//!
//! Everything here returns a [`FileFact`] rather than a `Result`. Unreadable
//! files, undecodable bytes and unparseable source all degrade to less
//! information, never to an error the caller has to handle.

use crate::error::{AnalysisError, Result};
use crate::facts::FileFact;
use crate::languages::{Language, LanguageAnalyzer};
use crate::scan::{scan_env_vars, scan_todos};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Analyzes a file on disk.
///
/// Files in unsupported languages and files that can't be read as UTF-8
/// produce an empty fact.
pub fn analyze_file(path: &Path) -> FileFact {
    match try_analyze_file(path) {
        Ok(fact) => fact,
        Err(e) => {
            debug!("Skipping {}: {}", path.display(), e);
            FileFact::default()
        }
    }
}

/// Like [`analyze_file`], but says why a file contributed nothing.
pub fn try_analyze_file(path: &Path) -> Result<FileFact> {
    let language = detect_language(path)
        .ok_or_else(|| AnalysisError::UnsupportedLanguage(path.to_path_buf()))?;
    let source = read_source(path)?;
    Ok(analyze_source(&source, language))
}

/// Analyzes in-memory source text.
pub fn analyze_source(source: &str, language: Language) -> FileFact {
    let analyzer = language.analyzer();
    analyze_with(source, analyzer.as_ref())
}

/// Analyzes raw bytes, which may not be valid UTF-8.
pub fn analyze_bytes(bytes: &[u8], language: Language) -> FileFact {
    match std::str::from_utf8(bytes) {
        Ok(source) => analyze_source(source, language),
        Err(e) => {
            debug!("Skipping undecodable {} source: {}", language, e);
            FileFact::default()
        }
    }
}

/// Runs the structural pass, then the line scans.
pub fn analyze_with(source: &str, analyzer: &dyn LanguageAnalyzer) -> FileFact {
    let mut fact = FileFact::default();

    if let Err(e) = analyzer.extract_structure(source, &mut fact) {
        debug!(
            "Structural {} analysis skipped: {}",
            analyzer.language(),
            e
        );
    }

    scan_todos(
        source,
        analyzer.todo_tags(),
        analyzer.todo_pattern(),
        &mut fact,
    );
    scan_env_vars(source, analyzer.env_patterns(), &mut fact);

    fact
}

/// Reads a source file as UTF-8.
pub fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| AnalysisError::io(path, e))
}

/// Detects the analysis mode from a file path.
///
/// Returns None if we don't support the file's extension.
pub fn detect_language(path: &Path) -> Option<Language> {
    Language::from_path(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::TodoTag;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_python_end_to_end() {
        let source = r#"import os

def foo(a, b):
    # TODO: fix auth bug
    return os.environ.get("API_KEY")
"#;
        let fact = analyze_source(source, Language::Python);

        assert_eq!(fact.imports, vec!["os"]);
        assert_eq!(fact.exports.len(), 1);
        assert_eq!(fact.exports[0].to_string(), "def foo(a, b)");
        assert_eq!(fact.todos.len(), 1);
        assert_eq!(fact.todos[0].line, 4);
        assert_eq!(fact.env_vars, vec!["API_KEY"]);
    }

    #[test]
    fn test_syntax_error_still_scans_lines() {
        let source = "def broken(:\n    # FIXME: parser chokes here\n    x = os.getenv('DB_URL')\n";
        let fact = analyze_source(source, Language::Python);

        assert!(fact.exports.is_empty());
        assert!(fact.imports.is_empty());
        assert_eq!(fact.todos.len(), 1);
        assert_eq!(fact.todos[0].tag, TodoTag::Fixme);
        assert_eq!(fact.env_vars, vec!["DB_URL"]);
    }

    #[test]
    fn test_python_env_patterns() {
        let source = r#"
a = os.environ["SECRET_KEY"]
b = os.environ.get("API_KEY")
c = os.getenv("API_KEY")
d = config("debug_mode")
e = settings.DEBUG
f = os.environ.get("API_KEY")
"#;
        let fact = analyze_source(source, Language::Python);
        assert_eq!(
            fact.env_vars,
            vec!["API_KEY", "SECRET_KEY", "debug_mode", "DEBUG"]
        );
    }

    #[test]
    fn test_script_scans() {
        let source = r#"
// TODO: remove once the API is stable
const url = process.env.API_URL;
const mode = import.meta.env.VITE_MODE;
// XXX: not a script tag
"#;
        let fact = analyze_source(source, Language::JavaScript);
        assert_eq!(fact.todos.len(), 1);
        assert_eq!(fact.todos[0].line, 2);
        assert_eq!(fact.env_vars, vec!["API_URL", "VITE_MODE"]);
    }

    #[test]
    fn test_invalid_bytes_yield_empty_fact() {
        let bytes = [0xff, 0xfe, 0x00, b'#', b' ', b'T', b'O', b'D', b'O'];
        assert!(analyze_bytes(&bytes, Language::Python).is_empty());
        assert!(analyze_bytes(&bytes, Language::JavaScript).is_empty());
    }

    #[test]
    fn test_binary_like_text_never_panics() {
        let junk: String = (0u8..=127).map(char::from).cycle().take(4096).collect();
        let _ = analyze_source(&junk, Language::Python);
        let _ = analyze_source(&junk, Language::JavaScript);
        let _ = analyze_source("def f(\n\"\"\"unterminated", Language::Python);
    }

    #[test]
    fn test_analyze_file_handles_missing_and_unsupported() {
        let dir = tempdir().unwrap();
        assert!(analyze_file(&dir.path().join("missing.py")).is_empty());

        let notes = dir.path().join("notes.md");
        fs::write(&notes, "# TODO: not analyzed").unwrap();
        assert!(analyze_file(&notes).is_empty());

        let bad = dir.path().join("bad.py");
        fs::write(&bad, [0xc3, 0x28, b'\n']).unwrap();
        assert!(analyze_file(&bad).is_empty());
    }

    #[test]
    fn test_try_analyze_file_reports_why() {
        let dir = tempdir().unwrap();
        let notes = dir.path().join("notes.md");
        fs::write(&notes, "text").unwrap();

        assert!(matches!(
            try_analyze_file(&notes),
            Err(AnalysisError::UnsupportedLanguage(_))
        ));
        assert!(matches!(
            try_analyze_file(&dir.path().join("gone.py")),
            Err(AnalysisError::Io { .. })
        ));
    }

    #[test]
    fn test_analyze_file_reads_source() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("api.ts");
        fs::write(&path, "export function load() { return fetch('/api/data'); }").unwrap();

        let fact = analyze_file(&path);
        assert_eq!(fact.exports.len(), 1);
        assert_eq!(fact.endpoints.len(), 1);
    }
}
