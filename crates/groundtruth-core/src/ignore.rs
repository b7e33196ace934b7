//! Ignore rules and path matching.
//!
//! Rules are built in two stages: the fixed defaults, then whatever the
//! project adds (its `.gitignore`, the config's `ignore` list). The result is
//! frozen into an [`IgnoreRuleSet`] and compiled into a [`PathMatcher`]
//! scoped to one root.
//!
//! Matching is deliberately over-inclusive. Every prefix of the path and
//! every single component is tested against every rule, so a folder whose
//! name matches a rule hides everything beneath it no matter how deep it
//! sits. This is closer to how people read ignore files than to strict
//! gitignore anchoring.

use globset::{GlobBuilder, GlobMatcher};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Patterns that are always ignored.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    // Version control
    ".git",
    // Python caches and build output
    "__pycache__",
    "*.pyc",
    "*.pyo",
    "*.pyd",
    "*.egg-info",
    ".pytest_cache",
    ".coverage",
    "htmlcov",
    ".tox",
    ".mypy_cache",
    // Environments
    "node_modules",
    "venv",
    ".venv",
    "env",
    ".env",
    // Build directories
    "dist",
    "build",
    // Tool state
    ".groundtruth",
    // Binary and log artifacts
    "*.log",
    "*.sqlite",
    "*.db",
    ".DS_Store",
    "Thumbs.db",
];

/// Name of the project ignore file read from the root.
pub const IGNORE_FILE_NAME: &str = ".gitignore";

/// A frozen, deduplicated set of glob-style ignore patterns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreRuleSet {
    patterns: BTreeSet<String>,
}

impl IgnoreRuleSet {
    /// Starts a build seeded with [`DEFAULT_IGNORE_PATTERNS`].
    pub fn builder() -> IgnoreRuleSetBuilder {
        IgnoreRuleSetBuilder::empty().patterns(DEFAULT_IGNORE_PATTERNS.iter().copied())
    }

    /// Just the defaults.
    pub fn defaults() -> Self {
        Self::builder().build()
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(String::as_str)
    }

    pub fn contains(&self, pattern: &str) -> bool {
        self.patterns.contains(pattern)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Accumulates patterns before they are frozen.
#[derive(Debug, Default)]
pub struct IgnoreRuleSetBuilder {
    patterns: BTreeSet<String>,
}

impl IgnoreRuleSetBuilder {
    /// A builder with no patterns at all, not even the defaults.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Adds one pattern.
    ///
    /// Blank lines and `#` comments are skipped. Trailing separators are
    /// dropped (`build/` means `build`), and so is a leading one.
    pub fn pattern(mut self, raw: &str) -> Self {
        if let Some(pattern) = normalize(raw) {
            self.patterns.insert(pattern);
        }
        self
    }

    pub fn patterns<'a>(self, patterns: impl IntoIterator<Item = &'a str>) -> Self {
        patterns.into_iter().fold(self, |builder, p| builder.pattern(p))
    }

    /// Adds every line of an ignore-file body.
    pub fn lines(self, text: &str) -> Self {
        self.patterns(text.lines())
    }

    /// Adds the lines of an ignore file. A missing or unreadable file adds
    /// nothing.
    pub fn ignore_file(self, path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(text) => self.lines(&text),
            Err(e) => {
                debug!("No ignore rules from {}: {}", path.display(), e);
                self
            }
        }
    }

    pub fn build(self) -> IgnoreRuleSet {
        IgnoreRuleSet {
            patterns: self.patterns,
        }
    }
}

fn normalize(raw: &str) -> Option<String> {
    let line = raw.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let trimmed = line.trim_end_matches('/');
    let trimmed = trimmed.strip_prefix('/').unwrap_or(trimmed);
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_string())
}

/// A glob that falls back to plain string equality when it can't compile.
#[derive(Debug, Clone)]
struct Pattern {
    text: String,
    glob: Option<GlobMatcher>,
}

impl Pattern {
    fn compile(text: &str) -> Self {
        // fnmatch semantics: `*` is allowed to cross `/`.
        let glob = GlobBuilder::new(text)
            .literal_separator(false)
            .backslash_escape(false)
            .build()
            .map(|g| g.compile_matcher());

        let glob = match glob {
            Ok(g) => Some(g),
            Err(e) => {
                debug!("Treating ignore pattern '{}' literally: {}", text, e);
                None
            }
        };

        Self {
            text: text.to_string(),
            glob,
        }
    }

    fn matches(&self, candidate: &str) -> bool {
        match &self.glob {
            Some(glob) => glob.is_match(candidate),
            None => self.text == candidate,
        }
    }
}

/// One compiled ignore rule.
#[derive(Debug, Clone)]
struct Rule {
    full: Pattern,
    /// For `**/rest`, the `rest` part, matched against any suffix of the path.
    recursive_tail: Option<Pattern>,
    /// No separator and no wildcard: matches a component by equality.
    plain_name: bool,
}

impl Rule {
    fn compile(pattern: &str) -> Self {
        let recursive_tail = pattern.strip_prefix("**/").map(Pattern::compile);
        let plain_name = !pattern.contains('/') && !pattern.contains(['*', '?', '[']);

        Self {
            full: Pattern::compile(pattern),
            recursive_tail,
            plain_name,
        }
    }

    /// Tests the rule at one nesting level, `parts` being the components
    /// from the root down to and including that level.
    fn matches_level(&self, parts: &[String], prefix: &str) -> bool {
        let component = match parts.last() {
            Some(c) => c.as_str(),
            None => return false,
        };

        if prefix == self.full.text || self.full.matches(prefix) {
            return true;
        }

        if component == self.full.text || self.full.matches(component) {
            return true;
        }

        if self.plain_name && parts.iter().any(|p| p == &self.full.text) {
            return true;
        }

        if let Some(tail) = &self.recursive_tail {
            for start in 0..parts.len() {
                if tail.matches(&parts[start..].join("/")) {
                    return true;
                }
            }
        }

        false
    }
}

/// Decides whether paths under a fixed root are excluded.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    root: PathBuf,
    rules: Vec<Rule>,
}

impl PathMatcher {
    /// Compiles a rule set for the given root.
    pub fn new(root: impl Into<PathBuf>, rules: &IgnoreRuleSet) -> Self {
        Self {
            root: root.into(),
            rules: rules.patterns().map(Rule::compile).collect(),
        }
    }

    /// Builds the full rule set for a project root: defaults, the root's
    /// `.gitignore`, then any extra patterns.
    pub fn for_root(root: &Path, extra: &[String]) -> Self {
        let rules = IgnoreRuleSet::builder()
            .ignore_file(&root.join(IGNORE_FILE_NAME))
            .patterns(extra.iter().map(String::as_str))
            .build();
        Self::new(root, &rules)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns true if `path` is excluded.
    ///
    /// Paths outside the root are always excluded. The root itself never is.
    pub fn should_ignore(&self, path: &Path) -> bool {
        let relative = match path.strip_prefix(&self.root) {
            Ok(rel) => rel,
            Err(_) => return true,
        };

        let parts: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();

        for depth in 1..=parts.len() {
            let level = &parts[..depth];
            let prefix = level.join("/");

            if self.rules.iter().any(|rule| rule.matches_level(level, &prefix)) {
                return true;
            }
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn matcher(patterns: &[&str]) -> PathMatcher {
        let rules = IgnoreRuleSetBuilder::empty()
            .patterns(patterns.iter().copied())
            .build();
        PathMatcher::new("/project", &rules)
    }

    #[test]
    fn test_defaults_hide_directory_and_descendants() {
        let m = PathMatcher::new("/project", &IgnoreRuleSet::defaults());

        assert!(m.should_ignore(Path::new("/project/node_modules")));
        assert!(m.should_ignore(Path::new("/project/node_modules/react/index.js")));
        assert!(m.should_ignore(Path::new("/project/web/node_modules/a/b/c.js")));
        assert!(m.should_ignore(Path::new("/project/.git/HEAD")));
        assert!(!m.should_ignore(Path::new("/project/src/main.py")));
    }

    #[test]
    fn test_extension_glob_at_any_depth() {
        let m = matcher(&["*.pyc"]);
        assert!(m.should_ignore(Path::new("/project/a.pyc")));
        assert!(m.should_ignore(Path::new("/project/pkg/sub/a.pyc")));
        assert!(!m.should_ignore(Path::new("/project/pkg/sub/a.py")));
    }

    #[test]
    fn test_plain_name_matches_any_component() {
        let m = matcher(&["generated"]);
        assert!(m.should_ignore(Path::new("/project/src/generated")));
        assert!(m.should_ignore(Path::new("/project/src/generated/deep/file.ts")));
        assert!(!m.should_ignore(Path::new("/project/src/generated_code.ts")));
    }

    #[test]
    fn test_recursive_marker_matches_suffix() {
        let m = matcher(&["**/fixtures/*.json"]);
        assert!(m.should_ignore(Path::new("/project/a/b/fixtures/data.json")));
        assert!(m.should_ignore(Path::new("/project/fixtures/data.json")));
        assert!(!m.should_ignore(Path::new("/project/a/b/data.json")));
    }

    #[test]
    fn test_anchored_path_pattern() {
        let m = matcher(&["docs/build"]);
        assert!(m.should_ignore(Path::new("/project/docs/build")));
        assert!(m.should_ignore(Path::new("/project/docs/build/index.html")));
        assert!(!m.should_ignore(Path::new("/project/docs/source")));
    }

    #[test]
    fn test_character_class_and_question_mark() {
        let m = matcher(&["log[0-9].txt", "tmp?"]);
        assert!(m.should_ignore(Path::new("/project/log3.txt")));
        assert!(!m.should_ignore(Path::new("/project/logx.txt")));
        assert!(m.should_ignore(Path::new("/project/tmp1/x.py")));
    }

    #[test]
    fn test_malformed_pattern_is_literal() {
        let m = matcher(&["weird[name"]);
        assert!(m.should_ignore(Path::new("/project/weird[name")));
        assert!(m.should_ignore(Path::new("/project/a/weird[name/x.py")));
        assert!(!m.should_ignore(Path::new("/project/weirdn")));
    }

    #[test]
    fn test_outside_root_is_ignored() {
        let m = matcher(&[]);
        assert!(m.should_ignore(Path::new("/elsewhere/file.py")));
        assert!(!m.should_ignore(Path::new("/project")));
        assert!(!m.should_ignore(Path::new("/project/file.py")));
    }

    #[test]
    fn test_builder_normalizes_lines() {
        let rules = IgnoreRuleSetBuilder::empty()
            .lines("# comment\n\nbuild/\n/target\nbuild\n  *.log  \n")
            .build();

        assert_eq!(rules.len(), 3);
        assert!(rules.contains("build"));
        assert!(rules.contains("target"));
        assert!(rules.contains("*.log"));
    }

    #[test]
    fn test_for_root_reads_gitignore() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(".gitignore"), "secrets/\n*.tmp\n").unwrap();

        let m = PathMatcher::for_root(dir.path(), &["vendor".to_string()]);
        assert!(m.should_ignore(&dir.path().join("secrets").join("key.py")));
        assert!(m.should_ignore(&dir.path().join("a.tmp")));
        assert!(m.should_ignore(&dir.path().join("vendor")));
        assert!(m.should_ignore(&dir.path().join("node_modules")));
        assert!(!m.should_ignore(&dir.path().join("app.py")));
    }

    #[test]
    fn test_missing_gitignore_keeps_defaults() {
        let dir = tempdir().unwrap();
        let m = PathMatcher::for_root(dir.path(), &[]);
        assert!(m.should_ignore(&dir.path().join("__pycache__")));
    }
}
