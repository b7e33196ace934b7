//! Language analyzers.
//!
//! Each supported language has its own submodule implementing
//! [`LanguageAnalyzer`]. The structural pass differs per language (a real
//! syntax tree for Python, regex rules for the JavaScript family); the line
//! scans for TODOs and environment variables are shared and only take their
//! tables from the analyzer.

mod python;
mod script;

use crate::error::Result;
use crate::facts::{FileFact, TodoTag};
use regex::Regex;
use std::fmt;
use std::path::Path;

pub use python::PythonAnalyzer;
pub use script::ScriptAnalyzer;

/// The analysis modes we know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    /// Python, analyzed through a syntax tree.
    Python,
    /// JavaScript and TypeScript, analyzed with line/regex rules.
    JavaScript,
}

impl Language {
    /// Maps a file extension (without the dot) to a language.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            "py" => Some(Self::Python),
            "js" | "jsx" | "ts" | "tsx" | "mjs" => Some(Self::JavaScript),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?;
        Self::from_extension(extension)
    }

    /// Returns the analyzer for this language.
    pub fn analyzer(&self) -> Box<dyn LanguageAnalyzer> {
        match self {
            Self::Python => Box::new(PythonAnalyzer),
            Self::JavaScript => Box::new(ScriptAnalyzer),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Python => "python",
            Self::JavaScript => "javascript",
        };
        write!(f, "{}", s)
    }
}

/// Trait for language-specific extraction rules.
pub trait LanguageAnalyzer: Send + Sync {
    fn language(&self) -> Language;

    /// File extensions this analyzer handles.
    fn extensions(&self) -> &[&str];

    /// Extracts imports, exports and endpoints into `fact`.
    ///
    /// Returning an error means structural extraction was skipped. The
    /// caller still runs the line scans, so this never loses TODOs or
    /// environment variables.
    fn extract_structure(&self, source: &str, fact: &mut FileFact) -> Result<()>;

    /// Tags a line must contain before the TODO pattern is tried.
    fn todo_tags(&self) -> &[TodoTag];

    /// Comment pattern with groups (prefix, tag, message).
    fn todo_pattern(&self) -> &Regex;

    /// Patterns whose first group captures an environment variable name.
    fn env_patterns(&self) -> &[Regex];
}

/// Gets an analyzer for the given file extension.
pub fn get_analyzer(extension: &str) -> Option<Box<dyn LanguageAnalyzer>> {
    Language::from_extension(extension).map(|lang| lang.analyzer())
}

/// Lists all supported file extensions.
pub fn supported_extensions() -> &'static [&'static str] {
    &["py", "js", "jsx", "ts", "tsx", "mjs"]
}

/// Checks if a file extension is supported.
pub fn is_supported(extension: &str) -> bool {
    Language::from_extension(extension).is_some()
}
