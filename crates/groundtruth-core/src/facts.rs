//! Extracted facts.
//!
//! A FileFact is what one pass over one source file produces. A FolderFacts
//! is the fold of every FileFact in a folder. Both are plain data: they are
//! rebuilt from scratch on every analysis and thrown away after rendering.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// What kind of declaration an export is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportKind {
    Function,
    Class,
    /// `const`, `let`, `var` and names re-exported from a brace list.
    Binding,
}

impl fmt::Display for ExportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Function => "function",
            Self::Class => "class",
            Self::Binding => "binding",
        };
        write!(f, "{}", s)
    }
}

/// A publicly visible declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExportDecl {
    pub kind: ExportKind,
    pub name: String,
    /// Rendered signature, e.g. `def foo(a, b)` or `class User`.
    pub signature: Option<String>,
}

impl ExportDecl {
    /// A function with its positional parameter names.
    pub fn function(name: impl Into<String>, params: &[String]) -> Self {
        let name = name.into();
        let signature = format!("def {}({})", name, params.join(", "));
        Self {
            kind: ExportKind::Function,
            name,
            signature: Some(signature),
        }
    }

    pub fn class(name: impl Into<String>) -> Self {
        let name = name.into();
        let signature = format!("class {}", name);
        Self {
            kind: ExportKind::Class,
            name,
            signature: Some(signature),
        }
    }

    /// An export known only by name.
    pub fn named(kind: ExportKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            signature: None,
        }
    }
}

impl fmt::Display for ExportDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.signature {
            Some(sig) => write!(f, "{}", sig),
            None => write!(f, "{}", self.name),
        }
    }
}

/// The marker word that introduced a TODO-class comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TodoTag {
    Todo,
    Fixme,
    Hack,
    Xxx,
}

impl TodoTag {
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "TODO" => Some(Self::Todo),
            "FIXME" => Some(Self::Fixme),
            "HACK" => Some(Self::Hack),
            "XXX" => Some(Self::Xxx),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "TODO",
            Self::Fixme => "FIXME",
            Self::Hack => "HACK",
            Self::Xxx => "XXX",
        }
    }
}

impl fmt::Display for TodoTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A TODO/FIXME/HACK/XXX comment found in a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoMarker {
    /// 1-indexed, like editors show.
    pub line: usize,
    pub tag: TodoTag,
    /// Trailing comment text, capped at 60 characters.
    pub message: String,
}

impl fmt::Display for TodoMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}: {}", self.line, self.tag, self.message)
    }
}

/// HTTP verb of a route or outbound call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    /// Maps a lower- or mixed-case verb (`get`, `Post`) to a method.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "get" => Some(Self::Get),
            "post" => Some(Self::Post),
            "put" => Some(Self::Put),
            "delete" => Some(Self::Delete),
            "patch" => Some(Self::Patch),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An API endpoint inferred from a route declaration or a network call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Endpoint {
    pub method: HttpMethod,
    pub path: String,
    /// The function the route is bound to, when known.
    pub handler: Option<String>,
}

impl Endpoint {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            handler: None,
        }
    }

    /// Builder pattern: set the handler name.
    pub fn with_handler(mut self, handler: impl Into<String>) -> Self {
        self.handler = Some(handler.into());
        self
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.handler {
            Some(handler) => write!(f, "{} {} → {}()", self.method, self.path, handler),
            None => write!(f, "{} {}", self.method, self.path),
        }
    }
}

/// Everything extracted from one file.
///
/// Every field may be empty. An empty fact is the answer for unreadable
/// files and unsupported languages, never an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFact {
    /// Module paths or relative specifiers, in source order.
    pub imports: Vec<String>,
    pub exports: Vec<ExportDecl>,
    pub todos: Vec<TodoMarker>,
    /// Deduplicated within the file, first occurrence wins.
    pub env_vars: Vec<String>,
    pub endpoints: Vec<Endpoint>,
}

impl FileFact {
    pub fn is_empty(&self) -> bool {
        self.imports.is_empty()
            && self.exports.is_empty()
            && self.todos.is_empty()
            && self.env_vars.is_empty()
            && self.endpoints.is_empty()
    }

    /// Records an environment variable name unless already present.
    pub fn add_env_var(&mut self, name: &str) {
        if !self.env_vars.iter().any(|existing| existing == name) {
            self.env_vars.push(name.to_string());
        }
    }
}

/// An export tagged with the file that declares it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaggedExport {
    pub file: String,
    pub export: ExportDecl,
}

impl fmt::Display for TaggedExport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.file, self.export)
    }
}

/// A TODO marker tagged with the file it was found in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedTodo {
    pub file: String,
    pub todo: TodoMarker,
}

impl fmt::Display for TaggedTodo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.file, self.todo)
    }
}

/// Aggregated facts for the direct files of one folder.
///
/// Sets are ordered so that two passes over an unchanged folder produce
/// identical values. TODOs keep visit order: files in the order they were
/// folded in, then line order within a file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderFacts {
    pub imports: BTreeSet<String>,
    pub exports: BTreeSet<TaggedExport>,
    pub todos: Vec<TaggedTodo>,
    pub env_vars: BTreeSet<String>,
    pub endpoints: BTreeSet<Endpoint>,
}

impl FolderFacts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one file's fact into the folder totals.
    pub fn absorb(&mut self, file_name: &str, fact: FileFact) {
        self.imports.extend(fact.imports);

        for export in fact.exports {
            self.exports.insert(TaggedExport {
                file: file_name.to_string(),
                export,
            });
        }

        for todo in fact.todos {
            self.todos.push(TaggedTodo {
                file: file_name.to_string(),
                todo,
            });
        }

        self.env_vars.extend(fact.env_vars);
        self.endpoints.extend(fact.endpoints);
    }

    pub fn is_empty(&self) -> bool {
        self.imports.is_empty()
            && self.exports.is_empty()
            && self.todos.is_empty()
            && self.env_vars.is_empty()
            && self.endpoints.is_empty()
    }

    /// Imports written as relative specifiers (`./x`, `../y.z`).
    pub fn local_imports(&self) -> impl Iterator<Item = &String> {
        self.imports.iter().filter(|imp| imp.starts_with('.'))
    }

    /// Everything that isn't a relative specifier.
    pub fn external_imports(&self) -> impl Iterator<Item = &String> {
        self.imports.iter().filter(|imp| !imp.starts_with('.'))
    }
}
