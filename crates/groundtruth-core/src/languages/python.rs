//! Python analyzer.
//!
//! Handles .py files through the tree-sitter Python grammar. A tree that
//! contains error nodes is treated as unparseable: no imports, exports or
//! routes are taken from it, mirroring how the interpreter would refuse the
//! whole file.

use crate::error::{AnalysisError, Result};
use crate::facts::{Endpoint, ExportDecl, FileFact, HttpMethod, TodoTag};
use crate::languages::{Language, LanguageAnalyzer};
use once_cell::sync::Lazy;
use regex::Regex;
use tree_sitter::{Node, Parser, Tree};

pub struct PythonAnalyzer;

static TODO_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(#|//|/\*)\s*(TODO|FIXME|HACK|XXX)[:\s]*(.*)").expect("valid TODO pattern")
});

static ENV_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r#"os\.environ\.get\(["']([^"']+)"#,
        r#"os\.environ\[["']([^"']+)"#,
        r#"os\.getenv\(["']([^"']+)"#,
        r#"config\(["']([^"']+)"#,
        r"settings\.([A-Z_]+)",
        r"env\.([A-Z_]+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid env pattern"))
    .collect()
});

const TODO_TAGS: &[TodoTag] = &[TodoTag::Todo, TodoTag::Fixme, TodoTag::Hack, TodoTag::Xxx];

/// Receivers whose decorators declare routes (`@app.get(...)`).
const ROUTE_RECEIVERS: &[&str] = &["router", "app", "bp"];

/// Decorator method name to HTTP verb.
const ROUTE_METHODS: &[(&str, HttpMethod)] = &[
    ("get", HttpMethod::Get),
    ("post", HttpMethod::Post),
    ("put", HttpMethod::Put),
    ("delete", HttpMethod::Delete),
    ("patch", HttpMethod::Patch),
    ("route", HttpMethod::Get),
];

impl LanguageAnalyzer for PythonAnalyzer {
    fn language(&self) -> Language {
        Language::Python
    }

    fn extensions(&self) -> &[&str] {
        &["py"]
    }

    fn extract_structure(&self, source: &str, fact: &mut FileFact) -> Result<()> {
        let tree = parse_tree(source)?;
        let root = tree.root_node();

        if root.has_error() {
            return Err(AnalysisError::Parser("source has syntax errors".into()));
        }

        collect_exports(&root, source, fact);
        walk(&root, source, fact);

        Ok(())
    }

    fn todo_tags(&self) -> &[TodoTag] {
        TODO_TAGS
    }

    fn todo_pattern(&self) -> &Regex {
        &TODO_PATTERN
    }

    fn env_patterns(&self) -> &[Regex] {
        &ENV_PATTERNS
    }
}

fn parse_tree(source: &str) -> Result<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::language())
        .map_err(|e| AnalysisError::Parser(format!("Failed to set language: {}", e)))?;

    parser
        .parse(source, None)
        .ok_or_else(|| AnalysisError::Parser("Tree-sitter returned no tree".into()))
}

/// Collects top-level functions and classes that aren't underscore-private.
fn collect_exports(root: &Node, source: &str, fact: &mut FileFact) {
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        let definition = match child.kind() {
            "decorated_definition" => match child.child_by_field_name("definition") {
                Some(def) => def,
                None => continue,
            },
            _ => child,
        };

        let name = match definition.child_by_field_name("name") {
            Some(n) => get_text(&n, source),
            None => continue,
        };

        if name.starts_with('_') {
            continue;
        }

        match definition.kind() {
            "function_definition" => {
                let params = definition
                    .child_by_field_name("parameters")
                    .map(|p| positional_params(&p, source))
                    .unwrap_or_default();
                fact.exports.push(ExportDecl::function(name, &params));
            }
            "class_definition" => fact.exports.push(ExportDecl::class(name)),
            _ => {}
        }
    }
}

/// Collects imports and decorator routes from every node under `root`.
///
/// Walks with a cursor rather than recursion, so nesting depth costs no
/// stack.
fn walk(root: &Node, source: &str, fact: &mut FileFact) {
    let mut cursor = root.walk();

    loop {
        let node = cursor.node();
        match node.kind() {
            "import_statement" => extract_import(&node, source, fact),
            "import_from_statement" => extract_from_import(&node, source, fact),
            "future_import_statement" => {
                for name in imported_names(&node, source) {
                    fact.imports.push(format!("__future__.{}", name));
                }
            }
            "decorated_definition" => extract_routes(&node, source, fact),
            _ => {}
        }

        if cursor.goto_first_child() {
            continue;
        }
        while !cursor.goto_next_sibling() {
            if !cursor.goto_parent() {
                return;
            }
        }
    }
}

/// `import a.b, c as d` yields `a.b` and `c`.
fn extract_import(node: &Node, source: &str, fact: &mut FileFact) {
    fact.imports.extend(imported_names(node, source));
}

/// `from X import Y` yields `X.Y`, with relative modules turned into paths.
fn extract_from_import(node: &Node, source: &str, fact: &mut FileFact) {
    let module_node = match node.child_by_field_name("module_name") {
        Some(m) => m,
        None => return,
    };

    let module_path = if module_node.kind() == "relative_import" {
        let level = find_child_by_kind(&module_node, "import_prefix")
            .map(|prefix| get_text(&prefix, source).matches('.').count())
            .unwrap_or(0);
        let module = find_child_by_kind(&module_node, "dotted_name")
            .map(|name| get_text(&name, source))
            .unwrap_or_default();
        relative_module_path(level, &module)
    } else {
        get_text(&module_node, source)
    };

    if find_child_by_kind(node, "wildcard_import").is_some() {
        fact.imports.push(format!("{}.*", module_path));
        return;
    }

    for name in imported_names(node, source) {
        fact.imports.push(format!("{}.{}", module_path, name));
    }
}

/// Rewrites a relative import as a path.
///
/// Level 1 is the current folder (`./`); each extra level adds one `../`.
pub(crate) fn relative_module_path(level: usize, module: &str) -> String {
    if level == 0 {
        return module.to_string();
    }

    let prefix = if level > 1 {
        "../".repeat(level - 1)
    } else {
        "./".to_string()
    };

    if module.is_empty() {
        prefix
    } else {
        format!("{}{}", prefix, module.replace('.', "/"))
    }
}

/// The `name` fields of an import node, with aliases resolved to the
/// original name.
fn imported_names(node: &Node, source: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut cursor = node.walk();
    for child in node.children_by_field_name("name", &mut cursor) {
        let target = match child.kind() {
            "aliased_import" => child.child_by_field_name("name"),
            _ => Some(child),
        };
        if let Some(target) = target {
            names.push(get_text(&target, source));
        }
    }
    names
}

/// Positional-or-keyword parameter names, the way `def` exports list them.
///
/// Stops at `*`, `*args` or `**kwargs`; anything before a `/` is dropped.
fn positional_params(params: &Node, source: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut cursor = params.walk();

    for param in params.named_children(&mut cursor) {
        match param.kind() {
            "identifier" => names.push(get_text(&param, source)),
            "default_parameter" | "typed_default_parameter" => {
                if let Some(name) = param.child_by_field_name("name") {
                    if name.kind() == "identifier" {
                        names.push(get_text(&name, source));
                    }
                }
            }
            "typed_parameter" => match param.named_child(0) {
                Some(inner) if inner.kind() == "identifier" => {
                    names.push(get_text(&inner, source))
                }
                _ => break,
            },
            "positional_separator" => names.clear(),
            "keyword_separator" | "list_splat_pattern" | "dictionary_splat_pattern" => break,
            _ => {}
        }
    }

    names
}

/// The shape of a decorator expression, as far as route detection cares.
#[derive(Debug, PartialEq)]
enum Decorator {
    /// `@receiver.method(first, ...)`
    MethodCall {
        receiver: String,
        method: String,
        first_arg: Option<Literal>,
    },
    Other,
}

/// The first positional argument of a decorator call.
#[derive(Debug, PartialEq)]
enum Literal {
    Str(String),
    Other,
}

impl Decorator {
    fn parse(decorator: &Node, source: &str) -> Self {
        let expr = match decorator.named_child(0) {
            Some(e) if e.kind() == "call" => e,
            _ => return Self::Other,
        };

        let function = match expr.child_by_field_name("function") {
            Some(f) if f.kind() == "attribute" => f,
            _ => return Self::Other,
        };

        let receiver = match function.child_by_field_name("object") {
            Some(obj) if obj.kind() == "identifier" => get_text(&obj, source),
            _ => return Self::Other,
        };

        let method = match function.child_by_field_name("attribute") {
            Some(attr) => get_text(&attr, source),
            None => return Self::Other,
        };

        let first_arg = expr.child_by_field_name("arguments").and_then(|args| {
            let mut cursor = args.walk();
            let first = args
                .named_children(&mut cursor)
                .find(|arg| arg.kind() != "comment");
            match first {
                Some(arg) if arg.kind() == "keyword_argument" => None,
                Some(arg) => Some(Literal::parse(&arg, source)),
                None => None,
            }
        });

        Self::MethodCall {
            receiver,
            method,
            first_arg,
        }
    }

    /// Looks the decorator up in the route table.
    fn route(&self) -> Option<(HttpMethod, &str)> {
        match self {
            Self::MethodCall {
                receiver,
                method,
                first_arg: Some(Literal::Str(path)),
            } if ROUTE_RECEIVERS.contains(&receiver.as_str()) => ROUTE_METHODS
                .iter()
                .find(|(name, _)| *name == method.as_str())
                .map(|(_, verb)| (*verb, path.as_str())),
            _ => None,
        }
    }
}

impl Literal {
    fn parse(node: &Node, source: &str) -> Self {
        if node.kind() != "string" || find_child_by_kind(node, "interpolation").is_some() {
            return Self::Other;
        }

        match string_value(&get_text(node, source)) {
            Some(value) => Self::Str(value),
            None => Self::Other,
        }
    }
}

/// Strips the prefix and quotes from a plain string literal.
///
/// Byte strings and f-strings aren't plain text constants and yield None.
fn string_value(literal: &str) -> Option<String> {
    let quote_start = literal.find(['"', '\''])?;
    let prefix = &literal[..quote_start];
    if !prefix.chars().all(|c| matches!(c, 'r' | 'R' | 'u' | 'U')) {
        return None;
    }

    let quoted = &literal[quote_start..];
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if quoted.len() >= quote.len() * 2 && quoted.starts_with(quote) && quoted.ends_with(quote)
        {
            return Some(quoted[quote.len()..quoted.len() - quote.len()].to_string());
        }
    }
    None
}

/// Turns route decorators on a decorated function into endpoints.
fn extract_routes(node: &Node, source: &str, fact: &mut FileFact) {
    let function = match node.child_by_field_name("definition") {
        Some(def) if def.kind() == "function_definition" => def,
        _ => return,
    };

    let handler = match function.child_by_field_name("name") {
        Some(n) => get_text(&n, source),
        None => return,
    };

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() != "decorator" {
            continue;
        }

        if let Some((method, path)) = Decorator::parse(&child, source).route() {
            fact.endpoints
                .push(Endpoint::new(method, path).with_handler(handler.clone()));
        }
    }
}

// ============================================================================
// Helper functions
// ============================================================================

/// Gets text content of a node.
fn get_text(node: &Node, source: &str) -> String {
    node.utf8_text(source.as_bytes())
        .map(str::to_string)
        .unwrap_or_default()
}

/// Finds a child node by its kind.
fn find_child_by_kind<'a>(node: &Node<'a>, kind: &str) -> Option<Node<'a>> {
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            if child.kind() == kind {
                return Some(child);
            }
        }
    }
    None
}
