//! JavaScript/TypeScript analyzer.
//!
//! No syntax tree here: imports, exports and endpoints come from regex rules
//! over the raw text. Extraction is best-effort and can't fail, so
//! `extract_structure` always returns Ok.

use crate::error::Result;
use crate::facts::{Endpoint, ExportDecl, ExportKind, FileFact, HttpMethod, TodoTag};
use crate::languages::{Language, LanguageAnalyzer};
use once_cell::sync::Lazy;
use regex::Regex;

pub struct ScriptAnalyzer;

// import x from "m" / import { a, b } from "m" / import * as ns from "m"
static IMPORT_FROM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"import\s+(?:\{[^}]+\}|\*\s+as\s+\w+|\w+)\s+from\s+["']([^"']+)"#)
        .expect("valid import pattern")
});

// const x = require("m")
static REQUIRE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"const\s+\w+\s*=\s*require\(["']([^"']+)"#).expect("valid require pattern")
});

// import("m")
static DYNAMIC_IMPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"import\(["']([^"']+)"#).expect("valid dynamic import pattern"));

static EXPORT_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"export\s+(?:default\s+)?(class|function|const|let|var)\s+(\w+)")
        .expect("valid export pattern")
});

static EXPORT_LIST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"export\s+\{([^}]+)\}").expect("valid export list pattern"));

static MODULE_EXPORTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"module\.exports\s*=\s*\{([^}]+)\}").expect("valid module.exports pattern")
});

static FETCH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"fetch\(["']([^"']+)"#).expect("valid fetch pattern"));

// axios.get("/x"), app.post("/x"), router.delete("/x")
static CLIENT_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(axios|app|router)\.(get|post|put|delete|patch)\(["']([^"']+)"#)
        .expect("valid client call pattern")
});

// NestJS-style @Get("/x")
static ROUTE_ANNOTATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"@(Get|Post|Put|Delete|Patch)\(["']([^"']+)"#)
        .expect("valid route annotation pattern")
});

static TODO_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(//|/\*)\s*(TODO|FIXME|HACK)[:\s]*(.*)").expect("valid TODO pattern")
});

static ENV_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"process\.env\.([A-Z_]+)",
        r"import\.meta\.env\.([A-Z_]+)",
        r"env\.([A-Z_]+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid env pattern"))
    .collect()
});

const TODO_TAGS: &[TodoTag] = &[TodoTag::Todo, TodoTag::Fixme, TodoTag::Hack];

impl LanguageAnalyzer for ScriptAnalyzer {
    fn language(&self) -> Language {
        Language::JavaScript
    }

    fn extensions(&self) -> &[&str] {
        &["js", "jsx", "ts", "tsx", "mjs"]
    }

    fn extract_structure(&self, source: &str, fact: &mut FileFact) -> Result<()> {
        extract_imports(source, fact);
        extract_exports(source, fact);
        extract_endpoints(source, fact);
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

fn extract_imports(source: &str, fact: &mut FileFact) {
    for pattern in [&*IMPORT_FROM, &*REQUIRE, &*DYNAMIC_IMPORT] {
        for cap in pattern.captures_iter(source) {
            fact.imports.push(cap[1].to_string());
        }
    }
}

fn extract_exports(source: &str, fact: &mut FileFact) {
    for cap in EXPORT_DECL.captures_iter(source) {
        let kind = match &cap[1] {
            "class" => ExportKind::Class,
            "function" => ExportKind::Function,
            _ => ExportKind::Binding,
        };
        fact.exports.push(ExportDecl::named(kind, &cap[2]));
    }

    for pattern in [&*EXPORT_LIST, &*MODULE_EXPORTS] {
        for cap in pattern.captures_iter(source) {
            for name in cap[1].split(',').map(str::trim).filter(|n| !n.is_empty()) {
                fact.exports.push(ExportDecl::named(ExportKind::Binding, name));
            }
        }
    }
}

fn extract_endpoints(source: &str, fact: &mut FileFact) {
    // fetch() defaults to GET
    for cap in FETCH.captures_iter(source) {
        fact.endpoints.push(Endpoint::new(HttpMethod::Get, &cap[1]));
    }

    for cap in CLIENT_CALL.captures_iter(source) {
        if let Some(method) = HttpMethod::from_name(&cap[2]) {
            fact.endpoints.push(Endpoint::new(method, &cap[3]));
        }
    }

    for cap in ROUTE_ANNOTATION.captures_iter(source) {
        if let Some(method) = HttpMethod::from_name(&cap[1]) {
            fact.endpoints.push(Endpoint::new(method, &cap[2]));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn structure(source: &str) -> FileFact {
        let mut fact = FileFact::default();
        ScriptAnalyzer.extract_structure(source, &mut fact).unwrap();
        fact
    }

    #[test]
    fn test_imports() {
        let source = r#"
import React from 'react';
import { useState, useEffect } from "react";
import * as path from 'node:path';
const fs = require('fs');
const Page = lazy(() => import("./pages/Home"));
"#;
        let fact = structure(source);
        assert_eq!(
            fact.imports,
            vec!["react", "react", "node:path", "fs", "./pages/Home"]
        );
    }

    #[test]
    fn test_exports() {
        let source = r#"
export default class App {}
export function greet(name) {}
export const API_URL = "/api";
export { alpha, beta as gamma , };
module.exports = { handler, config };
"#;
        let fact = structure(source);
        let names: Vec<&str> = fact.exports.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "App",
                "greet",
                "API_URL",
                "alpha",
                "beta as gamma",
                "handler",
                "config"
            ]
        );
        assert_eq!(fact.exports[0].kind, ExportKind::Class);
        assert_eq!(fact.exports[1].kind, ExportKind::Function);
        assert_eq!(fact.exports[2].kind, ExportKind::Binding);
    }

    #[test]
    fn test_endpoints() {
        let source = r#"
const res = await fetch("/api/users");
axios.post('/api/login', body);
app.get("/health", handler);
router.delete('/items/:id', remove);
@Patch('/profile')
"#;
        let fact = structure(source);
        let endpoints: Vec<String> = fact.endpoints.iter().map(|e| e.to_string()).collect();
        assert_eq!(
            endpoints,
            vec![
                "GET /api/users",
                "POST /api/login",
                "GET /health",
                "DELETE /items/:id",
                "PATCH /profile",
            ]
        );
    }

    #[test]
    fn test_garbage_is_harmless() {
        let fact = structure("export { \nimport ( fetch( @Get(\u{0}\u{1}");
        assert!(fact.imports.is_empty());
        assert!(fact.endpoints.is_empty());
    }
}
