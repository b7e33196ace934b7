//! Markdown rendering for GROUND_TRUTH.md.
//!
//! Rendering is a pure function of its inputs, the generation timestamp and
//! the previous artifact text (if any). The only part of a previous artifact
//! that survives is the body of the critical-information section.

use crate::history::HistoryEntry;
use chrono::{DateTime, Local};
use groundtruth_core::{FolderFacts, FolderInfo};
use std::path::Path;

pub const CRITICAL_HEADING: &str = "## ⚠️ Critical Information";

const MAX_EXPORTS: usize = 15;
const MAX_IMPORTS: usize = 10;
const MAX_TODOS: usize = 10;
const MAX_ENV_VARS: usize = 15;
const MAX_ENDPOINTS: usize = 15;
const MAX_HISTORY: usize = 5;

const DEFAULT_CRITICAL_BODY: [&str; 4] = [
    "<!-- Add warnings about what breaks if changed -->",
    "- This folder is tracked by ground truth system",
    "- Changes are automatically logged via git hooks",
    "- Manual edits to this section are preserved",
];

/// Everything one artifact is built from.
#[derive(Debug, Clone)]
pub struct DocumentInput<'a> {
    /// Folder path relative to the project root.
    pub relative_path: &'a Path,
    pub info: &'a FolderInfo,
    pub facts: &'a FolderFacts,
    /// Newest first.
    pub history: &'a [HistoryEntry],
    pub generated_at: DateTime<Local>,
}

/// Renders the artifact, carrying over the critical section of `previous`.
pub fn render(input: &DocumentInput<'_>, previous: Option<&str>) -> String {
    let timestamp = input.generated_at.format("%Y-%m-%dT%H:%M:%S").to_string();
    let relative = if input.relative_path.as_os_str().is_empty() {
        ".".to_string()
    } else {
        input.relative_path.display().to_string()
    };

    let mut lines = vec![
        format!("# GROUND_TRUTH.md for {}", relative),
        format!("Last Updated: {}", timestamp),
        "Auto-generated by groundtruth".to_string(),
        String::new(),
        "## 📁 Purpose".to_string(),
        input.info.purpose.to_string(),
        String::new(),
        format!("## 📄 Files ({} files)", input.info.files.len()),
    ];

    if input.info.files.is_empty() {
        lines.push("- No tracked files in this directory".to_string());
    }
    for file in &input.info.files {
        lines.push(format!(
            "- `{}` - {} (Modified: {}, Size: {})",
            file.name,
            file.purpose,
            file.modified.format("%Y-%m-%d"),
            format_size(file.size)
        ));
    }

    let facts = input.facts;

    if !facts.exports.is_empty() {
        let exports = sorted_strings(facts.exports.iter());
        section(&mut lines, "## 📦 Exports");
        push_capped(&mut lines, &exports, MAX_EXPORTS);
    }

    if !facts.imports.is_empty() {
        section(&mut lines, "## 🔗 Dependencies");
        lines.push("### This folder imports:".to_string());
        for import in facts.local_imports().take(MAX_IMPORTS) {
            lines.push(format!("- {}", import));
        }

        let external: Vec<&String> = facts.external_imports().collect();
        if !external.is_empty() {
            lines.push("### External imports:".to_string());
            for import in external.into_iter().take(MAX_IMPORTS) {
                lines.push(format!("- {}", import));
            }
        }
    }

    if !facts.todos.is_empty() {
        let todos: Vec<String> = facts.todos.iter().map(|t| t.to_string()).collect();
        section(&mut lines, "## 📝 TODOs & FIXMEs");
        push_capped(&mut lines, &todos, MAX_TODOS);
    }

    if !facts.env_vars.is_empty() {
        section(&mut lines, "## 🔐 Environment Variables");
        for name in facts.env_vars.iter().take(MAX_ENV_VARS) {
            lines.push(format!("- {}", name));
        }
    }

    if !facts.endpoints.is_empty() {
        let endpoints = sorted_strings(facts.endpoints.iter());
        section(&mut lines, "## 🌐 API Endpoints");
        push_capped(&mut lines, &endpoints, MAX_ENDPOINTS);
    }

    section(&mut lines, "## 🔄 Recent Git Changes");
    if input.history.is_empty() {
        lines.push("- No git history for this folder yet".to_string());
    }
    for entry in input.history.iter().take(MAX_HISTORY) {
        lines.push(format!("- [{}] {} ({})", entry.date, entry.message, entry.hash));
    }

    section(&mut lines, CRITICAL_HEADING);
    match previous.and_then(preserved_critical) {
        Some(body) => lines.extend(body.lines().map(str::to_string)),
        None => lines.extend(DEFAULT_CRITICAL_BODY.iter().map(|l| l.to_string())),
    }

    lines.extend(
        [
            "",
            "## 🤖 LLM Instructions",
            "**BEFORE modifying ANY file in this folder:**",
            "1. READ this GROUND_TRUTH.md completely",
            "2. CHECK parent folder's GROUND_TRUTH.md",
            "3. VERIFY no dependencies will break",
            "4. UPDATE will happen automatically via git hooks",
            "",
            "## 📊 Folder Statistics",
        ]
        .iter()
        .map(|l| l.to_string()),
    );
    lines.push(format!("- Total files: {}", input.info.files.len()));
    lines.push(format!("- Total size: {}", format_size(input.info.total_size)));
    lines.push(format!("- Last scan: {}", timestamp));
    lines.push(String::new());

    lines.join("\n")
}

/// The hand-maintained body of the critical section in a previous artifact.
///
/// Only recognized when another `## ` heading follows it. The heading line
/// itself is not part of the body.
pub fn preserved_critical(previous: &str) -> Option<String> {
    let start = previous.find(CRITICAL_HEADING)?;
    let end = start + 1 + previous[start + 1..].find("\n## ")?;

    let section = previous[start..end].trim();
    let body = section
        .split_once('\n')
        .map(|(_, rest)| rest)
        .unwrap_or_default();
    Some(body.to_string())
}

/// Human-readable size with binary units, one decimal.
pub fn format_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if size < 1024.0 {
            return format!("{:.1}{}", size, unit);
        }
        size /= 1024.0;
    }
    format!("{:.1}TB", size)
}

fn section(lines: &mut Vec<String>, heading: &str) {
    lines.push(String::new());
    lines.push(heading.to_string());
}

fn push_capped(lines: &mut Vec<String>, items: &[String], cap: usize) {
    for item in items.iter().take(cap) {
        lines.push(format!("- {}", item));
    }
    if items.len() > cap {
        lines.push(format!("- ... and {} more", items.len() - cap));
    }
}

fn sorted_strings<T: ToString>(items: impl Iterator<Item = T>) -> Vec<String> {
    let mut out: Vec<String> = items.map(|item| item.to_string()).collect();
    out.sort();
    out
}
