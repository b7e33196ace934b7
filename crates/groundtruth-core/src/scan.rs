//! Line scans shared by every language.
//!
//! These run over the raw text whether or not structural extraction worked.

use crate::facts::{FileFact, TodoMarker, TodoTag};
use regex::Regex;

/// Longest TODO message kept, in characters.
pub const TODO_MESSAGE_LIMIT: usize = 60;

/// Finds TODO-class comments.
///
/// A line is only tried against `pattern` if it contains one of `tags`. The
/// pattern's second group is the tag and its third the message.
pub fn scan_todos(source: &str, tags: &[TodoTag], pattern: &Regex, fact: &mut FileFact) {
    for (index, line) in source.split('\n').enumerate() {
        if !tags.iter().any(|tag| line.contains(tag.as_str())) {
            continue;
        }

        let Some(cap) = pattern.captures(line) else {
            continue;
        };

        let Some(tag) = cap.get(2).and_then(|m| TodoTag::parse(m.as_str())) else {
            continue;
        };

        let message = cap
            .get(3)
            .map(|m| m.as_str().trim())
            .unwrap_or_default()
            .chars()
            .take(TODO_MESSAGE_LIMIT)
            .collect();

        fact.todos.push(TodoMarker {
            line: index + 1,
            tag,
            message,
        });
    }
}

/// Finds environment variable references.
///
/// Names are kept only if they look like variables (all caps, or containing
/// an underscore) and are deduplicated within the file.
pub fn scan_env_vars(source: &str, patterns: &[Regex], fact: &mut FileFact) {
    for pattern in patterns {
        for cap in pattern.captures_iter(source) {
            if let Some(name) = cap.get(1).map(|m| m.as_str()) {
                if looks_like_env_var(name) {
                    fact.add_env_var(name);
                }
            }
        }
    }
}

fn looks_like_env_var(name: &str) -> bool {
    name.to_uppercase() == name || name.contains('_')
}
