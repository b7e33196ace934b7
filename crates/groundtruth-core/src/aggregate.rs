//! Folder aggregation.
//!
//! Folds the facts of every eligible direct file in a folder into one
//! [`FolderFacts`]. Nothing fails past this point: an unreadable folder is
//! an empty folder.

use crate::analyzer::{analyze_file, detect_language};
use crate::facts::FolderFacts;
use crate::folder::list_files;
use crate::ignore::PathMatcher;
use std::path::Path;
use tracing::debug;

/// Analyzes the direct files of `folder` and merges the results.
///
/// Files are visited in name order, so TODOs come out grouped by file and
/// then by line.
pub fn aggregate_folder(folder: &Path, matcher: &PathMatcher) -> FolderFacts {
    let mut facts = FolderFacts::new();

    let files = match list_files(folder, matcher) {
        Ok(files) => files,
        Err(e) => {
            debug!("Nothing to aggregate: {}", e);
            return facts;
        }
    };

    let mut analyzed = 0;
    for path in files {
        if detect_language(&path).is_none() {
            continue;
        }

        let name = match path.file_name() {
            Some(n) => n.to_string_lossy().into_owned(),
            None => continue,
        };

        facts.absorb(&name, analyze_file(&path));
        analyzed += 1;
    }

    debug!("Aggregated {} files in {}", analyzed, folder.display());
    facts
}
