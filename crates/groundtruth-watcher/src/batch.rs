//! Whole-tree generation.
//!
//! Walks every non-ignored folder under the root (the root included) and
//! regenerates its artifact. Folders are independent; one failing is
//! recorded and the walk moves on.

use crate::error::Result;
use groundtruth_docs::DocGenerator;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Result of a batch pass.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Artifacts written, in walk order.
    pub written: Vec<PathBuf>,

    /// Folders that failed, with the reason.
    pub errors: Vec<(PathBuf, String)>,

    /// Time taken in milliseconds.
    pub duration_ms: u64,
}

/// Regenerates the artifact of every folder under the generator's root.
///
/// # Example
///
/// ```no_run
/// use groundtruth_core::Config;
/// use groundtruth_docs::DocGenerator;
/// use groundtruth_watcher::generate_all;
/// use std::path::Path;
///
/// let root = Path::new(".");
/// let generator = DocGenerator::from_config(root, &Config::load(root).unwrap());
/// let report = generate_all(&generator).unwrap();
/// println!("Wrote {} files", report.written.len());
/// ```
pub fn generate_all(generator: &DocGenerator) -> Result<BatchReport> {
    generate_all_with_progress(generator, |_| {})
}

/// Same as [`generate_all`], calling `progress` before each folder.
pub fn generate_all_with_progress(
    generator: &DocGenerator,
    mut progress: impl FnMut(&Path),
) -> Result<BatchReport> {
    let start = Instant::now();
    let root = generator.root();
    let matcher = generator.matcher();

    if !root.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} is not a directory", root.display()),
        )
        .into());
    }

    info!("Generating artifacts under {}", root.display());

    let mut report = BatchReport::default();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0 || !entry.file_type().is_dir() || !matcher.should_ignore(entry.path())
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_dir() {
            continue;
        }

        let folder = entry.path();
        progress(folder);

        match generator.generate(folder) {
            Ok(Some(path)) => report.written.push(path),
            Ok(None) => {}
            Err(e) => {
                warn!("Failed to document {}: {}", folder.display(), e);
                report.errors.push((folder.to_path_buf(), e.to_string()));
            }
        }
    }

    report.duration_ms = start.elapsed().as_millis() as u64;

    info!(
        "Wrote {} artifacts in {}ms ({} failed)",
        report.written.len(),
        report.duration_ms,
        report.errors.len()
    );

    Ok(report)
}

/// Runs [`generate_all`] on the blocking pool.
pub async fn generate_all_blocking(generator: Arc<DocGenerator>) -> Result<BatchReport> {
    tokio::task::spawn_blocking(move || generate_all(&generator)).await?
}
