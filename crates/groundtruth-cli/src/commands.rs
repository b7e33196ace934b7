//! CLI command implementations.

use colored::Colorize;
use groundtruth_core::Config;
use groundtruth_docs::DocGenerator;
use groundtruth_watcher::{
    generate_all_blocking, generate_all_with_progress, BatchReport, WatchOptions,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Write a default config if there is none, then generate everything.
pub fn init(path: &Path) -> Result<()> {
    let root = resolve_root(path)?;
    let config_path = Config::path(&root);

    if config_path.exists() {
        println!("{} Already initialized", "✓".green());
    } else {
        if let Some(dir) = config_path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&config_path, serde_json::to_string_pretty(&Config::default())?)?;
        println!("{} Initialized Ground Truth in {}", "✓".green(), root.display());
    }

    run_batch(&root)?;
    println!("  Run {} to keep them current", "groundtruth watch".cyan());

    Ok(())
}

/// Regenerate every GROUND_TRUTH.md under the root.
pub fn update(path: &Path) -> Result<()> {
    let root = resolve_root(path)?;
    run_batch(&root)
}

/// Watch the root and regenerate folders as they change.
pub async fn watch(
    path: &Path,
    init: bool,
    debounce_ms: Option<u64>,
    sweep_ms: Option<u64>,
) -> Result<()> {
    let root = resolve_root(path)?;
    let config = Config::load(&root)?;
    let generator = Arc::new(DocGenerator::from_config(&root, &config));

    let mut options = WatchOptions::from_config(&config);
    if let Some(ms) = debounce_ms {
        options.debounce = Duration::from_millis(ms);
    }
    if let Some(ms) = sweep_ms {
        options.sweep_interval = Duration::from_millis(ms);
    }

    println!(
        "{} Ground Truth Watcher v{}",
        "🚀".bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("📁 Watching: {}", root.display().to_string().cyan());

    if init {
        println!("{}", "Generating GROUND_TRUTH.md files...".cyan());
        let report = generate_all_blocking(Arc::clone(&generator)).await?;
        print_report(&root, &report);
    }

    println!("👀 Watching for changes... (Press Ctrl+C to stop)");
    println!(
        "{}",
        format!(
            "Updates happen {}ms after changes (debounced)",
            options.debounce.as_millis()
        )
        .dimmed()
    );

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
        }
        println!();
        println!("⏹️  Stopping watcher...");
    };

    let summary = groundtruth_watcher::watch(generator, options, shutdown).await?;

    println!(
        "{} Watcher stopped ({} changes, {} updates, {} failed)",
        "✓".green(),
        summary.changes,
        summary.updated,
        summary.failed
    );

    Ok(())
}

fn run_batch(root: &Path) -> Result<()> {
    let config = Config::load(root)?;
    let generator = DocGenerator::from_config(root, &config);

    println!("{}", "Generating GROUND_TRUTH.md files...".cyan());

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner.set_message("Scanning folders...");

    let report = generate_all_with_progress(&generator, |folder| {
        spinner.set_message(format!("Documenting {}", relative(root, folder)));
    })?;

    spinner.finish_and_clear();
    print_report(root, &report);

    Ok(())
}

fn print_report(root: &Path, report: &BatchReport) {
    println!(
        "{} Wrote {} GROUND_TRUTH.md files in {}ms",
        "✓".green(),
        report.written.len().to_string().cyan(),
        report.duration_ms
    );

    for (folder, error) in &report.errors {
        println!("{} {}: {}", "⚠".yellow(), relative(root, folder), error);
    }
}

/// Rejects a missing root or one that isn't a directory.
fn resolve_root(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        return Err(format!("Path does not exist: {}", path.display()).into());
    }
    if !path.is_dir() {
        return Err(format!("Path is not a directory: {}", path.display()).into());
    }
    Ok(path.canonicalize()?)
}

fn relative(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
        Ok(rel) => rel.display().to_string(),
        Err(_) => path.display().to_string(),
    }
}
