//! The watch loop.
//!
//! One task owns the loop. Filesystem changes arrive over a channel, a
//! timer drains deferred folders, and regeneration runs on the blocking
//! pool so the loop only ever decides and spawns.

use crate::error::{Result, WatchError};
use crate::scheduler::UpdateScheduler;
use crate::watcher::{FileChange, FileWatcher};
use groundtruth_core::Config;
use groundtruth_docs::DocGenerator;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Timing knobs for [`watch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    /// Minimum time between change-driven runs of one folder.
    pub debounce: Duration,
    /// How often deferred folders are drained.
    pub sweep_interval: Duration,
}

impl WatchOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            debounce: config.debounce(),
            sweep_interval: config.sweep_interval(),
        }
    }

    /// A zero debounce is fine. A zero sweep interval is not.
    pub fn validate(&self) -> Result<()> {
        if self.sweep_interval.is_zero() {
            return Err(WatchError::InvalidOptions(
                "sweep interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// What a watch session did before it stopped.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WatchSummary {
    pub changes: usize,
    pub updated: usize,
    pub failed: usize,
}

/// Watches the generator's root until `shutdown` resolves.
///
/// Once shutdown begins no further changes are accepted, and regenerations
/// already running are awaited.
pub async fn watch<F>(
    generator: Arc<DocGenerator>,
    options: WatchOptions,
    shutdown: F,
) -> Result<WatchSummary>
where
    F: Future<Output = ()>,
{
    options.validate()?;

    let (sender, changes) = mpsc::unbounded_channel::<FileChange>();
    let _watcher = FileWatcher::new(generator.root(), sender)?;

    watch_changes(generator, options, changes, shutdown).await
}

/// Runs the debounce loop over changes from any source until `shutdown`
/// resolves.
///
/// [`watch`] feeds it from the filesystem. The loop keeps sweeping
/// deferred folders after every sender is gone.
pub async fn watch_changes<F>(
    generator: Arc<DocGenerator>,
    options: WatchOptions,
    mut changes: mpsc::UnboundedReceiver<FileChange>,
    shutdown: F,
) -> Result<WatchSummary>
where
    F: Future<Output = ()>,
{
    options.validate()?;

    let scheduler = UpdateScheduler::new(generator.matcher().clone(), options.debounce);

    let mut sweep = tokio::time::interval(options.sweep_interval);
    sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);
    sweep.tick().await;

    let mut tasks: JoinSet<RefreshOutcome> = JoinSet::new();
    let mut summary = WatchSummary::default();
    let mut open = true;

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutting down watcher");
                break;
            }
            received = changes.recv(), if open => match received {
                Some(change) => {
                    summary.changes += 1;
                    for folder in scheduler.on_change(&change, Instant::now()) {
                        spawn_refresh(&mut tasks, &generator, folder);
                    }
                }
                None => {
                    debug!("Change stream closed");
                    open = false;
                }
            },
            _ = sweep.tick() => {
                let due = scheduler.sweep(Instant::now());
                if !due.is_empty() {
                    debug!("Sweep picked up {} deferred folders", due.len());
                }
                for folder in due {
                    spawn_refresh(&mut tasks, &generator, folder);
                }
            }
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                record(&mut summary, joined);
            }
        }
    }

    changes.close();

    while let Some(joined) = tasks.join_next().await {
        record(&mut summary, joined);
    }

    Ok(summary)
}

/// Artifacts written by one [`refresh_folder`] call.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub written: Vec<PathBuf>,
    pub failed: usize,
}

fn spawn_refresh(
    tasks: &mut JoinSet<RefreshOutcome>,
    generator: &Arc<DocGenerator>,
    folder: PathBuf,
) {
    let generator = Arc::clone(generator);
    tasks.spawn_blocking(move || refresh_folder(&generator, &folder));
}

fn record(
    summary: &mut WatchSummary,
    joined: std::result::Result<RefreshOutcome, tokio::task::JoinError>,
) {
    match joined {
        Ok(outcome) => {
            summary.updated += outcome.written.len();
            summary.failed += outcome.failed;
        }
        Err(e) => {
            warn!("Regeneration task failed: {}", e);
            summary.failed += 1;
        }
    }
}

/// Regenerates `folder`, then its parent if the parent is inside the root.
///
/// Only one level up. A failure is logged and counted, never propagated.
pub fn refresh_folder(generator: &DocGenerator, folder: &Path) -> RefreshOutcome {
    let root = generator.root();
    let mut outcome = RefreshOutcome::default();

    let parent = folder
        .parent()
        .filter(|parent| folder != root && parent.starts_with(root));

    for target in std::iter::once(folder).chain(parent) {
        match generator.generate(target) {
            Ok(Some(path)) => {
                info!("Updated {}", display_relative(root, &path));
                outcome.written.push(path);
            }
            Ok(None) => debug!("Nothing to update for {}", target.display()),
            Err(e) => {
                warn!("Failed to update {}: {}", target.display(), e);
                outcome.failed += 1;
            }
        }
    }

    outcome
}

fn display_relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}
