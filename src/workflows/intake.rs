use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use tracing::{debug, error, info};

use super::placement::PlacementEngine;
use crate::media::subtitles::{collect_subtitle_files, is_subtitle_file};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeEvent {
    Candidate(PathBuf),
    Shutdown,
}

/// Single-worker queue in front of the placement engine.
///
/// The startup sweep, the filesystem watcher and the signal handler all push
/// into the same channel; [`Intake::run`] drains it on one thread, so no two
/// placements ever overlap.
pub struct Intake {
    tx: Sender<IntakeEvent>,
    rx: Receiver<IntakeEvent>,
}

impl Intake {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }

    pub fn sender(&self) -> Sender<IntakeEvent> {
        self.tx.clone()
    }

    /// Queue every subtitle already sitting in `source_dir`.
    pub fn sweep(&self, source_dir: &Path) -> Result<usize> {
        let files = collect_subtitle_files(source_dir, true)?;
        info!(
            "Found {} subtitle file(s) in {}",
            files.len(),
            source_dir.display()
        );

        let count = files.len();
        for path in files {
            // Cannot fail: `self.rx` is alive for as long as `self` is.
            let _ = self.tx.send(IntakeEvent::Candidate(path));
        }
        Ok(count)
    }

    /// Subscribe to create/modify events under `source_dir`. Events keep
    /// flowing for as long as the returned watcher is alive.
    pub fn watch(&self, source_dir: &Path) -> Result<RecommendedWatcher> {
        let tx = self.tx.clone();
        let mut watcher = notify::recommended_watcher(
            move |res: std::result::Result<Event, notify::Error>| match res {
                Ok(event) => {
                    for path in candidate_paths(event) {
                        debug!("File watch event for {}", path.display());
                        if tx.send(IntakeEvent::Candidate(path)).is_err() {
                            debug!("Intake queue closed; dropping file watch event");
                        }
                    }
                }
                Err(e) => error!("Watch error: {e}"),
            },
        )
        .context("Failed to create file watcher")?;

        watcher
            .watch(source_dir, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch {}", source_dir.display()))?;
        info!("Watching {} for new subtitles", source_dir.display());

        Ok(watcher)
    }

    /// Process queued paths until a shutdown request arrives or every sender
    /// is gone. Returns the number of candidates handed to the engine.
    pub fn run(self, engine: &PlacementEngine) -> usize {
        let Intake { tx, rx } = self;
        drop(tx);

        let mut processed = 0;
        for event in rx {
            match event {
                IntakeEvent::Candidate(path) => {
                    // The engine reports every outcome itself; a failure here only
                    // concerns this one file.
                    let _ = engine.process_file(&path);
                    processed += 1;
                }
                IntakeEvent::Shutdown => {
                    info!("Shutdown requested, stopping intake");
                    break;
                }
            }
        }
        processed
    }
}

impl Default for Intake {
    fn default() -> Self {
        Self::new()
    }
}

fn candidate_paths(event: Event) -> Vec<PathBuf> {
    match event.kind {
        EventKind::Create(_) | EventKind::Modify(_) => event
            .paths
            .into_iter()
            .filter(|path| is_subtitle_file(path))
            .collect(),
        _ => Vec::new(),
    }
}
