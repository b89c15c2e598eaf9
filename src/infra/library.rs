use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::domain::models::PlacementOutcome;

static NON_ALNUM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\p{L}\p{N}]+").unwrap());

/// View over the configured library roots.
///
/// Nothing is cached: every lookup lists the roots again, so shows added to
/// the library while the process runs are picked up.
#[derive(Debug, Clone)]
pub struct LibraryIndex {
    roots: Vec<PathBuf>,
}

impl LibraryIndex {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    /// Find the single show directory whose name contains `title`.
    ///
    /// Zero or several candidates are reported as the matching skip outcome;
    /// an ambiguous title is never resolved automatically.
    pub fn find_show_directory(&self, title: &str) -> Result<PathBuf, PlacementOutcome> {
        let needle = normalize(title);
        // A title without letters or digits is contained in every name.
        if needle.is_empty() {
            return Err(PlacementOutcome::SkippedNoDirectory {
                title: title.to_string(),
            });
        }

        let mut matches = Vec::new();

        for root in &self.roots {
            let entries = match fs::read_dir(root) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Failed to list library directory {}: {e}", root.display());
                    continue;
                }
            };

            for entry in entries.flatten() {
                let path = entry.path();
                // is_dir follows symlinks
                if !path.is_dir() {
                    continue;
                }

                let name = entry.file_name();
                if normalize(&name.to_string_lossy()).contains(&needle) {
                    matches.push(path);
                }
            }
        }

        debug!(title, candidates = matches.len(), "Looked up show directory");

        match matches.len() {
            1 => Ok(matches.remove(0)),
            0 => Err(PlacementOutcome::SkippedNoDirectory {
                title: title.to_string(),
            }),
            _ => {
                matches.sort();
                Err(PlacementOutcome::SkippedAmbiguous {
                    title: title.to_string(),
                    candidates: matches,
                })
            }
        }
    }
}

/// Lowercase, with every run of punctuation/whitespace folded to one space.
fn normalize(name: &str) -> String {
    NON_ALNUM_RE
        .replace_all(&name.to_lowercase(), " ")
        .trim()
        .to_string()
}
