use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Extensions accepted from the inbox, compared case-insensitively.
pub const SUBTITLE_EXTENSIONS: [&str; 3] = ["srt", "sbv", "sub"];

pub fn is_subtitle_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUBTITLE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// List the subtitle files under `dir_path`, sorted by path.
///
/// Symlinked directories are not descended into, so a link back up the tree
/// cannot list the same file twice. Only an unreadable `dir_path` is an
/// error; anything below it that cannot be read is logged and skipped.
pub fn collect_subtitle_files(dir_path: &Path, recurse: bool) -> Result<Vec<PathBuf>> {
    let mut walker = WalkDir::new(dir_path).follow_links(false);
    if !recurse {
        walker = walker.max_depth(1);
    }

    let mut subtitle_files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(e)
                    .with_context(|| format!("Failed to read directory {}", dir_path.display()));
            }
            Err(e) => {
                warn!("Skipping unreadable inbox entry: {e}");
                continue;
            }
        };

        // is_file follows a symlink to a single subtitle
        if is_subtitle_file(entry.path()) && entry.path().is_file() {
            subtitle_files.push(entry.into_path());
        }
    }

    subtitle_files.sort();
    Ok(subtitle_files)
}
