use std::fs;
use std::path::Path;
use tracing::warn;

use super::error::PlacementError;
use crate::domain::models::{EpisodeIdentity, MatchConfidence};
use crate::media::identity::EpisodeIdentifier;
use crate::media::video::is_video_file;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEpisode {
    /// File name of the episode, including its video extension.
    pub file_name: String,
    pub confidence: MatchConfidence,
}

/// Find the episode file for `identity` directly inside `season_dir`.
///
/// Only video files are candidates. They are visited in file name order and
/// the first one with the same season and episode wins. When nothing matches, a default name built from
/// the title is returned instead; that file need not exist.
pub fn resolve_episode_file(
    identifier: &dyn EpisodeIdentifier,
    season_dir: &Path,
    identity: &EpisodeIdentity,
) -> Result<ResolvedEpisode, PlacementError> {
    let read_err = |source| PlacementError::ReadSeasonDir {
        path: season_dir.to_path_buf(),
        source,
    };

    let mut candidates = Vec::new();
    for entry in fs::read_dir(season_dir).map_err(read_err)? {
        let path = entry.map_err(read_err)?.path();
        if !path.is_file() || !is_video_file(&path) {
            continue;
        }
        candidates.push(path);
    }
    candidates.sort();

    let mut matching = candidates.iter().filter(|path| {
        identifier.identify(path).is_some_and(|found| {
            found.season == identity.season && found.episode == identity.episode
        })
    });

    let Some(first) = matching.next() else {
        return Ok(fallback(identity));
    };

    let duplicates: Vec<_> = matching.map(|p| p.display().to_string()).collect();
    if !duplicates.is_empty() {
        warn!(
            "Multiple files in {} match S{:02}E{:02}; using {} and ignoring {}",
            season_dir.display(),
            identity.season,
            identity.episode,
            first.display(),
            duplicates.join(", ")
        );
    }

    match first.file_name().and_then(|name| name.to_str()) {
        Some(name) => Ok(ResolvedEpisode {
            file_name: name.to_string(),
            confidence: MatchConfidence::Exact,
        }),
        None => {
            warn!(
                "Episode file {} has a non UTF-8 name; falling back to the default name",
                first.display()
            );
            Ok(fallback(identity))
        }
    }
}

fn fallback(identity: &EpisodeIdentity) -> ResolvedEpisode {
    ResolvedEpisode {
        file_name: generate_fallback_filename(&identity.title, identity.season, identity.episode),
        confidence: MatchConfidence::Fallback,
    }
}

pub fn generate_fallback_filename(show_name: &str, season: u32, episode: u32) -> String {
    format!(
        "{} - S{:02}E{:02}.mkv",
        sanitize_filename(show_name),
        season,
        episode
    )
}

fn sanitize_filename(name: &str) -> String {
    // Remove or replace invalid filename characters
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}
