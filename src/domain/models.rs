use std::fmt;
use std::path::PathBuf;

/// Show title plus season/episode numbers inferred from a filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeIdentity {
    pub title: String,
    pub season: u32,
    pub episode: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchConfidence {
    /// An episode file with the same season/episode exists in the season folder.
    Exact,
    /// No episode file was found; the name was synthesized from the title.
    Fallback,
}

impl fmt::Display for MatchConfidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchConfidence::Exact => f.write_str("exact"),
            MatchConfidence::Fallback => f.write_str("fallback"),
        }
    }
}

/// Terminal result of processing one inbox file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementOutcome {
    Placed {
        target: PathBuf,
        confidence: MatchConfidence,
    },
    SkippedNotSubtitle,
    SkippedNotEpisode,
    SkippedNoDirectory {
        title: String,
    },
    SkippedAmbiguous {
        title: String,
        candidates: Vec<PathBuf>,
    },
    SkippedSeasonMissing {
        path: PathBuf,
    },
    /// The source was gone before processing started, usually because an
    /// earlier event for the same path already consumed it.
    SourceMissing,
}

impl PlacementOutcome {
    /// Outcomes that are expected noise and not worth an operator's attention.
    pub fn is_silent(&self) -> bool {
        matches!(
            self,
            PlacementOutcome::SkippedNotSubtitle | PlacementOutcome::SourceMissing
        )
    }
}
