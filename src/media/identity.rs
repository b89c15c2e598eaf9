use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::path::Path;
use tracing::trace;

use crate::domain::models::EpisodeIdentity;

/// Classifies a file as an episode of some show, or not.
///
/// Implementations must not panic on odd input; anything that cannot be
/// understood is simply `None`.
pub trait EpisodeIdentifier {
    fn identify(&self, path: &Path) -> Option<EpisodeIdentity>;
}

/// `S01E02`, `S01.E02`, `S01 E02`, `S01E02E03` (first episode wins)
static SXXEXX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?P<title>.*?)\bs(?P<season>\d{1,3})\s?-?\s?e(?P<episode>\d{1,4})").unwrap()
});

/// `1x02`
static NXNN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?P<title>.*?)\b(?P<season>\d{1,2})x(?P<episode>\d{1,3})\b").unwrap()
});

/// `Season 1 Episode 2`
static VERBOSE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?P<title>.*?)\bseason\s*(?P<season>\d{1,3})[\s,\-]*episode\s*(?P<episode>\d{1,4})\b",
    )
    .unwrap()
});

static MULTI_SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static TRAILING_YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*[\(\[]?(?:19|20)\d{2}[\)\]]?$").unwrap());

/// Regex-based identifier for common scene and library naming schemes.
#[derive(Debug, Default, Clone, Copy)]
pub struct FilenameIdentifier;

impl EpisodeIdentifier for FilenameIdentifier {
    fn identify(&self, path: &Path) -> Option<EpisodeIdentity> {
        let stem = path.file_stem()?.to_string_lossy();
        let identity = parse_episode(&stem);
        trace!(file = %path.display(), ?identity, "Classified filename");
        identity
    }
}

pub fn parse_episode(stem: &str) -> Option<EpisodeIdentity> {
    let cleaned = stem.replace(['.', '_'], " ");

    [&*SXXEXX_RE, &*NXNN_RE, &*VERBOSE_RE]
        .iter()
        .find_map(|re| re.captures(&cleaned))
        .and_then(|caps| identity_from_captures(&caps))
}

fn identity_from_captures(caps: &Captures<'_>) -> Option<EpisodeIdentity> {
    let season = caps.name("season")?.as_str().parse().ok()?;
    let episode = caps.name("episode")?.as_str().parse().ok()?;
    let title = clean_title(caps.name("title").map_or("", |m| m.as_str()));

    Some(EpisodeIdentity {
        title,
        season,
        episode,
    })
}

fn clean_title(raw: &str) -> String {
    let collapsed = MULTI_SPACE_RE.replace_all(raw, " ");
    let title = trim_separators(&collapsed);

    // A bare year is a valid title ("1923"), only strip it as a suffix.
    let without_year = TRAILING_YEAR_RE.replace(title, "");
    let without_year = trim_separators(&without_year);
    if without_year.is_empty() {
        title.to_string()
    } else {
        without_year.to_string()
    }
}

fn trim_separators(s: &str) -> &str {
    s.trim_matches(|c: char| c.is_whitespace() || matches!(c, '-' | '[' | '('))
}
