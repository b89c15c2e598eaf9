use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, ErrorKind};
use std::path::Path;
use tracing::{debug, error, info, warn};

use super::error::PlacementError;
use super::resolver::resolve_episode_file;
use crate::config::{Config, SeasonFormat};
use crate::domain::models::PlacementOutcome;
use crate::infra::library::LibraryIndex;
use crate::media::identity::EpisodeIdentifier;
use crate::media::subtitles::is_subtitle_file;

pub type PlacementResult = Result<PlacementOutcome, PlacementError>;

/// Receives exactly one report per processed file.
pub trait PlacementReporter {
    fn report(&self, source: &Path, result: &PlacementResult);
}

/// Writes one human-readable log line per outcome.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl PlacementReporter for TracingReporter {
    fn report(&self, source: &Path, result: &PlacementResult) {
        let source = source.display();
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Failed to place {source}: {e}");
                return;
            }
        };

        if outcome.is_silent() {
            debug!("Ignoring {source}: {outcome:?}");
            return;
        }

        match outcome {
            PlacementOutcome::Placed { target, confidence } => {
                info!("Placed {source} -> {} [{confidence} match]", target.display());
            }
            PlacementOutcome::SkippedNotEpisode => {
                warn!("TV show not detected. Skipping file {source}");
            }
            PlacementOutcome::SkippedNoDirectory { title } => {
                error!("Target directory for show {title} not found. Ignoring subtitle {source}");
            }
            PlacementOutcome::SkippedAmbiguous { title, candidates } => {
                let candidates: Vec<_> =
                    candidates.iter().map(|c| c.display().to_string()).collect();
                warn!(
                    "Found multiple possible target dirs for show {title}: {}. \
                     Ignoring subtitle {source}",
                    candidates.join(", ")
                );
            }
            PlacementOutcome::SkippedSeasonMissing { path } => {
                error!(
                    "Season directory {} does not exist. Ignoring subtitle {source}",
                    path.display()
                );
            }
            PlacementOutcome::SkippedNotSubtitle | PlacementOutcome::SourceMissing => {}
        }
    }
}

/// Moves inbox subtitles into the library, one file at a time.
///
/// Holds no state between calls apart from its configuration, so calling
/// [`PlacementEngine::process_file`] again for a path that was already placed
/// is a silent no-op.
pub struct PlacementEngine {
    library: LibraryIndex,
    season_format: SeasonFormat,
    identifier: Box<dyn EpisodeIdentifier>,
    reporter: Box<dyn PlacementReporter>,
}

impl PlacementEngine {
    pub fn new(
        config: &Config,
        identifier: Box<dyn EpisodeIdentifier>,
        reporter: Box<dyn PlacementReporter>,
    ) -> Self {
        Self {
            library: LibraryIndex::new(config.library_dirs.clone()),
            season_format: config.season_format.clone(),
            identifier,
            reporter,
        }
    }

    pub fn process_file(&self, path: &Path) -> PlacementResult {
        let result = self.place(path);
        self.reporter.report(path, &result);
        result
    }

    fn place(&self, path: &Path) -> PlacementResult {
        if !is_subtitle_file(path) {
            return Ok(PlacementOutcome::SkippedNotSubtitle);
        }
        if !path.exists() {
            return Ok(PlacementOutcome::SourceMissing);
        }
        if !path.is_file() {
            return Ok(PlacementOutcome::SkippedNotSubtitle);
        }

        let Some(identity) = self
            .identifier
            .identify(path)
            .filter(|identity| !identity.title.trim().is_empty())
        else {
            return Ok(PlacementOutcome::SkippedNotEpisode);
        };
        debug!(
            "Got subtitle file {} for {} S{:02}E{:02}",
            path.display(),
            identity.title,
            identity.season,
            identity.episode
        );

        let show_dir = match self.library.find_show_directory(&identity.title) {
            Ok(dir) => dir,
            Err(skipped) => return Ok(skipped),
        };

        let season_dir = show_dir.join(self.season_format.render(identity.season));
        if !season_dir.is_dir() {
            return Ok(PlacementOutcome::SkippedSeasonMissing { path: season_dir });
        }

        let resolved = resolve_episode_file(self.identifier.as_ref(), &season_dir, &identity)?;
        let target = season_dir.join(subtitle_filename(&resolved.file_name, path));
        debug!(
            "Will create subtitle file {} [{} match]",
            target.display(),
            resolved.confidence
        );

        if let Err(source) = copy_file(path, &target) {
            if source.kind() == ErrorKind::NotFound && !path.exists() {
                return Ok(PlacementOutcome::SourceMissing);
            }
            return Err(PlacementError::Copy {
                from: path.to_path_buf(),
                to: target,
                source,
            });
        }

        match fs::remove_file(path) {
            Ok(()) => {}
            // Someone else removed it after our copy finished; the placement stands.
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(source) => {
                return Err(PlacementError::RemoveSource {
                    from: path.to_path_buf(),
                    to: target,
                    source,
                })
            }
        }

        Ok(PlacementOutcome::Placed {
            target,
            confidence: resolved.confidence,
        })
    }
}

/// Episode file stem with the subtitle's own extension.
fn subtitle_filename(episode_file_name: &str, subtitle: &Path) -> OsString {
    let episode = Path::new(episode_file_name);
    let mut name = OsString::from(episode.file_stem().unwrap_or(episode.as_os_str()));
    if let Some(ext) = subtitle.extension() {
        name.push(".");
        name.push(ext);
    }
    name
}

/// Stage the copy next to `to` and rename it into place, so the final name
/// only ever holds a complete file. The staged file is removed on failure.
fn copy_file(from: &Path, to: &Path) -> io::Result<()> {
    let dir = to.parent().unwrap_or(Path::new("."));
    let mut source = File::open(from)?;
    let permissions = source.metadata()?.permissions();

    let mut staged = tempfile::Builder::new()
        .prefix(".subtitle-sink-")
        .tempfile_in(dir)?;
    io::copy(&mut source, staged.as_file_mut())?;
    staged.as_file().sync_all()?;
    staged.as_file().set_permissions(permissions)?;
    staged.persist(to).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{EpisodeIdentity, MatchConfidence};
    use crate::media::identity::FilenameIdentifier;
    use std::cell::RefCell;
    use std::path::PathBuf;
    use std::rc::Rc;
    use tempfile::TempDir;

    #[derive(Clone, Default)]
    struct RecordingReporter {
        reports: Rc<RefCell<Vec<(PathBuf, Result<PlacementOutcome, String>)>>>,
    }

    impl PlacementReporter for RecordingReporter {
        fn report(&self, source: &Path, result: &PlacementResult) {
            let result = match result {
                Ok(outcome) => Ok(outcome.clone()),
                Err(e) => Err(e.to_string()),
            };
            self.reports
                .borrow_mut()
                .push((source.to_path_buf(), result));
        }
    }

    struct Fixture {
        _temp_dir: TempDir,
        inbox: PathBuf,
        library: PathBuf,
        reporter: RecordingReporter,
        engine: PlacementEngine,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with_season_format(SeasonFormat::default())
        }

        fn with_season_format(season_format: SeasonFormat) -> Self {
            let temp_dir = TempDir::new().unwrap();
            let inbox = temp_dir.path().join("inbox");
            let library = temp_dir.path().join("tv");
            fs::create_dir_all(&inbox).unwrap();
            fs::create_dir_all(&library).unwrap();

            let config = Config {
                source_dir: inbox.clone(),
                library_dirs: vec![library.clone()],
                season_format,
                log_file: None,
            };
            let reporter = RecordingReporter::default();
            let engine = PlacementEngine::new(
                &config,
                Box::new(FilenameIdentifier),
                Box::new(reporter.clone()),
            );

            Self {
                _temp_dir: temp_dir,
                inbox,
                library,
                reporter,
                engine,
            }
        }

        fn season(&self, show: &str, season: &str) -> PathBuf {
            let dir = self.library.join(show).join(season);
            fs::create_dir_all(&dir).unwrap();
            dir
        }

        fn subtitle(&self, name: &str, content: &str) -> PathBuf {
            let path = self.inbox.join(name);
            fs::write(&path, content).unwrap();
            path
        }

        fn entries(dir: &Path) -> Vec<String> {
            let mut names: Vec<String> = fs::read_dir(dir)
                .unwrap()
                .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
                .collect();
            names.sort();
            names
        }
    }

    #[test]
    fn test_subtitle_filename_swaps_extension() {
        assert_eq!(
            subtitle_filename("Show - S02E05.mkv", Path::new("/inbox/show.s02e05.srt")),
            OsString::from("Show - S02E05.srt")
        );
        assert_eq!(
            subtitle_filename("Mr. Robot - S01E01.mkv", Path::new("x.SBV")),
            OsString::from("Mr. Robot - S01E01.SBV")
        );
    }

    #[test]
    fn test_places_subtitle_next_to_exact_match() {
        let fx = Fixture::new();
        let season_dir = fx.season("Show", "Season 2");
        fs::write(season_dir.join("Show - S02E05.mkv"), "video").unwrap();
        let source = fx.subtitle("show.s02e05.srt", "1\n00:00:01,000 --> 00:00:02,000\nHi\n");

        let outcome = fx.engine.process_file(&source).unwrap();

        let target = season_dir.join("Show - S02E05.srt");
        assert_eq!(
            outcome,
            PlacementOutcome::Placed {
                target: target.clone(),
                confidence: MatchConfidence::Exact,
            }
        );
        assert!(!source.exists());
        assert_eq!(
            fs::read_to_string(&target).unwrap(),
            "1\n00:00:01,000 --> 00:00:02,000\nHi\n"
        );
        assert_eq!(
            Fixture::entries(&season_dir),
            vec!["Show - S02E05.mkv", "Show - S02E05.srt"]
        );
    }

    #[test]
    fn test_places_subtitle_with_fallback_name() {
        let fx = Fixture::new();
        let season_dir = fx.season("Show (2019)", "Season 3");
        let source = fx.subtitle("Show.S03E07.sub", "sub");

        let outcome = fx.engine.process_file(&source).unwrap();

        assert_eq!(
            outcome,
            PlacementOutcome::Placed {
                target: season_dir.join("Show - S03E07.sub"),
                confidence: MatchConfidence::Fallback,
            }
        );
        assert!(!source.exists());
    }

    #[test]
    fn test_custom_season_format() {
        let fx = Fixture::with_season_format(SeasonFormat::parse("S{nr:02}").unwrap());
        let season_dir = fx.season("Show", "S04");
        let source = fx.subtitle("Show 4x01.srt", "sub");

        let outcome = fx.engine.process_file(&source).unwrap();

        assert_eq!(
            outcome,
            PlacementOutcome::Placed {
                target: season_dir.join("Show - S04E01.srt"),
                confidence: MatchConfidence::Fallback,
            }
        );
    }

    #[test]
    fn test_not_episode_leaves_source() {
        let fx = Fixture::new();
        fx.season("Show", "Season 1");
        let untitled = fx.subtitle("S01E01.srt", "sub");
        let notes = fx.subtitle("notes.srt", "sub");

        assert_eq!(
            fx.engine.process_file(&notes).unwrap(),
            PlacementOutcome::SkippedNotEpisode
        );
        assert_eq!(
            fx.engine.process_file(&untitled).unwrap(),
            PlacementOutcome::SkippedNotEpisode
        );
        assert!(notes.exists());
        assert!(untitled.exists());
    }

    #[test]
    fn test_non_subtitle_is_ignored() {
        let fx = Fixture::new();
        fx.season("Show", "Season 1");
        let video = fx.subtitle("Show.S01E01.mkv", "video");

        assert_eq!(
            fx.engine.process_file(&video).unwrap(),
            PlacementOutcome::SkippedNotSubtitle
        );
        assert!(video.exists());
    }

    #[test]
    fn test_missing_and_ambiguous_directories_do_not_mutate() {
        let fx = Fixture::new();
        fx.season("Show (2005)", "Season 1");
        fx.season("Show (2019)", "Season 1");
        let ambiguous = fx.subtitle("Show.S01E01.srt", "sub");
        let unknown = fx.subtitle("Other.S01E01.srt", "sub");

        match fx.engine.process_file(&ambiguous).unwrap() {
            PlacementOutcome::SkippedAmbiguous { title, candidates } => {
                assert_eq!(title, "Show");
                assert_eq!(
                    candidates,
                    vec![fx.library.join("Show (2005)"), fx.library.join("Show (2019)")]
                );
            }
            other => panic!("expected ambiguous outcome, got {other:?}"),
        }
        assert_eq!(
            fx.engine.process_file(&unknown).unwrap(),
            PlacementOutcome::SkippedNoDirectory {
                title: "Other".to_string()
            }
        );

        assert!(ambiguous.exists());
        assert!(unknown.exists());
        assert!(Fixture::entries(&fx.library.join("Show (2005)").join("Season 1")).is_empty());
        assert!(Fixture::entries(&fx.library.join("Show (2019)").join("Season 1")).is_empty());
    }

    #[test]
    fn test_punctuation_only_title_is_not_placed() {
        let fx = Fixture::new();
        let season_dir = fx.season("Breaking Bad", "Season 1");
        fs::write(season_dir.join("Breaking Bad - S01E01.mkv"), "video").unwrap();
        let source = fx.subtitle("!!!.S01E01.srt", "sub");

        assert_eq!(
            fx.engine.process_file(&source).unwrap(),
            PlacementOutcome::SkippedNoDirectory {
                title: "!!!".to_string()
            }
        );
        assert!(source.exists());
        assert_eq!(
            Fixture::entries(&season_dir),
            vec!["Breaking Bad - S01E01.mkv"]
        );
    }

    #[test]
    fn test_season_missing() {
        let fx = Fixture::new();
        fx.season("Show", "Season 1");
        let source = fx.subtitle("Show.S02E01.srt", "sub");

        assert_eq!(
            fx.engine.process_file(&source).unwrap(),
            PlacementOutcome::SkippedSeasonMissing {
                path: fx.library.join("Show").join("Season 2")
            }
        );
        assert!(source.exists());
    }

    #[test]
    fn test_second_call_is_silent_no_op() {
        let fx = Fixture::new();
        fx.season("Show", "Season 1");
        let source = fx.subtitle("Show.S01E02.srt", "sub");

        assert!(matches!(
            fx.engine.process_file(&source).unwrap(),
            PlacementOutcome::Placed { .. }
        ));
        let second = fx.engine.process_file(&source).unwrap();
        assert_eq!(second, PlacementOutcome::SourceMissing);
        assert!(second.is_silent());

        let reports = fx.reporter.reports.borrow();
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|(path, _)| path == &source));
    }

    #[test]
    fn test_failed_copy_keeps_source() {
        let fx = Fixture::new();
        let season_dir = fx.season("Show", "Season 1");
        fs::write(season_dir.join("Show - S01E03.mkv"), "video").unwrap();
        // A directory squatting on the target name makes the final rename fail.
        fs::create_dir(season_dir.join("Show - S01E03.srt")).unwrap();
        let source = fx.subtitle("Show.S01E03.srt", "sub");

        let result = fx.engine.process_file(&source);

        assert!(matches!(result, Err(PlacementError::Copy { .. })));
        assert_eq!(fs::read_to_string(&source).unwrap(), "sub");
        assert_eq!(
            Fixture::entries(&season_dir),
            vec!["Show - S01E03.mkv", "Show - S01E03.srt"]
        );
        let reports = fx.reporter.reports.borrow();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].1.is_err());
    }

    struct BrokenIdentifier;

    impl EpisodeIdentifier for BrokenIdentifier {
        fn identify(&self, _path: &Path) -> Option<EpisodeIdentity> {
            Some(EpisodeIdentity {
                title: "   ".to_string(),
                season: 1,
                episode: 1,
            })
        }
    }

    #[test]
    fn test_blank_title_from_identifier_is_not_episode() {
        let fx = Fixture::new();
        fx.season("Show", "Season 1");
        let config = Config {
            source_dir: fx.inbox.clone(),
            library_dirs: vec![fx.library.clone()],
            season_format: SeasonFormat::default(),
            log_file: None,
        };
        let engine = PlacementEngine::new(
            &config,
            Box::new(BrokenIdentifier),
            Box::new(TracingReporter),
        );
        let source = fx.subtitle("Show.S01E01.srt", "sub");

        assert_eq!(
            engine.process_file(&source).unwrap(),
            PlacementOutcome::SkippedNotEpisode
        );
        assert!(source.exists());
    }
}
