use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_SEASON_FORMAT: &str = "Season {nr}";
const SYSTEM_CONFIG_PATH: &str = "/etc/subtitle-sink.cfg";

/// `{nr}`, `{nr:02}`, `{nr:02d}`, `{nr:2}`
static SEASON_PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{nr(?::(?P<zero>0)?(?P<width>\d*)d?)?\}").unwrap());

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config file")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config: missing section Default")]
    MissingSection,
    #[error("Invalid config: missing key SourceDir")]
    MissingSourceDir,
    #[error("Invalid config: missing csv key TVDirs")]
    MissingTvDirs,
    #[error("Invalid config: none of the configured TVDirs exist")]
    NoLibraryDirs,
    #[error("Invalid config: SeasonFormat {0:?} may only contain {{nr}} placeholders")]
    InvalidSeasonFormat(String),
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(rename = "Default")]
    default: Option<DefaultSection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DefaultSection {
    source_dir: Option<PathBuf>,
    #[serde(rename = "TVDirs")]
    tv_dirs: Option<DirList>,
    season_format: Option<String>,
    log_file: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DirList {
    Csv(String),
    List(Vec<String>),
}

impl DirList {
    fn entries(&self) -> Vec<PathBuf> {
        let raw: Vec<&str> = match self {
            DirList::Csv(csv) => csv.split(',').collect(),
            DirList::List(list) => list.iter().map(String::as_str).collect(),
        };
        raw.into_iter()
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(PathBuf::from)
            .collect()
    }
}

/// Folder name template for a season, e.g. `Season {nr}` or `S{nr:02}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonFormat(String);

impl SeasonFormat {
    pub fn parse(template: &str) -> Result<Self, ConfigError> {
        let leftover = SEASON_PLACEHOLDER_RE.replace_all(template, "");
        if leftover.contains(['{', '}']) {
            return Err(ConfigError::InvalidSeasonFormat(template.to_string()));
        }
        if leftover.len() == template.len() {
            warn!(
                "SeasonFormat {template:?} has no {{nr}} placeholder; \
                 every season maps to the same folder"
            );
        }
        Ok(Self(template.to_string()))
    }

    pub fn render(&self, season: u32) -> String {
        SEASON_PLACEHOLDER_RE
            .replace_all(&self.0, |caps: &Captures<'_>| {
                let width = caps
                    .name("width")
                    .and_then(|w| w.as_str().parse::<usize>().ok())
                    .unwrap_or(0);
                if caps.name("zero").is_some() {
                    format!("{season:0width$}")
                } else {
                    format!("{season:>width$}")
                }
            })
            .into_owned()
    }
}

impl Default for SeasonFormat {
    fn default() -> Self {
        Self(DEFAULT_SEASON_FORMAT.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub source_dir: PathBuf,
    pub library_dirs: Vec<PathBuf>,
    pub season_format: SeasonFormat,
    pub log_file: Option<PathBuf>,
}

/// Parsed but not yet validated config file.
///
/// Split from [`Config`] so logging can be pointed at `LogFile` before the
/// library directories are checked and their warnings emitted.
#[derive(Debug)]
pub struct RawConfig {
    section: Option<DefaultSection>,
}

impl RawConfig {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content)?;
        Ok(Self {
            section: file.default,
        })
    }

    pub fn log_file(&self) -> Option<&Path> {
        self.section
            .as_ref()
            .and_then(|s| s.log_file.as_deref())
            .filter(|p| !p.as_os_str().is_empty())
    }

    pub fn validate(self) -> Result<Config, ConfigError> {
        let section = self.section.ok_or(ConfigError::MissingSection)?;

        let source_dir = section
            .source_dir
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or(ConfigError::MissingSourceDir)?;

        let tv_dirs = section
            .tv_dirs
            .map(|dirs| dirs.entries())
            .filter(|dirs| !dirs.is_empty())
            .ok_or(ConfigError::MissingTvDirs)?;

        let mut library_dirs: Vec<PathBuf> = Vec::new();
        for tv_dir in tv_dirs {
            if !tv_dir.exists() {
                warn!("TV Dir {} does not exist. Ignoring", tv_dir.display());
                continue;
            }
            if !library_dirs.contains(&tv_dir) {
                library_dirs.push(tv_dir);
            }
        }

        if library_dirs.is_empty() {
            return Err(ConfigError::NoLibraryDirs);
        }

        let season_format = match section.season_format.as_deref() {
            Some(template) if !template.is_empty() => SeasonFormat::parse(template)?,
            _ => SeasonFormat::default(),
        };

        Ok(Config {
            source_dir,
            library_dirs,
            season_format,
            log_file: section.log_file.filter(|p| !p.as_os_str().is_empty()),
        })
    }
}

/// Pick the config file: explicit path, then the system-wide file, then the
/// per-user config directory.
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    let system = PathBuf::from(SYSTEM_CONFIG_PATH);
    if system.exists() {
        return system;
    }

    get_config_dir_path().join("config.toml")
}

fn get_config_dir_path() -> PathBuf {
    xdir::config()
        .map(|path| path.join("subtitle-sink"))
        // If the standard path could not be found (e.g.`$HOME` is not set),
        // default to the current directory.
        .unwrap_or_default()
}
