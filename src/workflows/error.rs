use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// I/O failure while placing a single file. The source is never removed when
/// one of these is returned, except for [`PlacementError::RemoveSource`]
/// where the copy already succeeded.
#[derive(Debug, Error)]
pub enum PlacementError {
    #[error("failed to read season directory {path}: {source}")]
    ReadSeasonDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("copied to {to} but failed to remove {from} from the inbox: {source}")]
    RemoveSource {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}
