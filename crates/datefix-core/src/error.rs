use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Invalid run configuration. Fatal: raised before any file is touched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid time zone '{0}', must be in Region/City format, e.g. Europe/London")]
    InvalidTimeZone(String),
    #[error("invalid number of recursion levels ({0}), must be at least 1")]
    InvalidDepth(usize),
    #[error("invalid path '{}', must be an existing directory", .0.display())]
    NotADirectory(PathBuf),
}

/// No detection strategy produced a capture time. The file is skipped.
#[derive(Debug, Error)]
#[error("failed to detect timestamp for {}", path.display())]
pub struct DetectionFailure {
    pub path: PathBuf,
}

#[derive(Debug, Error)]
pub enum MoveError {
    #[error("target {} already exists", .0.display())]
    TargetExists(PathBuf),
    #[error("no free deduplication id left for {}", .0.display())]
    NamesExhausted(PathBuf),
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum TimestampError {
    #[error("{} no longer exists", .0.display())]
    NotFound(PathBuf),
    #[error("permission denied setting times on {}", .0.display())]
    PermissionDenied(PathBuf),
    #[error("failed to set times on {}: {source}", path.display())]
    Other { path: PathBuf, source: io::Error },
}

impl TimestampError {
    pub fn from_io(path: PathBuf, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path),
            _ => Self::Other { path, source: err },
        }
    }
}
