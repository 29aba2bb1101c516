pub mod walk;

use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use filetime::FileTime;

use crate::error::{MoveError, TimestampError};

/// File system capabilities the pipeline needs.
pub trait FileOps {
    /// Whether anything occupies `path`.
    fn exists(&self, path: &Path) -> bool;

    fn modified(&self, path: &Path) -> io::Result<SystemTime>;

    /// Rename `from` to `to`. Never replaces an existing `to`.
    fn rename(&self, from: &Path, to: &Path) -> Result<(), MoveError>;

    /// Set both access and modification time of `path` to `instant`.
    fn set_timestamps(&self, path: &Path, instant: DateTime<Utc>) -> Result<(), TimestampError>;
}

/// The real file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

impl FileOps for LocalFs {
    fn exists(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok()
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        fs::metadata(path)?.modified()
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), MoveError> {
        if self.exists(to) {
            return Err(MoveError::TargetExists(to.to_path_buf()));
        }
        fs::rename(from, to)?;
        Ok(())
    }

    fn set_timestamps(&self, path: &Path, instant: DateTime<Utc>) -> Result<(), TimestampError> {
        let ft = FileTime::from_unix_time(instant.timestamp(), instant.timestamp_subsec_nanos());
        filetime::set_file_times(path, ft, ft).map_err(|e| TimestampError::from_io(path.to_path_buf(), e))
    }
}
