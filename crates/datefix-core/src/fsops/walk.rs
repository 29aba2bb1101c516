use std::path::{Path, PathBuf};

use log::{debug, warn};
use walkdir::WalkDir;

use crate::error::ConfigError;

/// How far below the root directory to descend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recursion {
    Off,
    /// At most this many directory levels below the root (at least 1).
    Limited(usize),
    Unlimited,
}

impl Recursion {
    /// `depth` implies recursion.
    pub fn from_args(recurse: bool, depth: Option<usize>) -> Result<Self, ConfigError> {
        match depth {
            Some(0) => Err(ConfigError::InvalidDepth(0)),
            Some(n) => Ok(Self::Limited(n)),
            None if recurse => Ok(Self::Unlimited),
            None => Ok(Self::Off),
        }
    }
}

/// One directory's regular files, sorted by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryBatch {
    pub dir: PathBuf,
    pub files: Vec<String>,
}

/// Lazily visit `root` and, depending on `recursion`, its subdirectories.
///
/// Directories are visited depth first in name order. Unreadable directories
/// and names that are not valid UTF-8 are logged and skipped.
pub fn walk_directories(root: &Path, recursion: Recursion) -> impl Iterator<Item = DirectoryBatch> {
    // Files sit one level below the directory holding them. Siblings are
    // ordered files first, so a directory's files arrive before any of its
    // subdirectories.
    let walker = WalkDir::new(root).sort_by(|a, b| {
        (a.file_type().is_dir(), a.file_name()).cmp(&(b.file_type().is_dir(), b.file_name()))
    });
    let max_dir_depth = match recursion {
        Recursion::Off => Some(0),
        Recursion::Limited(levels) => Some(levels),
        Recursion::Unlimited => None,
    };
    let walker = match max_dir_depth {
        Some(depth) => walker.max_depth(depth + 1),
        None => walker,
    };

    Batches {
        entries: walker.into_iter(),
        max_dir_depth,
        current: None,
    }
}

struct Batches {
    entries: walkdir::IntoIter,
    max_dir_depth: Option<usize>,
    current: Option<DirectoryBatch>,
}

impl Batches {
    fn finish(&mut self, next: Option<DirectoryBatch>) -> Option<DirectoryBatch> {
        let mut done = std::mem::replace(&mut self.current, next)?;
        done.files.sort();
        debug!("{}: {} file(s)", done.dir.display(), done.files.len());
        Some(done)
    }
}

impl Iterator for Batches {
    type Item = DirectoryBatch;

    fn next(&mut self) -> Option<DirectoryBatch> {
        loop {
            let entry = match self.entries.next() {
                Some(Ok(entry)) => entry,
                Some(Err(e)) => {
                    warn!("Skipping unreadable directory: {}", e);
                    let current_dir = self.current.as_ref().map(|c| c.dir.as_path());
                    if current_dir.is_some() && e.path() == current_dir {
                        self.current = None;
                    }
                    continue;
                }
                None => return self.finish(None),
            };

            if entry.file_type().is_dir() {
                if self.max_dir_depth.is_some_and(|max| entry.depth() > max) {
                    continue;
                }
                let next = DirectoryBatch {
                    dir: entry.into_path(),
                    files: Vec::new(),
                };
                if let Some(done) = self.finish(Some(next)) {
                    return Some(done);
                }
                continue;
            }

            let Some(current) = self.current.as_mut() else {
                continue;
            };
            if !entry.path().is_file() {
                continue;
            }
            match entry.file_name().to_os_string().into_string() {
                Ok(name) => current.files.push(name),
                Err(name) => warn!("Skipping non UTF-8 file name {:?} in {}", name, current.dir.display()),
            }
        }
    }
}
