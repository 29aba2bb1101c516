pub mod exif;
pub mod pattern;

use std::path::Path;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use log::{debug, warn};

use crate::error::DetectionFailure;
use crate::fsops::FileOps;
use crate::moment::CaptureMoment;
use self::exif::MetadataReader;

/// Which strategy produced a detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchSource {
    Metadata,
    /// Name of the file name pattern that matched.
    Filename(&'static str),
    Modified,
}

/// Result of a successful detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub capture: CaptureMoment,
    pub deduplication_id: Option<u64>,
    pub label: Option<String>,
    pub source: MatchSource,
}

/// Runs the detection strategies in priority order: embedded metadata, file
/// name patterns, then (if enabled) the file's modification time.
pub struct Detector<'a> {
    metadata: Option<&'a dyn MetadataReader>,
    fs: &'a dyn FileOps,
    time_zone: Tz,
    modified_fallback: bool,
}

impl<'a> Detector<'a> {
    /// `metadata` is `None` when embedded metadata should be skipped.
    pub fn new(
        metadata: Option<&'a dyn MetadataReader>,
        fs: &'a dyn FileOps,
        time_zone: Tz,
        modified_fallback: bool,
    ) -> Self {
        Self {
            metadata,
            fs,
            time_zone,
            modified_fallback,
        }
    }

    /// Detect the capture time of the file at `path`, whose name without
    /// extension is `stem`.
    pub fn detect(&self, path: &Path, stem: &str) -> Result<Detection, DetectionFailure> {
        if let Some(detection) = self.from_metadata(path) {
            return Ok(detection);
        }
        if let Some(detection) = pattern::match_filename(stem) {
            return Ok(detection);
        }
        if self.modified_fallback {
            if let Some(detection) = self.from_modified(path) {
                return Ok(detection);
            }
        }
        Err(DetectionFailure {
            path: path.to_path_buf(),
        })
    }

    fn from_metadata(&self, path: &Path) -> Option<Detection> {
        let reader = self.metadata?;
        let raw = match reader.read_date_taken(path) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                debug!("  No EXIF data: {:#}", e);
                return None;
            }
        };
        let Some(capture) = CaptureMoment::parse_date_taken(&raw) else {
            debug!("  Ignoring unparseable EXIF date taken {:?}", raw);
            return None;
        };
        debug!("  Using EXIF Date Taken");
        Some(Detection {
            capture,
            deduplication_id: None,
            label: None,
            source: MatchSource::Metadata,
        })
    }

    fn from_modified(&self, path: &Path) -> Option<Detection> {
        let modified = match self.fs.modified(path) {
            Ok(t) => t,
            Err(e) => {
                warn!("Cannot read modified time of {}: {}", path.display(), e);
                return None;
            }
        };
        warn!("Falling back to Modified time for {}", path.display());
        let instant: DateTime<Utc> = modified.into();
        Some(Detection {
            capture: CaptureMoment::from_instant(instant, self.time_zone),
            deduplication_id: None,
            label: None,
            source: MatchSource::Modified,
        })
    }
}
