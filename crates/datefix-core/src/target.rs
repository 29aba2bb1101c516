use std::path::{Path, PathBuf};

use crate::date::{Detection, MatchSource};
use crate::moment::CaptureMoment;

/// Split a file name into stem and extension at the last `.`. The extension
/// keeps its dot and is empty when the name has none.
pub fn split_name(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(idx) => file_name.split_at(idx),
        None => (file_name, ""),
    }
}

/// A file being renamed: where it is, what was detected, and the stem it
/// should have. The new stem is derived and recomputed on every change.
#[derive(Debug, Clone)]
pub struct TargetFile {
    directory: PathBuf,
    original_stem: String,
    extension: String,
    capture: CaptureMoment,
    deduplication_id: Option<u64>,
    label: Option<String>,
    source: MatchSource,
    new_stem: String,
}

impl TargetFile {
    pub fn new(directory: &Path, original_stem: &str, extension: &str, detection: Detection) -> Self {
        let mut target = Self {
            directory: directory.to_path_buf(),
            original_stem: original_stem.to_string(),
            extension: extension.to_string(),
            capture: detection.capture,
            deduplication_id: detection.deduplication_id,
            label: detection.label,
            source: detection.source,
            new_stem: String::new(),
        };
        target.merge_name();
        target
    }

    pub fn capture(&self) -> CaptureMoment {
        self.capture
    }

    pub fn deduplication_id(&self) -> Option<u64> {
        self.deduplication_id
    }

    pub fn source(&self) -> MatchSource {
        self.source
    }

    pub fn new_stem(&self) -> &str {
        &self.new_stem
    }

    pub fn set_deduplication_id(&mut self, id: Option<u64>) {
        self.deduplication_id = id;
        self.merge_name();
    }

    pub fn original_path(&self) -> PathBuf {
        self.directory.join(format!("{}{}", self.original_stem, self.extension))
    }

    pub fn target_path(&self) -> PathBuf {
        self.directory.join(format!("{}{}", self.new_stem, self.extension))
    }

    pub fn rename_needed(&self) -> bool {
        self.original_stem != self.new_stem
    }

    fn merge_name(&mut self) {
        let mut name = self.capture.stem();
        if let Some(id) = self.deduplication_id {
            name.push_str(&format!("_{id}"));
        }
        if let Some(label) = &self.label {
            name.push('-');
            name.push_str(label);
        }
        self.new_stem = name;
    }
}
