use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::target::TargetFile;

/// Target paths claimed so far in one run. Only grows.
#[derive(Debug, Default)]
pub struct NameRegistry {
    claimed: HashSet<PathBuf>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.claimed.contains(path)
    }

    fn claim(&mut self, path: PathBuf) {
        self.claimed.insert(path);
    }
}

/// Pick a collision-free name for `target`, adjusting its deduplication id,
/// and claim it in `registry`. Returns the claimed path, or `None` if the
/// deduplication ids run out.
///
/// A candidate is rejected when another file already claimed it this run, or
/// when something other than the file itself already exists there. The first
/// rejection caused by the registry (or by the disk when no id is set yet)
/// restarts the id at 1; every later rejection increments it.
pub fn resolve(target: &mut TargetFile, registry: &mut NameRegistry, exists: impl Fn(&Path) -> bool) -> Option<PathBuf> {
    let original = target.original_path();
    let mut first = true;
    loop {
        let candidate = target.target_path();
        let claimed = registry.contains(&candidate);
        let occupied = candidate != original && exists(&candidate);
        if !claimed && !occupied {
            registry.claim(candidate.clone());
            return Some(candidate);
        }
        let next = match (first && claimed, target.deduplication_id()) {
            (true, _) | (false, None) => 1,
            (false, Some(id)) => id.checked_add(1)?,
        };
        target.set_deduplication_id(Some(next));
        first = false;
    }
}
