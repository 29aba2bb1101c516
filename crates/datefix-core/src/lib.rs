pub mod date;
pub mod error;
pub mod fsops;
pub mod moment;
pub mod namer;
pub mod target;

use std::path::{Path, PathBuf};

use log::debug;
use serde::Serialize;

use date::exif::{ExifMetadata, MetadataReader};
use date::Detector;
use error::{ConfigError, MoveError, TimestampError};
use fsops::walk::{walk_directories, Recursion};
use fsops::{FileOps, LocalFs};
use namer::NameRegistry;
use target::{split_name, TargetFile};

pub use chrono_tz::Tz;
pub use moment::CaptureMoment;

/// Parse an IANA time zone name such as `Europe/London`.
pub fn parse_time_zone(name: &str) -> Result<Tz, ConfigError> {
    name.parse::<Tz>()
        .map_err(|_| ConfigError::InvalidTimeZone(name.to_string()))
}

#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// Directory to start in.
    pub root: PathBuf,
    /// Zone used for file names and for setting timestamps.
    pub time_zone: Tz,
    pub recursion: Recursion,
    /// Skip embedded metadata and go straight to file name patterns.
    pub skip_metadata: bool,
    /// Fall back to the file's modified time when nothing else matches.
    pub modified_fallback: bool,
    /// Resolve names but never rename or touch files.
    pub dry_run: bool,
}

impl ProcessOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            time_zone: Tz::UTC,
            recursion: Recursion::Off,
            skip_metadata: false,
            modified_fallback: false,
            dry_run: false,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.root.is_dir() {
            return Err(ConfigError::NotADirectory(self.root.clone()));
        }
        if self.recursion == Recursion::Limited(0) {
            return Err(ConfigError::InvalidDepth(0));
        }
        Ok(())
    }
}

/// What happened to one file.
#[derive(Debug)]
pub enum FileOutcome {
    Renamed { from: PathBuf, to: PathBuf },
    /// Dry run: the rename that would have happened.
    WouldRename { from: PathBuf, to: PathBuf },
    /// Name already canonical; timestamps were set.
    TimestampOnly(PathBuf),
    /// Dry run: name already canonical, nothing to do.
    Unchanged(PathBuf),
    /// No strategy could date the file; left untouched.
    SkippedNoPattern(PathBuf),
    MoveFailed { from: PathBuf, to: PathBuf, error: MoveError },
    /// Setting timestamps failed. `renamed_from` is set when the rename
    /// before it succeeded.
    TimestampFailed {
        path: PathBuf,
        renamed_from: Option<PathBuf>,
        error: TimestampError,
    },
}

/// Counters for a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub processed: u64,
    /// Files a detection strategy succeeded for.
    pub matched: u64,
    /// Files renamed (planned renames in a dry run).
    pub renamed: u64,
    pub failed: u64,
    pub dry_run: bool,
}

impl RunSummary {
    fn record(&mut self, outcome: &FileOutcome) {
        self.processed += 1;
        match outcome {
            FileOutcome::SkippedNoPattern(_) => return,
            FileOutcome::Renamed { .. } | FileOutcome::WouldRename { .. } => self.renamed += 1,
            FileOutcome::MoveFailed { .. } => self.failed += 1,
            FileOutcome::TimestampFailed { renamed_from, .. } => {
                if renamed_from.is_some() {
                    self.renamed += 1;
                }
                self.failed += 1;
            }
            FileOutcome::TimestampOnly(_) | FileOutcome::Unchanged(_) => {}
        }
        self.matched += 1;
    }
}

/// Callback invoked once per file, in processing order.
pub type OutcomeCallback<'a> = dyn Fn(&FileOutcome) + 'a;

/// Run over `options.root` using EXIF metadata and the local file system.
pub fn process(options: &ProcessOptions, on_outcome: &OutcomeCallback<'_>) -> anyhow::Result<RunSummary> {
    process_with(options, &ExifMetadata, &LocalFs, on_outcome)
}

/// Run with the given metadata and file system capabilities.
///
/// Files are handled one at a time, directory by directory, in sorted name
/// order. A failure on one file is reported and the run continues.
pub fn process_with(
    options: &ProcessOptions,
    metadata: &dyn MetadataReader,
    fs: &dyn FileOps,
    on_outcome: &OutcomeCallback<'_>,
) -> anyhow::Result<RunSummary> {
    options.validate()?;

    let metadata = (!options.skip_metadata).then_some(metadata);
    let detector = Detector::new(metadata, fs, options.time_zone, options.modified_fallback);
    let mut registry = NameRegistry::new();
    let mut summary = RunSummary {
        dry_run: options.dry_run,
        ..RunSummary::default()
    };

    for batch in walk_directories(&options.root, options.recursion) {
        for name in &batch.files {
            let outcome = process_file(&batch.dir, name, &detector, &mut registry, fs, options);
            summary.record(&outcome);
            on_outcome(&outcome);
        }
    }

    Ok(summary)
}

fn process_file(
    dir: &Path,
    name: &str,
    detector: &Detector,
    registry: &mut NameRegistry,
    fs: &dyn FileOps,
    options: &ProcessOptions,
) -> FileOutcome {
    let path = dir.join(name);
    debug!("{}", path.display());

    let (stem, extension) = split_name(name);
    let detection = match detector.detect(&path, stem) {
        Ok(detection) => detection,
        Err(_) => return FileOutcome::SkippedNoPattern(path),
    };

    let mut target = TargetFile::new(dir, stem, extension, detection);
    let Some(to) = namer::resolve(&mut target, registry, |p| fs.exists(p)) else {
        let to = target.target_path();
        return FileOutcome::MoveFailed {
            from: path,
            error: MoveError::NamesExhausted(to.clone()),
            to,
        };
    };
    debug!("  {:?} -> {}", target.source(), target.new_stem());
    let instant = target.capture().to_instant(options.time_zone);

    match (target.rename_needed(), options.dry_run) {
        (true, true) => FileOutcome::WouldRename { from: path, to },
        (false, true) => FileOutcome::Unchanged(path),
        (true, false) => {
            if let Err(error) = fs.rename(&path, &to) {
                return FileOutcome::MoveFailed { from: path, to, error };
            }
            match fs.set_timestamps(&to, instant) {
                Ok(()) => FileOutcome::Renamed { from: path, to },
                Err(error) => FileOutcome::TimestampFailed {
                    path: to,
                    renamed_from: Some(path),
                    error,
                },
            }
        }
        (false, false) => match fs.set_timestamps(&path, instant) {
            Ok(()) => FileOutcome::TimestampOnly(path),
            Err(error) => FileOutcome::TimestampFailed {
                path,
                renamed_from: None,
                error,
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::fs::{self, File};
    use std::io;
    use std::time::SystemTime;
    use tempfile::tempdir;

    /// Date taken per file name; everything else has no metadata.
    struct StubMetadata(HashMap<&'static str, &'static str>);

    impl StubMetadata {
        fn new(entries: &[(&'static str, &'static str)]) -> Self {
            Self(entries.iter().copied().collect())
        }
    }

    impl MetadataReader for StubMetadata {
        fn read_date_taken(&self, path: &Path) -> anyhow::Result<Option<String>> {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            Ok(self.0.get(name).map(|s| s.to_string()))
        }
    }

    /// Local file system that refuses to rename one file.
    struct FailingRename(&'static str);

    impl FileOps for FailingRename {
        fn exists(&self, path: &Path) -> bool {
            LocalFs.exists(path)
        }

        fn modified(&self, path: &Path) -> io::Result<SystemTime> {
            LocalFs.modified(path)
        }

        fn rename(&self, from: &Path, to: &Path) -> Result<(), MoveError> {
            if from.file_name().and_then(|n| n.to_str()) == Some(self.0) {
                return Err(io::Error::from(io::ErrorKind::PermissionDenied).into());
            }
            LocalFs.rename(from, to)
        }

        fn set_timestamps(&self, path: &Path, instant: DateTime<Utc>) -> Result<(), TimestampError> {
            LocalFs.set_timestamps(path, instant)
        }
    }

    /// Local file system where setting times is never permitted.
    struct LockedTimes;

    impl FileOps for LockedTimes {
        fn exists(&self, path: &Path) -> bool {
            LocalFs.exists(path)
        }

        fn modified(&self, path: &Path) -> io::Result<SystemTime> {
            LocalFs.modified(path)
        }

        fn rename(&self, from: &Path, to: &Path) -> Result<(), MoveError> {
            LocalFs.rename(from, to)
        }

        fn set_timestamps(&self, path: &Path, _instant: DateTime<Utc>) -> Result<(), TimestampError> {
            Err(TimestampError::PermissionDenied(path.to_path_buf()))
        }
    }

    fn touch(dir: &Path, names: &[&str]) {
        for name in names {
            File::create(dir.join(name)).unwrap();
        }
    }

    fn listing(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        names
    }

    fn run(options: &ProcessOptions, metadata: &dyn MetadataReader) -> (RunSummary, Vec<String>) {
        let log = RefCell::new(Vec::new());
        let summary = process_with(options, metadata, &LocalFs, &|o| log.borrow_mut().push(format!("{o:?}"))).unwrap();
        (summary, log.into_inner())
    }

    #[test]
    fn test_metadata_file_skips_past_existing_names() {
        let dir = tempdir().unwrap();
        touch(dir.path(), &["20210101_100000.jpg", "20210101_100000_1.jpg", "foo.jpg"]);
        let metadata = StubMetadata::new(&[("foo.jpg", "2021:01:01 10:00:00")]);

        let (summary, _) = run(&ProcessOptions::new(dir.path()), &metadata);

        assert_eq!(
            listing(dir.path()),
            vec!["20210101_100000.jpg", "20210101_100000_1.jpg", "20210101_100000_2.jpg"]
        );
        assert_eq!(
            summary,
            RunSummary {
                processed: 3,
                matched: 3,
                renamed: 1,
                failed: 0,
                dry_run: false,
            }
        );
    }

    #[test]
    fn test_identical_captures_in_sorted_order() {
        let dir = tempdir().unwrap();
        touch(dir.path(), &["c.jpg", "a.jpg", "b.jpg"]);
        let metadata = StubMetadata::new(&[
            ("a.jpg", "2021:01:01 10:00:00"),
            ("b.jpg", "2021:01:01 10:00:00"),
            ("c.jpg", "2021:01:01 10:00:00"),
        ]);

        let outcomes = RefCell::new(Vec::new());
        process_with(&ProcessOptions::new(dir.path()), &metadata, &LocalFs, &|o| {
            if let FileOutcome::Renamed { from, to } = o {
                outcomes.borrow_mut().push((
                    from.file_name().unwrap().to_string_lossy().into_owned(),
                    to.file_name().unwrap().to_string_lossy().into_owned(),
                ));
            }
        })
        .unwrap();

        assert_eq!(
            outcomes.into_inner(),
            vec![
                ("a.jpg".to_string(), "20210101_100000.jpg".to_string()),
                ("b.jpg".to_string(), "20210101_100000_1.jpg".to_string()),
                ("c.jpg".to_string(), "20210101_100000_2.jpg".to_string()),
            ]
        );
    }

    #[test]
    fn test_second_run_renames_nothing() {
        let dir = tempdir().unwrap();
        touch(dir.path(), &["IMG_20210815_120000.jpg", "IMG_20210815_120000-1.jpg", "Screenshot_20210815-120000.png"]);
        let metadata = StubMetadata::new(&[]);
        let options = ProcessOptions::new(dir.path());

        let (first, _) = run(&options, &metadata);
        assert_eq!(first.renamed, 3);
        let after_first = listing(dir.path());

        let (second, _) = run(&options, &metadata);
        assert_eq!(second.renamed, 0);
        assert_eq!(second.matched, 3);
        assert_eq!(listing(dir.path()), after_first);
    }

    #[test]
    fn test_dry_run_predicts_real_run() {
        let dir = tempdir().unwrap();
        touch(dir.path(), &["IMG_20210815_120000.jpg", "notes.txt"]);
        let before_mtime = fs::metadata(dir.path().join("IMG_20210815_120000.jpg")).unwrap().modified().unwrap();
        let metadata = StubMetadata::new(&[]);

        let mut options = ProcessOptions::new(dir.path());
        options.dry_run = true;
        let planned = RefCell::new(None);
        let summary = process_with(&options, &metadata, &LocalFs, &|o| {
            if let FileOutcome::WouldRename { to, .. } = o {
                *planned.borrow_mut() = Some(to.clone());
            }
        })
        .unwrap();

        assert!(summary.dry_run);
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.matched, 1);
        assert_eq!(summary.renamed, 1);
        assert_eq!(listing(dir.path()), vec!["IMG_20210815_120000.jpg", "notes.txt"]);
        let after_mtime = fs::metadata(dir.path().join("IMG_20210815_120000.jpg")).unwrap().modified().unwrap();
        assert_eq!(before_mtime, after_mtime);

        options.dry_run = false;
        run(&options, &metadata);
        let planned = planned.into_inner().unwrap();
        assert!(planned.exists());
        assert_eq!(planned.file_name().unwrap(), "20210815_120000.jpg");
    }

    #[test]
    fn test_unmatched_file_left_alone_unless_fallback() {
        let dir = tempdir().unwrap();
        touch(dir.path(), &["holiday.jpg"]);
        let metadata = StubMetadata::new(&[]);
        let mut options = ProcessOptions::new(dir.path());

        let (summary, log) = run(&options, &metadata);
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.matched, 0);
        assert!(log[0].starts_with("SkippedNoPattern"));
        assert_eq!(listing(dir.path()), vec!["holiday.jpg"]);

        let ft = filetime::FileTime::from_unix_time(1_610_753_400, 0);
        filetime::set_file_mtime(dir.path().join("holiday.jpg"), ft).unwrap();
        options.modified_fallback = true;
        let (summary, _) = run(&options, &metadata);
        assert_eq!(summary.matched, 1);
        assert_eq!(listing(dir.path()), vec!["20210115_233000.jpg"]);
    }

    #[test]
    fn test_timestamps_follow_time_zone() {
        let dir = tempdir().unwrap();
        touch(dir.path(), &["IMG_20210815_120000.jpg", "20210101_090000.jpg"]);
        let mut options = ProcessOptions::new(dir.path());
        options.time_zone = parse_time_zone("Europe/London").unwrap();

        let (summary, _) = run(&options, &StubMetadata::new(&[]));
        assert_eq!(summary.renamed, 1);

        let mtime = |name: &str| -> DateTime<Utc> { fs::metadata(dir.path().join(name)).unwrap().modified().unwrap().into() };
        assert_eq!(mtime("20210815_120000.jpg"), Utc.with_ymd_and_hms(2021, 8, 15, 11, 0, 0).unwrap());
        assert_eq!(mtime("20210101_090000.jpg"), Utc.with_ymd_and_hms(2021, 1, 1, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_skip_metadata() {
        let dir = tempdir().unwrap();
        touch(dir.path(), &["IMG_20210815_120000.jpg"]);
        let metadata = StubMetadata::new(&[("IMG_20210815_120000.jpg", "2000:01:01 00:00:00")]);
        let mut options = ProcessOptions::new(dir.path());
        options.skip_metadata = true;

        run(&options, &metadata);
        assert_eq!(listing(dir.path()), vec!["20210815_120000.jpg"]);
    }

    #[test]
    fn test_move_failure_does_not_stop_run() {
        let dir = tempdir().unwrap();
        touch(dir.path(), &["IMG_20210815_120000.jpg", "VID_20210815_120000.mp4", "download_20210815_120000.jpg"]);
        let outcomes = RefCell::new(Vec::new());
        let summary = process_with(
            &ProcessOptions::new(dir.path()),
            &StubMetadata::new(&[]),
            &FailingRename("IMG_20210815_120000.jpg"),
            &|o| outcomes.borrow_mut().push(format!("{o:?}")),
        )
        .unwrap();

        assert_eq!(summary.processed, 3);
        assert_eq!(summary.matched, 3);
        assert_eq!(summary.renamed, 2);
        assert_eq!(summary.failed, 1);
        assert!(outcomes.borrow()[0].starts_with("MoveFailed"));
        // The failed file's claim stands, so the next file takes the _1 name.
        assert_eq!(
            listing(dir.path()),
            vec!["20210815_120000.mp4", "20210815_120000_1.jpg", "IMG_20210815_120000.jpg"]
        );
    }

    #[test]
    fn test_recursive_dirs_do_not_collide() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        touch(dir.path(), &["IMG_20210815_120000.jpg", "sub/IMG_20210815_120000.jpg"]);
        let mut options = ProcessOptions::new(dir.path());
        options.recursion = Recursion::Unlimited;

        let (summary, _) = run(&options, &StubMetadata::new(&[]));
        assert_eq!(summary.renamed, 2);
        assert_eq!(listing(&dir.path().join("sub")), vec!["20210815_120000.jpg"]);
        assert!(dir.path().join("20210815_120000.jpg").exists());
    }

    #[test]
    fn test_invalid_configuration() {
        let dir = tempdir().unwrap();
        let missing = ProcessOptions::new(dir.path().join("nope"));
        assert!(matches!(missing.validate(), Err(ConfigError::NotADirectory(_))));

        let mut zero = ProcessOptions::new(dir.path());
        zero.recursion = Recursion::Limited(0);
        assert!(matches!(zero.validate(), Err(ConfigError::InvalidDepth(0))));
        assert!(process_with(&zero, &StubMetadata::new(&[]), &LocalFs, &|_| {}).is_err());

        assert!(matches!(parse_time_zone("Mars/Olympus"), Err(ConfigError::InvalidTimeZone(_))));
        assert_eq!(parse_time_zone("Etc/UTC").unwrap(), Tz::Etc__UTC);
    }

    #[test]
    fn test_timestamp_failures_are_counted() {
        let dir = tempdir().unwrap();
        touch(dir.path(), &["20210101_090000.jpg", "IMG_20210815_120000.jpg"]);
        let outcomes = RefCell::new(Vec::new());
        let summary = process_with(
            &ProcessOptions::new(dir.path()),
            &StubMetadata::new(&[]),
            &LockedTimes,
            &|o| {
                if let FileOutcome::TimestampFailed { path, renamed_from, error } = o {
                    assert!(matches!(error, TimestampError::PermissionDenied(_)));
                    outcomes.borrow_mut().push((
                        path.file_name().unwrap().to_string_lossy().into_owned(),
                        renamed_from.is_some(),
                    ));
                }
            },
        )
        .unwrap();

        assert_eq!(
            outcomes.into_inner(),
            vec![
                ("20210101_090000.jpg".to_string(), false),
                ("20210815_120000.jpg".to_string(), true),
            ]
        );
        assert_eq!(
            summary,
            RunSummary {
                processed: 2,
                matched: 2,
                renamed: 1,
                failed: 2,
                dry_run: false,
            }
        );
        // The rename stands even though its timestamps could not be set.
        assert_eq!(listing(dir.path()), vec!["20210101_090000.jpg", "20210815_120000.jpg"]);
    }

    #[test]
    fn test_dry_run_claims_names() {
        let dir = tempdir().unwrap();
        touch(dir.path(), &["IMG_20210815_120000.jpg", "download_20210815_120000.jpg"]);
        let metadata = StubMetadata::new(&[]);
        let mut options = ProcessOptions::new(dir.path());
        options.dry_run = true;

        let planned = RefCell::new(Vec::new());
        process_with(&options, &metadata, &LocalFs, &|o| {
            if let FileOutcome::WouldRename { to, .. } = o {
                planned.borrow_mut().push(to.file_name().unwrap().to_string_lossy().into_owned());
            }
        })
        .unwrap();
        let planned = planned.into_inner();
        assert_eq!(planned, vec!["20210815_120000.jpg", "20210815_120000_1.jpg"]);
        assert_eq!(listing(dir.path()), vec!["IMG_20210815_120000.jpg", "download_20210815_120000.jpg"]);

        options.dry_run = false;
        let (summary, _) = run(&options, &metadata);
        assert_eq!(summary.renamed, 2);
        assert_eq!(listing(dir.path()), planned);
    }

    #[test]
    fn test_summary_json() {
        let summary = RunSummary {
            processed: 4,
            matched: 3,
            renamed: 2,
            failed: 1,
            dry_run: false,
        };
        assert_eq!(
            serde_json::to_string(&summary).unwrap(),
            r#"{"processed":4,"matched":3,"renamed":2,"failed":1,"dry_run":false}"#
        );
    }
}
