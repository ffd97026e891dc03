//! Recursive source walker (the producer side of a mirror run)
//!
//! Runs on a single dedicated thread. For every source entry it decides
//! between skip, no-op, copy and replace, creates target directories eagerly,
//! pushes file copies onto the shared [`CopyQueue`], and reaps obsolete target
//! entries once a directory's children have all been visited.

use super::mapper::{distinct_roots, ensure_dir, prepare_mirror_root};
use super::skip::SkipRules;
use crate::config::Config;
use crate::executor::{panic_message, recursive_delete, CopyQueue};
use crate::progress::Tracker;
use crate::types::{CopyTask, Failure, FailureReason};
use filetime::FileTime;
use std::collections::HashSet;
use std::fs::{self, Metadata};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, trace};

/// Target paths that must survive obsolete reaping.
///
/// When obsolete removal is disabled the registry stays empty and is never
/// consulted.
#[derive(Debug, Default)]
pub struct ShouldExist {
    enabled: bool,
    paths: HashSet<PathBuf>,
}

impl ShouldExist {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            paths: HashSet::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn insert(&mut self, path: &Path) {
        if self.enabled {
            self.paths.insert(path.to_path_buf());
        }
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }
}

/// What currently occupies a target path. Symlinks are not followed.
enum TargetKind {
    Missing,
    File(Metadata),
    Dir,
    /// Symlink, socket, FIFO or device
    Other,
}

fn target_kind(target: &Path) -> TargetKind {
    match fs::symlink_metadata(target) {
        Err(_) => TargetKind::Missing,
        Ok(m) if m.is_dir() => TargetKind::Dir,
        Ok(m) if m.is_file() => TargetKind::File(m),
        Ok(_) => TargetKind::Other,
    }
}

/// Modification time in whole milliseconds since the epoch.
fn mtime_millis(metadata: &Metadata) -> i128 {
    let mtime = FileTime::from_last_modification_time(metadata);
    i128::from(mtime.unix_seconds()) * 1000 + i128::from(mtime.nanoseconds() / 1_000_000)
}

/// Same length, and mtimes no more than `leniency_ms` apart (inclusive).
fn is_up_to_date(source: &Metadata, target: &Metadata, leniency_ms: u64) -> bool {
    source.len() == target.len()
        && (mtime_millis(source) - mtime_millis(target)).abs() <= i128::from(leniency_ms)
}

/// The scanning half of an engine run.
pub struct Scanner {
    config: Config,
    rules: SkipRules,
    queue: Arc<CopyQueue>,
    tracker: Arc<Tracker>,
    stop: Arc<AtomicBool>,
}

impl Scanner {
    pub fn new(
        config: Config,
        queue: Arc<CopyQueue>,
        tracker: Arc<Tracker>,
        stop: Arc<AtomicBool>,
    ) -> Self {
        let rules = SkipRules::from_config(&config);
        Self {
            config,
            rules,
            queue,
            tracker,
            stop,
        }
    }

    /// Walk every source root, then close the queue.
    ///
    /// A panic anywhere in the traversal is recorded as
    /// `UnexpectedScanError`. Whatever happens, the tracker's scanning
    /// flag is set and the queue is closed before this returns, so workers
    /// always get to drain and exit.
    pub fn run(self) {
        let start_time = Instant::now();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.scan_all()));
        if let Err(payload) = outcome {
            self.tracker.record_failure(
                Failure::bare(FailureReason::UnexpectedScanError)
                    .with_cause(panic_message(payload.as_ref())),
            );
        }

        self.tracker.mark_scanning_finished();
        self.queue.close();

        info!(
            "scan finished in {:?}: {} files scanned, {} copies still queued",
            start_time.elapsed(),
            self.tracker.files_scanned(),
            self.queue.len()
        );
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    fn scan_all(&self) {
        let mut should_exist = ShouldExist::new(self.config.remove_obsolete);
        should_exist.insert(&self.config.target);

        // Map every root before visiting any, so the ancestry of a later root
        // is registered before an earlier root's reaping could remove it.
        let mut roots: Vec<(PathBuf, PathBuf)> = Vec::new();
        for source in distinct_roots(&self.config.sources) {
            match prepare_mirror_root(
                &source,
                &self.config.target,
                self.config.virtual_root.as_deref(),
                &mut should_exist,
            ) {
                Ok(mirror) => {
                    debug!("mirroring {} -> {}", source.display(), mirror.display());
                    roots.push((source, mirror));
                }
                Err(failure) => self.fail(failure),
            }
        }

        for (source, mirror) in &roots {
            if self.stopped() {
                break;
            }
            self.visit(source, mirror, &mut should_exist);
        }
    }

    fn visit(&self, source: &Path, target: &Path, should_exist: &mut ShouldExist) {
        if self.stopped() {
            return;
        }
        if self.rules.is_skipped(source) {
            trace!("skipping {}", source.display());
            return;
        }

        should_exist.insert(target);

        let metadata = match fs::metadata(source) {
            Ok(m) => m,
            Err(e) => {
                self.fail(Failure::io(FailureReason::SourceMissing, source, &e));
                return;
            }
        };

        if metadata.is_dir() {
            self.visit_dir(source, target, should_exist);
        } else if metadata.is_file() {
            self.visit_file(source, &metadata, target);
        } else {
            debug!("ignoring special file {}", source.display());
        }
    }

    fn visit_dir(&self, source: &Path, target: &Path, should_exist: &mut ShouldExist) {
        if let Err(failure) = ensure_dir(target) {
            self.fail(failure);
            return;
        }

        if is_symlink_loop(source) {
            self.fail(
                Failure::new(FailureReason::SourceUnlistable, source)
                    .with_cause("symlink points at one of its own ancestors"),
            );
            return;
        }

        self.tracker.set_current_scan_dir(source);

        let mut children = match fs::read_dir(source).and_then(|it| it.collect::<Result<Vec<_>, _>>())
        {
            Ok(children) => children,
            Err(e) => {
                self.fail(Failure::io(FailureReason::SourceUnlistable, source, &e));
                return;
            }
        };
        children.sort_by_key(|entry| entry.file_name());

        for child in &children {
            self.visit(&child.path(), &target.join(child.file_name()), should_exist);
        }

        // A stop mid-way leaves some children unregistered; reaping now
        // would delete their mirrors.
        if should_exist.is_enabled() && !self.stopped() {
            self.reap_obsolete(target, should_exist);
        }
    }

    fn visit_file(&self, source: &Path, metadata: &Metadata, target: &Path) {
        self.tracker.record_scanned();

        match target_kind(target) {
            TargetKind::File(existing)
                if is_up_to_date(metadata, &existing, self.config.timestamp_leniency_ms) =>
            {
                trace!("up to date: {}", target.display());
                return;
            }
            TargetKind::Dir => {
                debug!("replacing directory {} with a file", target.display());
                if let Err(e) = recursive_delete(target, &self.tracker) {
                    self.fail(Failure::io(FailureReason::TargetConflict, target, &e));
                    return;
                }
            }
            TargetKind::Other => {
                if let Err(e) = fs::remove_file(target) {
                    self.fail(Failure::io(FailureReason::TargetConflict, target, &e));
                    return;
                }
            }
            TargetKind::File(_) | TargetKind::Missing => {}
        }

        let task = CopyTask::new(source.to_path_buf(), target.to_path_buf());
        if !self.queue.push(task) {
            debug!("queue closed, dropping {}", source.display());
        }
    }

    /// Remove every child of `target` that no visited source registered.
    fn reap_obsolete(&self, target: &Path, should_exist: &ShouldExist) {
        let entries = match fs::read_dir(target) {
            Ok(entries) => entries,
            Err(e) => {
                self.fail(Failure::io(FailureReason::ObsoleteDeleteFailure, target, &e));
                return;
            }
        };

        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    self.fail(Failure::io(FailureReason::ObsoleteDeleteFailure, target, &e));
                    continue;
                }
            };
            if should_exist.contains(&path) {
                continue;
            }
            debug!("removing obsolete {}", path.display());
            if let Err(e) = recursive_delete(&path, &self.tracker) {
                self.fail(Failure::io(FailureReason::ObsoleteDeleteFailure, &path, &e));
            }
        }
    }

    fn fail(&self, failure: Failure) {
        self.tracker.record_failure(failure);
    }
}

/// A symlinked directory whose target is one of the link's own ancestors
/// would recurse forever.
fn is_symlink_loop(source: &Path) -> bool {
    let is_link = fs::symlink_metadata(source)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false);
    if !is_link {
        return false;
    }

    match (
        fs::canonicalize(source),
        source.parent().map(fs::canonicalize),
    ) {
        (Ok(resolved), Some(Ok(parent))) => parent.starts_with(resolved),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};
    use tempfile::TempDir;

    fn set_mtime_ms(path: &Path, millis: u64) {
        let time = UNIX_EPOCH + Duration::from_millis(millis);
        filetime::set_file_mtime(path, FileTime::from_system_time(time)).expect("set mtime");
    }

    #[test]
    fn test_up_to_date_leniency_is_inclusive() {
        let dir = TempDir::new().expect("tempdir");
        let src = dir.path().join("a");
        let dst = dir.path().join("b");
        fs::write(&src, b"same").expect("write src");
        fs::write(&dst, b"same").expect("write dst");

        set_mtime_ms(&src, 1_600_000_000_000);
        set_mtime_ms(&dst, 1_600_000_000_010);
        let (s, d) = (fs::metadata(&src).unwrap(), fs::metadata(&dst).unwrap());
        assert!(is_up_to_date(&s, &d, 10));
        assert!(!is_up_to_date(&s, &d, 9));
        // symmetric
        assert!(is_up_to_date(&d, &s, 10));
    }

    #[test]
    fn test_size_mismatch_is_not_up_to_date() {
        let dir = TempDir::new().expect("tempdir");
        let src = dir.path().join("a");
        let dst = dir.path().join("b");
        fs::write(&src, b"longer").expect("write src");
        fs::write(&dst, b"short").expect("write dst");
        set_mtime_ms(&src, 1_600_000_000_000);
        set_mtime_ms(&dst, 1_600_000_000_000);

        let (s, d) = (fs::metadata(&src).unwrap(), fs::metadata(&dst).unwrap());
        assert!(!is_up_to_date(&s, &d, 1_000));
    }

    #[test]
    fn test_should_exist_disabled_ignores_inserts() {
        let mut registry = ShouldExist::new(false);
        registry.insert(Path::new("/backup/a"));
        assert!(!registry.contains(Path::new("/backup/a")));

        let mut registry = ShouldExist::new(true);
        registry.insert(Path::new("/backup/a"));
        assert!(registry.contains(Path::new("/backup/a")));
    }

    #[test]
    #[cfg(unix)]
    fn test_symlink_loop_detection() {
        let dir = TempDir::new().expect("tempdir");
        let inner = dir.path().join("a/b");
        fs::create_dir_all(&inner).expect("create dirs");
        let looped = inner.join("loop");
        std::os::unix::fs::symlink(dir.path().join("a"), &looped).expect("symlink");
        let sideways = inner.join("side");
        fs::create_dir_all(dir.path().join("other")).expect("create other");
        std::os::unix::fs::symlink(dir.path().join("other"), &sideways).expect("symlink");

        assert!(is_symlink_loop(&looped));
        assert!(!is_symlink_loop(&sideways));
        assert!(!is_symlink_loop(&inner));
    }

    #[test]
    fn test_scanner_closes_queue_and_flags_finished() {
        let dir = TempDir::new().expect("tempdir");
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        fs::create_dir_all(src.join("sub")).expect("create src");
        fs::create_dir_all(&dst).expect("create dst");
        fs::write(src.join("one.txt"), b"1").expect("write");
        fs::write(src.join("sub/two.txt"), b"2").expect("write");

        let config = Config {
            sources: vec![src.clone()],
            target: dst.clone(),
            virtual_root: Some(dir.path().to_path_buf()),
            ..Config::default()
        };
        let queue = Arc::new(CopyQueue::new());
        let tracker = Arc::new(Tracker::new(1));
        Scanner::new(
            config,
            Arc::clone(&queue),
            Arc::clone(&tracker),
            Arc::new(AtomicBool::new(false)),
        )
        .run();

        assert!(tracker.scanning_finished());
        assert!(queue.is_closed());
        assert_eq!(tracker.files_scanned(), 2);
        assert!(dst.join("src/sub").is_dir());

        // Listing order: one.txt before sub/two.txt
        let first = queue.pop().expect("first task");
        let second = queue.pop().expect("second task");
        assert_eq!(first.target(), dst.join("src/one.txt"));
        assert_eq!(second.target(), dst.join("src/sub/two.txt"));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn test_stop_before_scan_does_nothing() {
        let dir = TempDir::new().expect("tempdir");
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        fs::create_dir_all(&src).expect("create src");
        fs::create_dir_all(&dst).expect("create dst");
        fs::write(src.join("one.txt"), b"1").expect("write");
        fs::write(dst.join("keep.txt"), b"k").expect("write");

        let config = Config {
            sources: vec![src],
            target: dst.clone(),
            virtual_root: Some(dir.path().to_path_buf()),
            ..Config::default()
        };
        let queue = Arc::new(CopyQueue::new());
        let tracker = Arc::new(Tracker::new(1));
        Scanner::new(
            config,
            Arc::clone(&queue),
            Arc::clone(&tracker),
            Arc::new(AtomicBool::new(true)),
        )
        .run();

        assert!(tracker.scanning_finished());
        assert_eq!(tracker.files_scanned(), 0);
        assert!(queue.is_empty());
        assert!(dst.join("keep.txt").exists());
    }
}
