//! Recursive removal of obsolete target entries

use crate::progress::Tracker;
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;

/// Delete `entry` and, if it is a directory, everything below it.
///
/// Symlinks are removed, never followed. Children are deleted first; a child
/// that cannot be deleted aborts only its own branch and its siblings are
/// still attempted. The tracker's obsolete counter is bumped once for every
/// file or directory actually removed.
///
/// Returns the first error encountered. A directory with an undeletable
/// descendant is left in place.
pub fn recursive_delete(entry: &Path, tracker: &Tracker) -> io::Result<()> {
    let metadata = fs::symlink_metadata(entry)?;

    if metadata.is_dir() {
        let mut first_error: Option<io::Error> = None;
        for child in fs::read_dir(entry)? {
            let result = child.and_then(|child| recursive_delete(&child.path(), tracker));
            if let Err(e) = result {
                debug!("could not delete below {}: {}", entry.display(), e);
                first_error.get_or_insert(e);
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }
        fs::remove_dir(entry)?;
    } else {
        fs::remove_file(entry)?;
    }

    debug!("removed {}", entry.display());
    tracker.record_obsolete_removed();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_delete_single_file_counts_once() {
        let dir = TempDir::new().expect("tempdir");
        let file = dir.path().join("old.txt");
        fs::write(&file, b"stale").expect("write file");
        let tracker = Tracker::new(1);

        recursive_delete(&file, &tracker).expect("delete file");

        assert!(!file.exists());
        assert_eq!(tracker.obsolete_removed(), 1);
    }

    #[test]
    fn test_delete_tree_counts_every_entry() {
        let dir = TempDir::new().expect("tempdir");
        let root = dir.path().join("old");
        fs::create_dir_all(root.join("a/b")).expect("create tree");
        fs::write(root.join("one.txt"), b"1").expect("write");
        fs::write(root.join("a/two.txt"), b"2").expect("write");
        fs::write(root.join("a/b/three.txt"), b"3").expect("write");
        let tracker = Tracker::new(1);

        recursive_delete(&root, &tracker).expect("delete tree");

        assert!(!root.exists());
        // old, a, b + three files
        assert_eq!(tracker.obsolete_removed(), 6);
    }

    #[test]
    fn test_missing_entry_is_an_error() {
        let dir = TempDir::new().expect("tempdir");
        let tracker = Tracker::new(1);

        let err = recursive_delete(&dir.path().join("ghost"), &tracker).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert_eq!(tracker.obsolete_removed(), 0);
    }

    #[test]
    #[cfg(unix)]
    fn test_symlinked_directory_is_not_followed() {
        let dir = TempDir::new().expect("tempdir");
        let outside = dir.path().join("outside");
        fs::create_dir_all(&outside).expect("create outside");
        fs::write(outside.join("keep.txt"), b"keep").expect("write keep");
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&outside, &link).expect("create symlink");
        let tracker = Tracker::new(1);

        recursive_delete(&link, &tracker).expect("delete link");

        assert!(fs::symlink_metadata(&link).is_err());
        assert!(outside.join("keep.txt").exists());
        assert_eq!(tracker.obsolete_removed(), 1);
    }
}
