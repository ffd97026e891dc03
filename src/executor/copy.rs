//! Streaming file copy with modification-time preservation

use crate::types::{Failure, FailureReason};
use filetime::FileTime;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Size of each chunk streamed from source to target.
pub const COPY_CHUNK_SIZE: usize = 64 * 1024;

/// Copy `src` to `dest`, then stamp `dest` with `src`'s modification time.
///
/// The target's parent directory must already exist; the scanner creates
/// mirror directories before it enqueues any file below them. There is no
/// rollback: a copy that fails midway may leave a truncated target behind,
/// which the next run will see as out of date and copy again.
///
/// # Returns
/// * `Ok(u64)` - Number of bytes streamed
/// * `Err(Failure)` - `CopySourceUnreadable`, `CopyTargetUnwritable` or
///   `CopyIoError`, carrying the offending path and io error
pub fn copy_file(src: &Path, dest: &Path) -> Result<u64, Failure> {
    let src_file = File::open(src)
        .map_err(|e| Failure::io(FailureReason::CopySourceUnreadable, src, &e))?;
    let dest_file = File::create(dest)
        .map_err(|e| Failure::io(FailureReason::CopyTargetUnwritable, dest, &e))?;

    let mut reader = BufReader::with_capacity(COPY_CHUNK_SIZE, src_file);
    let mut writer = BufWriter::with_capacity(COPY_CHUNK_SIZE, dest_file);
    let mut buffer = vec![0u8; COPY_CHUNK_SIZE];
    let mut total_bytes = 0u64;

    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .map_err(|e| Failure::io(FailureReason::CopyIoError, src, &e))?;

        if bytes_read == 0 {
            break; // EOF
        }

        writer
            .write_all(&buffer[..bytes_read])
            .map_err(|e| Failure::io(FailureReason::CopyIoError, dest, &e))?;
        total_bytes += bytes_read as u64;
    }

    writer
        .flush()
        .map_err(|e| Failure::io(FailureReason::CopyIoError, dest, &e))?;
    drop(writer);

    let src_metadata =
        fs::metadata(src).map_err(|e| Failure::io(FailureReason::CopyIoError, src, &e))?;
    let mtime = FileTime::from_last_modification_time(&src_metadata);
    filetime::set_file_mtime(dest, mtime)
        .map_err(|e| Failure::io(FailureReason::CopyIoError, dest, &e))?;

    Ok(total_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_copy_multi_chunk_file() {
        let dir = TempDir::new().expect("tempdir");
        let src = dir.path().join("big.bin");
        let dest = dir.path().join("big.copy");
        let content: Vec<u8> = (0..(COPY_CHUNK_SIZE * 3 + 17))
            .map(|i| (i % 251) as u8)
            .collect();
        fs::write(&src, &content).expect("write source");

        let bytes = copy_file(&src, &dest).expect("copy should succeed");

        assert_eq!(bytes, content.len() as u64);
        assert_eq!(fs::read(&dest).expect("read copy"), content);
    }

    #[test]
    fn test_missing_source_is_unreadable() {
        let dir = TempDir::new().expect("tempdir");
        let failure = copy_file(&dir.path().join("nope"), &dir.path().join("out")).unwrap_err();

        assert_eq!(failure.reason, FailureReason::CopySourceUnreadable);
        assert_eq!(failure.path.as_deref(), Some(dir.path().join("nope").as_path()));
        assert!(failure.cause.is_some());
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_missing_parent_is_unwritable() {
        let dir = TempDir::new().expect("tempdir");
        let src = dir.path().join("a.txt");
        fs::write(&src, b"data").expect("write source");

        let failure = copy_file(&src, &dir.path().join("no/such/dir/a.txt")).unwrap_err();
        assert_eq!(failure.reason, FailureReason::CopyTargetUnwritable);
    }

    #[test]
    fn test_overwrites_existing_target() {
        let dir = TempDir::new().expect("tempdir");
        let src = dir.path().join("a.txt");
        let dest = dir.path().join("b.txt");
        fs::write(&src, b"new").expect("write source");
        fs::write(&dest, b"old and longer").expect("write target");

        copy_file(&src, &dest).expect("copy should succeed");
        assert_eq!(fs::read(&dest).expect("read copy"), b"new");
    }
}
