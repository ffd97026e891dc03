//! Source root → target mirror path mapping

use super::walker::ShouldExist;
use crate::types::{Failure, FailureReason};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Ancestors of `source` that are replayed under the target, outermost first.
///
/// Walks up from `source` (inclusive) until the filesystem root or
/// `virtual_root` is reached, then drops that outermost entry. The last element
/// is always `source` itself unless `source` equals the virtual root, in which
/// case the result is empty and the source mirrors onto the target root.
fn replayed_ancestors<'a>(source: &'a Path, virtual_root: Option<&Path>) -> Vec<&'a Path> {
    let mut chain = Vec::new();
    for ancestor in source.ancestors() {
        chain.push(ancestor);
        if virtual_root == Some(ancestor) {
            break;
        }
    }
    chain.pop();
    chain.reverse();
    chain
}

/// Where the mirror of `source` lives under `target_root`.
///
/// `/a/b/c` with virtual root `/a/b` and target `/backup` maps to
/// `/backup/c`; without a virtual root it maps to `/backup/a/b/c`.
pub fn mirror_path(source: &Path, target_root: &Path, virtual_root: Option<&Path>) -> PathBuf {
    replayed_ancestors(source, virtual_root)
        .into_iter()
        .filter_map(Path::file_name)
        .fold(target_root.to_path_buf(), |target, name| target.join(name))
}

/// Make sure `target` is a real directory.
///
/// A file or symlink in the way is removed first; symlinks are never
/// followed, so nothing is ever created outside the target root.
pub(super) fn ensure_dir(target: &Path) -> Result<(), Failure> {
    match fs::symlink_metadata(target) {
        Ok(m) if m.is_dir() => return Ok(()),
        Ok(_) => {
            debug!("replacing {} with a directory", target.display());
            fs::remove_file(target)
                .map_err(|e| Failure::io(FailureReason::TargetConflict, target, &e))?;
        }
        Err(_) => {}
    }
    fs::create_dir(target).map_err(|e| Failure::io(FailureReason::TargetConflict, target, &e))?;
    debug!("created mirror directory {}", target.display());
    Ok(())
}

/// Compute the mirror path of `source` and create every intermediate
/// directory above it, registering each one in `should_exist`.
///
/// The mirror root itself is left for the scanner, which creates it (or
/// replaces a conflicting entry) when it visits `source`. Fails with
/// `TargetConflict` when an intermediate cannot be made a directory.
pub fn prepare_mirror_root(
    source: &Path,
    target_root: &Path,
    virtual_root: Option<&Path>,
    should_exist: &mut ShouldExist,
) -> Result<PathBuf, Failure> {
    let names: Vec<_> = replayed_ancestors(source, virtual_root)
        .into_iter()
        .filter_map(Path::file_name)
        .collect();

    let mut target = target_root.to_path_buf();
    let intermediate = names.len().saturating_sub(1);
    for (depth, name) in names.into_iter().enumerate() {
        target.push(name);
        should_exist.insert(&target);
        if depth < intermediate {
            ensure_dir(&target)?;
        }
    }

    Ok(target)
}

/// Drop source roots that are equal to or nested under another root.
///
/// A nested root's files are already reached through its ancestor, and
/// both map to the same mirror subtree, so keeping it would enqueue them
/// twice. Order of the remaining roots is preserved.
pub fn distinct_roots(sources: &[PathBuf]) -> Vec<PathBuf> {
    sources
        .iter()
        .enumerate()
        .filter(|&(i, source)| {
            let covered_by = sources.iter().enumerate().find(|&(j, other)| {
                j != i && source.starts_with(other) && (source != other || j < i)
            });
            match covered_by {
                Some((_, other)) => {
                    info!(
                        "skipping source {} - already covered by {}",
                        source.display(),
                        other.display()
                    );
                    false
                }
                None => true,
            }
        })
        .map(|(_, source)| source.clone())
        .collect()
}
