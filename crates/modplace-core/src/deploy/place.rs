//! Per-mechanism placement and removal of a single entry.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::{DeployError, DeployResult};
use crate::fs::tree::{
    copy_tree, create_symlink, hardlink_tree, remove_dir_if_empty, remove_mirrored, remove_path,
    remove_symlink, unique_temp_path,
};

use super::StrategyKind;

/// Outcome of removing one target during clean.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Removal {
    Removed,
    Absent,
    /// Left in place (fully or partially), with the reason
    Kept(String),
}

/// Place `source` at `target`, which must not exist.
///
/// The entry is staged at a hidden sibling and renamed into place, so a
/// failure never leaves a partially built target behind.
pub(crate) fn place(kind: StrategyKind, source: &Path, target: &Path) -> DeployResult<()> {
    let staged = unique_temp_path(target)?;

    let result = match kind {
        StrategyKind::Symlink => create_symlink(source, &staged)
            .map_err(|err| DeployError::filesystem("create symlink", target, err)),
        StrategyKind::Link => stage_tree(source, &staged, hardlink_tree, |from, to| {
            fs::hard_link(from, to).map_err(|err| DeployError::filesystem("hard link", from, err))
        }),
        StrategyKind::Copy => stage_tree(source, &staged, copy_tree, |from, to| {
            fs::copy(from, to)
                .map(|_| ())
                .map_err(|err| DeployError::filesystem("copy", from, err))
        }),
    };

    if let Err(err) = result {
        let _ = remove_path(&staged);
        return Err(err);
    }

    if let Err(err) = fs::rename(&staged, target) {
        let _ = remove_path(&staged);
        return Err(DeployError::filesystem("move staged entry to", target, err));
    }
    Ok(())
}

fn stage_tree(
    source: &Path,
    staged: &Path,
    tree: fn(&Path, &Path) -> DeployResult<()>,
    file: impl Fn(&Path, &Path) -> DeployResult<()>,
) -> DeployResult<()> {
    let meta = fs::metadata(source).map_err(|err| DeployError::filesystem("inspect", source, err))?;
    if meta.is_dir() {
        fs::create_dir(staged)
            .map_err(|err| DeployError::filesystem("create directory", staged, err))?;
        tree(source, staged)
    } else {
        file(source, staged)
    }
}

/// Remove what `kind` placed at `target` for `source`.
pub(crate) fn remove(kind: StrategyKind, source: &Path, target: &Path) -> DeployResult<Removal> {
    let meta = match fs::symlink_metadata(target) {
        Ok(meta) => meta,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Removal::Absent),
        Err(err) => return Err(DeployError::filesystem("inspect", target, err)),
    };

    if kind == StrategyKind::Symlink {
        if !meta.file_type().is_symlink() {
            return Ok(Removal::Kept("not a symlink".to_string()));
        }
        remove_symlink(target).map_err(|err| DeployError::filesystem("remove link", target, err))?;
        return Ok(Removal::Removed);
    }

    if meta.file_type().is_symlink() {
        return Ok(Removal::Kept(format!("is a symlink, not a {} placement", kind)));
    }

    let source_is_dir = match fs::metadata(source) {
        Ok(source_meta) => Some(source_meta.is_dir()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => None,
        Err(err) => return Err(DeployError::filesystem("inspect", source, err)),
    };

    match (meta.is_dir(), source_is_dir) {
        (true, Some(true)) => {
            if remove_mirrored(source, target)? {
                Ok(Removal::Removed)
            } else {
                Ok(Removal::Kept("directory still holds unrelated entries".to_string()))
            }
        }
        (true, Some(false)) => Ok(Removal::Kept("expected a file, found a directory".to_string())),
        (true, None) => {
            if remove_dir_if_empty(target)? {
                Ok(Removal::Removed)
            } else {
                Ok(Removal::Kept(
                    "source is gone and the directory is not empty".to_string(),
                ))
            }
        }
        (false, Some(true)) => Ok(Removal::Kept("expected a directory, found a file".to_string())),
        (false, _) => {
            fs::remove_file(target).map_err(|err| DeployError::filesystem("remove", target, err))?;
            Ok(Removal::Removed)
        }
    }
}
