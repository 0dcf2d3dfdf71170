//! Deterministic tree fingerprints
//!
//! Computes a stable hash of a directory tree, used to check that a target
//! tree is byte-identical before a deploy and after the matching clean.

use std::fs;
use std::path::Path;

use crate::error::{DeployError, DeployResult};

/// Compute deterministic tree hash of a directory
///
/// # Algorithm
/// - Recursive directory traversal, entries sorted by name
/// - Files: `relative_path || 0x00 || content`
/// - Directories: `relative_path || 0xFF`, then their entries
/// - Symlinks (not followed): `relative_path || 0xFE || link target`
/// - Output: blake3 hex string
///
/// # Example
/// ```no_run
/// use modplace_core::fs::tree_hash::hash_tree;
/// use std::path::Path;
///
/// let hash = hash_tree(Path::new("/srv/magento"))?;
/// assert_eq!(hash.len(), 64); // blake3 hex output
/// # Ok::<(), modplace_core::error::DeployError>(())
/// ```
pub fn hash_tree(path: &Path) -> DeployResult<String> {
    let mut hasher = blake3::Hasher::new();
    hash_dir_recursive(&mut hasher, path, "")?;
    Ok(hasher.finalize().to_hex().to_string())
}

fn hash_dir_recursive(hasher: &mut blake3::Hasher, dir: &Path, base: &str) -> DeployResult<()> {
    let entries =
        fs::read_dir(dir).map_err(|err| DeployError::filesystem("read directory", dir, err))?;

    // Collect and sort entries for deterministic ordering
    let mut sorted_entries: Vec<_> = entries
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| DeployError::filesystem("read directory", dir, err))?;
    sorted_entries.sort_by_key(|e| e.file_name());

    for entry in sorted_entries {
        let path = entry.path();
        let name = entry.file_name();
        let name_str = name.to_string_lossy();
        let rel_path = if base.is_empty() {
            name_str.to_string()
        } else {
            format!("{}/{}", base, name_str)
        };

        let ty = entry
            .file_type()
            .map_err(|err| DeployError::filesystem("inspect", &path, err))?;

        if ty.is_symlink() {
            let target = fs::read_link(&path)
                .map_err(|err| DeployError::filesystem("read link", &path, err))?;
            hasher.update(rel_path.as_bytes());
            hasher.update(&[0xFE]); // Symlink marker
            hasher.update(target.to_string_lossy().as_bytes());
        } else if ty.is_dir() {
            hasher.update(rel_path.as_bytes());
            hasher.update(&[0xFF]); // Directory marker
            hash_dir_recursive(hasher, &path, &rel_path)?;
        } else if ty.is_file() {
            hasher.update(rel_path.as_bytes());
            hasher.update(&[0x00]); // Path separator
            let content =
                fs::read(&path).map_err(|err| DeployError::filesystem("read", &path, err))?;
            hasher.update(&content);
        } else {
            return Err(DeployError::filesystem(
                "hash",
                &path,
                std::io::Error::other("unsupported filesystem entry type"),
            ));
        }
    }

    Ok(())
}
