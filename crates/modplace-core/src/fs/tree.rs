//! Tree-level filesystem operations used by the deploy strategies.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{DeployError, DeployResult};

/// Whether anything exists at `path`, without following a final symlink.
///
/// A dangling symlink counts as existing.
pub fn entry_exists(path: &Path) -> DeployResult<bool> {
    match fs::symlink_metadata(path) {
        Ok(_) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(DeployError::filesystem("inspect", path, err)),
    }
}

/// Remove a file, symlink or directory tree. Symlinks are never followed.
pub fn remove_path(path: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(path)?;
    if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        remove_symlink_or_file(path)
    }
}

#[cfg(windows)]
fn remove_symlink_or_file(path: &Path) -> io::Result<()> {
    // directory symlinks on Windows must be removed as directories
    fs::remove_file(path).or_else(|_| fs::remove_dir(path))
}

#[cfg(not(windows))]
fn remove_symlink_or_file(path: &Path) -> io::Result<()> {
    fs::remove_file(path)
}

/// Remove the symlink at `path` itself.
pub fn remove_symlink(path: &Path) -> io::Result<()> {
    remove_symlink_or_file(path)
}

/// Hidden sibling of `dst` that does not exist yet, used to stage an entry
/// before renaming it into place.
pub fn unique_temp_path(dst: &Path) -> DeployResult<PathBuf> {
    let parent = dst.parent().ok_or_else(|| {
        DeployError::configuration(format!("target path has no parent: {}", dst.display()))
    })?;
    let base = dst.file_name().ok_or_else(|| {
        DeployError::configuration(format!("target path has no file name: {}", dst.display()))
    })?;

    for attempt in 0u32..1000 {
        let name = if attempt == 0 {
            format!(".{}.tmp.{}", base.to_string_lossy(), std::process::id())
        } else {
            format!(
                ".{}.tmp.{}.{}",
                base.to_string_lossy(),
                std::process::id(),
                attempt
            )
        };
        let candidate = parent.join(name);
        if !entry_exists(&candidate)? {
            return Ok(candidate);
        }
    }

    Err(DeployError::configuration(format!(
        "failed to allocate a unique temp path for {}",
        dst.display()
    )))
}

/// Recursively copy the contents of directory `src` into existing directory `dst`.
pub fn copy_tree(src: &Path, dst: &Path) -> DeployResult<()> {
    for entry in read_dir(src)? {
        let entry = entry.map_err(|err| DeployError::filesystem("read directory", src, err))?;
        let from = entry.path();
        let to = dst.join(entry.file_name());
        let ty = entry
            .file_type()
            .map_err(|err| DeployError::filesystem("inspect", &from, err))?;

        if ty.is_dir() {
            fs::create_dir(&to)
                .map_err(|err| DeployError::filesystem("create directory", &to, err))?;
            copy_tree(&from, &to)?;
        } else if ty.is_file() {
            fs::copy(&from, &to).map_err(|err| DeployError::filesystem("copy", &from, err))?;
        } else {
            return Err(unsupported_entry(&from));
        }
    }
    Ok(())
}

/// Mirror the directory structure of `src` into existing directory `dst`,
/// hard-linking every file.
pub fn hardlink_tree(src: &Path, dst: &Path) -> DeployResult<()> {
    for entry in read_dir(src)? {
        let entry = entry.map_err(|err| DeployError::filesystem("read directory", src, err))?;
        let from = entry.path();
        let to = dst.join(entry.file_name());
        let ty = entry
            .file_type()
            .map_err(|err| DeployError::filesystem("inspect", &from, err))?;

        if ty.is_dir() {
            fs::create_dir(&to)
                .map_err(|err| DeployError::filesystem("create directory", &to, err))?;
            hardlink_tree(&from, &to)?;
        } else if ty.is_file() {
            fs::hard_link(&from, &to)
                .map_err(|err| DeployError::filesystem("hard link", &from, err))?;
        } else {
            return Err(unsupported_entry(&from));
        }
    }
    Ok(())
}

/// Remove from `dst` every file that has a counterpart in `src`, then every
/// directory left empty. Entries without a counterpart are kept.
///
/// Returns true when `dst` itself was removed.
pub fn remove_mirrored(src: &Path, dst: &Path) -> DeployResult<bool> {
    for entry in read_dir(src)? {
        let entry = entry.map_err(|err| DeployError::filesystem("read directory", src, err))?;
        let from = entry.path();
        let to = dst.join(entry.file_name());
        let ty = entry
            .file_type()
            .map_err(|err| DeployError::filesystem("inspect", &from, err))?;

        let meta = match fs::symlink_metadata(&to) {
            Ok(meta) => meta,
            Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
            Err(err) => return Err(DeployError::filesystem("inspect", &to, err)),
        };

        if ty.is_dir() && meta.is_dir() {
            remove_mirrored(&from, &to)?;
        } else if ty.is_file() && meta.is_file() {
            fs::remove_file(&to).map_err(|err| DeployError::filesystem("remove", &to, err))?;
        }
    }
    remove_dir_if_empty(dst)
}

/// Remove `dir` if it exists and is empty. Returns true when removed.
pub fn remove_dir_if_empty(dir: &Path) -> DeployResult<bool> {
    let mut entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(DeployError::filesystem("read directory", dir, err)),
    };
    if entries.next().is_some() {
        return Ok(false);
    }
    fs::remove_dir(dir).map_err(|err| DeployError::filesystem("remove directory", dir, err))?;
    Ok(true)
}

/// Create `dir` and any missing ancestors, one level at a time.
///
/// Returns the directories that did not exist before, outermost first.
pub fn create_missing_dirs(dir: &Path) -> DeployResult<Vec<PathBuf>> {
    let mut missing = Vec::new();
    let mut current = Some(dir);
    while let Some(path) = current {
        if entry_exists(path)? {
            break;
        }
        missing.push(path.to_path_buf());
        current = path.parent();
    }
    missing.reverse();

    let mut created = Vec::with_capacity(missing.len());
    for path in missing {
        match fs::create_dir(&path) {
            Ok(()) => created.push(path),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => {}
            Err(err) => return Err(DeployError::filesystem("create directory", &path, err)),
        }
    }
    Ok(created)
}

#[cfg(unix)]
pub fn create_symlink(src: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(src, link)
}

#[cfg(windows)]
pub fn create_symlink(src: &Path, link: &Path) -> io::Result<()> {
    if src.is_dir() {
        std::os::windows::fs::symlink_dir(src, link)
    } else {
        std::os::windows::fs::symlink_file(src, link)
    }
}

#[cfg(not(any(unix, windows)))]
pub fn create_symlink(_src: &Path, _link: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "Symlinks are not supported on this platform",
    ))
}

fn read_dir(dir: &Path) -> DeployResult<fs::ReadDir> {
    fs::read_dir(dir).map_err(|err| DeployError::filesystem("read directory", dir, err))
}

fn unsupported_entry(path: &Path) -> DeployError {
    DeployError::filesystem(
        "place",
        path,
        io::Error::other("unsupported filesystem entry type (symlink or special file)"),
    )
}
