use crate::errors::{FileOperation, IoError};
use std::{
    fs,
    path::{Component, Path, PathBuf},
};
use walkdir::WalkDir;

/// Returns `true` when `path` is a directory without any entries.
pub fn is_empty_dir(path: &Path) -> Result<bool, IoError> {
    let mut entries = fs::read_dir(path)
        .map_err(|error| IoError::new(FileOperation::ReadDir, path.to_path_buf(), error))?;

    Ok(entries.next().is_none())
}

/// Returns `true` when `name` is exactly one plain path segment: not empty, not `.` or `..`,
/// not absolute and without separators. Joining such a name appends exactly one segment.
pub fn is_single_segment(name: &str) -> bool {
    if name.contains(['/', '\\']) {
        return false;
    }

    let mut components = Path::new(name).components();

    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Recursively removes `path`.
///
/// Refuses with `Ok(false)`, without touching the file system, when `path` is literally the
/// `workspace_root` or `/`. Read-only files are made writable before they are unlinked.
pub fn remove_dir(path: &Path, workspace_root: &Path) -> Result<bool, IoError> {
    if path == workspace_root || path == Path::new("/") {
        log::warn!("refusing to remove protected directory: {}", path.display());
        return Ok(false);
    }

    for entry in WalkDir::new(path).contents_first(true) {
        let entry = entry.map_err(|error| {
            let failed = error.path().unwrap_or(path).to_path_buf();
            IoError::new(FileOperation::ReadDir, failed, error.into())
        })?;

        let entry_path = entry.path();

        if entry.file_type().is_dir() {
            fs::remove_dir(entry_path).map_err(|error| {
                IoError::new(FileOperation::RemoveDir, entry_path.to_path_buf(), error)
            })?;
        } else {
            make_writable(entry_path)?;
            fs::remove_file(entry_path).map_err(|error| {
                IoError::new(FileOperation::RemoveFile, entry_path.to_path_buf(), error)
            })?;
        }
    }

    Ok(true)
}

/// Best-effort removal of a single file; failures are only logged.
pub fn remove_file_quietly(path: &Path) {
    if let Err(error) = make_writable(path) {
        log::debug!("...{}", error);
    }

    if let Err(error) = fs::remove_file(path) {
        log::debug!("...could not remove {}: {}", path.display(), error);
    }
}

/// Copies the contents of `from` into `to`, creating `to` if needed.
pub fn copy_dir(from: &Path, to: &Path) -> Result<(), IoError> {
    for entry in WalkDir::new(from) {
        let entry = entry.map_err(|error| {
            let failed = error.path().unwrap_or(from).to_path_buf();
            IoError::new(FileOperation::ReadDir, failed, error.into())
        })?;

        let relative = entry.path().strip_prefix(from).unwrap_or(entry.path());
        let target = to.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .map_err(|error| IoError::new(FileOperation::Mkdir, target.clone(), error))?;
        } else {
            fs::copy(entry.path(), &target)
                .map_err(|error| IoError::new(FileOperation::Copy, target.clone(), error))?;
        }
    }

    Ok(())
}

/// Moves `from` to `to`, creating the parent of `to` first.
pub fn rename(from: &Path, to: &Path) -> Result<(), IoError> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)
            .map_err(|error| IoError::new(FileOperation::Mkdir, parent.to_path_buf(), error))?;
    }

    fs::rename(from, to).map_err(|error| IoError::new(FileOperation::Rename, from.into(), error))
}

/// Writes `contents` to `path`, creating missing parent directories.
pub fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> Result<PathBuf, IoError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|error| IoError::new(FileOperation::Mkdir, parent.to_path_buf(), error))?;
    }

    fs::write(path, contents)
        .map_err(|error| IoError::new(FileOperation::Write, path.to_path_buf(), error))?;

    Ok(path.to_path_buf())
}

/// Clears the read-only flag of `path`. Missing paths and symlinks are left alone.
fn make_writable(path: &Path) -> Result<(), IoError> {
    let Ok(metadata) = fs::symlink_metadata(path) else {
        return Ok(());
    };

    if metadata.file_type().is_symlink() {
        return Ok(());
    }

    let mut permissions = metadata.permissions();

    if permissions.readonly() {
        #[allow(clippy::permissions_set_readonly_false)]
        permissions.set_readonly(false);
        fs::set_permissions(path, permissions).map_err(|error| {
            IoError::new(FileOperation::Permissions, path.to_path_buf(), error)
        })?;
    }

    Ok(())
}
