//! Existence checks and parent-directory creation ahead of opening a file.

use std::path::Path;

use log::debug;

use crate::{FilePermission, FileSystem, IoOp, PoolError, Result};

/// Make `path` openable with `permission`.
///
/// Read-only access requires the file to exist already and never touches
/// the file system otherwise. Writable access creates missing parent
/// directories; the file itself is created when the writer opens it.
///
/// # Errors
///
/// - [`PoolError::FileNotFound`] for a missing file under read-only access
/// - [`PoolError::CreateDirectory`] if the parent directories cannot be made
/// - [`PoolError::Io`] with [`IoOp::Stat`] if existence cannot be determined
pub(crate) fn prepare(fs: &dyn FileSystem, path: &Path, permission: FilePermission) -> Result<()> {
    if exists(fs, path)? {
        return Ok(());
    }
    if !permission.can_write() {
        return Err(PoolError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) else {
        return Ok(());
    };
    if !exists(fs, dir)? {
        fs.create_dir_all(dir)
            .map_err(|source| PoolError::CreateDirectory {
                path: dir.to_path_buf(),
                source,
            })?;
        debug!("created directory {}", dir.display());
    }
    Ok(())
}

fn exists(fs: &dyn FileSystem, path: &Path) -> Result<bool> {
    match fs.exists(path) {
        Ok(found) => Ok(found),
        Err(e) if fs.is_not_found(&e) => Ok(false),
        Err(e) => Err(PoolError::io(IoOp::Stat, path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryFs;

    #[test]
    fn read_only_needs_existing_file() {
        let fs = MemoryFs::new();
        let err = prepare(&fs, Path::new("/a/b.txt"), FilePermission::ReadOnly).unwrap_err();
        assert!(matches!(err, PoolError::FileNotFound { .. }));
        assert!(!fs.is_dir("/a"));
    }

    #[test]
    fn read_only_accepts_existing_file() {
        let fs = MemoryFs::new();
        fs.insert_file("/a/b.txt", b"x");
        prepare(&fs, Path::new("/a/b.txt"), FilePermission::ReadOnly).unwrap();
    }

    #[test]
    fn writable_creates_parent_directories() {
        let fs = MemoryFs::new();
        prepare(&fs, Path::new("/x/y/z.log"), FilePermission::WriteOnly).unwrap();
        assert!(fs.is_dir("/x/y"));
        assert!(fs.contents("/x/y/z.log").is_none());
    }

    #[test]
    fn relative_path_without_parent() {
        let fs = MemoryFs::new();
        prepare(&fs, Path::new("plain.log"), FilePermission::ReadWrite).unwrap();
    }

    #[test]
    fn directory_creation_failure_is_reported() {
        let fs = MemoryFs::new();
        fs.insert_file("/blocker", b"");
        let err = prepare(&fs, Path::new("/blocker/sub/f"), FilePermission::ReadWrite).unwrap_err();
        assert!(matches!(err, PoolError::CreateDirectory { .. }));
    }

    #[test]
    fn stat_failure_is_reported() {
        let fs = MemoryFs::new();
        fs.fail(IoOp::Stat);
        let err = prepare(&fs, Path::new("/f"), FilePermission::ReadWrite).unwrap_err();
        assert_eq!(err.io_op(), Some(IoOp::Stat));
    }
}
