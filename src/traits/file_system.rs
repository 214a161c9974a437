//! Path-level operations: existence checks, directory creation, opening.

use std::io;
use std::path::Path;

use super::{ReadHandle, WriteHandle};

/// The path and directory collaborator of the pool.
///
/// Implementations hand out fresh, independent handles on every `open_*`
/// call. An instance with a reader limit of `n` calls
/// [`open_read`](FileSystem::open_read) `n` times and expects `n` cursors
/// that do not interfere with each other.
///
/// # Thread Safety
///
/// Requires `Send + Sync`; the pool shares one file system across threads
/// behind an `Arc`.
///
/// # Object Safety
///
/// This trait is object-safe and is normally used as `Arc<dyn FileSystem>`.
pub trait FileSystem: Send + Sync {
    /// Returns `true` if `path` exists (file or directory).
    fn exists(&self, path: &Path) -> io::Result<bool>;

    /// Create `path` and all missing parents.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Open an existing file for reading.
    fn open_read(&self, path: &Path) -> io::Result<Box<dyn ReadHandle>>;

    /// Open a file for writing, creating it if missing. Never truncates.
    fn open_write(&self, path: &Path) -> io::Result<Box<dyn WriteHandle>>;

    /// Returns `true` if `err` means "no such file or directory".
    fn is_not_found(&self, err: &io::Error) -> bool {
        err.kind() == io::ErrorKind::NotFound
    }
}
