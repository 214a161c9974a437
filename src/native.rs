//! [`FileSystem`] backed by the local disk through `std::fs`.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::{FileSystem, ReadHandle, WriteHandle};

/// Local-disk file system.
///
/// Every `open_*` call opens a new OS file descriptor, so readers and the
/// writer of one instance never share a cursor.
///
/// # Example
///
/// ```rust,no_run
/// use fspool::{FileSystem, NativeFs};
/// use std::path::Path;
///
/// let fs = NativeFs::new();
/// if !fs.exists(Path::new("/var/lib/app"))? {
///     fs.create_dir_all(Path::new("/var/lib/app"))?;
/// }
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeFs;

impl NativeFs {
    /// Create the local-disk file system.
    pub const fn new() -> Self {
        NativeFs
    }
}

impl FileSystem for NativeFs {
    fn exists(&self, path: &Path) -> io::Result<bool> {
        match fs::metadata(path) {
            Ok(_) => Ok(true),
            Err(e) if self.is_not_found(&e) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    /// A file below a regular file cannot exist either.
    fn is_not_found(&self, err: &io::Error) -> bool {
        matches!(
            err.kind(),
            io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
        )
    }

    fn open_read(&self, path: &Path) -> io::Result<Box<dyn ReadHandle>> {
        let file = File::open(path)?;
        Ok(Box::new(NativeFile(file)))
    }

    fn open_write(&self, path: &Path) -> io::Result<Box<dyn WriteHandle>> {
        let file = OpenOptions::new().write(true).create(true).truncate(false).open(path)?;
        Ok(Box::new(NativeFile(file)))
    }
}

/// An open [`File`] exposed through the per-role handle traits.
#[derive(Debug)]
struct NativeFile(File);

impl ReadHandle for NativeFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.0.seek(pos)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }

    fn size(&mut self) -> io::Result<u64> {
        Ok(self.0.metadata()?.len())
    }

    fn close(self: Box<Self>) -> io::Result<()> {
        // Dropping the descriptor is the close; std surfaces no error for it.
        drop(self);
        Ok(())
    }
}

impl WriteHandle for NativeFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.0.seek(pos)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.0.flush()?;
        self.0.sync_data()
    }

    fn close(self: Box<Self>) -> io::Result<()> {
        drop(self);
        Ok(())
    }
}
