//! Read-only access to one file.

use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::trace;

use crate::handle::BufferedFile;
use crate::{HandleId, IoOp, PoolError, ReadHandle, Result};

/// Read side of a file.
///
/// A reader owns one OS handle and allows one in-flight operation at a time;
/// overlapping calls queue on an internal mutex. Non-blocking contention
/// handling (the busy flag) lives one layer up in
/// [`FsInstance`](crate::FsInstance).
///
/// After [`close`](Reader::close) every operation fails with
/// [`PoolError::ReaderUnavailable`].
pub struct Reader {
    id: HandleId,
    path: PathBuf,
    file: Mutex<Option<BufferedFile<dyn ReadHandle>>>,
}

impl Reader {
    /// Wrap an open handle for `path`.
    pub fn new(path: impl Into<PathBuf>, handle: Box<dyn ReadHandle>) -> Self {
        let path = path.into();
        Self {
            id: HandleId::new(),
            file: Mutex::new(Some(BufferedFile::new(path.clone(), handle))),
            path,
        }
    }

    /// Stable identity for logs and diagnostics.
    pub fn id(&self) -> HandleId {
        self.id
    }

    /// The file this reader is bound to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` once [`close`](Reader::close) has succeeded or failed.
    pub fn is_closed(&self) -> bool {
        self.lock().is_none()
    }

    /// Read up to `len` bytes starting at `pos`.
    ///
    /// Reads stop early only at end of file; the result is then shorter than
    /// `len`. Errors from the underlying handle are returned, never retried.
    pub fn read_at(&self, pos: SeekFrom, len: usize) -> Result<Vec<u8>> {
        let mut guard = self.lock();
        let file = guard.as_mut().ok_or_else(|| self.unavailable())?;
        let data = file.seek_and_read(pos, len)?;
        trace!("reader {} read {} bytes at {:?}", self.id, data.len(), pos);
        Ok(data)
    }

    /// Read the whole file as it is at the moment of the size check.
    ///
    /// Concurrent writers may grow or shrink the file between the size check
    /// and the read; the result is not a consistent snapshot in that case.
    pub fn read_all(&self) -> Result<Vec<u8>> {
        let mut guard = self.lock();
        let file = guard.as_mut().ok_or_else(|| self.unavailable())?;
        let size = file.stat_size()?;
        let len = usize::try_from(size).map_err(|_| {
            let source = io::Error::new(io::ErrorKind::OutOfMemory, "file too large to buffer");
            PoolError::io(IoOp::Read, &self.path, source)
        })?;
        let data = file.seek_and_read(SeekFrom::Start(0), len)?;
        trace!("reader {} read all {} bytes", self.id, data.len());
        Ok(data)
    }

    /// Release the underlying handle.
    ///
    /// The reader counts as closed afterwards even if the handle reported an
    /// error while closing.
    pub fn close(&self) -> Result<()> {
        let file = self.lock().take().ok_or_else(|| self.unavailable())?;
        file.close()
    }

    fn lock(&self) -> MutexGuard<'_, Option<BufferedFile<dyn ReadHandle>>> {
        self.file.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn unavailable(&self) -> PoolError {
        PoolError::ReaderUnavailable {
            path: self.path.clone(),
        }
    }
}

impl std::fmt::Debug for Reader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reader")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("closed", &self.is_closed())
            .finish()
    }
}
