//! Buffered file handle: one open OS handle plus the path it belongs to.
//!
//! Every primitive maps 1:1 onto the underlying [`ReadHandle`] or
//! [`WriteHandle`] call, and every failure is wrapped into
//! [`PoolError::Io`] naming the path and the failing [`IoOp`].
//!
//! Not safe for unsynchronized concurrent use; [`Reader`](crate::Reader) and
//! [`Writer`](crate::Writer) hold it behind their own locks.

use std::io::{self, SeekFrom};
use std::path::PathBuf;

use crate::{IoOp, PoolError, ReadHandle, Result, WriteHandle};

/// An open file handle bound to its path.
pub(crate) struct BufferedFile<H: ?Sized> {
    path: PathBuf,
    inner: Box<H>,
}

impl<H: ?Sized> BufferedFile<H> {
    pub(crate) fn new(path: impl Into<PathBuf>, inner: Box<H>) -> Self {
        Self {
            path: path.into(),
            inner,
        }
    }

    fn wrap(&self, op: IoOp) -> impl FnOnce(io::Error) -> PoolError + '_ {
        move |source| PoolError::io(op, &self.path, source)
    }
}

impl BufferedFile<dyn ReadHandle> {
    /// Seek to `pos`, then read up to `len` bytes.
    ///
    /// Keeps reading until `len` bytes are filled or end of file is reached;
    /// the returned buffer is truncated to what was actually read.
    pub(crate) fn seek_and_read(&mut self, pos: SeekFrom, len: usize) -> Result<Vec<u8>> {
        self.inner.seek(pos).map_err(self.wrap(IoOp::Seek))?;
        let mut buf = vec![0u8; len];
        let filled = self.fill(&mut buf)?;
        buf.truncate(filled);
        Ok(buf)
    }

    /// Size of the file at this instant.
    pub(crate) fn stat_size(&mut self) -> Result<u64> {
        self.inner.size().map_err(self.wrap(IoOp::Stat))
    }

    pub(crate) fn close(self) -> Result<()> {
        let Self { path, inner } = self;
        inner
            .close()
            .map_err(|source| PoolError::io(IoOp::Close, path, source))
    }

    fn fill(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(PoolError::io(IoOp::Read, &self.path, e)),
            }
        }
        Ok(filled)
    }
}

impl BufferedFile<dyn WriteHandle> {
    /// Seek to `pos` and return the resulting absolute offset.
    pub(crate) fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        self.inner.seek(pos).map_err(self.wrap(IoOp::Seek))
    }

    /// Seek to `pos`, then write all of `data`.
    pub(crate) fn seek_and_write(&mut self, data: &[u8], pos: SeekFrom) -> Result<()> {
        self.seek(pos)?;
        let mut written = 0;
        while written < data.len() {
            match self.inner.write(&data[written..]) {
                Ok(0) => {
                    let source = io::Error::from(io::ErrorKind::WriteZero);
                    return Err(PoolError::io(IoOp::Write, &self.path, source));
                }
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(PoolError::io(IoOp::Write, &self.path, e)),
            }
        }
        Ok(())
    }

    pub(crate) fn sync(&mut self) -> Result<()> {
        self.inner.sync().map_err(self.wrap(IoOp::Sync))
    }

    pub(crate) fn close(self) -> Result<()> {
        let Self { path, inner } = self;
        inner
            .close()
            .map_err(|source| PoolError::io(IoOp::Close, path, source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FileSystem, MemoryFs};
    use std::path::Path;

    fn reader(fs: &MemoryFs, path: &str) -> BufferedFile<dyn ReadHandle> {
        BufferedFile::new(path, fs.open_read(Path::new(path)).unwrap())
    }

    fn writer(fs: &MemoryFs, path: &str) -> BufferedFile<dyn WriteHandle> {
        BufferedFile::new(path, fs.open_write(Path::new(path)).unwrap())
    }

    #[test]
    fn seek_and_read_returns_requested_range() {
        let fs = MemoryFs::new();
        fs.insert_file("/f", b"hello world");
        let mut file = reader(&fs, "/f");
        assert_eq!(file.seek_and_read(SeekFrom::Start(6), 5).unwrap(), b"world");
    }

    #[test]
    fn short_read_is_truncated_not_padded() {
        let fs = MemoryFs::new();
        fs.insert_file("/f", b"abc");
        let mut file = reader(&fs, "/f");
        assert_eq!(file.seek_and_read(SeekFrom::Start(1), 10).unwrap(), b"bc");
        assert!(file.seek_and_read(SeekFrom::Start(100), 4).unwrap().is_empty());
    }

    #[test]
    fn seek_failure_is_reported_as_seek() {
        let fs = MemoryFs::new();
        fs.insert_file("/f", b"abc");
        let mut file = reader(&fs, "/f");
        fs.fail(IoOp::Seek);
        let err = file.seek_and_read(SeekFrom::Start(0), 1).unwrap_err();
        assert_eq!(err.io_op(), Some(IoOp::Seek));
    }

    #[test]
    fn read_failure_is_reported_as_read() {
        let fs = MemoryFs::new();
        fs.insert_file("/f", b"abc");
        let mut file = reader(&fs, "/f");
        fs.fail(IoOp::Read);
        let err = file.seek_and_read(SeekFrom::Start(0), 1).unwrap_err();
        assert_eq!(err.io_op(), Some(IoOp::Read));
    }

    #[test]
    fn stat_size_tracks_file_length() {
        let fs = MemoryFs::new();
        fs.insert_file("/f", b"12345");
        let mut file = reader(&fs, "/f");
        assert_eq!(file.stat_size().unwrap(), 5);
    }

    #[test]
    fn seek_and_write_then_sync() {
        let fs = MemoryFs::new();
        let mut file = writer(&fs, "/f");
        file.seek_and_write(b"abc", SeekFrom::Start(0)).unwrap();
        file.seek_and_write(b"Z", SeekFrom::Start(1)).unwrap();
        file.sync().unwrap();
        assert_eq!(fs.durable_contents("/f").unwrap(), b"aZc");
    }

    #[test]
    fn write_and_sync_failures_are_distinct() {
        let fs = MemoryFs::new();
        let mut file = writer(&fs, "/f");

        fs.fail(IoOp::Write);
        let err = file.seek_and_write(b"x", SeekFrom::Start(0)).unwrap_err();
        assert_eq!(err.io_op(), Some(IoOp::Write));
        fs.heal(IoOp::Write);

        fs.fail(IoOp::Sync);
        let err = file.sync().unwrap_err();
        assert_eq!(err.io_op(), Some(IoOp::Sync));
    }

    #[test]
    fn close_failure_is_wrapped() {
        let fs = MemoryFs::new();
        let file = writer(&fs, "/f");
        fs.fail(IoOp::Close);
        let err = file.close().unwrap_err();
        assert_eq!(err.io_op(), Some(IoOp::Close));
        assert!(err.to_string().contains("/f"));
    }
}
