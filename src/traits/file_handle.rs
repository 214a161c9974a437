//! Per-role capabilities of an open OS file handle.
//!
//! Readers and writers need different, small subsets of what an OS file can
//! do. Each role gets its own trait sized to exactly those needs:
//!
//! | Trait | Used by | Primitives |
//! |-------|---------|------------|
//! | [`ReadHandle`] | [`Reader`](crate::Reader) | `seek`, `read`, `size`, `close` |
//! | [`WriteHandle`] | [`Writer`](crate::Writer) | `seek`, `write`, `sync`, `close` |
//!
//! Both traits speak plain [`std::io::Result`]. Errors coming out of them are
//! opaque to the pool and always get wrapped into
//! [`PoolError::Io`](crate::PoolError::Io) together with the file path and
//! the failing primitive.
//!
//! # Thread Safety
//!
//! Handles are `Send` but not `Sync`: they are moved into a reader or writer
//! and only ever touched while that owner holds its lock.

use std::io::{self, SeekFrom};

/// Read side of an open file.
///
/// # Example
///
/// ```rust
/// use fspool::ReadHandle;
/// use std::io::{self, Cursor, Read, Seek, SeekFrom};
///
/// struct CursorHandle(Cursor<Vec<u8>>);
///
/// impl ReadHandle for CursorHandle {
///     fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
///         self.0.seek(pos)
///     }
///     fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
///         self.0.read(buf)
///     }
///     fn size(&mut self) -> io::Result<u64> {
///         Ok(self.0.get_ref().len() as u64)
///     }
///     fn close(self: Box<Self>) -> io::Result<()> {
///         Ok(())
///     }
/// }
/// ```
pub trait ReadHandle: Send {
    /// Move the cursor and return the new absolute position.
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64>;

    /// Read into `buf`, returning how many bytes were filled.
    ///
    /// Returns `Ok(0)` at end of file.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Current size of the file in bytes.
    fn size(&mut self) -> io::Result<u64>;

    /// Release the handle.
    fn close(self: Box<Self>) -> io::Result<()>;
}

/// Write side of an open file.
pub trait WriteHandle: Send {
    /// Move the cursor and return the new absolute position.
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64>;

    /// Write from `buf`, returning how many bytes were accepted.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Make everything written so far durable.
    fn sync(&mut self) -> io::Result<()>;

    /// Release the handle.
    fn close(self: Box<Self>) -> io::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read, Seek, Write};

    struct CursorHandle {
        inner: Cursor<Vec<u8>>,
        syncs: usize,
    }

    impl CursorHandle {
        fn new(data: &[u8]) -> Self {
            Self {
                inner: Cursor::new(data.to_vec()),
                syncs: 0,
            }
        }
    }

    impl ReadHandle for CursorHandle {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            Seek::seek(&mut self.inner, pos)
        }
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            Read::read(&mut self.inner, buf)
        }
        fn size(&mut self) -> io::Result<u64> {
            Ok(self.inner.get_ref().len() as u64)
        }
        fn close(self: Box<Self>) -> io::Result<()> {
            Ok(())
        }
    }

    impl WriteHandle for CursorHandle {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            Seek::seek(&mut self.inner, pos)
        }
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Write::write(&mut self.inner, buf)
        }
        fn sync(&mut self) -> io::Result<()> {
            self.syncs += 1;
            Ok(())
        }
        fn close(self: Box<Self>) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn handles_are_object_safe() {
        fn _read(_: Box<dyn ReadHandle>) {}
        fn _write(_: Box<dyn WriteHandle>) {}
    }

    #[test]
    fn read_handle_seeks_and_reads() {
        let mut handle = CursorHandle::new(b"hello world");
        assert_eq!(ReadHandle::seek(&mut handle, SeekFrom::Start(6)).unwrap(), 6);
        let mut buf = [0u8; 5];
        assert_eq!(ReadHandle::read(&mut handle, &mut buf).unwrap(), 5);
        assert_eq!(&buf, b"world");
        assert_eq!(handle.size().unwrap(), 11);
    }

    #[test]
    fn write_handle_writes_and_syncs() {
        let mut handle = CursorHandle::new(b"");
        WriteHandle::seek(&mut handle, SeekFrom::Start(0)).unwrap();
        assert_eq!(WriteHandle::write(&mut handle, b"abc").unwrap(), 3);
        handle.sync().unwrap();
        assert_eq!(handle.syncs, 1);
        assert_eq!(handle.inner.get_ref(), b"abc");
        WriteHandle::close(Box::new(handle)).unwrap();
    }
}
