//! One file bound to its reader slots and writer.
//!
//! # Lifecycle
//!
//! ```text
//! FsInstance::open ──▶ Ready ──close_reader() + close_writer()──▶ Closed
//! ```
//!
//! Construction is all-or-nothing: if any handle fails to open, the handles
//! opened so far are closed again and no instance is returned.
//!
//! # Reader Exclusion
//!
//! Each reader slot has a busy flag claimed by compare-and-swap. A read that
//! finds no free slot fails immediately with [`PoolError::ReaderBusy`]
//! instead of waiting; the intended caller pattern is "try, and if busy, try
//! something else". The flag is released on every exit path, errors
//! included.
//!
//! # Writer Exclusion
//!
//! Writes queue on the writer's lock. Closing the writer waits for an
//! in-flight write to finish.

use std::io::SeekFrom;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, TryLockError};

use log::{debug, warn};

use crate::{
    FilePermission, FileSystem, HandleId, InstanceConfig, IoOp, PoolError, Reader, Result,
    Writer, WriterStats, paths,
};

/// Lifecycle state of an [`FsInstance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceState {
    /// At least one of reader and writer is open.
    Ready,
    /// Reader and writer are both closed. Terminal.
    Closed,
}

/// Permission-scoped access to one file.
///
/// # Example
///
/// ```rust
/// use fspool::{FilePermission, FsInstance, InstanceConfig, MemoryFs};
/// use std::io::SeekFrom;
///
/// let fs = MemoryFs::new();
/// let config = InstanceConfig::new("/data/log", FilePermission::ReadWrite);
/// let instance = FsInstance::open(config, &fs)?;
///
/// instance.write(b"hello", SeekFrom::Start(0))?;
/// assert_eq!(instance.read_at(SeekFrom::Start(0), 5)?, b"hello");
/// # Ok::<(), fspool::PoolError>(())
/// ```
pub struct FsInstance {
    id: HandleId,
    config: InstanceConfig,
    readers: RwLock<Option<ReaderSet>>,
    writer: RwLock<Option<Writer>>,
}

struct ReaderSet {
    slots: Vec<ReaderSlot>,
}

struct ReaderSlot {
    busy: AtomicBool,
    reader: Reader,
}

/// A claimed reader slot. Releases the busy flag when dropped.
struct SlotGuard<'a> {
    slot: &'a ReaderSlot,
}

impl FsInstance {
    /// Validate `config`, prepare the path and open every handle the
    /// permission calls for.
    ///
    /// # Errors
    ///
    /// - [`PoolError::EmptyPath`] for an empty path
    /// - [`PoolError::ConfigConflict`] / [`PoolError::InvalidConfig`] for a
    ///   rejected configuration
    /// - [`PoolError::FileNotFound`] for a missing file under read-only access
    /// - [`PoolError::CreateDirectory`] if parent directories cannot be made
    /// - [`PoolError::Io`] if a handle cannot be opened
    pub fn open(config: InstanceConfig, fs: &dyn FileSystem) -> Result<Self> {
        config.validate()?;
        let path = config.path.as_path();
        paths::prepare(fs, path, config.permission)?;

        // The writer goes first: it creates the file the readers then open.
        let writer = if config.permission.can_write() {
            let handle = fs
                .open_write(path)
                .map_err(|source| PoolError::io(IoOp::Open, path, source))?;
            Some(Writer::new(
                path,
                handle,
                config.memory_rent,
                config.flush_policy,
            )?)
        } else {
            None
        };

        let readers = if config.permission.can_read() {
            match ReaderSet::open(fs, path, config.reader_limit) {
                Ok(set) => Some(set),
                Err(e) => {
                    if let Some(writer) = &writer {
                        if let Err(close_err) = writer.close() {
                            warn!("closing writer after failed open: {close_err}");
                        }
                    }
                    return Err(e);
                }
            }
        } else {
            None
        };

        let instance = Self {
            id: HandleId::new(),
            readers: RwLock::new(readers),
            writer: RwLock::new(writer),
            config,
        };
        debug!(
            "instance {} opened {} ({})",
            instance.id,
            instance.path().display(),
            instance.permission()
        );
        Ok(instance)
    }

    /// Stable identity for logs and diagnostics.
    pub fn id(&self) -> HandleId {
        self.id
    }

    /// The file this instance is bound to.
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// The permission the instance was opened with.
    pub fn permission(&self) -> FilePermission {
        self.config.permission
    }

    /// The resolved configuration.
    pub fn config(&self) -> &InstanceConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> InstanceState {
        if self.read_readers().is_none() && self.read_writer().is_none() {
            InstanceState::Closed
        } else {
            InstanceState::Ready
        }
    }

    /// Returns `true` once both reader and writer are closed.
    pub fn is_closed(&self) -> bool {
        self.state() == InstanceState::Closed
    }

    // Writer side

    /// Write `data` at `pos` through the writer.
    ///
    /// # Errors
    ///
    /// - [`PoolError::WriterUnavailable`] without a writer
    /// - any error of [`Writer::write`]
    pub fn write(&self, data: &[u8], pos: SeekFrom) -> Result<()> {
        let guard = self.read_writer();
        let writer = guard.as_ref().ok_or_else(|| self.writer_unavailable())?;
        writer.write(data, pos)
    }

    /// Flush the writer and sync the file.
    pub fn sync(&self) -> Result<()> {
        let guard = self.read_writer();
        let writer = guard.as_ref().ok_or_else(|| self.writer_unavailable())?;
        writer.sync()
    }

    /// Identity of the writer.
    pub fn writer_id(&self) -> Result<HandleId> {
        let guard = self.read_writer();
        let writer = guard.as_ref().ok_or_else(|| self.writer_unavailable())?;
        Ok(writer.id())
    }

    /// Counters of the writer.
    pub fn writer_stats(&self) -> Result<WriterStats> {
        let guard = self.read_writer();
        let writer = guard.as_ref().ok_or_else(|| self.writer_unavailable())?;
        Ok(writer.stats())
    }

    /// Flush and close the writer. Later writer calls report
    /// [`PoolError::WriterUnavailable`].
    pub fn close_writer(&self) -> Result<()> {
        let writer = self
            .write_writer()
            .take()
            .ok_or_else(|| self.writer_unavailable())?;
        let result = writer.close();
        debug!("instance {} closed writer", self.id);
        result
    }

    // Reader side

    /// Read up to `len` bytes at `pos`.
    ///
    /// On a read-write instance, bytes still staged in the writer are pushed
    /// to the file first so the read observes every completed write. If
    /// that fails the read fails with the same error rather than return
    /// stale data; the staged bytes stay with the writer.
    ///
    /// # Errors
    ///
    /// - [`PoolError::ReaderUnavailable`] without a reader
    /// - [`PoolError::ReaderBusy`] if every reader slot is occupied
    /// - [`PoolError::Io`] if staged writes cannot be pushed to the file
    /// - any error of [`Reader::read_at`]
    pub fn read_at(&self, pos: SeekFrom, len: usize) -> Result<Vec<u8>> {
        self.with_reader(|reader| reader.read_at(pos, len))
    }

    /// Read the whole file.
    ///
    /// Same availability and contention rules as [`read_at`](Self::read_at).
    pub fn read_all(&self) -> Result<Vec<u8>> {
        self.with_reader(Reader::read_all)
    }

    /// Returns `true` while no reader slot is free.
    pub fn reader_state(&self) -> Result<bool> {
        let guard = self.read_readers();
        let set = guard.as_ref().ok_or_else(|| self.reader_unavailable())?;
        Ok(set.all_busy())
    }

    /// Identity of the first reader slot.
    pub fn reader_id(&self) -> Result<HandleId> {
        let guard = self.read_readers();
        let set = guard.as_ref().ok_or_else(|| self.reader_unavailable())?;
        set.slots
            .first()
            .map(|slot| slot.reader.id())
            .ok_or_else(|| self.reader_unavailable())
    }

    /// Identities of every reader slot.
    pub fn reader_ids(&self) -> Result<Vec<HandleId>> {
        let guard = self.read_readers();
        let set = guard.as_ref().ok_or_else(|| self.reader_unavailable())?;
        Ok(set.slots.iter().map(|slot| slot.reader.id()).collect())
    }

    /// Close every reader slot.
    ///
    /// # Errors
    ///
    /// - [`PoolError::ReaderBusy`] if a read is in flight or the reader is
    ///   being inspected by another thread
    /// - [`PoolError::ReaderUnavailable`] if already closed or never opened
    /// - [`PoolError::Io`] if a handle failed to close; the reader is
    ///   closed regardless
    pub fn close_reader(&self) -> Result<()> {
        // Reads hold the read lock for their whole duration.
        let mut guard = match self.readers.try_write() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return Err(self.reader_busy()),
        };
        let set = guard.take().ok_or_else(|| self.reader_unavailable())?;
        drop(guard);
        let result = set.close();
        debug!("instance {} closed reader", self.id);
        result
    }

    /// Returns `true` if any reader slot is occupied right now.
    pub fn is_reader_busy(&self) -> bool {
        self.read_readers().as_ref().is_some_and(ReaderSet::any_busy)
    }

    /// Close reader and writer, whichever are still open.
    ///
    /// Fails with [`PoolError::ReaderBusy`] without closing anything if a
    /// read is in flight. Otherwise both sides are closed and the first
    /// close error, if any, is returned.
    pub fn close(&self) -> Result<()> {
        if self.is_reader_busy() {
            return Err(self.reader_busy());
        }
        let reader = match self.close_reader() {
            Err(PoolError::ReaderUnavailable { .. }) => Ok(()),
            other => other,
        };
        let writer = match self.close_writer() {
            Err(PoolError::WriterUnavailable { .. }) => Ok(()),
            other => other,
        };
        reader.and(writer)
    }

    fn with_reader<T>(&self, op: impl FnOnce(&Reader) -> Result<T>) -> Result<T> {
        let guard = self.read_readers();
        let set = guard.as_ref().ok_or_else(|| self.reader_unavailable())?;
        let slot = set.claim().ok_or_else(|| self.reader_busy())?;

        if let Some(writer) = self.read_writer().as_ref() {
            writer.drain()?;
        }
        op(slot.reader())
    }

    fn read_readers(&self) -> RwLockReadGuard<'_, Option<ReaderSet>> {
        self.readers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_writer(&self) -> RwLockReadGuard<'_, Option<Writer>> {
        self.writer.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_writer(&self) -> RwLockWriteGuard<'_, Option<Writer>> {
        self.writer.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn reader_unavailable(&self) -> PoolError {
        PoolError::ReaderUnavailable {
            path: self.config.path.clone(),
        }
    }

    fn reader_busy(&self) -> PoolError {
        PoolError::ReaderBusy {
            path: self.config.path.clone(),
        }
    }

    fn writer_unavailable(&self) -> PoolError {
        PoolError::WriterUnavailable {
            path: self.config.path.clone(),
        }
    }
}

impl std::fmt::Debug for FsInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsInstance")
            .field("id", &self.id)
            .field("path", &self.config.path)
            .field("permission", &self.config.permission)
            .field("state", &self.state())
            .finish()
    }
}

impl ReaderSet {
    /// Open `count` independent readers, closing them all again on failure.
    fn open(fs: &dyn FileSystem, path: &Path, count: u32) -> Result<Self> {
        let mut slots = Vec::with_capacity(count as usize);
        for _ in 0..count {
            match fs.open_read(path) {
                Ok(handle) => slots.push(ReaderSlot {
                    busy: AtomicBool::new(false),
                    reader: Reader::new(path, handle),
                }),
                Err(source) => {
                    let opened = Self { slots };
                    if let Err(e) = opened.close() {
                        warn!("closing readers after failed open: {e}");
                    }
                    return Err(PoolError::io(IoOp::Open, path, source));
                }
            }
        }
        Ok(Self { slots })
    }

    fn claim(&self) -> Option<SlotGuard<'_>> {
        self.slots
            .iter()
            .find(|slot| {
                slot.busy
                    .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
                    .is_ok()
            })
            .map(|slot| SlotGuard { slot })
    }

    fn any_busy(&self) -> bool {
        self.slots.iter().any(|s| s.busy.load(Ordering::Acquire))
    }

    fn all_busy(&self) -> bool {
        self.slots.iter().all(|s| s.busy.load(Ordering::Acquire))
    }

    /// Close every reader, returning the first failure.
    fn close(self) -> Result<()> {
        self.slots
            .into_iter()
            .map(|slot| slot.reader.close())
            .fold(Ok(()), |first, next| first.and(next))
    }
}

impl SlotGuard<'_> {
    fn reader(&self) -> &Reader {
        &self.slot.reader
    }
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.slot.busy.store(false, Ordering::Release);
    }
}
