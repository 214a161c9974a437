//! Buffered, serialized write access to one file.
//!
//! Writes land in a staging buffer of `memory_rent` bytes and reach the OS
//! handle when the buffer has to make room, when the next write is not
//! contiguous with what is staged, or when a flush happens. A flush pushes
//! the staged bytes to the handle and syncs it.
//!
//! | Policy | Flush trigger |
//! |--------|---------------|
//! | [`FlushPolicy::BySize`] | bytes written since the last flush reach the threshold |
//! | [`FlushPolicy::ByTime`] | every tick of a background thread |
//!
//! [`sync`](Writer::sync) and [`close`](Writer::close) always flush.
//!
//! # Failures
//!
//! Staged bytes only leave the buffer once the handle has accepted them; a
//! failed drain keeps them for the next attempt. A background flush has no
//! caller to report to, so its first failure is held and returned by the
//! next [`write`](Writer::write), [`sync`](Writer::sync) or
//! [`close`](Writer::close).

use std::io::{self, SeekFrom};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, trace, warn};

use crate::flusher::Flusher;
use crate::handle::BufferedFile;
use crate::{FlushPolicy, HandleId, IoOp, PoolError, Result, WriteHandle};

/// Counters describing what a writer has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    /// Bytes accepted by [`Writer::write`].
    pub bytes_written: u64,
    /// Completed flushes (policy-driven, explicit and on close).
    pub flushes: u64,
    /// Bytes written since the last flush.
    pub pending: u64,
    /// Background flushes that failed.
    pub failed_flushes: u64,
}

/// Write side of a file.
///
/// All operations take one exclusive lock, so concurrent writes are applied
/// one after another and a background flush never interleaves with a write.
/// A failed write leaves the writer usable; it never retries on its own.
pub struct Writer {
    id: HandleId,
    shared: Arc<Shared>,
    flusher: Mutex<Option<Flusher>>,
}

struct Shared {
    id: HandleId,
    path: PathBuf,
    policy: FlushPolicy,
    capacity: usize,
    state: Mutex<State>,
}

struct State {
    file: Option<BufferedFile<dyn WriteHandle>>,
    staged: Vec<u8>,
    staged_at: u64,
    cursor: u64,
    stats: WriterStats,
    deferred: Option<PoolError>,
}

/// Writer state held under its lock.
struct Locked<'a> {
    shared: &'a Shared,
    state: MutexGuard<'a, State>,
}

impl Writer {
    /// Wrap an open handle for `path` with a staging buffer of
    /// `memory_rent` bytes.
    ///
    /// # Errors
    ///
    /// - [`PoolError::ConfigConflict`] if a size-based threshold exceeds
    ///   `memory_rent`
    /// - [`PoolError::InvalidConfig`] if `memory_rent` is zero or does not fit
    ///   in memory, or the policy's threshold or interval is zero
    /// - [`PoolError::Io`] if the background flusher cannot be started
    pub fn new(
        path: impl Into<PathBuf>,
        handle: Box<dyn WriteHandle>,
        memory_rent: u64,
        policy: FlushPolicy,
    ) -> Result<Self> {
        crate::config::check_flush(memory_rent, policy)?;
        let capacity = usize::try_from(memory_rent).map_err(|_| PoolError::InvalidConfig {
            field: "memory_rent",
            reason: format!("{memory_rent} bytes does not fit in memory"),
        })?;

        let path = path.into();
        let id = HandleId::new();
        let shared = Arc::new(Shared {
            id,
            state: Mutex::new(State {
                file: Some(BufferedFile::new(path.clone(), handle)),
                staged: Vec::with_capacity(capacity),
                staged_at: 0,
                cursor: 0,
                stats: WriterStats::default(),
                deferred: None,
            }),
            path,
            policy,
            capacity,
        });

        let flusher = match policy {
            FlushPolicy::BySize(_) => None,
            FlushPolicy::ByTime(interval) => {
                let ticking = Arc::clone(&shared);
                let flusher = Flusher::spawn(format!("fspool-flush-{id}"), interval, move || {
                    ticking.tick()
                })
                .map_err(|source| PoolError::io(IoOp::Open, &shared.path, source))?;
                Some(flusher)
            }
        };

        Ok(Self {
            id,
            shared,
            flusher: Mutex::new(flusher),
        })
    }

    /// Stable identity for logs and diagnostics.
    pub fn id(&self) -> HandleId {
        self.id
    }

    /// The file this writer is bound to.
    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    /// The active flush policy.
    pub fn policy(&self) -> FlushPolicy {
        self.shared.policy
    }

    /// Size of the staging buffer in bytes.
    pub fn memory_rent(&self) -> u64 {
        self.shared.capacity as u64
    }

    /// Returns `true` once [`close`](Writer::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.shared.lock().state.file.is_none()
    }

    /// Snapshot of the writer's counters.
    pub fn stats(&self) -> WriterStats {
        self.shared.lock().state.stats
    }

    /// Write `data` at `pos`.
    ///
    /// `SeekFrom::Current` is relative to the end of the previous write.
    /// Under [`FlushPolicy::BySize`] this flushes before returning once the
    /// bytes written since the last flush reach the threshold. If that flush
    /// fails the bytes stay staged and the error is returned.
    ///
    /// # Errors
    ///
    /// - [`PoolError::WriterUnavailable`] after [`close`](Writer::close)
    /// - the held failure of an earlier background flush; `data` is then not
    ///   written
    /// - [`PoolError::Io`] with [`IoOp::Seek`], [`IoOp::Write`] or
    ///   [`IoOp::Sync`] naming the primitive that failed
    pub fn write(&self, data: &[u8], pos: SeekFrom) -> Result<()> {
        let mut locked = self.shared.lock();
        locked.ensure_open()?;
        locked.take_deferred()?;
        locked.write(data, pos)?;
        trace!("writer {} staged {} bytes", self.id, data.len());

        if let FlushPolicy::BySize(threshold) = self.shared.policy {
            if locked.state.stats.pending >= threshold {
                locked.flush()?;
                debug!(
                    "writer {} flushed {} at size threshold {}",
                    self.id,
                    self.shared.path.display(),
                    threshold
                );
            }
        }
        Ok(())
    }

    /// Flush staged bytes and make everything written so far durable.
    ///
    /// Returns the held failure of an earlier background flush first,
    /// without flushing; the staged bytes are kept and a later call retries.
    pub fn sync(&self) -> Result<()> {
        let mut locked = self.shared.lock();
        locked.ensure_open()?;
        locked.take_deferred()?;
        locked.flush()
    }

    /// Push staged bytes to the OS handle without syncing.
    ///
    /// Lets readers holding separate handles observe completed writes. A
    /// closed writer has nothing staged, so this is then a no-op. On failure
    /// the bytes stay staged.
    pub fn drain(&self) -> Result<()> {
        let mut locked = self.shared.lock();
        if locked.state.file.is_none() {
            return Ok(());
        }
        locked.drain()
    }

    /// Flush, then release the underlying handle.
    ///
    /// Waits for an in-flight write or background flush to finish. The
    /// handle is released even when the final flush fails; that failure is
    /// logged and returned, and the writer counts as closed either way.
    ///
    /// # Errors
    ///
    /// - [`PoolError::WriterUnavailable`] if already closed
    /// - the held failure of an earlier background flush
    /// - [`PoolError::Io`] if the final flush or the close itself failed
    pub fn close(&self) -> Result<()> {
        self.stop_flusher();

        let mut locked = self.shared.lock();
        locked.ensure_open()?;
        let deferred = locked.take_deferred();
        let flushed = locked.flush();
        let closed = match locked.state.file.take() {
            Some(file) => file.close(),
            None => Ok(()),
        };
        drop(locked);

        if let Err(e) = &flushed {
            warn!("writer {}: flush on close failed: {e}", self.id);
        }
        debug!("writer {} closed {}", self.id, self.shared.path.display());
        deferred.and(flushed).and(closed)
    }

    fn stop_flusher(&self) {
        let flusher = self
            .flusher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(mut flusher) = flusher {
            flusher.stop();
        }
    }
}

impl Drop for Writer {
    fn drop(&mut self) {
        if !self.is_closed() {
            if let Err(e) = self.close() {
                warn!("writer {}: close on drop failed: {e}", self.id);
            }
        }
    }
}

impl std::fmt::Debug for Writer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Writer")
            .field("id", &self.id)
            .field("path", &self.shared.path)
            .field("policy", &self.shared.policy)
            .field("memory_rent", &self.shared.capacity)
            .finish()
    }
}

impl Shared {
    fn lock(&self) -> Locked<'_> {
        Locked {
            shared: self,
            state: self.state.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    fn unavailable(&self) -> PoolError {
        PoolError::WriterUnavailable {
            path: self.path.clone(),
        }
    }

    /// One background flush. Stops the ticker once the writer is closed.
    fn tick(&self) -> ControlFlow<()> {
        let mut locked = self.lock();
        if locked.state.file.is_none() {
            return ControlFlow::Break(());
        }
        match locked.flush() {
            Ok(()) => trace!("writer {} timed flush", self.id),
            Err(e) => {
                warn!("writer {}: timed flush failed: {e}", self.id);
                locked.state.stats.failed_flushes += 1;
                if locked.state.deferred.is_none() {
                    locked.state.deferred = Some(e);
                }
            }
        }
        ControlFlow::Continue(())
    }
}

impl Locked<'_> {
    fn ensure_open(&self) -> Result<()> {
        match self.state.file {
            Some(_) => Ok(()),
            None => Err(self.shared.unavailable()),
        }
    }

    fn take_deferred(&mut self) -> Result<()> {
        match self.state.deferred.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn file_mut(&mut self) -> Result<&mut BufferedFile<dyn WriteHandle>> {
        let shared = self.shared;
        self.state.file.as_mut().ok_or_else(|| shared.unavailable())
    }

    fn seek_error(&self, reason: &str) -> PoolError {
        let source = io::Error::new(io::ErrorKind::InvalidInput, reason.to_owned());
        PoolError::io(IoOp::Seek, &self.shared.path, source)
    }

    fn write(&mut self, data: &[u8], pos: SeekFrom) -> Result<()> {
        let start = self.resolve(pos)?;
        let len = data.len() as u64;
        let end = start
            .checked_add(len)
            .ok_or_else(|| self.seek_error("write ends past the largest file offset"))?;

        let capacity = self.shared.capacity;
        let staged_end = self.state.staged_at + self.state.staged.len() as u64;
        if !self.state.staged.is_empty()
            && (start != staged_end || self.state.staged.len() + data.len() > capacity)
        {
            self.drain()?;
        }

        if data.len() > capacity {
            self.file_mut()?.seek_and_write(data, SeekFrom::Start(start))?;
        } else {
            let state = &mut *self.state;
            if state.staged.is_empty() {
                state.staged_at = start;
            }
            state.staged.extend_from_slice(data);
        }

        let state = &mut *self.state;
        state.cursor = end;
        state.stats.bytes_written += len;
        state.stats.pending += len;
        Ok(())
    }

    fn resolve(&mut self, pos: SeekFrom) -> Result<u64> {
        match pos {
            SeekFrom::Start(offset) => Ok(offset),
            SeekFrom::Current(delta) => self
                .state
                .cursor
                .checked_add_signed(delta)
                .ok_or_else(|| self.seek_error("seek before start of file")),
            SeekFrom::End(delta) => {
                self.drain()?;
                self.file_mut()?.seek(SeekFrom::End(delta))
            }
        }
    }

    /// Write staged bytes through to the handle. They are dropped from the
    /// buffer only once the handle accepted all of them.
    fn drain(&mut self) -> Result<()> {
        let state = &mut *self.state;
        if state.staged.is_empty() {
            return Ok(());
        }
        let Some(file) = state.file.as_mut() else {
            return Ok(());
        };
        file.seek_and_write(&state.staged, SeekFrom::Start(state.staged_at))?;
        state.staged.clear();
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.drain()?;
        self.file_mut()?.sync()?;
        self.state.stats.pending = 0;
        self.state.stats.flushes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorKind, FileSystem, KIB, MemoryFs};
    use std::thread;
    use std::time::{Duration, Instant};

    fn open(fs: &MemoryFs, path: &str, rent: u64, policy: FlushPolicy) -> Writer {
        let handle = fs.open_write(Path::new(path)).unwrap();
        Writer::new(path, handle, rent, policy).unwrap()
    }

    #[test]
    fn threshold_above_rent_is_rejected() {
        let fs = MemoryFs::new();
        let handle = fs.open_write(Path::new("/f")).unwrap();
        let err = Writer::new("/f", handle, 10, FlushPolicy::BySize(11)).unwrap_err();
        assert!(matches!(
            err,
            PoolError::ConfigConflict {
                memory_rent: 10,
                flush_size: 11
            }
        ));
    }

    #[test]
    fn small_writes_stay_staged_until_threshold() {
        let fs = MemoryFs::new();
        let writer = open(&fs, "/f", 64, FlushPolicy::BySize(8));

        writer.write(b"abc", SeekFrom::Start(0)).unwrap();
        assert_eq!(fs.contents("/f").unwrap(), b"");
        assert_eq!(writer.stats().pending, 3);

        writer.write(b"defgh", SeekFrom::Current(0)).unwrap();
        assert_eq!(fs.durable_contents("/f").unwrap(), b"abcdefgh");
        assert_eq!(
            writer.stats(),
            WriterStats {
                bytes_written: 8,
                flushes: 1,
                pending: 0,
                failed_flushes: 0,
            }
        );
    }

    #[test]
    fn one_large_write_flushes_once() {
        let fs = MemoryFs::new();
        let writer = open(&fs, "/f", 1024 * KIB, FlushPolicy::BySize(256 * KIB));
        let data = vec![7u8; 300 * 1024];

        writer.write(&data, SeekFrom::Start(0)).unwrap();

        assert_eq!(writer.stats().flushes, 1);
        assert_eq!(fs.sync_count(), 1);
        assert_eq!(fs.durable_contents("/f").unwrap(), data);
    }

    #[test]
    fn write_larger_than_rent_goes_straight_through() {
        let fs = MemoryFs::new();
        let writer = open(&fs, "/f", 4, FlushPolicy::ByTime(Duration::from_secs(3600)));
        writer.write(b"0123456789", SeekFrom::Start(0)).unwrap();
        assert_eq!(fs.contents("/f").unwrap(), b"0123456789");
        assert_eq!(fs.durable_contents("/f").unwrap(), b"");
        writer.close().unwrap();
    }

    #[test]
    fn non_contiguous_write_drains_previous_stage() {
        let fs = MemoryFs::new();
        let writer = open(&fs, "/f", 64, FlushPolicy::BySize(64));
        writer.write(b"aaaa", SeekFrom::Start(0)).unwrap();
        writer.write(b"bb", SeekFrom::Start(1)).unwrap();
        assert_eq!(fs.contents("/f").unwrap(), b"aaaa");
        writer.sync().unwrap();
        assert_eq!(fs.durable_contents("/f").unwrap(), b"abba");
    }

    #[test]
    fn write_relative_to_end() {
        let fs = MemoryFs::new();
        fs.insert_file("/f", b"head");
        let writer = open(&fs, "/f", 64, FlushPolicy::BySize(64));
        writer.write(b"-tail", SeekFrom::End(0)).unwrap();
        writer.write(b"!", SeekFrom::End(0)).unwrap();
        writer.sync().unwrap();
        assert_eq!(fs.durable_contents("/f").unwrap(), b"head-tail!");
    }

    #[test]
    fn negative_current_offset_is_a_seek_error() {
        let fs = MemoryFs::new();
        let writer = open(&fs, "/f", 64, FlushPolicy::BySize(64));
        let err = writer.write(b"x", SeekFrom::Current(-1)).unwrap_err();
        assert_eq!(err.io_op(), Some(IoOp::Seek));
    }

    #[test]
    fn write_past_largest_offset_is_a_seek_error() {
        let fs = MemoryFs::new();
        let writer = open(&fs, "/f", 64, FlushPolicy::BySize(64));
        let err = writer.write(b"xy", SeekFrom::Start(u64::MAX)).unwrap_err();
        assert_eq!(err.io_op(), Some(IoOp::Seek));
        assert_eq!(writer.stats().bytes_written, 0);
        writer.write(b"ok", SeekFrom::Start(0)).unwrap();
    }

    #[test]
    fn failed_drain_keeps_staged_bytes() {
        let fs = MemoryFs::new();
        let writer = open(&fs, "/f", 64, FlushPolicy::BySize(64));
        writer.write(b"keep me", SeekFrom::Start(0)).unwrap();

        fs.fail(IoOp::Write);
        assert_eq!(writer.drain().unwrap_err().io_op(), Some(IoOp::Write));
        assert_eq!(writer.sync().unwrap_err().io_op(), Some(IoOp::Write));
        assert_eq!(writer.stats().pending, 7);

        fs.heal(IoOp::Write);
        writer.sync().unwrap();
        assert_eq!(fs.durable_contents("/f").unwrap(), b"keep me");
    }

    #[test]
    fn failed_write_leaves_writer_usable() {
        let fs = MemoryFs::new();
        let writer = open(&fs, "/f", 4, FlushPolicy::BySize(4));

        fs.fail(IoOp::Write);
        let err = writer.write(b"abcd", SeekFrom::Start(0)).unwrap_err();
        assert_eq!(err.io_op(), Some(IoOp::Write));

        fs.heal(IoOp::Write);
        writer.write(b"wxyz", SeekFrom::Start(0)).unwrap();
        assert_eq!(fs.durable_contents("/f").unwrap(), b"wxyz");
    }

    #[test]
    fn seek_and_write_failures_are_reported_separately() {
        let fs = MemoryFs::new();
        let writer = open(&fs, "/f", 2, FlushPolicy::BySize(2));

        fs.fail(IoOp::Seek);
        let err = writer.write(b"ab", SeekFrom::Start(0)).unwrap_err();
        assert_eq!(err.io_op(), Some(IoOp::Seek));
        fs.heal(IoOp::Seek);

        fs.fail(IoOp::Write);
        let err = writer.write(b"ab", SeekFrom::Start(0)).unwrap_err();
        assert_eq!(err.io_op(), Some(IoOp::Write));
    }

    #[test]
    fn sync_flushes_staged_bytes() {
        let fs = MemoryFs::new();
        let writer = open(&fs, "/f", 64, FlushPolicy::BySize(64));
        writer.write(b"pending", SeekFrom::Start(0)).unwrap();
        writer.sync().unwrap();
        assert_eq!(fs.durable_contents("/f").unwrap(), b"pending");
        assert_eq!(writer.stats().pending, 0);
    }

    #[test]
    fn drain_writes_without_syncing() {
        let fs = MemoryFs::new();
        let writer = open(&fs, "/f", 64, FlushPolicy::BySize(64));
        writer.write(b"visible", SeekFrom::Start(0)).unwrap();
        writer.drain().unwrap();
        assert_eq!(fs.contents("/f").unwrap(), b"visible");
        assert_eq!(fs.sync_count(), 0);
    }

    #[test]
    fn close_flushes_and_is_not_repeatable() {
        let fs = MemoryFs::new();
        let writer = open(&fs, "/f", 64, FlushPolicy::BySize(64));
        writer.write(b"last words", SeekFrom::Start(0)).unwrap();
        writer.close().unwrap();
        assert_eq!(fs.durable_contents("/f").unwrap(), b"last words");
        assert!(writer.is_closed());

        for _ in 0..2 {
            let err = writer.close().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ResourceUnavailable);
        }
        let err = writer.write(b"x", SeekFrom::Start(0)).unwrap_err();
        assert!(matches!(err, PoolError::WriterUnavailable { .. }));
        assert!(writer.sync().is_err());
    }

    #[test]
    fn close_reports_sync_failure_but_still_closes() {
        let fs = MemoryFs::new();
        let writer = open(&fs, "/f", 64, FlushPolicy::BySize(64));
        writer.write(b"data", SeekFrom::Start(0)).unwrap();

        fs.fail(IoOp::Sync);
        let err = writer.close().unwrap_err();
        assert_eq!(err.io_op(), Some(IoOp::Sync));
        assert!(writer.is_closed());
        // The bytes reached the handle even though they were never synced.
        assert_eq!(fs.contents("/f").unwrap(), b"data");
    }

    #[test]
    fn drop_flushes_staged_bytes() {
        let fs = MemoryFs::new();
        let writer = open(&fs, "/f", 64, FlushPolicy::BySize(64));
        writer.write(b"dropped", SeekFrom::Start(0)).unwrap();
        drop(writer);
        assert_eq!(fs.durable_contents("/f").unwrap(), b"dropped");
    }

    #[test]
    fn timed_policy_flushes_in_background() {
        let fs = MemoryFs::new();
        let writer = open(&fs, "/f", 64, FlushPolicy::ByTime(Duration::from_millis(10)));
        writer.write(b"tick", SeekFrom::Start(0)).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while fs.durable_contents("/f").unwrap() != b"tick" && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(fs.durable_contents("/f").unwrap(), b"tick");
        assert!(writer.stats().flushes >= 1);
        writer.close().unwrap();
    }

    #[test]
    fn failed_timed_flush_is_reported_by_next_sync() {
        let fs = MemoryFs::new();
        let writer = open(&fs, "/f", 64, FlushPolicy::ByTime(Duration::from_millis(10)));
        fs.fail(IoOp::Write);
        writer.write(b"precious", SeekFrom::Start(0)).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while writer.stats().failed_flushes == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(writer.stats().failed_flushes >= 1);

        fs.heal(IoOp::Write);
        let err = writer.sync().unwrap_err();
        assert_eq!(err.io_op(), Some(IoOp::Write));

        // The bytes were kept and land on the next flush.
        writer.sync().unwrap();
        assert_eq!(fs.durable_contents("/f").unwrap(), b"precious");
        writer.close().unwrap();
    }

    #[test]
    fn failed_timed_flush_is_reported_by_close() {
        let fs = MemoryFs::new();
        let writer = open(&fs, "/f", 64, FlushPolicy::ByTime(Duration::from_millis(10)));
        fs.fail(IoOp::Sync);
        writer.write(b"late", SeekFrom::Start(0)).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while writer.stats().failed_flushes == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        fs.heal(IoOp::Sync);

        let err = writer.close().unwrap_err();
        assert_eq!(err.io_op(), Some(IoOp::Sync));
        assert!(writer.is_closed());
        assert_eq!(fs.durable_contents("/f").unwrap(), b"late");
    }

    #[test]
    fn timed_policy_never_flushes_by_size() {
        let fs = MemoryFs::new();
        let writer = open(&fs, "/f", 8, FlushPolicy::ByTime(Duration::from_secs(3600)));
        writer.write(b"12345678", SeekFrom::Start(0)).unwrap();
        assert_eq!(writer.stats().flushes, 0);
        assert_eq!(fs.sync_count(), 0);
        writer.close().unwrap();
        assert_eq!(fs.sync_count(), 1);
    }

    #[test]
    fn concurrent_writes_are_serialized() {
        let fs = MemoryFs::new();
        let writer = Arc::new(open(&fs, "/f", 16, FlushPolicy::BySize(16)));

        let threads: Vec<_> = (0..8u8)
            .map(|i| {
                let writer = Arc::clone(&writer);
                thread::spawn(move || {
                    let chunk = [b'a' + i; 4];
                    writer
                        .write(&chunk, SeekFrom::Start(u64::from(i) * 4))
                        .unwrap();
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        writer.sync().unwrap();

        let data = fs.durable_contents("/f").unwrap();
        assert_eq!(data.len(), 32);
        for (i, chunk) in data.chunks(4).enumerate() {
            assert_eq!(chunk, [b'a' + i as u8; 4]);
        }
        assert_eq!(writer.stats().bytes_written, 32);
    }
}
