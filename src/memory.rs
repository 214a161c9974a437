//! In-memory [`FileSystem`] for tests and examples.
//!
//! Besides storing files in memory, [`MemoryFs`] keeps a few knobs that make
//! concurrency and durability behaviour observable:
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`contents`](MemoryFs::contents) | Bytes written so far |
//! | [`durable_contents`](MemoryFs::durable_contents) | Bytes as of the last sync |
//! | [`sync_count`](MemoryFs::sync_count) | Number of successful syncs |
//! | [`fail`](MemoryFs::fail) / [`heal`](MemoryFs::heal) | Inject failures per primitive |
//! | [`pause_reads`](MemoryFs::pause_reads) | Hold reads in flight until released |

use std::collections::{HashMap, HashSet};
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::{FileSystem, IoOp, ReadHandle, WriteHandle};

/// In-memory file system. Cheap to clone; clones share state.
///
/// # Example
///
/// ```rust
/// use fspool::{FileSystem, MemoryFs};
/// use std::path::Path;
///
/// let fs = MemoryFs::new();
/// fs.insert_file("/data/a.txt", b"hello");
/// assert!(fs.exists(Path::new("/data")).unwrap());
/// assert_eq!(fs.contents("/data/a.txt").unwrap(), b"hello");
/// ```
#[derive(Clone, Default)]
pub struct MemoryFs {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    tree: Mutex<Tree>,
    failing: Mutex<HashSet<IoOp>>,
    syncs: AtomicUsize,
    opens: AtomicUsize,
    gate: Mutex<Gate>,
    gate_changed: Condvar,
}

#[derive(Default)]
struct Tree {
    files: HashMap<PathBuf, Arc<Mutex<MemFile>>>,
    dirs: HashSet<PathBuf>,
}

#[derive(Default)]
struct MemFile {
    data: Vec<u8>,
    durable: Vec<u8>,
}

#[derive(Default)]
struct Gate {
    paused: bool,
    blocked: usize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryFs {
    /// Create an empty file system containing only the root directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (or replace) a file, creating its parent directories.
    pub fn insert_file(&self, path: impl AsRef<Path>, data: &[u8]) {
        let path = path.as_ref();
        let mut tree = lock(&self.inner.tree);
        if let Some(parent) = path.parent() {
            tree.add_dirs(parent);
        }
        let file = MemFile {
            data: data.to_vec(),
            durable: data.to_vec(),
        };
        tree.files
            .insert(path.to_path_buf(), Arc::new(Mutex::new(file)));
    }

    /// Current contents of a file, including unsynced writes.
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        let tree = lock(&self.inner.tree);
        tree.files.get(path.as_ref()).map(|f| lock(f).data.clone())
    }

    /// Contents of a file as of its last successful sync.
    pub fn durable_contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        let tree = lock(&self.inner.tree);
        tree.files.get(path.as_ref()).map(|f| lock(f).durable.clone())
    }

    /// Returns `true` if `path` is a known directory.
    pub fn is_dir(&self, path: impl AsRef<Path>) -> bool {
        lock(&self.inner.tree).is_dir(path.as_ref())
    }

    /// Number of successful syncs across all handles.
    pub fn sync_count(&self) -> usize {
        self.inner.syncs.load(Ordering::SeqCst)
    }

    /// Number of handles opened so far.
    pub fn open_count(&self) -> usize {
        self.inner.opens.load(Ordering::SeqCst)
    }

    /// Make every subsequent call of `op` fail until [`heal`](Self::heal).
    pub fn fail(&self, op: IoOp) {
        lock(&self.inner.failing).insert(op);
    }

    /// Stop failing `op`.
    pub fn heal(&self, op: IoOp) {
        lock(&self.inner.failing).remove(&op);
    }

    /// Block every read that starts while the returned guard is alive.
    ///
    /// Blocked reads resume when the guard is dropped.
    pub fn pause_reads(&self) -> ReadPause {
        lock(&self.inner.gate).paused = true;
        ReadPause {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Wait until at least `count` reads are blocked by a [`ReadPause`].
    ///
    /// Returns `false` if that did not happen within `timeout`.
    pub fn wait_for_blocked_reads(&self, count: usize, timeout: Duration) -> bool {
        let gate = lock(&self.inner.gate);
        let (gate, _) = self
            .inner
            .gate_changed
            .wait_timeout_while(gate, timeout, |g| g.blocked < count)
            .unwrap_or_else(PoisonError::into_inner);
        gate.blocked >= count
    }

    fn check(&self, op: IoOp) -> io::Result<()> {
        self.inner.check(op)
    }
}

impl Inner {
    fn check(&self, op: IoOp) -> io::Result<()> {
        if lock(&self.failing).contains(&op) {
            return Err(io::Error::other(format!("injected {op} failure")));
        }
        Ok(())
    }

    fn wait_if_paused(&self) {
        let mut gate = lock(&self.gate);
        if !gate.paused {
            return;
        }
        gate.blocked += 1;
        self.gate_changed.notify_all();
        let mut gate = self
            .gate_changed
            .wait_while(gate, |g| g.paused)
            .unwrap_or_else(PoisonError::into_inner);
        gate.blocked -= 1;
    }
}

impl Tree {
    fn is_dir(&self, path: &Path) -> bool {
        path.as_os_str().is_empty() || path.parent().is_none() || self.dirs.contains(path)
    }

    fn add_dirs(&mut self, path: &Path) {
        for ancestor in path.ancestors() {
            if ancestor.parent().is_some() && !ancestor.as_os_str().is_empty() {
                self.dirs.insert(ancestor.to_path_buf());
            }
        }
    }
}

impl std::fmt::Debug for MemoryFs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tree = lock(&self.inner.tree);
        f.debug_struct("MemoryFs")
            .field("files", &tree.files.len())
            .field("dirs", &tree.dirs.len())
            .finish()
    }
}

impl FileSystem for MemoryFs {
    fn exists(&self, path: &Path) -> io::Result<bool> {
        self.check(IoOp::Stat)?;
        let tree = lock(&self.inner.tree);
        Ok(tree.files.contains_key(path) || tree.is_dir(path))
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let mut tree = lock(&self.inner.tree);
        if let Some(file) = path.ancestors().find(|a| tree.files.contains_key(*a)) {
            return Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("{} is a file", file.display()),
            ));
        }
        tree.add_dirs(path);
        Ok(())
    }

    fn open_read(&self, path: &Path) -> io::Result<Box<dyn ReadHandle>> {
        self.check(IoOp::Open)?;
        let tree = lock(&self.inner.tree);
        let file = tree
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;
        self.inner.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemHandle {
            file,
            pos: 0,
            fs: Arc::clone(&self.inner),
        }))
    }

    fn open_write(&self, path: &Path) -> io::Result<Box<dyn WriteHandle>> {
        self.check(IoOp::Open)?;
        let mut tree = lock(&self.inner.tree);
        if let Some(parent) = path.parent() {
            if !tree.is_dir(parent) {
                return Err(io::Error::from(io::ErrorKind::NotFound));
            }
        }
        let file = Arc::clone(tree.files.entry(path.to_path_buf()).or_default());
        self.inner.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemHandle {
            file,
            pos: 0,
            fs: Arc::clone(&self.inner),
        }))
    }
}

/// Guard returned by [`MemoryFs::pause_reads`].
#[must_use = "reads resume as soon as the pause is dropped"]
pub struct ReadPause {
    inner: Arc<Inner>,
}

impl Drop for ReadPause {
    fn drop(&mut self) {
        lock(&self.inner.gate).paused = false;
        self.inner.gate_changed.notify_all();
    }
}

struct MemHandle {
    file: Arc<Mutex<MemFile>>,
    pos: u64,
    fs: Arc<Inner>,
}

impl MemHandle {
    fn seek_to(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.fs.check(IoOp::Seek)?;
        let len = lock(&self.file).data.len() as u64;
        let target = match pos {
            SeekFrom::Start(n) => Some(n),
            SeekFrom::Current(d) => self.pos.checked_add_signed(d),
            SeekFrom::End(d) => len.checked_add_signed(d),
        };
        let target = target.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "seek before start of file")
        })?;
        self.pos = target;
        Ok(target)
    }
}

impl ReadHandle for MemHandle {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.seek_to(pos)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.fs.wait_if_paused();
        self.fs.check(IoOp::Read)?;
        let file = lock(&self.file);
        let start = usize::try_from(self.pos).unwrap_or(usize::MAX);
        if start >= file.data.len() {
            return Ok(0);
        }
        let n = buf.len().min(file.data.len() - start);
        buf[..n].copy_from_slice(&file.data[start..start + n]);
        self.pos += n as u64;
        Ok(n)
    }

    fn size(&mut self) -> io::Result<u64> {
        self.fs.check(IoOp::Stat)?;
        Ok(lock(&self.file).data.len() as u64)
    }

    fn close(self: Box<Self>) -> io::Result<()> {
        self.fs.check(IoOp::Close)
    }
}

impl WriteHandle for MemHandle {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.seek_to(pos)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.fs.check(IoOp::Write)?;
        let mut file = lock(&self.file);
        let start = usize::try_from(self.pos)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "offset too large"))?;
        let end = start + buf.len();
        if end > file.data.len() {
            file.data.resize(end, 0);
        }
        file.data[start..end].copy_from_slice(buf);
        self.pos = end as u64;
        Ok(buf.len())
    }

    fn sync(&mut self) -> io::Result<()> {
        self.fs.check(IoOp::Sync)?;
        let mut file = lock(&self.file);
        file.durable = file.data.clone();
        self.fs.syncs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(self: Box<Self>) -> io::Result<()> {
        self.fs.check(IoOp::Close)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn root_always_exists() {
        let fs = MemoryFs::new();
        assert!(fs.exists(Path::new("/")).unwrap());
        assert!(!fs.exists(Path::new("/nope")).unwrap());
    }

    #[test]
    fn open_write_needs_parent_directory() {
        let fs = MemoryFs::new();
        assert!(fs.open_write(Path::new("/a/b.txt")).is_err());
        fs.create_dir_all(Path::new("/a")).unwrap();
        assert!(fs.open_write(Path::new("/a/b.txt")).is_ok());
        assert!(fs.exists(Path::new("/a/b.txt")).unwrap());
    }

    #[test]
    fn writes_become_durable_on_sync() {
        let fs = MemoryFs::new();
        let mut w = fs.open_write(Path::new("/f")).unwrap();
        w.write(b"abc").unwrap();
        assert_eq!(fs.contents("/f").unwrap(), b"abc");
        assert_eq!(fs.durable_contents("/f").unwrap(), b"");

        w.sync().unwrap();
        assert_eq!(fs.durable_contents("/f").unwrap(), b"abc");
        assert_eq!(fs.sync_count(), 1);
    }

    #[test]
    fn write_past_end_zero_fills() {
        let fs = MemoryFs::new();
        let mut w = fs.open_write(Path::new("/f")).unwrap();
        w.seek(SeekFrom::Start(3)).unwrap();
        w.write(b"x").unwrap();
        assert_eq!(fs.contents("/f").unwrap(), b"\0\0\0x");
    }

    #[test]
    fn injected_failures_apply_until_healed() {
        let fs = MemoryFs::new();
        fs.insert_file("/f", b"data");
        let mut r = fs.open_read(Path::new("/f")).unwrap();

        fs.fail(IoOp::Seek);
        assert!(r.seek(SeekFrom::Start(0)).is_err());
        fs.heal(IoOp::Seek);
        assert!(r.seek(SeekFrom::Start(0)).is_ok());
    }

    #[test]
    fn seek_before_start_is_rejected() {
        let fs = MemoryFs::new();
        fs.insert_file("/f", b"data");
        let mut r = fs.open_read(Path::new("/f")).unwrap();
        let err = r.seek(SeekFrom::End(-10)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn paused_reads_block_until_released() {
        let fs = MemoryFs::new();
        fs.insert_file("/f", b"data");
        let mut r = fs.open_read(Path::new("/f")).unwrap();

        let pause = fs.pause_reads();
        let reader = thread::spawn(move || {
            let mut buf = [0u8; 4];
            r.read(&mut buf).unwrap();
            buf
        });

        assert!(fs.wait_for_blocked_reads(1, Duration::from_secs(5)));
        drop(pause);
        assert_eq!(&reader.join().unwrap(), b"data");
    }

    #[test]
    fn clones_share_state() {
        let fs = MemoryFs::new();
        let other = fs.clone();
        fs.insert_file("/shared", b"1");
        assert_eq!(other.contents("/shared").unwrap(), b"1");
    }
}
