//! Bounded set of [`FsInstance`]s shared between threads.
//!
//! Instances are keyed by `(path, permission)`. Acquiring a key that is
//! already live hands out the existing instance; otherwise a new one is
//! opened, subject to two limits:
//!
//! | Limit | Config field | Error |
//! |-------|--------------|-------|
//! | Live instances | [`PoolConfig::instance_limit`] | [`PoolError::InstanceLimitExceeded`] |
//! | Summed writer memory rent | [`PoolConfig::memory_budget`] | [`PoolError::MemoryBudgetExceeded`] |
//!
//! # Eviction
//!
//! An instance with no outstanding [`PoolHandle`] is idle. Idle instances
//! stay open for reuse and are evicted lazily, least recently used first,
//! only when a new instance would otherwise breach a limit. Eviction never
//! touches an instance that is referenced or has a read in flight, and an
//! evicted instance is closed (flushing its writer) before it is dropped.
//!
//! Only writable instances commit memory rent; a read-only instance holds no
//! staging buffer.

use std::collections::HashMap;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, warn};

use crate::{
    FilePermission, FileSystem, FsInstance, InstanceConfig, InstanceOverrides, NativeFs,
    PoolConfig, PoolError, Result,
};

type Key = (PathBuf, FilePermission);

/// Thread-safe pool of file instances. Cheap to clone; clones share state.
///
/// # Example
///
/// ```rust
/// use fspool::{FilePermission, FsPool, MemoryFs, PoolConfig};
/// use std::io::SeekFrom;
///
/// let pool = FsPool::new(PoolConfig::default().with_instance_limit(8), MemoryFs::new())?;
///
/// let log = pool.acquire("/var/app/events.log")?;
/// log.write(b"started\n", SeekFrom::End(0))?;
/// log.sync()?;
///
/// assert!(pool.contains("/var/app/events.log", FilePermission::ReadWrite));
/// drop(log); // idle, still open for reuse
/// assert_eq!(pool.stats().idle, 1);
/// # Ok::<(), fspool::PoolError>(())
/// ```
#[derive(Clone)]
pub struct FsPool {
    shared: Arc<Shared>,
}

struct Shared {
    config: PoolConfig,
    fs: Arc<dyn FileSystem>,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    entries: HashMap<Key, Entry>,
    committed: u64,
    clock: u64,
    closed: bool,
}

struct Entry {
    instance: Arc<FsInstance>,
    refs: usize,
    rent: u64,
    last_used: u64,
}

/// Snapshot of pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Live instances, idle ones included.
    pub instances: usize,
    /// Instances without outstanding handles.
    pub idle: usize,
    /// Memory rent committed to live writable instances.
    pub committed_rent: u64,
    /// Configured instance limit.
    pub instance_limit: usize,
    /// Configured memory budget, if any.
    pub memory_budget: Option<u64>,
}

/// A reference to a pooled instance.
///
/// Dereferences to [`FsInstance`]. Dropping the handle releases the
/// reference; the instance itself stays open until the pool evicts it.
pub struct PoolHandle {
    shared: Arc<Shared>,
    key: Key,
    instance: Arc<FsInstance>,
}

impl FsPool {
    /// Create a pool over `fs`.
    ///
    /// # Errors
    ///
    /// Any error of [`PoolConfig::validate`].
    pub fn new(config: PoolConfig, fs: impl FileSystem + 'static) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            shared: Arc::new(Shared {
                config,
                fs: Arc::new(fs),
                state: Mutex::new(State::default()),
            }),
        })
    }

    /// Create a pool over the local file system.
    pub fn native(config: PoolConfig) -> Result<Self> {
        Self::new(config, NativeFs::new())
    }

    /// The pool-wide defaults and limits.
    pub fn config(&self) -> &PoolConfig {
        &self.shared.config
    }

    /// Acquire the instance for `path` with the pool defaults.
    ///
    /// See [`acquire_with`](Self::acquire_with).
    pub fn acquire(&self, path: impl AsRef<Path>) -> Result<PoolHandle> {
        self.acquire_with(path, &InstanceOverrides::none())
    }

    /// Acquire the instance for `path`, overriding pool defaults field by
    /// field.
    ///
    /// The key is the path plus the resolved permission. If that key is
    /// already live the existing instance is returned and the remaining
    /// overrides are ignored.
    ///
    /// # Errors
    ///
    /// - [`PoolError::PoolClosed`] after [`close`](Self::close)
    /// - [`PoolError::InstanceLimitExceeded`] or
    ///   [`PoolError::MemoryBudgetExceeded`] if no idle instance can be
    ///   evicted to make room
    /// - any error of [`FsInstance::open`]
    pub fn acquire_with(
        &self,
        path: impl AsRef<Path>,
        overrides: &InstanceOverrides,
    ) -> Result<PoolHandle> {
        let config = self.shared.config.resolve(path.as_ref(), overrides);
        config.validate()?;
        let key: Key = (config.path.clone(), config.permission);

        let mut state = self.shared.lock();
        if state.closed {
            return Err(PoolError::PoolClosed);
        }

        let tick = state.tick();
        if let Some(entry) = state.entries.get_mut(&key) {
            if !entry.instance.is_closed() {
                entry.refs += 1;
                entry.last_used = tick;
                return Ok(self.handle(key, Arc::clone(&entry.instance)));
            }
        }
        if let Some(stale) = state.entries.remove(&key) {
            state.committed -= stale.rent;
            debug!("dropped closed instance for {}", key.0.display());
        }

        let rent = committed_rent(&config);
        let evicted = state.make_room(&self.shared.config, rent)?;
        let opened = FsInstance::open(config, self.shared.fs.as_ref());
        let instance = match opened {
            Ok(instance) => Arc::new(instance),
            Err(e) => {
                drop(state);
                close_evicted(evicted);
                return Err(e);
            }
        };

        state.committed += rent;
        state.entries.insert(
            key.clone(),
            Entry {
                instance: Arc::clone(&instance),
                refs: 1,
                rent,
                last_used: tick,
            },
        );
        debug!(
            "pool opened {} ({}), {} live",
            key.0.display(),
            key.1,
            state.entries.len()
        );
        drop(state);

        close_evicted(evicted);
        Ok(self.handle(key, instance))
    }

    /// Give a handle back to the pool. Same as dropping it.
    pub fn release(&self, handle: PoolHandle) {
        drop(handle);
    }

    /// Returns `true` if an open instance for the key is live.
    pub fn contains(&self, path: impl AsRef<Path>, permission: FilePermission) -> bool {
        let state = self.shared.lock();
        state
            .entries
            .get(&(path.as_ref().to_path_buf(), permission))
            .is_some_and(|entry| !entry.instance.is_closed())
    }

    /// Close and drop every idle instance. Returns how many were evicted.
    pub fn evict_idle(&self) -> usize {
        let evicted = self.shared.lock().take_idle();
        let count = evicted.len();
        close_evicted(evicted);
        count
    }

    /// Shut the pool down.
    ///
    /// Idle instances are closed now; instances still referenced are closed
    /// when their last handle is dropped. Further acquires fail with
    /// [`PoolError::PoolClosed`].
    ///
    /// # Errors
    ///
    /// The first error from closing an idle instance. Every idle instance is
    /// closed regardless.
    pub fn close(&self) -> Result<()> {
        let idle = {
            let mut state = self.shared.lock();
            state.closed = true;
            state.take_idle()
        };
        debug!("pool closing {} idle instances", idle.len());
        idle.into_iter()
            .map(|instance| instance.close())
            .fold(Ok(()), |first, next| first.and(next))
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }

    /// Snapshot of the pool's occupancy.
    pub fn stats(&self) -> PoolStats {
        let state = self.shared.lock();
        PoolStats {
            instances: state.entries.len(),
            idle: state.entries.values().filter(|e| e.refs == 0).count(),
            committed_rent: state.committed,
            instance_limit: self.shared.config.instance_limit,
            memory_budget: self.shared.config.memory_budget,
        }
    }

    fn handle(&self, key: Key, instance: Arc<FsInstance>) -> PoolHandle {
        PoolHandle {
            shared: Arc::clone(&self.shared),
            key,
            instance,
        }
    }
}

impl std::fmt::Debug for FsPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsPool")
            .field("config", &self.shared.config)
            .field("stats", &self.stats())
            .finish()
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self, key: &Key, instance: &Arc<FsInstance>) {
        let mut state = self.lock();
        let tick = state.tick();
        let closed = state.closed;
        let Some(entry) = state.entries.get_mut(key) else {
            return;
        };
        if !Arc::ptr_eq(&entry.instance, instance) {
            return;
        }
        entry.refs = entry.refs.saturating_sub(1);
        entry.last_used = tick;
        if !(closed && entry.refs == 0) {
            return;
        }

        if let Some(entry) = state.entries.remove(key) {
            state.committed -= entry.rent;
            drop(state);
            if let Err(e) = entry.instance.close() {
                warn!("closing {} after pool shutdown: {e}", key.0.display());
            }
        }
    }
}

impl State {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Remove least recently used idle entries until an instance needing
    /// `rent` fits. Nothing is removed if it cannot fit.
    fn make_room(&mut self, config: &PoolConfig, rent: u64) -> Result<Vec<Arc<FsInstance>>> {
        let budget_exceeded = |committed: u64| PoolError::MemoryBudgetExceeded {
            budget: config.memory_budget.unwrap_or(u64::MAX),
            committed,
            requested: rent,
        };
        let fits = |count: usize, committed: u64| {
            count < config.instance_limit
                && config
                    .memory_budget
                    .is_none_or(|budget| committed.saturating_add(rent) <= budget)
        };

        if config.memory_budget.is_some_and(|budget| rent > budget) {
            return Err(budget_exceeded(self.committed));
        }

        let mut candidates: Vec<(&Key, &Entry)> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_evictable())
            .collect();
        candidates.sort_by_key(|(_, entry)| entry.last_used);

        let mut count = self.entries.len();
        let mut committed = self.committed;
        let mut victims = Vec::new();
        for (key, entry) in candidates {
            if fits(count, committed) {
                break;
            }
            victims.push(key.clone());
            count -= 1;
            committed -= entry.rent;
        }

        if !fits(count, committed) {
            return Err(if self.entries.len() >= config.instance_limit {
                PoolError::InstanceLimitExceeded {
                    limit: config.instance_limit,
                }
            } else {
                budget_exceeded(self.committed)
            });
        }

        Ok(victims
            .into_iter()
            .filter_map(|key| self.remove(&key))
            .collect())
    }

    fn take_idle(&mut self) -> Vec<Arc<FsInstance>> {
        let idle: Vec<Key> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_evictable())
            .map(|(key, _)| key.clone())
            .collect();
        idle.iter().filter_map(|key| self.remove(key)).collect()
    }

    fn remove(&mut self, key: &Key) -> Option<Arc<FsInstance>> {
        let entry = self.entries.remove(key)?;
        self.committed -= entry.rent;
        debug!("pool evicted {} ({})", key.0.display(), key.1);
        Some(entry.instance)
    }
}

impl Entry {
    /// Closed instances can always go; open ones only when unreferenced and
    /// not reading.
    fn is_evictable(&self) -> bool {
        self.instance.is_closed() || (self.refs == 0 && !self.instance.is_reader_busy())
    }
}

fn committed_rent(config: &InstanceConfig) -> u64 {
    if config.permission.can_write() {
        config.memory_rent
    } else {
        0
    }
}

fn close_evicted(evicted: Vec<Arc<FsInstance>>) {
    for instance in evicted {
        if let Err(e) = instance.close() {
            warn!("closing evicted {}: {e}", instance.path().display());
        }
    }
}

impl PoolHandle {
    /// The `(path, permission)` key this handle was acquired under.
    pub fn key(&self) -> (&Path, FilePermission) {
        (&self.key.0, self.key.1)
    }
}

impl Deref for PoolHandle {
    type Target = FsInstance;

    fn deref(&self) -> &FsInstance {
        &self.instance
    }
}

impl Clone for PoolHandle {
    fn clone(&self) -> Self {
        let mut state = self.shared.lock();
        if let Some(entry) = state.entries.get_mut(&self.key) {
            if Arc::ptr_eq(&entry.instance, &self.instance) {
                entry.refs += 1;
            }
        }
        drop(state);
        Self {
            shared: Arc::clone(&self.shared),
            key: self.key.clone(),
            instance: Arc::clone(&self.instance),
        }
    }
}

impl Drop for PoolHandle {
    fn drop(&mut self) {
        self.shared.release(&self.key, &self.instance);
    }
}

impl std::fmt::Debug for PoolHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PoolHandle").field(&*self.instance).finish()
    }
}
