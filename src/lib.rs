//! # fspool
//!
//! A **managed access layer over on-disk files**: a bounded pool of open
//! files, each exposed through permission-scoped reader and writer handles
//! that are safe to share between threads.
//!
//! Writes are staged in a per-file memory buffer and flushed to disk by a
//! size threshold or a time interval. Reads never queue: a read that finds
//! the file's reader occupied fails at once so the caller can retry or go
//! elsewhere.
//!
//! ---
//!
//! ## Quick Start
//!
//! ```rust
//! use fspool::{FlushPolicy, FsPool, MemoryFs, PoolConfig, KIB};
//! use std::io::SeekFrom;
//!
//! let config = PoolConfig::default()
//!     .with_memory_rent(64 * KIB)
//!     .with_flush_policy(FlushPolicy::BySize(16 * KIB))
//!     .with_instance_limit(16);
//! let pool = FsPool::new(config, MemoryFs::new())?;
//!
//! let file = pool.acquire("/data/segment-0001")?;
//! file.write(b"record", SeekFrom::Start(0))?;
//! assert_eq!(file.read_at(SeekFrom::Start(0), 6)?, b"record");
//! file.sync()?;
//! # Ok::<(), fspool::PoolError>(())
//! ```
//!
//! Use [`FsPool::native`] for real files.
//!
//! ---
//!
//! ## Core Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`FsPool`] | Bounded, keyed set of instances with LRU eviction of idle ones |
//! | [`PoolHandle`] | Reference to a pooled instance, released on drop |
//! | [`FsInstance`] | One file bound to its reader slots and writer |
//! | [`Reader`] | Positioned reads over one handle |
//! | [`Writer`] | Staged, serialized writes with a flush policy |
//! | [`PoolConfig`] / [`InstanceConfig`] | Pool defaults and resolved per-file settings |
//! | [`PoolError`] | Error type with path and primitive context |
//!
//! ---
//!
//! ## Flushing
//!
//! | Policy | Fires |
//! |--------|-------|
//! | [`FlushPolicy::BySize`] | After a write once unflushed bytes reach the threshold |
//! | [`FlushPolicy::ByTime`] | On every tick of a background timer per writer |
//!
//! A flush writes staged bytes through and syncs the file. [`FsInstance::sync`]
//! flushes on demand and closing a writer always flushes.
//!
//! ---
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, PoolError>`](Result). Each variant
//! maps onto a coarse [`ErrorKind`]:
//!
//! ```rust
//! use fspool::{ErrorKind, PoolError};
//! use std::path::PathBuf;
//!
//! let err = PoolError::ReaderBusy { path: PathBuf::from("/data/a") };
//! assert_eq!(err.to_string(), "reader busy: /data/a");
//! assert_eq!(err.kind(), ErrorKind::ResourceBusy);
//! assert!(err.is_retryable());
//! ```
//!
//! ---
//!
//! ## Thread Safety
//!
//! [`FsPool`], [`PoolHandle`] and [`FsInstance`] are `Send + Sync` and every
//! method takes `&self`.
//!
//! - Writes on one instance are serialized; a second writer waits.
//! - Reads claim a reader slot without waiting and fail with
//!   [`PoolError::ReaderBusy`] when none is free.
//! - Time-based flushes take the same lock as writes.
//! - Pool bookkeeping sits behind one mutex, so limits hold exactly under
//!   concurrent acquire and release.
//!
//! ---
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `serde` | Serialization for configuration types and [`PoolConfig::from_json`] |

// Private modules
mod config;
mod error;
mod flusher;
mod handle;
mod instance;
mod memory;
mod native;
mod paths;
mod pool;
mod reader;
mod traits;
mod types;
mod writer;

// Public re-exports - error types
pub use error::{ErrorKind, IoOp, PoolError, Result};

// Public re-exports - core types
pub use types::{FilePermission, FlushPolicy, HandleId, KIB, MIB};

// Public re-exports - configuration
pub use config::{
    DEFAULT_INSTANCE_LIMIT, DEFAULT_MEMORY_RENT, DEFAULT_READER_LIMIT, InstanceConfig,
    InstanceOverrides, PoolConfig,
};

// Public re-exports - collaborator traits
pub use traits::{FileSystem, ReadHandle, WriteHandle};

// Public re-exports - file systems
pub use memory::{MemoryFs, ReadPause};
pub use native::NativeFs;

// Public re-exports - engine
pub use instance::{FsInstance, InstanceState};
pub use pool::{FsPool, PoolHandle, PoolStats};
pub use reader::Reader;
pub use writer::{Writer, WriterStats};
