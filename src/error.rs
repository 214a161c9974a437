//! Error types for the file pool.

use std::fmt;
use std::path::PathBuf;

/// Convenience alias used throughout the crate.
pub type Result<T, E = PoolError> = std::result::Result<T, E>;

/// The low-level file primitive that failed.
///
/// Carried by [`PoolError::Io`] so that, for example, a seek failure and a
/// write failure stay distinguishable even though both wrap an
/// [`std::io::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IoOp {
    /// Opening the file handle.
    Open,
    /// Positioning the file cursor.
    Seek,
    /// Reading bytes.
    Read,
    /// Writing bytes.
    Write,
    /// Flushing the handle to durable storage.
    Sync,
    /// Releasing the handle.
    Close,
    /// Querying file size or existence.
    Stat,
}

impl IoOp {
    /// Lowercase name used in error messages and logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            IoOp::Open => "open",
            IoOp::Seek => "seek",
            IoOp::Read => "read",
            IoOp::Write => "write",
            IoOp::Sync => "sync",
            IoOp::Close => "close",
            IoOp::Stat => "stat",
        }
    }
}

impl fmt::Display for IoOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse classification of a [`PoolError`].
///
/// Calling code usually only needs the kind to decide between retrying
/// (e.g. [`ErrorKind::ResourceBusy`]) and giving up (e.g.
/// [`ErrorKind::PathInvalid`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Empty, malformed or missing path.
    PathInvalid,
    /// Configuration values contradict each other or are out of range.
    ConfigConflict,
    /// Reader or writer is absent or already closed.
    ResourceUnavailable,
    /// Reader is occupied by a concurrent caller.
    ResourceBusy,
    /// The underlying file handle reported a failure.
    Io,
    /// A parent directory could not be created.
    DirectoryCreation,
    /// The pool is at its instance limit or memory budget.
    PoolLimitExceeded,
}

/// Error type for every fallible operation in this crate.
///
/// All variants include relevant context (path, primitive, limits) where
/// applicable. Uses `#[non_exhaustive]` for forward compatibility.
///
/// # Examples
///
/// ```rust
/// use fspool::{ErrorKind, PoolError};
/// use std::path::PathBuf;
///
/// let err = PoolError::ReaderBusy { path: PathBuf::from("/data/log") };
/// assert_eq!(err.to_string(), "reader busy: /data/log");
/// assert_eq!(err.kind(), ErrorKind::ResourceBusy);
/// assert!(err.is_retryable());
/// ```
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    // Path errors
    /// The configured file path is empty.
    #[error("file path is empty")]
    EmptyPath,

    /// The file must exist for the requested permission but does not.
    #[error("file not found: {path}")]
    FileNotFound {
        /// The missing file.
        path: PathBuf,
    },

    // Configuration errors
    /// Size-based flush threshold is larger than the staging buffer.
    #[error("memory rent {memory_rent} is smaller than flush size {flush_size}")]
    ConfigConflict {
        /// Bytes reserved for the staging buffer.
        memory_rent: u64,
        /// Configured flush threshold.
        flush_size: u64,
    },

    /// A configuration field is out of range.
    #[error("invalid config: {field} ({reason})")]
    InvalidConfig {
        /// Name of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// Configuration could not be parsed.
    #[cfg(feature = "serde")]
    #[error("config parse error: {0}")]
    ConfigParse(String),

    // Availability errors
    /// The instance has no reader (write-only permission or reader closed).
    #[error("reader unavailable: {path}")]
    ReaderUnavailable {
        /// File the instance is bound to.
        path: PathBuf,
    },

    /// The instance has no writer (read-only permission or writer closed).
    #[error("writer unavailable: {path}")]
    WriterUnavailable {
        /// File the instance is bound to.
        path: PathBuf,
    },

    /// Every reader slot is occupied by a concurrent caller.
    #[error("reader busy: {path}")]
    ReaderBusy {
        /// File the instance is bound to.
        path: PathBuf,
    },

    /// The pool has been shut down.
    #[error("pool is closed")]
    PoolClosed,

    // I/O errors
    /// A primitive of the underlying file handle failed.
    #[error("{op} failed for {path}: {source}")]
    Io {
        /// The primitive that failed.
        op: IoOp,
        /// The file involved.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Parent directories of a writable file could not be created.
    #[error("could not create directory {path}: {source}")]
    CreateDirectory {
        /// The directory that could not be created.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    // Pool limits
    /// Creating another instance would exceed the pool's instance limit.
    #[error("instance limit reached: {limit}")]
    InstanceLimitExceeded {
        /// The configured instance limit.
        limit: usize,
    },

    /// Creating another instance would exceed the pool's memory budget.
    #[error("memory budget exceeded: budget {budget}, committed {committed}, requested {requested}")]
    MemoryBudgetExceeded {
        /// The configured ceiling on aggregate memory rent.
        budget: u64,
        /// Memory rent already committed to live instances.
        committed: u64,
        /// Memory rent the new instance would need.
        requested: u64,
    },
}

impl PoolError {
    /// Wrap an error returned by a file-handle collaborator.
    pub fn io(op: IoOp, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PoolError::Io {
            op,
            path: path.into(),
            source,
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PoolError::EmptyPath | PoolError::FileNotFound { .. } => ErrorKind::PathInvalid,
            PoolError::ConfigConflict { .. } | PoolError::InvalidConfig { .. } => {
                ErrorKind::ConfigConflict
            }
            #[cfg(feature = "serde")]
            PoolError::ConfigParse(_) => ErrorKind::ConfigConflict,
            PoolError::ReaderUnavailable { .. }
            | PoolError::WriterUnavailable { .. }
            | PoolError::PoolClosed => ErrorKind::ResourceUnavailable,
            PoolError::ReaderBusy { .. } => ErrorKind::ResourceBusy,
            PoolError::Io { .. } => ErrorKind::Io,
            PoolError::CreateDirectory { .. } => ErrorKind::DirectoryCreation,
            PoolError::InstanceLimitExceeded { .. } | PoolError::MemoryBudgetExceeded { .. } => {
                ErrorKind::PoolLimitExceeded
            }
        }
    }

    /// The failing primitive, if this is an I/O error.
    pub fn io_op(&self) -> Option<IoOp> {
        match self {
            PoolError::Io { op, .. } => Some(*op),
            _ => None,
        }
    }

    /// Returns `true` if the same call may succeed when tried again later.
    ///
    /// Only reader contention qualifies; everything else needs a change of
    /// input, configuration or environment first.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::ResourceBusy
    }
}
