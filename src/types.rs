//! Core types shared by readers, writers, instances and the pool.

use std::fmt;
use std::time::Duration;

use uuid::Uuid;

/// One kibibyte.
pub const KIB: u64 = 1024;
/// One mebibyte.
pub const MIB: u64 = 1024 * KIB;

/// Which sides of a file an instance may touch.
///
/// Determines whether an instance holds a reader, a writer, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FilePermission {
    /// Reader only. The file must already exist.
    ReadOnly,
    /// Writer only. The file and its parent directories are created.
    WriteOnly,
    /// Reader and writer.
    #[default]
    ReadWrite,
}

impl FilePermission {
    /// Returns `true` if instances with this permission own a reader.
    #[inline]
    pub const fn can_read(self) -> bool {
        matches!(self, FilePermission::ReadOnly | FilePermission::ReadWrite)
    }

    /// Returns `true` if instances with this permission own a writer.
    #[inline]
    pub const fn can_write(self) -> bool {
        matches!(self, FilePermission::WriteOnly | FilePermission::ReadWrite)
    }
}

impl fmt::Display for FilePermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FilePermission::ReadOnly => "read-only",
            FilePermission::WriteOnly => "write-only",
            FilePermission::ReadWrite => "read-write",
        })
    }
}

/// When buffered writer data is pushed to disk.
///
/// Exactly one policy is active per writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FlushPolicy {
    /// Flush once this many bytes have been written since the last flush.
    ///
    /// Must not exceed the writer's memory rent.
    BySize(u64),
    /// Flush on a fixed period, independent of write volume.
    ByTime(Duration),
}

impl FlushPolicy {
    /// The size threshold, if this is a size-based policy.
    #[inline]
    pub const fn threshold(&self) -> Option<u64> {
        match self {
            FlushPolicy::BySize(bytes) => Some(*bytes),
            FlushPolicy::ByTime(_) => None,
        }
    }

    /// The flush period, if this is a time-based policy.
    #[inline]
    pub const fn interval(&self) -> Option<Duration> {
        match self {
            FlushPolicy::BySize(_) => None,
            FlushPolicy::ByTime(interval) => Some(*interval),
        }
    }
}

impl Default for FlushPolicy {
    fn default() -> Self {
        FlushPolicy::BySize(MIB)
    }
}

/// Stable identity of a reader, writer or instance.
///
/// Only meaningful for logging and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HandleId(Uuid);

impl HandleId {
    /// Generate a fresh random identity.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID.
    #[inline]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for HandleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
