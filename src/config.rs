//! Instance and pool configuration.
//!
//! Configuration resolves in two levels. [`PoolConfig`] carries pool-wide
//! defaults; [`InstanceOverrides`] carries optional per-instance values.
//! [`PoolConfig::resolve`] merges them field by field into the
//! [`InstanceConfig`] an instance is built from:
//!
//! ```text
//! override.field.unwrap_or(pool.field)
//! ```
//!
//! Using `Option` for overrides keeps "explicitly zero" and "not provided"
//! apart; a zero override is passed through and then rejected by validation.

use std::path::PathBuf;
use std::time::Duration;

use crate::{FilePermission, FlushPolicy, MIB, PoolError, Result};

/// Default staging buffer size per writer (4 MiB).
pub const DEFAULT_MEMORY_RENT: u64 = 4 * MIB;
/// Default number of concurrent reads per instance.
pub const DEFAULT_READER_LIMIT: u32 = 1;
/// Default maximum number of live instances in a pool.
pub const DEFAULT_INSTANCE_LIMIT: usize = 64;

/// Fully resolved configuration of one instance.
///
/// Immutable once the instance is built; open a new instance to change it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InstanceConfig {
    /// File the instance is bound to. Must not be empty.
    pub path: PathBuf,
    /// Which of reader and writer the instance owns.
    pub permission: FilePermission,
    /// Bytes reserved for the writer's staging buffer.
    pub memory_rent: u64,
    /// Maximum number of reads in flight at once.
    pub reader_limit: u32,
    /// When staged writes are flushed to disk.
    pub flush_policy: FlushPolicy,
}

impl InstanceConfig {
    /// Configuration for `path` with `permission` and default limits.
    pub fn new(path: impl Into<PathBuf>, permission: FilePermission) -> Self {
        Self {
            path: path.into(),
            permission,
            memory_rent: DEFAULT_MEMORY_RENT,
            reader_limit: DEFAULT_READER_LIMIT,
            flush_policy: FlushPolicy::default(),
        }
    }

    /// Set the staging buffer size.
    pub fn with_memory_rent(mut self, bytes: u64) -> Self {
        self.memory_rent = bytes;
        self
    }

    /// Set the number of concurrent reads.
    pub fn with_reader_limit(mut self, limit: u32) -> Self {
        self.reader_limit = limit;
        self
    }

    /// Set the flush policy.
    pub fn with_flush_policy(mut self, policy: FlushPolicy) -> Self {
        self.flush_policy = policy;
        self
    }

    /// Check the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// - [`PoolError::EmptyPath`] if `path` is empty
    /// - [`PoolError::ConfigConflict`] if a size threshold exceeds `memory_rent`
    /// - [`PoolError::InvalidConfig`] for zero sizes, limits or intervals
    pub fn validate(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(PoolError::EmptyPath);
        }
        if self.reader_limit == 0 {
            return Err(invalid("reader_limit", "must be at least 1"));
        }
        check_flush(self.memory_rent, self.flush_policy)
    }
}

/// Optional per-instance values that take precedence over pool defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct InstanceOverrides {
    /// Permission for this instance.
    pub permission: Option<FilePermission>,
    /// Staging buffer size for this instance.
    pub memory_rent: Option<u64>,
    /// Concurrent read limit for this instance.
    pub reader_limit: Option<u32>,
    /// Flush policy for this instance.
    pub flush_policy: Option<FlushPolicy>,
}

impl InstanceOverrides {
    /// No overrides; everything comes from the pool.
    pub fn none() -> Self {
        Self::default()
    }

    /// Override the permission.
    pub fn with_permission(mut self, permission: FilePermission) -> Self {
        self.permission = Some(permission);
        self
    }

    /// Override the staging buffer size.
    pub fn with_memory_rent(mut self, bytes: u64) -> Self {
        self.memory_rent = Some(bytes);
        self
    }

    /// Override the concurrent read limit.
    pub fn with_reader_limit(mut self, limit: u32) -> Self {
        self.reader_limit = Some(limit);
        self
    }

    /// Override the flush policy.
    pub fn with_flush_policy(mut self, policy: FlushPolicy) -> Self {
        self.flush_policy = Some(policy);
        self
    }
}

/// Pool-wide defaults and limits.
///
/// # Example
///
/// ```rust
/// use fspool::{FilePermission, FlushPolicy, InstanceOverrides, PoolConfig, KIB};
///
/// let pool = PoolConfig::default()
///     .with_instance_limit(8)
///     .with_memory_rent(512 * KIB)
///     .with_flush_policy(FlushPolicy::BySize(128 * KIB));
///
/// let overrides = InstanceOverrides::none().with_permission(FilePermission::ReadOnly);
/// let resolved = pool.resolve("/data/index", &overrides);
///
/// assert_eq!(resolved.permission, FilePermission::ReadOnly);
/// assert_eq!(resolved.memory_rent, 512 * KIB);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PoolConfig {
    /// Default permission of new instances.
    pub permission: FilePermission,
    /// Default staging buffer size of new instances.
    pub memory_rent: u64,
    /// Maximum number of live instances.
    pub instance_limit: usize,
    /// Default concurrent read limit of new instances.
    pub reader_limit: u32,
    /// Default flush policy of new instances.
    pub flush_policy: FlushPolicy,
    /// Ceiling on the summed memory rent of live instances, if any.
    pub memory_budget: Option<u64>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            permission: FilePermission::default(),
            memory_rent: DEFAULT_MEMORY_RENT,
            instance_limit: DEFAULT_INSTANCE_LIMIT,
            reader_limit: DEFAULT_READER_LIMIT,
            flush_policy: FlushPolicy::default(),
            memory_budget: None,
        }
    }
}

impl PoolConfig {
    /// Set the default permission.
    pub fn with_permission(mut self, permission: FilePermission) -> Self {
        self.permission = permission;
        self
    }

    /// Set the default staging buffer size.
    pub fn with_memory_rent(mut self, bytes: u64) -> Self {
        self.memory_rent = bytes;
        self
    }

    /// Set the maximum number of live instances.
    pub fn with_instance_limit(mut self, limit: usize) -> Self {
        self.instance_limit = limit;
        self
    }

    /// Set the default concurrent read limit.
    pub fn with_reader_limit(mut self, limit: u32) -> Self {
        self.reader_limit = limit;
        self
    }

    /// Set the default flush policy.
    pub fn with_flush_policy(mut self, policy: FlushPolicy) -> Self {
        self.flush_policy = policy;
        self
    }

    /// Cap the summed memory rent of live instances.
    pub fn with_memory_budget(mut self, bytes: u64) -> Self {
        self.memory_budget = Some(bytes);
        self
    }

    /// Check the pool defaults and limits.
    ///
    /// # Errors
    ///
    /// - [`PoolError::ConfigConflict`] if a size threshold exceeds `memory_rent`
    /// - [`PoolError::InvalidConfig`] for zero limits, sizes or intervals, or
    ///   a memory budget too small for even one default instance
    pub fn validate(&self) -> Result<()> {
        if self.instance_limit == 0 {
            return Err(invalid("instance_limit", "must be at least 1"));
        }
        if self.reader_limit == 0 {
            return Err(invalid("reader_limit", "must be at least 1"));
        }
        check_flush(self.memory_rent, self.flush_policy)?;
        if let Some(budget) = self.memory_budget {
            if budget < self.memory_rent {
                return Err(invalid(
                    "memory_budget",
                    format!("{budget} is below the default memory rent {}", self.memory_rent),
                ));
            }
        }
        Ok(())
    }

    /// Merge pool defaults with `overrides` for the instance at `path`.
    ///
    /// Each field set in `overrides` wins; unset fields fall back to the pool.
    pub fn resolve(&self, path: impl Into<PathBuf>, overrides: &InstanceOverrides) -> InstanceConfig {
        InstanceConfig {
            path: path.into(),
            permission: overrides.permission.unwrap_or(self.permission),
            memory_rent: overrides.memory_rent.unwrap_or(self.memory_rent),
            reader_limit: overrides.reader_limit.unwrap_or(self.reader_limit),
            flush_policy: overrides.flush_policy.unwrap_or(self.flush_policy),
        }
    }

    /// Parse a pool configuration from JSON. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// - [`PoolError::ConfigParse`] if the JSON is malformed
    /// - any error of [`validate`](Self::validate)
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| PoolError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

/// Check a memory rent and flush policy pair.
pub(crate) fn check_flush(memory_rent: u64, policy: FlushPolicy) -> Result<()> {
    if memory_rent == 0 {
        return Err(invalid("memory_rent", "must be positive"));
    }
    match policy {
        FlushPolicy::BySize(0) => Err(invalid("flush_policy", "flush size must be positive")),
        FlushPolicy::BySize(flush_size) if flush_size > memory_rent => {
            Err(PoolError::ConfigConflict {
                memory_rent,
                flush_size,
            })
        }
        FlushPolicy::ByTime(interval) if interval == Duration::ZERO => {
            Err(invalid("flush_policy", "flush interval must be positive"))
        }
        _ => Ok(()),
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> PoolError {
    PoolError::InvalidConfig {
        field,
        reason: reason.into(),
    }
}
