//! # Collaborator Traits
//!
//! The seams between the pool and the operating system.
//!
//! ## Roles
//!
//! ```text
//! FileSystem ──open_read()──▶ ReadHandle  ──▶ Reader
//!            ──open_write()─▶ WriteHandle ──▶ Writer
//! ```
//!
//! ## Quick Reference
//!
//! | Trait | Responsibility |
//! |-------|----------------|
//! | [`FileSystem`] | Existence checks, directory creation, opening handles |
//! | [`ReadHandle`] | Seek, read, size, close of one open file |
//! | [`WriteHandle`] | Seek, write, sync, close of one open file |
//!
//! [`NativeFs`](crate::NativeFs) implements all three on top of `std::fs`.
//! [`MemoryFs`](crate::MemoryFs) implements them in memory for tests.

mod file_handle;
mod file_system;

pub use file_handle::{ReadHandle, WriteHandle};
pub use file_system::FileSystem;
