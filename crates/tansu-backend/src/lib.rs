//! # tansu-backend
//!
//! Unified storage abstraction for autonomous agents. A caller reads,
//! writes, searches, and edits files through one [`Backend`] contract
//! without knowing whether those files live in memory, on a real disk,
//! or behind a routed mix of both. Key components:
//!
//! - [`Backend`] - the storage contract (list, read, write, edit, glob, grep)
//! - [`MemoryStore`] - process-local map, nothing persists
//! - [`DiskStore`] - real directory tree, with an optional virtual overlay
//!   that captures writes in memory for zero-side-effect previews
//! - [`CompositeRouter`] - dispatches to sub-backends by longest path prefix
//!
//! ## Design Decisions
//!
//! - **Path-based, forward slashes only**: every operation validates its
//!   path through one gate ([`path::validate`]) before storage access.
//! - **Line-oriented reads**: reads render 1-indexed, tab-separated line
//!   numbers, windowed by offset/limit.
//! - **Errors are values**: contract violations come back as
//!   [`BackendError`] results with user-presentable `Display` text.

pub mod backends;
pub mod contract;
pub mod error;
pub mod path;
pub mod record;
pub mod search;

pub use backends::{CompositeRouter, DiskStore, MemoryStore};
pub use contract::Backend;
pub use error::{BackendError, BackendResult};
pub use record::{
    DEFAULT_READ_LIMIT, DirectoryEntry, EditOutcome, ExecutionResult, FileRecord, SearchMatch,
    WriteOutcome, apply_edit, render_lines,
};
