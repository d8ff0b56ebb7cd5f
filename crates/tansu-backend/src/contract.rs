//! The storage contract every backend implements.

use async_trait::async_trait;

use crate::error::BackendResult;
use crate::record::{
    DEFAULT_READ_LIMIT, DirectoryEntry, EditOutcome, SearchMatch, WriteOutcome,
};

/// The contract shared by every storage strategy.
///
/// All operations are path-based; paths are validated and normalized by
/// [`crate::path::validate`] before any storage access, so implementations
/// behave identically on malformed input. Contract violations (missing
/// file, ambiguous edit, bad pattern) come back as `Err` values meant for
/// direct user presentation; they are never panics.
#[async_trait]
pub trait Backend: Send + Sync {
    /// List the direct children of `path`.
    ///
    /// Intermediate directories that exist only implicitly (as prefixes of
    /// stored paths) are synthesized into the listing.
    async fn list(&self, path: &str) -> BackendResult<Vec<DirectoryEntry>>;

    /// Read a window of `limit` lines starting at 0-indexed `offset`,
    /// rendered as `"<1-indexed line>\t<text>"` rows.
    ///
    /// A window entirely past the end of the file is an empty string, not
    /// an error.
    async fn read(&self, path: &str, offset: usize, limit: usize) -> BackendResult<String>;

    /// Create or fully replace the file at `path`.
    async fn write(&self, path: &str, content: &str) -> BackendResult<WriteOutcome>;

    /// Replace `old` with `new` in the file at `path`.
    ///
    /// Without `replace_all` the match must be unique; with it, every
    /// occurrence is replaced and the count reported.
    async fn edit(
        &self,
        path: &str,
        old: &str,
        new: &str,
        replace_all: bool,
    ) -> BackendResult<EditOutcome>;

    /// Find files under `path` matching a shell glob (`*`, `**`, `?`).
    async fn glob(&self, pattern: &str, path: &str) -> BackendResult<Vec<DirectoryEntry>>;

    /// Regex-search every line of every file under `path` (or the whole
    /// store when `path` is `None`), optionally pre-filtered by a file
    /// glob. Matches are ordered by path, then line.
    async fn grep(
        &self,
        pattern: &str,
        path: Option<&str>,
        file_glob: Option<&str>,
    ) -> BackendResult<Vec<SearchMatch>>;

    /// Read from the start of the file with the default line limit.
    async fn read_all(&self, path: &str) -> BackendResult<String> {
        self.read(path, 0, DEFAULT_READ_LIMIT).await
    }
}
