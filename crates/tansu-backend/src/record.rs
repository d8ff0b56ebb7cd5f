//! The line-oriented file model and contract result types.
//!
//! Every backend stores (or synthesizes) [`FileRecord`]s and reports
//! results through the outcome types here, so semantics like line
//! splitting, edit counting, and read rendering live in exactly one place.

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

use crate::error::{BackendError, BackendResult};

/// Default line limit for reads when the caller does not give one.
pub const DEFAULT_READ_LIMIT: usize = 2000;

/// One stored file: its lines plus creation/modification timestamps.
///
/// Content is kept as the exact sequence of newline-separated segments,
/// trailing empties included, so a write followed by a read round-trips
/// byte for byte.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    /// File content split on `'\n'`, order significant.
    pub lines: Vec<String>,
    /// Set once, on first write.
    pub created_at: SystemTime,
    /// Refreshed on every write and edit.
    pub modified_at: SystemTime,
}

impl FileRecord {
    /// Build a record from raw content.
    pub fn from_content(content: &str) -> Self {
        let now = SystemTime::now();
        Self {
            lines: split_lines(content),
            created_at: now,
            modified_at: now,
        }
    }

    /// Replace the content in place, keeping `created_at`.
    pub fn replace(&mut self, content: &str) {
        self.lines = split_lines(content);
        self.touch();
    }

    /// The joined file content.
    pub fn content(&self) -> String {
        self.lines.join("\n")
    }

    /// Content size in bytes (as joined).
    pub fn size_bytes(&self) -> u64 {
        let newlines = self.lines.len().saturating_sub(1) as u64;
        self.lines.iter().map(|line| line.len() as u64).sum::<u64>() + newlines
    }

    /// Advance `modified_at`, strictly, even under a coarse clock.
    pub fn touch(&mut self) {
        let now = SystemTime::now();
        let floor = self.modified_at + Duration::from_nanos(1);
        self.modified_at = now.max(floor);
    }
}

fn split_lines(content: &str) -> Vec<String> {
    content.split('\n').map(str::to_string).collect()
}

/// Metadata for one listing or glob result.
///
/// Derived on every call from the authoritative record set (or real
/// filesystem metadata); never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Final path component.
    pub name: String,
    /// Full normalized path.
    pub path: String,
    /// Whether this entry is a directory.
    pub is_dir: bool,
    /// Size in bytes; `None` for directories.
    pub size: Option<u64>,
}

impl DirectoryEntry {
    /// Create a file entry.
    pub fn file(name: impl Into<String>, path: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            is_dir: false,
            size: Some(size),
        }
    }

    /// Create a directory entry.
    pub fn directory(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            is_dir: true,
            size: None,
        }
    }
}

/// Success payload of a write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOutcome {
    /// Normalized path the content landed at.
    pub path: String,
}

/// Success payload of an edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditOutcome {
    /// Normalized path of the edited file.
    pub path: String,
    /// Number of substitutions performed.
    pub occurrences: usize,
}

/// One grep hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchMatch {
    /// Normalized path of the matching file.
    pub path: String,
    /// 1-indexed line number.
    pub line: usize,
    /// Full text of the matching line.
    pub text: String,
}

/// Outcome of running a command in a sandbox.
///
/// A timeout is a normal outcome, not an error: `exit_code` is `None` and
/// `output` holds whatever was captured before the process was killed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Combined standard output and error streams.
    pub output: String,
    /// Process exit code; `None` on timeout, cancellation, or signal death.
    pub exit_code: Option<i32>,
    /// Whether `output` was cut at the size ceiling.
    pub truncated: bool,
}

/// Apply the contract's edit semantics to `content`.
///
/// Returns the updated content and the substitution count, or the
/// ambiguity/no-match error. Shared by every backend so edit behavior
/// cannot drift between storage strategies.
pub fn apply_edit(
    path: &str,
    content: &str,
    old: &str,
    new: &str,
    replace_all: bool,
) -> BackendResult<(String, usize)> {
    let count = content.matches(old).count();
    if count == 0 {
        return Err(BackendError::NoMatch {
            path: path.to_string(),
            old: old.to_string(),
        });
    }
    if count > 1 && !replace_all {
        return Err(BackendError::AmbiguousMatch {
            path: path.to_string(),
            old: old.to_string(),
            count,
        });
    }

    if replace_all {
        Ok((content.replace(old, new), count))
    } else {
        Ok((content.replacen(old, new, 1), 1))
    }
}

/// Render a line window as `"<1-indexed line>\t<text>"` rows.
///
/// `offset` is 0-indexed; a window entirely past the end renders as the
/// empty string. When `limit` cuts off trailing lines a final notice row
/// is appended.
pub fn render_lines(content: &str, offset: usize, limit: usize) -> String {
    let lines = split_lines(content);
    if offset >= lines.len() {
        return String::new();
    }

    let end = offset.saturating_add(limit).min(lines.len());
    let mut out = lines[offset..end]
        .iter()
        .enumerate()
        .map(|(i, line)| format!("{}\t{}", offset + i + 1, line))
        .collect::<Vec<_>>()
        .join("\n");

    let remaining = lines.len() - end;
    if remaining > 0 {
        out.push_str(&format!("\n... ({remaining} more lines)"));
    }
    out
}
