//! Backend error types.

use std::io;
use thiserror::Error;

/// Error type shared by every backend operation.
///
/// Contract violations (`InvalidPath`, `NotFound`, `AmbiguousMatch`,
/// `NoMatch`, `InvalidPattern`) are ordinary result values: callers format
/// them for users and carry on. `SandboxClosed` signals misuse of a stopped
/// executor and is not retryable.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Malformed or traversal-attempting path, rejected before storage access.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Read or edit against a path that does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Edit target occurs more than once and replace-all was not requested.
    #[error("{old:?} found {count} times in {path}; pass replace_all or provide more context")]
    AmbiguousMatch {
        /// File the edit targeted.
        path: String,
        /// The string that matched more than once.
        old: String,
        /// How many times it matched.
        count: usize,
    },

    /// Edit target text absent from the file.
    #[error("{old:?} not found in {path}; the match must be exact")]
    NoMatch {
        /// File the edit targeted.
        path: String,
        /// The string that never matched.
        old: String,
    },

    /// Grep pattern failed to compile; carries the regex diagnostic.
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    /// Operation against a sandbox after `stop`.
    #[error("sandbox is stopped")]
    SandboxClosed,

    /// Sandbox infrastructure failure (container runtime, relay commands).
    #[error("sandbox error: {0}")]
    Sandbox(String),

    /// Underlying filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl BackendError {
    /// Create an InvalidPath error.
    pub fn invalid_path(msg: impl Into<String>) -> Self {
        Self::InvalidPath(msg.into())
    }

    /// Create a NotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create an InvalidPattern error.
    pub fn invalid_pattern(msg: impl Into<String>) -> Self {
        Self::InvalidPattern(msg.into())
    }

    /// Create a Sandbox infrastructure error.
    pub fn sandbox(msg: impl Into<String>) -> Self {
        Self::Sandbox(msg.into())
    }
}

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_user_facing() {
        let err = BackendError::AmbiguousMatch {
            path: "/f.txt".into(),
            old: "foo".into(),
            count: 3,
        };
        let text = err.to_string();
        assert!(text.contains("3 times"));
        assert!(text.contains("/f.txt"));

        let err = BackendError::NoMatch {
            path: "/f.txt".into(),
            old: "foo".into(),
        };
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn io_errors_convert() {
        let io = io::Error::new(io::ErrorKind::NotFound, "gone");
        let err: BackendError = io.into();
        assert!(matches!(err, BackendError::Io(_)));
    }
}
