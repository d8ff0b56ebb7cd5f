//! # tansu-sandbox
//!
//! Sandbox backends add one capability to the storage contract: running
//! commands inside an isolated, disposable environment. File operations
//! on a sandbox follow the same path and edit contract as every other
//! backend, but are physically relayed into the environment.
//!
//! Lifecycle is an explicit state machine, not a context manager:
//! `Created` on construction, `Running` from the first `execute`, and
//! `Stopped` after [`Sandbox::stop`] — which is idempotent, terminates
//! any in-flight command first, and releases the environment. Every
//! operation after `stop` fails with `SandboxClosed`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use tansu_backend::{Backend, BackendResult, ExecutionResult};

pub mod docker;

pub use docker::{DockerSandbox, SandboxConfig};

/// Where a sandbox is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SandboxState {
    /// Environment acquired, no command run yet.
    Created,
    /// At least one command has run; the environment is being reused.
    Running,
    /// Environment released; no further operations are valid.
    Stopped,
}

/// Capability extension over [`Backend`] for sandboxed execution.
///
/// One command runs at a time per instance: a second `execute` while one
/// is in flight blocks until the first completes (it does not fail fast).
#[async_trait]
pub trait Sandbox: Backend {
    /// Run `command` inside the environment.
    ///
    /// Falls back to the configured default when `timeout` is `None`.
    /// Output past the size ceiling is truncated (flagged on the result).
    /// A command that outlives its timeout is forcibly terminated and
    /// reported as a normal [`ExecutionResult`] with `exit_code: None` —
    /// a timeout is not a failure of the executor.
    async fn execute(
        &self,
        command: &str,
        timeout: Option<Duration>,
    ) -> BackendResult<ExecutionResult>;

    /// Stable identifier for the environment instance.
    fn id(&self) -> &str;

    /// Current lifecycle state.
    fn state(&self) -> SandboxState;

    /// Release the environment.
    ///
    /// Terminates any in-flight command first. Calling `stop` twice is a
    /// no-op, not an error.
    async fn stop(&self) -> BackendResult<()>;
}
