//! Docker-backed sandbox executor.
//!
//! Acquires a disposable container at construction (`docker run -d ...
//! sleep infinity`) and reuses it for every command, so filesystem state
//! inside the environment persists across `execute` calls. File
//! operations relay through `docker exec` — content is piped in and out
//! rather than held locally.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use tansu_backend::record::apply_edit;
use tansu_backend::{
    Backend, BackendError, BackendResult, DirectoryEntry, EditOutcome, ExecutionResult,
    SearchMatch, WriteOutcome, render_lines, search,
};

use crate::{Sandbox, SandboxState};

/// Timeout applied when `execute` is called without one.
pub const DEFAULT_EXECUTE_TIMEOUT: Duration = Duration::from_secs(120);

/// Output ceiling for a single `execute` call, in bytes.
pub const DEFAULT_OUTPUT_CEILING: usize = 100_000;

/// Files larger than this are skipped by grep.
const GREP_MAX_FILE_SIZE: u64 = 1_000_000;

/// Configuration for a [`DockerSandbox`].
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Image the container is created from.
    pub image: String,
    /// Guest directory that file operations and commands run under.
    pub workdir: String,
    /// Timeout used when `execute` is called with `None`.
    pub default_timeout: Duration,
    /// Pull the image first if it is not present locally.
    pub pull: bool,
    /// Combined-output ceiling per command.
    pub output_ceiling: usize,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            image: "debian:stable-slim".to_string(),
            workdir: "/workspace".to_string(),
            default_timeout: DEFAULT_EXECUTE_TIMEOUT,
            pull: true,
            output_ceiling: DEFAULT_OUTPUT_CEILING,
        }
    }
}

/// Sandbox executor backed by a disposable Docker container.
pub struct DockerSandbox {
    config: SandboxConfig,
    /// Container name; doubles as the stable instance identifier.
    container: String,
    state: Mutex<SandboxState>,
    /// One command at a time; a second caller queues here.
    exec_lock: tokio::sync::Mutex<()>,
    /// Cancelled on `stop` and by caller-level aborts; terminates the
    /// in-flight command without tearing down anything else.
    cancel: CancellationToken,
}

impl DockerSandbox {
    /// Acquire a container and return the executor.
    ///
    /// A container that cannot be started fails construction entirely —
    /// there is no degraded sandbox.
    pub async fn start(config: SandboxConfig) -> BackendResult<Self> {
        if config.pull {
            ensure_image(&config.image).await?;
        }

        let container = format!("tansu-{}", &Uuid::new_v4().simple().to_string()[..8]);
        let output = run_docker(
            &[
                "run",
                "-d",
                "--name",
                &container,
                &config.image,
                "sleep",
                "infinity",
            ],
            None,
        )
        .await?;
        if !output.status.success() {
            return Err(BackendError::sandbox(format!(
                "failed to start container from {}: {}",
                config.image,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let output = run_docker(
            &["exec", &container, "mkdir", "-p", &config.workdir],
            None,
        )
        .await?;
        if !output.status.success() {
            let _ = run_docker(&["rm", "-f", &container], None).await;
            return Err(BackendError::sandbox(format!(
                "failed to create workdir {}",
                config.workdir
            )));
        }

        tracing::info!(target: "tansu::sandbox", container = %container, image = %config.image, "sandbox started");
        Ok(Self {
            config,
            container,
            state: Mutex::new(SandboxState::Created),
            exec_lock: tokio::sync::Mutex::new(()),
            cancel: CancellationToken::new(),
        })
    }

    /// Start with the default configuration.
    pub async fn start_default() -> BackendResult<Self> {
        Self::start(SandboxConfig::default()).await
    }

    /// Token a caller-level abort can cancel to terminate the in-flight
    /// command; the environment itself stays up.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn ensure_open(&self) -> BackendResult<()> {
        if *self.state.lock() == SandboxState::Stopped {
            Err(BackendError::SandboxClosed)
        } else {
            Ok(())
        }
    }

    fn guest_path(&self, normalized: &str) -> String {
        if normalized == "/" {
            self.config.workdir.clone()
        } else {
            format!("{}{}", self.config.workdir, normalized)
        }
    }

    /// Run a relay script in the guest, serialized with `execute`.
    ///
    /// File relays are expected to complete promptly and carry no timeout
    /// of their own.
    async fn relay(&self, script: &str, stdin: Option<&[u8]>) -> BackendResult<std::process::Output> {
        self.ensure_open()?;
        let _guard = self.exec_lock.lock().await;
        self.ensure_open()?;

        let mut args = vec!["exec"];
        if stdin.is_some() {
            args.push("-i");
        }
        args.extend([
            "-w",
            self.config.workdir.as_str(),
            self.container.as_str(),
            "sh",
            "-c",
            script,
        ]);
        run_docker(&args, stdin).await
    }

    /// Raw guest file content via `cat`.
    async fn raw_content(&self, normalized: &str) -> BackendResult<String> {
        let guest = self.guest_path(normalized);
        let output = self
            .relay(&format!("cat {}", shell_quote(&guest)), None)
            .await?;
        if !output.status.success() {
            return Err(BackendError::not_found(normalized));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn write_content(&self, normalized: &str, content: &str) -> BackendResult<()> {
        let guest = self.guest_path(normalized);
        let parent = match guest.rsplit_once('/') {
            Some((parent, _)) if !parent.is_empty() => parent.to_string(),
            _ => "/".to_string(),
        };
        let script = format!(
            "mkdir -p {} && cat > {}",
            shell_quote(&parent),
            shell_quote(&guest)
        );
        let output = self.relay(&script, Some(content.as_bytes())).await?;
        if !output.status.success() {
            return Err(BackendError::sandbox(format!(
                "write to {normalized} failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Sandbox for DockerSandbox {
    async fn execute(
        &self,
        command: &str,
        timeout: Option<Duration>,
    ) -> BackendResult<ExecutionResult> {
        self.ensure_open()?;
        let _guard = self.exec_lock.lock().await;
        {
            // Check-and-set in one acquisition: a stop that landed while
            // this call was queued must not be overwritten by the Running
            // transition.
            let mut state = self.state.lock();
            if *state == SandboxState::Stopped {
                return Err(BackendError::SandboxClosed);
            }
            *state = SandboxState::Running;
        }

        let timeout = timeout.unwrap_or(self.config.default_timeout);
        // Streams are combined in-guest so ordering is the shell's own.
        let script = format!("{{ {command}\n}} 2>&1");

        let mut child = Command::new("docker")
            .args([
                "exec",
                "-w",
                self.config.workdir.as_str(),
                self.container.as_str(),
                "sh",
                "-c",
                script.as_str(),
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BackendError::sandbox(format!("failed to spawn docker exec: {e}")))?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| BackendError::sandbox("exec stdout not captured"))?;

        let deadline = tokio::time::Instant::now() + timeout;
        let mut buffer: Vec<u8> = Vec::new();
        let mut chunk = [0u8; 8192];
        let mut truncated = false;
        let mut interrupted = false;

        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {
                    tracing::warn!(target: "tansu::sandbox", container = %self.container, ?timeout, "command timed out, killing");
                    interrupted = true;
                    break;
                }
                _ = self.cancel.cancelled() => {
                    tracing::info!(target: "tansu::sandbox", container = %self.container, "command cancelled");
                    interrupted = true;
                    break;
                }
                read = stdout.read(&mut chunk) => match read {
                    Ok(0) => break,
                    Ok(n) => {
                        truncated |= append_capped(&mut buffer, &chunk[..n], self.config.output_ceiling);
                    }
                    Err(_) => break,
                },
            }
        }

        let exit_code = if interrupted {
            let _ = child.start_kill();
            let _ = child.wait().await;
            None
        } else {
            child.wait().await.ok().and_then(|status| status.code())
        };

        tracing::debug!(
            target: "tansu::sandbox",
            container = %self.container,
            exit_code,
            truncated,
            bytes = buffer.len(),
            "execute finished"
        );
        Ok(ExecutionResult {
            output: String::from_utf8_lossy(&buffer).into_owned(),
            exit_code,
            truncated,
        })
    }

    fn id(&self) -> &str {
        &self.container
    }

    fn state(&self) -> SandboxState {
        *self.state.lock()
    }

    async fn stop(&self) -> BackendResult<()> {
        {
            let mut state = self.state.lock();
            if *state == SandboxState::Stopped {
                return Ok(());
            }
            *state = SandboxState::Stopped;
        }

        // Terminate the in-flight command before releasing the container.
        self.cancel.cancel();
        match run_docker(&["rm", "-f", &self.container], None).await {
            Ok(output) if output.status.success() => {
                tracing::info!(target: "tansu::sandbox", container = %self.container, "sandbox stopped");
            }
            Ok(output) => {
                tracing::warn!(
                    target: "tansu::sandbox",
                    container = %self.container,
                    stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                    "container removal reported an error"
                );
            }
            Err(e) => {
                tracing::warn!(target: "tansu::sandbox", container = %self.container, error = %e, "container removal failed");
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Backend for DockerSandbox {
    async fn list(&self, path: &str) -> BackendResult<Vec<DirectoryEntry>> {
        let base = tansu_backend::path::validate(path)?;
        let guest = self.guest_path(&base);
        let quoted = shell_quote(&guest);
        let script = format!(
            "if [ -f {quoted} ]; then find {quoted} -maxdepth 0 -printf '%y\\t%s\\t%p\\n'; \
             else find {quoted} -mindepth 1 -maxdepth 1 -printf '%y\\t%s\\t%p\\n'; fi"
        );
        let output = self.relay(&script, None).await?;
        if !output.status.success() {
            return Ok(Vec::new());
        }
        Ok(parse_listing(
            &self.config.workdir,
            &String::from_utf8_lossy(&output.stdout),
        ))
    }

    async fn read(&self, path: &str, offset: usize, limit: usize) -> BackendResult<String> {
        let normalized = tansu_backend::path::validate(path)?;
        let content = self.raw_content(&normalized).await?;
        Ok(render_lines(&content, offset, limit))
    }

    async fn write(&self, path: &str, content: &str) -> BackendResult<WriteOutcome> {
        let normalized = tansu_backend::path::validate(path)?;
        self.write_content(&normalized, content).await?;
        Ok(WriteOutcome { path: normalized })
    }

    async fn edit(
        &self,
        path: &str,
        old: &str,
        new: &str,
        replace_all: bool,
    ) -> BackendResult<EditOutcome> {
        let normalized = tansu_backend::path::validate(path)?;
        let content = self.raw_content(&normalized).await?;
        let (updated, occurrences) = apply_edit(&normalized, &content, old, new, replace_all)?;
        self.write_content(&normalized, &updated).await?;
        Ok(EditOutcome {
            path: normalized,
            occurrences,
        })
    }

    async fn glob(&self, pattern: &str, path: &str) -> BackendResult<Vec<DirectoryEntry>> {
        let base = tansu_backend::path::validate(path)?;
        let matcher = search::compile_glob(pattern)?;

        let guest = self.guest_path(&base);
        let script = format!(
            "find {} -type f -printf '%P\\t%s\\n'",
            shell_quote(&guest)
        );
        let output = self.relay(&script, None).await?;
        if !output.status.success() {
            return Ok(Vec::new());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut entries: Vec<DirectoryEntry> = stdout
            .lines()
            .filter_map(|line| {
                let (rel, size) = line.split_once('\t')?;
                if rel.is_empty() || !matcher.is_match(rel) {
                    return None;
                }
                let full = if base == "/" {
                    format!("/{rel}")
                } else {
                    format!("{base}/{rel}")
                };
                let name = rel.rsplit('/').next().unwrap_or(rel);
                Some(DirectoryEntry::file(name, full, size.parse().ok()?))
            })
            .collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    async fn grep(
        &self,
        pattern: &str,
        path: Option<&str>,
        file_glob: Option<&str>,
    ) -> BackendResult<Vec<SearchMatch>> {
        let re = search::compile_pattern(pattern)?;
        let base = tansu_backend::path::validate(path.unwrap_or("/"))?;
        let matcher = file_glob.map(search::compile_glob).transpose()?;

        // Enumerate candidate files in the guest, then pull their content
        // out and match with the shared engine. Guest `grep` speaks POSIX
        // ERE, a different dialect; the match set must be the one every
        // other backend produces for the same pattern.
        let guest = self.guest_path(&base);
        let quoted = shell_quote(&guest);
        let script = format!(
            "if [ -f {quoted} ]; then find {quoted} -maxdepth 0 -printf '%p\\t%s\\n'; \
             else find {quoted} -type f -printf '%p\\t%s\\n'; fi"
        );
        let output = self.relay(&script, None).await?;
        if !output.status.success() {
            return Ok(Vec::new());
        }
        let files = parse_file_sizes(
            &self.config.workdir,
            &String::from_utf8_lossy(&output.stdout),
        );

        // A direct file target is never filtered by the glob.
        let base_is_file = files.len() == 1 && files[0].0 == base;
        let mut matches = Vec::new();
        for (vpath, size) in files {
            if size > GREP_MAX_FILE_SIZE {
                continue;
            }
            if !base_is_file {
                if let Some(ref m) = matcher {
                    match tansu_backend::path::strip_base(&vpath, &base) {
                        Some(rest) if m.is_match(rest) => {}
                        _ => continue,
                    }
                }
            }
            let guest_file = self.guest_path(&vpath);
            let output = self
                .relay(&format!("cat {}", shell_quote(&guest_file)), None)
                .await?;
            if !output.status.success() {
                continue;
            }
            let Ok(content) = String::from_utf8(output.stdout) else {
                continue; // skip binary files
            };
            search::scan_lines(&re, &vpath, &content, &mut matches);
        }
        search::sort_matches(&mut matches);
        Ok(matches)
    }
}

/// Pull the image if it is not already present locally.
async fn ensure_image(image: &str) -> BackendResult<()> {
    let inspect = run_docker(&["image", "inspect", image], None).await?;
    if inspect.status.success() {
        return Ok(());
    }

    tracing::info!(target: "tansu::sandbox", image, "pulling image");
    let pull = run_docker(&["pull", image], None).await?;
    if !pull.status.success() {
        return Err(BackendError::sandbox(format!(
            "image {image} not found and pull failed: {}",
            String::from_utf8_lossy(&pull.stderr).trim()
        )));
    }
    Ok(())
}

/// Run a docker CLI invocation to completion.
async fn run_docker(args: &[&str], stdin: Option<&[u8]>) -> BackendResult<std::process::Output> {
    let mut cmd = Command::new("docker");
    cmd.args(args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd
        .spawn()
        .map_err(|e| BackendError::sandbox(format!("failed to spawn docker: {e}")))?;

    if let Some(data) = stdin {
        let mut handle = child
            .stdin
            .take()
            .ok_or_else(|| BackendError::sandbox("docker stdin not captured"))?;
        handle
            .write_all(data)
            .await
            .map_err(|e| BackendError::sandbox(format!("failed to write stdin: {e}")))?;
        drop(handle);
    }

    child
        .wait_with_output()
        .await
        .map_err(|e| BackendError::sandbox(format!("docker did not complete: {e}")))
}

/// Append `chunk` to `buffer` without growing past `cap`.
///
/// Returns true when anything was dropped.
fn append_capped(buffer: &mut Vec<u8>, chunk: &[u8], cap: usize) -> bool {
    let room = cap.saturating_sub(buffer.len());
    if chunk.len() <= room {
        buffer.extend_from_slice(chunk);
        false
    } else {
        buffer.extend_from_slice(&chunk[..room]);
        true
    }
}

/// Quote a string for `sh -c`.
fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r#"'\''"#))
}

/// Map an absolute guest path back to its virtual path.
fn virtual_path(workdir: &str, guest: &str) -> String {
    match guest.strip_prefix(workdir) {
        Some("") => "/".to_string(),
        Some(rest) if rest.starts_with('/') => rest.to_string(),
        _ => guest.to_string(),
    }
}

/// Parse `find -printf '%y\t%s\t%p\n'` records into a sorted listing.
fn parse_listing(workdir: &str, stdout: &str) -> Vec<DirectoryEntry> {
    let mut entries: Vec<DirectoryEntry> = stdout
        .lines()
        .filter_map(|line| {
            let mut parts = line.splitn(3, '\t');
            let kind = parts.next()?;
            let size = parts.next()?;
            let guest = parts.next()?;
            let full = virtual_path(workdir, guest);
            let name = full.rsplit('/').next().unwrap_or_default().to_string();
            if name.is_empty() {
                return None;
            }
            Some(match kind {
                "d" => DirectoryEntry::directory(name, full),
                _ => DirectoryEntry::file(name, full, size.parse().ok()?),
            })
        })
        .collect();
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    entries
}

/// Parse `find -printf '%p\t%s\n'` records into (virtual path, size).
fn parse_file_sizes(workdir: &str, stdout: &str) -> Vec<(String, u64)> {
    stdout
        .lines()
        .filter_map(|line| {
            let (guest, size) = line.split_once('\t')?;
            Some((virtual_path(workdir, guest), size.parse().ok()?))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoting_survives_single_quotes() {
        assert_eq!(shell_quote("plain"), "'plain'");
        assert_eq!(shell_quote("it's"), r#"'it'\''s'"#);
    }

    #[test]
    fn capped_append_flags_truncation() {
        let mut buffer = Vec::new();
        assert!(!append_capped(&mut buffer, b"12345", 10));
        assert!(append_capped(&mut buffer, b"6789012345", 10));
        assert_eq!(buffer, b"1234567890");
        // Nothing more fits.
        assert!(append_capped(&mut buffer, b"x", 10));
        assert_eq!(buffer.len(), 10);
    }

    #[test]
    fn listing_parse_sorts_and_types() {
        let stdout = "f\t42\t/workspace/dir/b.txt\nd\t4096\t/workspace/dir/sub\nf\t7\t/workspace/dir/a.txt\n";
        let entries = parse_listing("/workspace", stdout);
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "sub"]);
        assert_eq!(entries[0].path, "/dir/a.txt");
        assert_eq!(entries[0].size, Some(7));
        let sub = entries.iter().find(|e| e.name == "sub").unwrap();
        assert!(sub.is_dir);
        assert_eq!(sub.size, None);
    }

    #[test]
    fn listing_parse_of_file_base() {
        // `find -maxdepth 0` on a file base prints the file itself.
        let entries = parse_listing("/workspace", "f\t12\t/workspace/notes.txt\n");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "/notes.txt");
        assert_eq!(entries[0].name, "notes.txt");
    }

    #[test]
    fn file_size_parse_strips_workdir() {
        let stdout = "/workspace/src/app.py\t42\n/workspace/top.txt\t7\n";
        let files = parse_file_sizes("/workspace", stdout);
        assert_eq!(
            files,
            vec![("/src/app.py".to_string(), 42), ("/top.txt".to_string(), 7)]
        );
    }

    #[test]
    fn default_config_is_sane() {
        let config = SandboxConfig::default();
        assert_eq!(config.workdir, "/workspace");
        assert_eq!(config.default_timeout, DEFAULT_EXECUTE_TIMEOUT);
        assert_eq!(config.output_ceiling, DEFAULT_OUTPUT_CEILING);
    }

    // The tests below need a reachable docker daemon; run them with
    // `cargo test -p tansu-sandbox -- --ignored`.

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    }

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn execute_and_reuse_environment() {
        init_tracing();
        let sandbox = DockerSandbox::start_default().await.unwrap();
        assert_eq!(sandbox.state(), SandboxState::Created);

        let result = sandbox.execute("echo hello", None).await.unwrap();
        assert_eq!(result.exit_code, Some(0));
        assert_eq!(result.output.trim(), "hello");
        assert!(!result.truncated);
        assert_eq!(sandbox.state(), SandboxState::Running);

        // Environment state persists between commands.
        sandbox.execute("echo persisted > marker.txt", None).await.unwrap();
        let result = sandbox.execute("cat marker.txt", None).await.unwrap();
        assert_eq!(result.output.trim(), "persisted");

        sandbox.stop().await.unwrap();
        assert_eq!(sandbox.state(), SandboxState::Stopped);
    }

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn timeout_is_a_normal_outcome() {
        let sandbox = DockerSandbox::start_default().await.unwrap();
        let started = std::time::Instant::now();
        let result = sandbox
            .execute("sleep 100", Some(Duration::from_secs(1)))
            .await
            .unwrap();
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(result.exit_code, None);
        assert!(!result.truncated);
        sandbox.stop().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn output_ceiling_truncates() {
        let sandbox = DockerSandbox::start(SandboxConfig {
            output_ceiling: 64,
            ..SandboxConfig::default()
        })
        .await
        .unwrap();
        let result = sandbox.execute("yes | head -n 1000", None).await.unwrap();
        assert!(result.truncated);
        assert!(result.output.len() <= 64);
        sandbox.stop().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn concurrent_executes_serialize() {
        let sandbox = std::sync::Arc::new(DockerSandbox::start_default().await.unwrap());
        let a = {
            let sandbox = sandbox.clone();
            tokio::spawn(async move { sandbox.execute("sleep 1; echo first", None).await })
        };
        let b = {
            let sandbox = sandbox.clone();
            tokio::spawn(async move { sandbox.execute("echo second", None).await })
        };
        let first = a.await.unwrap().unwrap();
        let second = b.await.unwrap().unwrap();
        assert_eq!(first.exit_code, Some(0));
        assert_eq!(second.exit_code, Some(0));
        sandbox.stop().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn stop_is_idempotent_and_closes_operations() {
        let sandbox = DockerSandbox::start_default().await.unwrap();
        sandbox.stop().await.unwrap();
        sandbox.stop().await.unwrap();

        assert!(matches!(
            sandbox.execute("echo x", None).await.unwrap_err(),
            BackendError::SandboxClosed
        ));
        assert!(matches!(
            sandbox.read_all("/f.txt").await.unwrap_err(),
            BackendError::SandboxClosed
        ));
    }

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn file_contract_relays_into_guest() {
        let sandbox = DockerSandbox::start_default().await.unwrap();

        sandbox.write("/src/app.py", "print('hi')").await.unwrap();
        assert_eq!(sandbox.read_all("/src/app.py").await.unwrap(), "1\tprint('hi')");

        let outcome = sandbox.edit("/src/app.py", "hi", "world", false).await.unwrap();
        assert_eq!(outcome.occurrences, 1);
        assert_eq!(sandbox.read_all("/src/app.py").await.unwrap(), "1\tprint('world')");

        let entries = sandbox.list("/").await.unwrap();
        assert!(entries.iter().any(|e| e.name == "src" && e.is_dir));

        let found = sandbox.glob("**/*.py", "/").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, "/src/app.py");

        let matches = sandbox.grep("world", None, None).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].path, "/src/app.py");
        assert_eq!(matches[0].line, 1);

        // Patterns outside the POSIX ERE dialect match the same way they
        // do on every other backend.
        let matches = sandbox.grep(r"\bworld\b", None, None).await.unwrap();
        assert_eq!(matches.len(), 1);

        sandbox.stop().await.unwrap();
    }
}
