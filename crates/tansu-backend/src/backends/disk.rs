//! Disk storage backend.
//!
//! Wraps a real directory tree. In direct mode every operation hits the
//! filesystem beneath the root; in virtual mode writes and edits are
//! captured in an in-memory overlay so a whole batch of changes can be
//! previewed with zero disk side effects.
//!
//! Grep delegates to `rg` when the binary is spawnable, purely as an
//! accelerator: the built-in line scan is the reference behavior and the
//! mandatory fallback.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::fs;
use tokio::process::Command;

use crate::contract::Backend;
use crate::error::{BackendError, BackendResult};
use crate::path;
use crate::record::{
    DirectoryEntry, EditOutcome, FileRecord, SearchMatch, WriteOutcome, apply_edit, render_lines,
};
use crate::search;

/// Files larger than this are skipped by grep, on both search paths.
const GREP_MAX_FILE_SIZE: u64 = 1_000_000;

/// Disk-backed storage rooted at a real directory.
///
/// The validated virtual path is always interpreted relative to the root
/// and re-checked after joining, so symlinks cannot carry an operation
/// outside it.
#[derive(Debug)]
pub struct DiskStore {
    root: PathBuf,
    virtual_mode: bool,
    overlay: Mutex<HashMap<String, FileRecord>>,
}

impl DiskStore {
    /// Open a direct-mode store. The root directory must already exist.
    pub fn new(root: impl Into<PathBuf>) -> BackendResult<Self> {
        let root: PathBuf = root.into();
        let root = dunce::canonicalize(&root).map_err(|e| {
            BackendError::invalid_path(format!("root {}: {e}", root.display()))
        })?;
        Ok(Self {
            root,
            virtual_mode: false,
            overlay: Mutex::new(HashMap::new()),
        })
    }

    /// Open a virtual-mode store, creating the root if needed.
    ///
    /// Writes and edits land in the overlay; the real tree is only read.
    pub fn virtual_mode(root: impl Into<PathBuf>) -> BackendResult<Self> {
        let root: PathBuf = root.into();
        std::fs::create_dir_all(&root)?;
        let root = dunce::canonicalize(&root)?;
        Ok(Self {
            root,
            virtual_mode: true,
            overlay: Mutex::new(HashMap::new()),
        })
    }

    /// The canonicalized root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether this store captures mutations in the overlay.
    pub fn is_virtual(&self) -> bool {
        self.virtual_mode
    }

    /// The set of paths touched through the overlay, sorted.
    pub fn overlay_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.overlay.lock().keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Map a validated virtual path onto the real tree, re-checking that
    /// the result stays under the root.
    fn resolve(&self, normalized: &str) -> BackendResult<PathBuf> {
        let rel = normalized.trim_start_matches('/');
        if rel.is_empty() {
            return Ok(self.root.clone());
        }
        let full = self.root.join(rel);

        // Canonicalize the nearest existing ancestor so symlinked escapes
        // are caught even for paths that do not exist yet.
        let checked = if full.exists() {
            dunce::canonicalize(&full)?
        } else {
            let parent = full
                .parent()
                .ok_or_else(|| BackendError::invalid_path(normalized))?;
            match dunce::canonicalize(parent) {
                Ok(parent) => parent.join(full.file_name().unwrap_or_default()),
                Err(_) => full.clone(),
            }
        };

        if !checked.starts_with(&self.root) {
            return Err(BackendError::invalid_path(format!(
                "{normalized} escapes the store root"
            )));
        }
        Ok(full)
    }

    fn virtual_path_for(&self, real: &Path) -> Option<String> {
        let rel = real.strip_prefix(&self.root).ok()?;
        let rel = rel.to_str()?;
        Some(if rel.is_empty() {
            "/".to_string()
        } else {
            format!("/{rel}")
        })
    }

    /// All real files under `dir` as (virtual path, size) pairs.
    async fn walk_files(&self, dir: &Path) -> BackendResult<Vec<(String, u64)>> {
        let mut out = Vec::new();
        let mut stack = vec![dir.to_path_buf()];
        while let Some(current) = stack.pop() {
            let mut entries = match fs::read_dir(&current).await {
                Ok(entries) => entries,
                Err(_) => continue,
            };
            while let Some(entry) = entries.next_entry().await? {
                let meta = match entry.metadata().await {
                    Ok(meta) => meta,
                    Err(_) => continue,
                };
                if meta.is_dir() {
                    stack.push(entry.path());
                } else if meta.is_file() {
                    if let Some(vpath) = self.virtual_path_for(&entry.path()) {
                        out.push((vpath, meta.len()));
                    }
                }
            }
        }
        Ok(out)
    }

    /// Overlay content for a path, if captured.
    fn overlay_content(&self, normalized: &str) -> Option<String> {
        self.overlay.lock().get(normalized).map(FileRecord::content)
    }

    /// Read raw content, overlay first in virtual mode.
    async fn raw_content(&self, normalized: &str) -> BackendResult<String> {
        if self.virtual_mode {
            if let Some(content) = self.overlay_content(normalized) {
                return Ok(content);
            }
        }
        let real = self.resolve(normalized)?;
        let meta = fs::metadata(&real)
            .await
            .map_err(|e| io_to_backend(e, normalized))?;
        if meta.is_dir() {
            return Err(BackendError::Io(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("{normalized} is a directory"),
            )));
        }
        fs::read_to_string(&real)
            .await
            .map_err(|e| io_to_backend(e, normalized))
    }

    /// The built-in grep scan: reference behavior and mandatory fallback.
    async fn grep_scan(
        &self,
        re: &regex::Regex,
        files: &[(String, u64)],
        matches: &mut Vec<SearchMatch>,
    ) -> BackendResult<()> {
        for (vpath, size) in files {
            if *size > GREP_MAX_FILE_SIZE {
                continue;
            }
            let real = self.resolve(vpath)?;
            let bytes = match fs::read(&real).await {
                Ok(bytes) => bytes,
                Err(_) => continue,
            };
            let Ok(content) = String::from_utf8(bytes) else {
                continue; // skip binary files
            };
            search::scan_lines(re, vpath, &content, matches);
        }
        Ok(())
    }

    /// Accelerated grep via `rg`. Returns `None` when the tool is
    /// unavailable or errors, in which case the caller must fall back.
    async fn grep_with_rg(&self, pattern: &str, target: &Path) -> Option<Vec<SearchMatch>> {
        let rel_target = target.strip_prefix(&self.root).unwrap_or(target);
        let arg = if rel_target.as_os_str().is_empty() {
            Path::new(".")
        } else {
            rel_target
        };

        let output = Command::new("rg")
            .arg("--line-number")
            .arg("--no-heading")
            .arg("--with-filename")
            .arg("--color=never")
            .arg("--no-ignore")
            .arg("--hidden")
            .arg("--max-filesize")
            .arg(GREP_MAX_FILE_SIZE.to_string())
            .arg("-e")
            .arg(pattern)
            .arg("--")
            .arg(arg)
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .await
            .ok()?;

        // Exit code 1 is "no matches"; anything past that means rg could
        // not complete the search, so the line scan takes over.
        match output.status.code() {
            Some(0) | Some(1) => {}
            _ => return None,
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut matches = Vec::new();
        for line in stdout.lines() {
            let (file, rest) = line.split_once(':')?;
            let (number, text) = rest.split_once(':')?;
            let line_number: usize = number.parse().ok()?;
            matches.push(SearchMatch {
                path: format!("/{}", file.trim_start_matches("./")),
                line: line_number,
                text: text.to_string(),
            });
        }
        tracing::debug!(target: "tansu::disk", matches = matches.len(), "grep via rg");
        Some(matches)
    }
}

fn io_to_backend(err: io::Error, path: &str) -> BackendError {
    if err.kind() == io::ErrorKind::NotFound {
        BackendError::not_found(path)
    } else {
        BackendError::Io(err)
    }
}

#[async_trait]
impl Backend for DiskStore {
    async fn list(&self, path: &str) -> BackendResult<Vec<DirectoryEntry>> {
        let base = path::validate(path)?;

        // name -> entry; overlay entries inserted last take precedence.
        let mut entries: BTreeMap<String, DirectoryEntry> = BTreeMap::new();

        let real = self.resolve(&base)?;
        match fs::metadata(&real).await {
            Ok(meta) if meta.is_file() => {
                if !(self.virtual_mode && self.overlay.lock().contains_key(&base)) {
                    return Ok(vec![DirectoryEntry::file(
                        path::file_name(&base),
                        &base,
                        meta.len(),
                    )]);
                }
            }
            Ok(_) => {
                let mut dir = fs::read_dir(&real).await?;
                while let Some(entry) = dir.next_entry().await? {
                    let meta = match entry.metadata().await {
                        Ok(meta) => meta,
                        Err(_) => continue,
                    };
                    let name = entry.file_name().to_string_lossy().into_owned();
                    let full = if base == "/" {
                        format!("/{name}")
                    } else {
                        format!("{base}/{name}")
                    };
                    let item = if meta.is_dir() {
                        DirectoryEntry::directory(&name, &full)
                    } else {
                        DirectoryEntry::file(&name, &full, meta.len())
                    };
                    entries.insert(name, item);
                }
            }
            Err(_) => {}
        }

        if self.virtual_mode {
            let overlay = self.overlay.lock();
            if let Some(record) = overlay.get(&base) {
                return Ok(vec![DirectoryEntry::file(
                    path::file_name(&base),
                    &base,
                    record.size_bytes(),
                )]);
            }
            for (stored, record) in overlay.iter() {
                let Some(rest) = path::strip_base(stored, &base) else {
                    continue;
                };
                match rest.split_once('/') {
                    None => {
                        entries.insert(
                            rest.to_string(),
                            DirectoryEntry::file(rest, stored, record.size_bytes()),
                        );
                    }
                    Some((dir, _)) => {
                        let full = if base == "/" {
                            format!("/{dir}")
                        } else {
                            format!("{base}/{dir}")
                        };
                        entries
                            .entry(dir.to_string())
                            .or_insert_with(|| DirectoryEntry::directory(dir, full));
                    }
                }
            }
        }

        Ok(entries.into_values().collect())
    }

    async fn read(&self, path: &str, offset: usize, limit: usize) -> BackendResult<String> {
        let normalized = path::validate(path)?;
        let content = self.raw_content(&normalized).await?;
        Ok(render_lines(&content, offset, limit))
    }

    async fn write(&self, path: &str, content: &str) -> BackendResult<WriteOutcome> {
        let normalized = path::validate(path)?;

        if self.virtual_mode {
            let mut overlay = self.overlay.lock();
            match overlay.get_mut(&normalized) {
                Some(record) => record.replace(content),
                None => {
                    overlay.insert(normalized.clone(), FileRecord::from_content(content));
                }
            }
            tracing::debug!(target: "tansu::disk", path = %normalized, "overlay write");
            return Ok(WriteOutcome { path: normalized });
        }

        let real = self.resolve(&normalized)?;
        if let Some(parent) = real.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&real, content)
            .await
            .map_err(|e| io_to_backend(e, &normalized))?;
        tracing::debug!(target: "tansu::disk", path = %normalized, bytes = content.len(), "write");
        Ok(WriteOutcome { path: normalized })
    }

    async fn edit(
        &self,
        path: &str,
        old: &str,
        new: &str,
        replace_all: bool,
    ) -> BackendResult<EditOutcome> {
        let normalized = path::validate(path)?;
        let content = self.raw_content(&normalized).await?;
        let (updated, occurrences) = apply_edit(&normalized, &content, old, new, replace_all)?;

        if self.virtual_mode {
            let mut overlay = self.overlay.lock();
            match overlay.get_mut(&normalized) {
                Some(record) => record.replace(&updated),
                None => {
                    overlay.insert(normalized.clone(), FileRecord::from_content(&updated));
                }
            }
        } else {
            let real = self.resolve(&normalized)?;
            fs::write(&real, &updated)
                .await
                .map_err(|e| io_to_backend(e, &normalized))?;
        }

        Ok(EditOutcome {
            path: normalized,
            occurrences,
        })
    }

    async fn glob(&self, pattern: &str, path: &str) -> BackendResult<Vec<DirectoryEntry>> {
        let base = path::validate(path)?;
        let matcher = search::compile_glob(pattern)?;

        // virtual path -> size; overlay inserted second so it wins on
        // same-path collisions.
        let mut files: BTreeMap<String, u64> = BTreeMap::new();
        let real = self.resolve(&base)?;
        if real.is_dir() {
            for (vpath, size) in self.walk_files(&real).await? {
                files.insert(vpath, size);
            }
        }
        if self.virtual_mode {
            let overlay = self.overlay.lock();
            for (stored, record) in overlay.iter() {
                if path::is_under(stored, &base) {
                    files.insert(stored.clone(), record.size_bytes());
                }
            }
        }

        Ok(files
            .into_iter()
            .filter_map(|(vpath, size)| {
                let rest = path::strip_base(&vpath, &base)?;
                matcher
                    .is_match(rest)
                    .then(|| DirectoryEntry::file(path::file_name(&vpath), &vpath, size))
            })
            .collect())
    }

    async fn grep(
        &self,
        pattern: &str,
        path: Option<&str>,
        file_glob: Option<&str>,
    ) -> BackendResult<Vec<SearchMatch>> {
        let re = search::compile_pattern(pattern)?;
        let base = path::validate(path.unwrap_or("/"))?;
        let matcher = file_glob.map(search::compile_glob).transpose()?;

        let mut matches = Vec::new();
        let mut shadowed: Vec<String> = Vec::new();

        // Overlay entries are always scanned in-process and shadow disk
        // results at the same path.
        if self.virtual_mode {
            let overlay = self.overlay.lock();
            if let Some(record) = overlay.get(&base) {
                search::scan_lines(&re, &base, &record.content(), &mut matches);
                return Ok(matches);
            }
            for (stored, record) in overlay.iter() {
                let Some(rest) = path::strip_base(stored, &base) else {
                    continue;
                };
                shadowed.push(stored.clone());
                if let Some(ref m) = matcher {
                    if !m.is_match(rest) {
                        continue;
                    }
                }
                search::scan_lines(&re, stored, &record.content(), &mut matches);
            }
        }

        let real = self.resolve(&base)?;
        let disk_matches = match self.grep_with_rg(pattern, &real).await {
            Some(found) => found,
            None => {
                let files = if real.is_dir() {
                    self.walk_files(&real).await?
                } else if real.is_file() {
                    let size = fs::metadata(&real).await.map(|m| m.len()).unwrap_or(0);
                    vec![(base.clone(), size)]
                } else {
                    Vec::new()
                };
                let mut found = Vec::new();
                self.grep_scan(&re, &files, &mut found).await?;
                found
            }
        };

        for m in disk_matches {
            if shadowed.contains(&m.path) {
                continue;
            }
            // The accelerated path searched the whole target; the glob
            // filter is applied here so both paths behave identically.
            // A direct file target is never filtered by the glob.
            if m.path != base {
                if let Some(ref g) = matcher {
                    match path::strip_base(&m.path, &base) {
                        Some(rest) if g.is_match(rest) => {}
                        _ => continue,
                    }
                }
            }
            matches.push(m);
        }

        search::sort_matches(&mut matches);
        Ok(matches)
    }
}
