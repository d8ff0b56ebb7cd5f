//! In-memory storage backend.
//!
//! All file state lives in a process-local map. Nothing survives the
//! process; used for scratch space and testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};

use crate::contract::Backend;
use crate::error::{BackendError, BackendResult};
use crate::path;
use crate::record::{
    DirectoryEntry, EditOutcome, FileRecord, SearchMatch, WriteOutcome, apply_edit, render_lines,
};
use crate::search;

/// In-memory backend.
///
/// Thread-safe via one coarse lock over the whole map; each contract
/// operation completes its map access inside a single acquisition, so a
/// concurrent reader never observes a half-updated record.
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: Mutex<HashMap<String, FileRecord>>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored files.
    pub fn len(&self) -> usize {
        self.files.lock().len()
    }

    /// True when no files are stored.
    pub fn is_empty(&self) -> bool {
        self.files.lock().is_empty()
    }

    fn content_of(&self, normalized: &str) -> BackendResult<String> {
        self.files
            .lock()
            .get(normalized)
            .map(FileRecord::content)
            .ok_or_else(|| BackendError::not_found(normalized))
    }
}

#[async_trait]
impl Backend for MemoryStore {
    async fn list(&self, path: &str) -> BackendResult<Vec<DirectoryEntry>> {
        let base = path::validate(path)?;
        let files = self.files.lock();

        // A path stored literally as a file lists as itself.
        if let Some(record) = files.get(&base) {
            return Ok(vec![DirectoryEntry::file(
                path::file_name(&base),
                &base,
                record.size_bytes(),
            )]);
        }

        // name -> entry; BTreeMap keeps the listing sorted and deduped.
        let mut entries: BTreeMap<String, DirectoryEntry> = BTreeMap::new();
        for (stored, record) in files.iter() {
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

        Ok(entries.into_values().collect())
    }

    async fn read(&self, path: &str, offset: usize, limit: usize) -> BackendResult<String> {
        let normalized = path::validate(path)?;
        let content = self.content_of(&normalized)?;
        Ok(render_lines(&content, offset, limit))
    }

    async fn write(&self, path: &str, content: &str) -> BackendResult<WriteOutcome> {
        let normalized = path::validate(path)?;
        let mut files = self.files.lock();
        match files.get_mut(&normalized) {
            Some(record) => record.replace(content),
            None => {
                files.insert(normalized.clone(), FileRecord::from_content(content));
            }
        }
        tracing::debug!(target: "tansu::memory", path = %normalized, bytes = content.len(), "write");
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
        let mut files = self.files.lock();
        let record = files
            .get_mut(&normalized)
            .ok_or_else(|| BackendError::not_found(&normalized))?;

        let (updated, occurrences) =
            apply_edit(&normalized, &record.content(), old, new, replace_all)?;
        record.replace(&updated);

        tracing::debug!(target: "tansu::memory", path = %normalized, occurrences, "edit");
        Ok(EditOutcome {
            path: normalized,
            occurrences,
        })
    }

    async fn glob(&self, pattern: &str, path: &str) -> BackendResult<Vec<DirectoryEntry>> {
        let base = path::validate(path)?;
        let matcher = search::compile_glob(pattern)?;

        let files = self.files.lock();
        let mut out: Vec<DirectoryEntry> = files
            .iter()
            .filter_map(|(stored, record)| {
                let rest = path::strip_base(stored, &base)?;
                matcher.is_match(rest).then(|| {
                    DirectoryEntry::file(path::file_name(stored), stored, record.size_bytes())
                })
            })
            .collect();
        out.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(out)
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

        let files = self.files.lock();
        let mut matches = Vec::new();

        // A file path targets just that file.
        if let Some(record) = files.get(&base) {
            search::scan_lines(&re, &base, &record.content(), &mut matches);
            return Ok(matches);
        }

        for (stored, record) in files.iter() {
            let Some(rest) = path::strip_base(stored, &base) else {
                continue;
            };
            if let Some(ref m) = matcher {
                if !m.is_match(rest) {
                    continue;
                }
            }
            search::scan_lines(&re, stored, &record.content(), &mut matches);
        }
        search::sort_matches(&mut matches);
        Ok(matches)
    }
}
