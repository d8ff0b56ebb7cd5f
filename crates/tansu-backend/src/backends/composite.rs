//! Composite routing backend.
//!
//! Dispatches every operation to a sub-backend by longest matching path
//! prefix, falling back to a default backend. The router owns no file
//! state of its own, only the routing table; routed backends are shared
//! `Arc`s and receive the caller's original path unrewritten.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::contract::Backend;
use crate::error::BackendResult;
use crate::path;
use crate::record::{DirectoryEntry, EditOutcome, SearchMatch, WriteOutcome};
use crate::search;

/// Longest-prefix router over shared backends.
pub struct CompositeRouter {
    /// Registration-ordered (prefix, backend) pairs. Registering an
    /// identical prefix replaces the earlier entry, so equal-length
    /// prefixes never compete during resolution.
    routes: RwLock<Vec<(String, Arc<dyn Backend>)>>,
    default: Arc<dyn Backend>,
}

impl CompositeRouter {
    /// Create a router with only a default backend.
    pub fn new(default: Arc<dyn Backend>) -> Self {
        Self {
            routes: RwLock::new(Vec::new()),
            default,
        }
    }

    /// Create a router with an initial route table.
    pub fn with_routes(
        default: Arc<dyn Backend>,
        routes: impl IntoIterator<Item = (String, Arc<dyn Backend>)>,
    ) -> BackendResult<Self> {
        let router = Self::new(default);
        for (prefix, backend) in routes {
            router.add_route(&prefix, backend)?;
        }
        Ok(router)
    }

    /// Register (or replace) a route.
    pub fn add_route(&self, prefix: &str, backend: Arc<dyn Backend>) -> BackendResult<()> {
        let prefix = path::validate(prefix)?;
        let mut routes = self.routes.write();
        if let Some(existing) = routes.iter_mut().find(|(p, _)| *p == prefix) {
            existing.1 = backend;
        } else {
            routes.push((prefix, backend));
        }
        Ok(())
    }

    /// Registered route prefixes, in registration order.
    pub fn route_prefixes(&self) -> Vec<String> {
        self.routes.read().iter().map(|(p, _)| p.clone()).collect()
    }

    /// Resolve the backend for a normalized path.
    ///
    /// Longest matching prefix wins; with no match the default backend
    /// handles the call. The `Arc` is cloned out so the lock is released
    /// before the forwarded operation awaits.
    fn resolve(&self, normalized: &str) -> Arc<dyn Backend> {
        let routes = self.routes.read();
        let mut best: Option<&(String, Arc<dyn Backend>)> = None;
        for route in routes.iter() {
            if !path::is_under(normalized, &route.0) {
                continue;
            }
            if best.is_none_or(|(prefix, _)| route.0.len() > prefix.len()) {
                best = Some(route);
            }
        }
        match best {
            Some((prefix, backend)) => {
                tracing::trace!(target: "tansu::composite", path = %normalized, route = %prefix, "routed");
                Arc::clone(backend)
            }
            None => Arc::clone(&self.default),
        }
    }

    /// Every backend that participates in a root-level aggregation:
    /// routed backends in registration order, then the default.
    fn all_backends(&self) -> Vec<Arc<dyn Backend>> {
        let mut backends: Vec<Arc<dyn Backend>> = self
            .routes
            .read()
            .iter()
            .map(|(_, backend)| Arc::clone(backend))
            .collect();
        backends.push(Arc::clone(&self.default));
        backends
    }
}

#[async_trait]
impl Backend for CompositeRouter {
    async fn list(&self, path: &str) -> BackendResult<Vec<DirectoryEntry>> {
        let base = path::validate(path)?;
        if base != "/" {
            return self.resolve(&base).list(path).await;
        }

        // Root listing: the default backend's entries plus one synthesized
        // directory per route's first path segment, deduplicated.
        let mut entries: BTreeMap<String, DirectoryEntry> = BTreeMap::new();
        if let Ok(default_entries) = self.default.list(path).await {
            for entry in default_entries {
                entries.insert(entry.name.clone(), entry);
            }
        }
        for prefix in self.route_prefixes() {
            let Some(first) = prefix.trim_start_matches('/').split('/').next() else {
                continue;
            };
            if first.is_empty() {
                continue;
            }
            entries
                .entry(first.to_string())
                .or_insert_with(|| DirectoryEntry::directory(first, format!("/{first}")));
        }
        Ok(entries.into_values().collect())
    }

    async fn read(&self, path: &str, offset: usize, limit: usize) -> BackendResult<String> {
        let base = path::validate(path)?;
        self.resolve(&base).read(path, offset, limit).await
    }

    async fn write(&self, path: &str, content: &str) -> BackendResult<WriteOutcome> {
        let base = path::validate(path)?;
        self.resolve(&base).write(path, content).await
    }

    async fn edit(
        &self,
        path: &str,
        old: &str,
        new: &str,
        replace_all: bool,
    ) -> BackendResult<EditOutcome> {
        let base = path::validate(path)?;
        self.resolve(&base).edit(path, old, new, replace_all).await
    }

    async fn glob(&self, pattern: &str, path: &str) -> BackendResult<Vec<DirectoryEntry>> {
        let base = path::validate(path)?;
        if base != "/" {
            return self.resolve(&base).glob(pattern, path).await;
        }

        // Validate the pattern once so aggregation cannot swallow the
        // diagnostic, then skip individual backend failures.
        search::compile_glob(pattern)?;
        let mut seen: BTreeMap<String, DirectoryEntry> = BTreeMap::new();
        for backend in self.all_backends() {
            if let Ok(entries) = backend.glob(pattern, path).await {
                for entry in entries {
                    seen.entry(entry.path.clone()).or_insert(entry);
                }
            }
        }
        Ok(seen.into_values().collect())
    }

    async fn grep(
        &self,
        pattern: &str,
        path: Option<&str>,
        file_glob: Option<&str>,
    ) -> BackendResult<Vec<SearchMatch>> {
        let base = path::validate(path.unwrap_or("/"))?;
        if base != "/" {
            return self.resolve(&base).grep(pattern, path, file_glob).await;
        }

        search::compile_pattern(pattern)?;
        let mut matches = Vec::new();
        for backend in self.all_backends() {
            if let Ok(found) = backend.grep(pattern, path, file_glob).await {
                matches.extend(found);
            }
        }
        search::sort_matches(&mut matches);
        matches.dedup();
        Ok(matches)
    }
}
