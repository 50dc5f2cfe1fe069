// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory container registry with atomic refresh.

use crate::error::LibraryError;
use crate::loader::load_tree;
use crate::patterns::UrlPattern;
use drover_core::ContainerDefinition;
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::Arc;

/// Immutable view of one successful load.
///
/// Reads after `load` never lock the loader: `ContainerLibrary` swaps the
/// whole snapshot pointer on refresh.
#[derive(Debug, Clone)]
pub struct LibrarySnapshot {
    /// Definitions in parent-before-child order
    definitions: IndexMap<String, Arc<ContainerDefinition>>,
    /// Root ids with their compiled patterns, in load order
    roots: Vec<(String, UrlPattern)>,
    /// sha256 over the canonical definition set
    hash: String,
}

impl LibrarySnapshot {
    fn build(defs: Vec<ContainerDefinition>) -> Result<Self, LibraryError> {
        let mut hasher = Sha256::new();
        let mut definitions = IndexMap::with_capacity(defs.len());
        let mut roots = Vec::new();

        for def in defs {
            // Canonical hash input: id + serialized definition, in load order.
            hasher.update(def.id.as_bytes());
            hasher.update(b"\n");
            if let Ok(body) = serde_json::to_vec(&def) {
                hasher.update(&body);
            }

            if let Some(pattern) = &def.root_pattern {
                let compiled =
                    UrlPattern::parse(pattern).map_err(|e| LibraryError::BadPattern {
                        id: def.id.clone(),
                        reason: e.to_string(),
                    })?;
                roots.push((def.id.clone(), compiled));
            }
            definitions.insert(def.id.clone(), Arc::new(def));
        }

        let hash = format!("{:x}", hasher.finalize());
        Ok(Self { definitions, roots, hash })
    }

    pub fn get(&self, id: &str) -> Option<Arc<ContainerDefinition>> {
        self.definitions.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn root_ids(&self) -> impl Iterator<Item = &str> {
        self.roots.iter().map(|(id, _)| id.as_str())
    }

    /// Every container id, parent before child.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    /// Candidate containers for a URL: every matching root followed by its
    /// descendant closure, preserving parent-before-child order.
    pub fn containers_for_url(&self, url: &str) -> IndexMap<String, Arc<ContainerDefinition>> {
        let mut out = IndexMap::new();
        for (root_id, pattern) in &self.roots {
            if pattern.matches(url) {
                self.collect_subtree(root_id, &mut out);
            }
        }
        out
    }

    fn collect_subtree(&self, id: &str, out: &mut IndexMap<String, Arc<ContainerDefinition>>) {
        let Some(def) = self.definitions.get(id) else {
            return;
        };
        if out.insert(id.to_string(), def.clone()).is_some() {
            // Already collected under another matching root.
            return;
        }
        for child in &def.children {
            self.collect_subtree(child, out);
        }
    }
}

/// The file-backed container registry.
///
/// `load`/`refresh` replace the cached snapshot atomically on full
/// success only; a partial failure leaves the prior cache intact.
pub struct ContainerLibrary {
    root: PathBuf,
    snapshot: RwLock<Option<Arc<LibrarySnapshot>>>,
    /// One refresh at a time; readers never take this.
    refresh_gate: Mutex<()>,
}

impl ContainerLibrary {
    /// Constructor variant: no global state, tests build isolated instances.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            snapshot: RwLock::new(None),
            refresh_gate: Mutex::new(()),
        }
    }

    /// Read every `container.json` under the library root and cache the
    /// validated snapshot.
    pub fn load(&self) -> Result<Arc<LibrarySnapshot>, LibraryError> {
        self.refresh()
    }

    /// Re-read the library. Idempotent; serialized by an internal gate.
    pub fn refresh(&self) -> Result<Arc<LibrarySnapshot>, LibraryError> {
        let _gate = self.refresh_gate.lock();
        let defs = load_tree(&self.root)?;
        let next = Arc::new(LibrarySnapshot::build(defs)?);
        tracing::info!(
            containers = next.len(),
            hash = drover_core::short(next.hash(), 12),
            "container library loaded"
        );
        *self.snapshot.write() = Some(next.clone());
        Ok(next)
    }

    /// The current snapshot, if `load` has succeeded at least once.
    pub fn snapshot(&self) -> Option<Arc<LibrarySnapshot>> {
        self.snapshot.read().clone()
    }

    pub fn get(&self, id: &str) -> Option<Arc<ContainerDefinition>> {
        self.snapshot.read().as_ref().and_then(|s| s.get(id))
    }

    /// Candidates for a URL. Empty when no root matches or nothing loaded.
    ///
    /// Load failures never surface here; they belong to `load`/`refresh`.
    pub fn containers_for_url(&self, url: &str) -> IndexMap<String, Arc<ContainerDefinition>> {
        match self.snapshot.read().as_ref() {
            Some(snapshot) => snapshot.containers_for_url(url),
            None => IndexMap::new(),
        }
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
