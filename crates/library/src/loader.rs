// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Directory-tree loader and structural validation.
//!
//! Layout contract: `<library_root>/<site>/<root_id>/container.json`, with
//! one child directory per child container. The directory name must equal
//! the last dot-segment of the id it holds.

use crate::error::LibraryError;
use crate::patterns::UrlPattern;
use drover_core::ContainerDefinition;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

/// Read and validate every `container.json` under `root`.
///
/// Returns definitions in parent-before-child order (siblings sorted by
/// directory name for determinism).
pub fn load_tree(root: &Path) -> Result<Vec<ContainerDefinition>, LibraryError> {
    if !root.is_dir() {
        return Err(LibraryError::RootNotFound(root.to_path_buf()));
    }

    let mut defs = Vec::new();
    for site_dir in sorted_dirs(root)? {
        for container_dir in sorted_dirs(&site_dir)? {
            walk_container(&container_dir, &mut defs)?;
        }
    }

    validate(&defs)?;
    Ok(defs)
}

fn sorted_dirs(dir: &Path) -> Result<Vec<std::path::PathBuf>, LibraryError> {
    let entries = fs::read_dir(dir).map_err(|source| LibraryError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| LibraryError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Depth-first: the parent's definition is pushed before its children.
fn walk_container(
    dir: &Path,
    defs: &mut Vec<ContainerDefinition>,
) -> Result<(), LibraryError> {
    let file = dir.join("container.json");
    let body = fs::read_to_string(&file).map_err(|source| LibraryError::Io {
        path: file.clone(),
        source,
    })?;
    let def: ContainerDefinition =
        serde_json::from_str(&body).map_err(|source| LibraryError::Parse {
            path: file,
            source,
        })?;

    let dir_name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let last_segment = def.id.rsplit_once('.').map_or(def.id.as_str(), |(_, s)| s);
    if dir_name != last_segment {
        return Err(LibraryError::DirMismatch { id: def.id, dir: dir_name });
    }

    defs.push(def);
    for child_dir in sorted_dirs(dir)? {
        walk_container(&child_dir, defs)?;
    }
    Ok(())
}

fn validate(defs: &[ContainerDefinition]) -> Result<(), LibraryError> {
    let mut by_id: HashMap<&str, &ContainerDefinition> = HashMap::new();
    for def in defs {
        if by_id.insert(def.id.as_str(), def).is_some() {
            return Err(LibraryError::DuplicateId(def.id.clone()));
        }
    }

    // Roots carry a pattern, nothing else does; patterns must compile.
    for def in defs {
        match (&def.root_pattern, def.parent_id()) {
            (Some(pattern), None) => {
                UrlPattern::parse(pattern).map_err(|e| LibraryError::BadPattern {
                    id: def.id.clone(),
                    reason: e.to_string(),
                })?;
            }
            (Some(_), Some(_)) => return Err(LibraryError::NonRootPattern(def.id.clone())),
            (None, None) => return Err(LibraryError::RootMissingPattern(def.id.clone())),
            (None, Some(_)) => {}
        }
    }

    // Every declared child exists, extends its parent's id, and has
    // exactly one parent.
    let mut parent_of: HashMap<&str, &str> = HashMap::new();
    for def in defs {
        for child in &def.children {
            if !by_id.contains_key(child.as_str()) {
                return Err(LibraryError::MissingChild {
                    parent: def.id.clone(),
                    child: child.clone(),
                });
            }
            if !child
                .strip_prefix(def.id.as_str())
                .is_some_and(|rest| rest.starts_with('.'))
            {
                return Err(LibraryError::BadChildPrefix {
                    child: child.clone(),
                    parent: def.id.clone(),
                });
            }
            if let Some(first) = parent_of.insert(child.as_str(), def.id.as_str()) {
                return Err(LibraryError::MultipleParents {
                    id: child.clone(),
                    first: first.to_string(),
                    second: def.id.clone(),
                });
            }
        }
    }

    // Every non-root is claimed by exactly one parent.
    for def in defs {
        if def.parent_id().is_some() && !parent_of.contains_key(def.id.as_str()) {
            return Err(LibraryError::OrphanContainer(def.id.clone()));
        }
    }

    // Acyclicity. The prefix rule already forbids cycles among well-formed
    // ids; this walk catches hand-edited libraries that defeat it.
    for def in defs {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut current = def.id.as_str();
        while let Some(parent) = parent_of.get(current) {
            if !seen.insert(current) {
                return Err(LibraryError::CyclicChildren(def.id.clone()));
            }
            current = parent;
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
