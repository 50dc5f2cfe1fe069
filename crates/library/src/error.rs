// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Library load/validation errors.

use drover_core::ErrorKind;
use std::path::PathBuf;

/// Errors raised while loading or validating the container library.
///
/// All validation variants name the offending id so the operator can fix
/// the library file directly.
#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error("library root not found: {0}")]
    RootNotFound(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("duplicate container id: {0}")]
    DuplicateId(String),

    #[error("container {id}: directory {dir} does not match id segment")]
    DirMismatch { id: String, dir: String },

    #[error("container {child} is not prefixed by its parent {parent}")]
    BadChildPrefix { child: String, parent: String },

    #[error("container {id} is listed as a child of both {first} and {second}")]
    MultipleParents {
        id: String,
        first: String,
        second: String,
    },

    #[error("container {parent} declares missing child {child}")]
    MissingChild { parent: String, child: String },

    #[error("container {0} is not listed in any parent's children")]
    OrphanContainer(String),

    #[error("non-root container {0} carries a root_pattern")]
    NonRootPattern(String),

    #[error("root container {0} is missing a root_pattern")]
    RootMissingPattern(String),

    #[error("container {id}: invalid root_pattern: {reason}")]
    BadPattern { id: String, reason: String },

    #[error("cyclic children involving container {0}")]
    CyclicChildren(String),
}

impl LibraryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LibraryError::RootNotFound(_) => ErrorKind::LibraryNotFound,
            _ => ErrorKind::LibraryInvalid,
        }
    }
}
