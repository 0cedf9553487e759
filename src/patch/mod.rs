//! patch
//!
//! The patch store and the engine that applies it.
//!
//! # Modules
//!
//! - [`parse`] - Unified diff / mail patch parser
//! - [`apply`] - Zero-fuzz forward and reverse application
//! - [`store`] - The ordered `*.patch` directory and its rewrite
//!
//! # Example
//!
//! ```ignore
//! use typestack::patch::{apply_all, Direction, PatchStore};
//!
//! let store = PatchStore::new(layout.patches_path());
//! let applied = apply_all(layout.work_dir(), &store.list()?, Direction::Forward)?;
//! ```

pub mod apply;
pub mod parse;
pub mod store;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub use apply::{apply_all, apply_set, Direction};
pub use parse::{FilePatch, Hunk, HunkLine, ParseError, PatchSet};
pub use store::{PatchFile, PatchStore, StoreError};

/// Errors from reading or applying patches.
#[derive(Debug, Error)]
pub enum PatchError {
    /// A patch or target file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File being read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// A patched file could not be written.
    #[error("failed to write {path}: {source}")]
    Write {
        /// File being written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// The patch file is malformed.
    #[error("{patch} is not a valid patch: {source}")]
    Parse {
        /// Patch file name
        patch: String,
        /// Parse failure
        #[source]
        source: ParseError,
    },

    /// A hunk did not match exactly. Nothing from this patch was written.
    #[error("patch {patch} does not apply to {file}: {reason}")]
    ApplyFailed {
        /// Patch file name
        patch: String,
        /// File the failing hunk targets
        file: String,
        /// What did not match
        reason: String,
    },
}

impl PatchError {
    /// Name of the patch file at fault, when known.
    pub fn patch_name(&self) -> Option<&str> {
        match self {
            PatchError::Parse { patch, .. } | PatchError::ApplyFailed { patch, .. } => Some(patch),
            PatchError::Read { .. } | PatchError::Write { .. } => None,
        }
    }
}
