//! patch::store
//!
//! The patch store: a directory of `*.patch` files, applied in lexical
//! file-name order.
//!
//! Rewrites are always a full replace. [`PatchStore::write_patches`] clears
//! every existing patch file, then formats a commit range with options that
//! make the output byte-identical across runs and machines.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;

use super::parse::PatchSet;
use super::PatchError;
use crate::core::naming::PATCH_SUFFIX;
use crate::core::types::CommitRange;
use crate::git::{GitError, Repository};

/// Errors from patch store maintenance.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Listing, reading or deleting store files failed.
    #[error("patch store I/O error at {path}: {source}")]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// Formatting the commit range failed.
    #[error("failed to write patches: {0}")]
    Git(#[from] GitError),
}

/// One patch file of the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchFile {
    /// File name; the patch's identity
    pub name: String,
    /// Absolute path
    pub path: PathBuf,
}

impl PatchFile {
    /// Raw patch text.
    pub fn read(&self) -> Result<String, PatchError> {
        fs::read_to_string(&self.path).map_err(|source| PatchError::Read {
            path: self.path.clone(),
            source,
        })
    }

    /// Read and parse the patch.
    pub fn load(&self) -> Result<PatchSet, PatchError> {
        PatchSet::parse(&self.read()?).map_err(|source| PatchError::Parse {
            patch: self.name.clone(),
            source,
        })
    }
}

/// The patch store directory.
#[derive(Debug, Clone)]
pub struct PatchStore {
    dir: PathBuf,
}

impl PatchStore {
    /// Store rooted at `dir` (absolute). The directory need not exist.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Patch files in application order. A missing directory is an empty
    /// store.
    pub fn list(&self) -> Result<Vec<PatchFile>, StoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_err(&self.dir, e)),
        };

        let mut patches = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| self.io_err(&self.dir, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_file = entry
                .file_type()
                .map_err(|e| self.io_err(&entry.path(), e))?
                .is_file();
            if is_file && name.ends_with(PATCH_SUFFIX) {
                patches.push(PatchFile {
                    name,
                    path: entry.path(),
                });
            }
        }
        patches.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(patches)
    }

    /// Remove every patch file. Returns how many were removed.
    pub fn clear(&self) -> Result<usize, StoreError> {
        let patches = self.list()?;
        for patch in &patches {
            fs::remove_file(&patch.path).map_err(|e| self.io_err(&patch.path, e))?;
        }
        Ok(patches.len())
    }

    /// Replace the store with one patch per commit of `range`.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let store = PatchStore::new(layout.patches_path());
    /// let written = store.write_patches(&git, &"tsflower-base..tsflower".parse()?)?;
    /// ```
    pub fn write_patches(
        &self,
        repo: &dyn Repository,
        range: &CommitRange,
    ) -> Result<Vec<PatchFile>, StoreError> {
        self.clear()?;
        fs::create_dir_all(&self.dir).map_err(|e| self.io_err(&self.dir, e))?;
        repo.format_patches(range, &self.dir)?;
        self.list()
    }

    /// SHA-256 over every patch's name and content, in order.
    pub fn digest(&self) -> Result<String, StoreError> {
        let mut hasher = Sha256::new();
        for patch in self.list()? {
            let bytes = fs::read(&patch.path).map_err(|e| self.io_err(&patch.path, e))?;
            hasher.update(patch.name.as_bytes());
            hasher.update([0]);
            hasher.update(&bytes);
            hasher.update([0]);
        }
        Ok(hex::encode(hasher.finalize()))
    }

    fn io_err(&self, path: &Path, source: io::Error) -> StoreError {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
