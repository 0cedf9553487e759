//! git
//!
//! Single interface for all repository operations.
//!
//! # Architecture
//!
//! This module is the **only doorway** to Git. Every read and write the
//! tool performs goes through the [`Repository`] trait, which exposes just
//! the operations the lifecycle manager and checker need. No other module
//! imports `git2` or spawns `git`.
//!
//! Two implementations exist:
//! - [`Git`] - git2 for reads and ref/config writes, the `git` binary for
//!   porcelain (checkout, add, commit, am, rebase, format-patch)
//! - `MockRepo` - an in-memory history over a real scratch working
//!   directory, available under `cfg(test)`
//!
//! # Invariants
//!
//! - The current branch and working directory are values returned by the
//!   trait, never ambient process state
//! - Paths crossing the trait are repo-relative and `/`-separated
//! - Path selection is always expressed as a [`PathFilter`]

mod interface;
#[cfg(test)]
mod mock;

use std::path::{Path, PathBuf};

pub use interface::{
    Git, GitError, GitState, RebaseOutcome, Upstream, WorktreeStatus, FORMAT_PATCH_ARGS,
};
#[cfg(test)]
pub use mock::MockRepo;

use crate::core::paths::PathFilter;
use crate::core::types::{BranchName, CommitRange, Oid};

/// Repository capabilities used by typestack.
pub trait Repository {
    /// Root of the working tree.
    fn work_dir(&self) -> &Path;

    /// In-progress operation, if any.
    fn state(&self) -> GitState;

    /// Staged/unstaged/untracked counts.
    fn worktree_status(&self) -> Result<WorktreeStatus, GitError>;

    /// Untracked, non-ignored files.
    fn untracked_paths(&self) -> Result<Vec<String>, GitError>;

    /// Every path differing from HEAD in the index or the working tree,
    /// untracked files included.
    fn changed_paths(&self) -> Result<Vec<String>, GitError>;

    /// Paths whose working-tree content differs from the index, untracked
    /// files included.
    fn unstaged_paths(&self) -> Result<Vec<String>, GitError>;

    /// Checked-out branch; `None` when HEAD is detached or unborn.
    fn current_branch(&self) -> Result<Option<BranchName>, GitError>;

    /// Commit HEAD points at.
    fn head_oid(&self) -> Result<Oid, GitError>;

    /// Tip of a local branch, or `None` if it does not exist.
    fn branch_oid(&self, branch: &BranchName) -> Result<Option<Oid>, GitError>;

    /// Whether `ancestor` is reachable from `descendant` (or equal to it).
    fn is_ancestor(&self, ancestor: &Oid, descendant: &Oid) -> Result<bool, GitError>;

    /// Configured upstream of a local branch.
    fn upstream(&self, branch: &BranchName) -> Result<Option<Upstream>, GitError>;

    /// Make `branch` track the local branch `upstream`.
    fn set_upstream(&self, branch: &BranchName, upstream: &BranchName) -> Result<(), GitError>;

    /// Create `branch` at `at`, resetting it if it already exists.
    fn create_branch(&self, branch: &BranchName, at: &Oid) -> Result<(), GitError>;

    /// Check out a local branch.
    fn checkout_branch(&self, branch: &BranchName) -> Result<(), GitError>;

    /// Detach HEAD at the current commit.
    fn checkout_detached(&self) -> Result<(), GitError>;

    /// Stage every change (additions, modifications, deletions) to paths
    /// matching `filter`.
    fn stage(&self, filter: &PathFilter) -> Result<(), GitError>;

    /// Commit the index, even when nothing changed.
    fn commit(&self, message: &str) -> Result<Oid, GitError>;

    /// Replay mail-formatted patches as one commit each (`git am -p0`).
    /// On failure HEAD and the working tree are restored.
    fn apply_mailbox(&self, patches: &[PathBuf]) -> Result<(), GitError>;

    /// Rebase the current branch onto `upstream`.
    fn rebase(&self, upstream: &BranchName) -> Result<RebaseOutcome, GitError>;

    /// Write each commit of `range` as a normalized patch file into
    /// `out_dir`; returns the written paths in order.
    fn format_patches(&self, range: &CommitRange, out_dir: &Path) -> Result<Vec<PathBuf>, GitError>;

    /// Make paths matching `filter` equal to their content in `branch`,
    /// deleting those absent there. Index and working tree both change.
    fn restore_from(&self, branch: &BranchName, filter: &PathFilter) -> Result<(), GitError>;

    /// Reset HEAD, index and working tree to `oid`.
    fn reset_hard(&self, oid: &Oid) -> Result<(), GitError>;
}
