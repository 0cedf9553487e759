//! git::interface
//!
//! The production [`Repository`] implementation.
//!
//! Reads (status, refs, ancestry, trees) and branch/config writes go through
//! `git2`. Operations that need git's porcelain behaviour (checkout, add,
//! commit, am, rebase, format-patch, restore, reset) run the `git` binary in
//! the repository's working directory.
//!
//! # Error Handling
//!
//! Git errors are categorized into typed variants:
//! - [`GitError::NotARepo`]: Not inside a Git repository
//! - [`GitError::RefNotFound`]: Requested ref does not exist
//! - [`GitError::CommandFailed`]: A `git` subprocess exited non-zero
//!
//! # Example
//!
//! ```ignore
//! use typestack::git::{Git, Repository};
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("."))?;
//! if let Some(branch) = git.current_branch()? {
//!     println!("on {branch}");
//! }
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

use super::Repository;
use crate::core::paths::PathFilter;
use crate::core::types::{BranchName, CommitRange, Oid, TypeError};

/// Errors from Git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Not inside a Git repository.
    #[error("not a git repository: {path}")]
    NotARepo {
        /// The path that was searched
        path: PathBuf,
    },

    /// Repository is bare (no working directory).
    #[error("bare repository not supported")]
    BareRepo,

    /// Requested ref does not exist.
    #[error("ref not found: {refname}")]
    RefNotFound {
        /// The ref that was not found
        refname: String,
    },

    /// Invalid object id format.
    #[error("invalid object id: {oid}")]
    InvalidOid {
        /// The invalid OID string
        oid: String,
    },

    /// Invalid ref name format.
    #[error("invalid ref name: {message}")]
    InvalidRefName {
        /// Description of the problem
        message: String,
    },

    /// A `git` subprocess failed.
    #[error("`git {command}` failed{}: {stderr}", status.map(|c| format!(" with exit code {c}")).unwrap_or_default())]
    CommandFailed {
        /// Arguments passed to git, space-joined
        command: String,
        /// Exit code, if the process exited normally
        status: Option<i32>,
        /// Trimmed standard error output
        stderr: String,
    },

    /// Filesystem error inside the working directory.
    #[error("cannot access {path}: {source}")]
    Io {
        /// The path being accessed
        path: PathBuf,
        /// The underlying error
        #[source]
        source: std::io::Error,
    },

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

impl GitError {
    /// Create a GitError from a git2::Error with richer context.
    fn from_git2(err: git2::Error, context: &str) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound => GitError::RefNotFound {
                refname: context.to_string(),
            },
            git2::ErrorCode::InvalidSpec => GitError::InvalidOid {
                oid: context.to_string(),
            },
            _ => GitError::Internal {
                message: format!("{}: {}", context, err.message()),
            },
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GitError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<git2::Error> for GitError {
    fn from(err: git2::Error) -> Self {
        GitError::Internal {
            message: err.message().to_string(),
        }
    }
}

impl From<TypeError> for GitError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidOid(msg) => GitError::InvalidOid { oid: msg },
            TypeError::InvalidBranchName(msg) | TypeError::InvalidRange(msg) => {
                GitError::InvalidRefName { message: msg }
            }
        }
    }
}

/// State of in-progress Git operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitState {
    /// No operation in progress.
    Clean,

    /// Rebase in progress.
    Rebase {
        /// Current step in the rebase (1-indexed), if available.
        current: Option<usize>,
        /// Total steps in the rebase, if available.
        total: Option<usize>,
    },

    /// Merge in progress.
    Merge,

    /// Cherry-pick in progress.
    CherryPick,

    /// Revert in progress.
    Revert,

    /// Bisect in progress.
    Bisect,

    /// Apply mailbox in progress.
    ApplyMailbox,
}

impl GitState {
    /// Check if any operation is in progress.
    ///
    /// # Example
    ///
    /// ```
    /// use typestack::git::GitState;
    ///
    /// assert!(!GitState::Clean.is_in_progress());
    /// assert!(GitState::Merge.is_in_progress());
    /// ```
    pub fn is_in_progress(&self) -> bool {
        !matches!(self, GitState::Clean)
    }

    /// Get a human-readable description of the state.
    pub fn description(&self) -> &'static str {
        match self {
            GitState::Clean => "clean",
            GitState::Rebase { .. } => "rebase",
            GitState::Merge => "merge",
            GitState::CherryPick => "cherry-pick",
            GitState::Revert => "revert",
            GitState::Bisect => "bisect",
            GitState::ApplyMailbox => "apply-mailbox",
        }
    }
}

impl std::fmt::Display for GitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GitState::Rebase {
                current: Some(c),
                total: Some(t),
            } => write!(f, "rebase ({}/{})", c, t),
            _ => write!(f, "{}", self.description()),
        }
    }
}

/// Summary of working tree status.
///
/// Untracked files are counted separately and never make the tree dirty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorktreeStatus {
    /// Number of staged changes
    pub staged: usize,
    /// Number of unstaged changes to tracked files
    pub unstaged: usize,
    /// Number of untracked files
    pub untracked: usize,
    /// Whether there are unresolved conflicts
    pub has_conflicts: bool,
}

impl WorktreeStatus {
    /// Check if the worktree has no staged or unstaged changes.
    pub fn is_clean(&self) -> bool {
        self.staged == 0 && self.unstaged == 0 && !self.has_conflicts
    }
}

/// A branch's configured upstream (`branch.<name>.remote` / `.merge`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Upstream {
    /// Tracks another local branch (`remote = .`).
    Local(BranchName),
    /// Tracks a branch of a named remote.
    Remote {
        /// Remote name
        remote: String,
        /// Merge ref on the remote
        merge: String,
    },
}

impl std::fmt::Display for Upstream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Upstream::Local(branch) => write!(f, "{branch}"),
            Upstream::Remote { remote, merge } => {
                write!(f, "{}/{}", remote, merge.trim_start_matches("refs/heads/"))
            }
        }
    }
}

/// Result of a rebase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebaseOutcome {
    /// Every commit was replayed.
    Completed,
    /// Git stopped on a conflict and left the rebase in progress.
    Conflict,
}

/// Arguments that make `git format-patch` output independent of the
/// environment: no version signature, zero commit hash, no numbering, no
/// path prefixes, fixed context and file naming.
pub const FORMAT_PATCH_ARGS: &[&str] = &[
    "--zero-commit",
    "--no-signature",
    "--no-numbered",
    "--no-prefix",
    "-U3",
    "--inter-hunk-context=0",
    "--no-renames",
    "--no-stat",
    "--suffix=.patch",
    "--filename-max-length=64",
    "--start-number=1",
];

/// The production repository: git2 plus the `git` binary.
pub struct Git {
    /// The underlying git2 repository
    repo: git2::Repository,
    work_dir: PathBuf,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("path", &self.repo.path())
            .finish()
    }
}

impl Git {
    /// Open a repository at the given path.
    ///
    /// Uses `git2::Repository::discover` to find the repository root,
    /// so `path` can be any directory within the repository.
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] if no repository is found
    /// - [`GitError::BareRepo`] if the repository has no working directory
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::discover(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;

        let work_dir = repo.workdir().ok_or(GitError::BareRepo)?.to_path_buf();

        Ok(Self { repo, work_dir })
    }

    /// Read rebase progress from .git/rebase-merge or .git/rebase-apply.
    fn read_rebase_progress(&self) -> (Option<usize>, Option<usize>) {
        let git_dir = self.repo.path();

        for (dir, next, last) in [
            ("rebase-merge", "msgnum", "end"),
            ("rebase-apply", "next", "last"),
        ] {
            let dir = git_dir.join(dir);
            if dir.exists() {
                let read = |name: &str| {
                    std::fs::read_to_string(dir.join(name))
                        .ok()
                        .and_then(|s| s.trim().parse().ok())
                };
                return (read(next), read(last));
            }
        }

        (None, None)
    }

    /// Run `git <args>` in the working directory and return stdout.
    fn run(&self, args: &[&str]) -> Result<String, GitError> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.work_dir)
            .output()
            .map_err(|e| GitError::CommandFailed {
                command: args.join(" "),
                status: None,
                stderr: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(GitError::CommandFailed {
                command: args.join(" "),
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Run a path-taking command with literal pathspecs; no-op for no paths.
    fn run_with_paths(&self, args: &[&str], paths: &[String]) -> Result<(), GitError> {
        if paths.is_empty() {
            return Ok(());
        }
        let mut full = vec!["--literal-pathspecs"];
        full.extend_from_slice(args);
        full.push("--");
        full.extend(paths.iter().map(String::as_str));
        self.run(&full).map(|_| ())
    }

    fn statuses(&self) -> Result<Vec<(String, git2::Status)>, GitError> {
        let mut opts = git2::StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false);

        let statuses = self.repo.statuses(Some(&mut opts))?;
        Ok(statuses
            .iter()
            .filter_map(|entry| entry.path().map(|p| (p.to_string(), entry.status())))
            .collect())
    }

    fn find_local_branch(&self, branch: &BranchName) -> Result<Option<git2::Branch<'_>>, GitError> {
        match self.repo.find_branch(branch.as_str(), git2::BranchType::Local) {
            Ok(b) => Ok(Some(b)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::from_git2(e, &branch.refname())),
        }
    }

    /// Blob paths of a branch's tree.
    fn tree_paths(&self, branch: &BranchName) -> Result<BTreeSet<String>, GitError> {
        let tree = self
            .find_local_branch(branch)?
            .ok_or_else(|| GitError::RefNotFound {
                refname: branch.refname(),
            })?
            .get()
            .peel_to_tree()?;

        let mut paths = BTreeSet::new();
        tree.walk(git2::TreeWalkMode::PreOrder, |root, entry| {
            if entry.kind() == Some(git2::ObjectType::Blob) {
                if let Some(name) = entry.name() {
                    paths.insert(format!("{root}{name}"));
                }
            }
            git2::TreeWalkResult::Ok
        })?;
        Ok(paths)
    }

    fn index_paths(&self) -> Result<BTreeSet<String>, GitError> {
        let index = self.repo.index()?;
        Ok(index
            .iter()
            .map(|entry| String::from_utf8_lossy(&entry.path).into_owned())
            .collect())
    }
}

fn git2_oid(oid: &Oid) -> Result<git2::Oid, GitError> {
    git2::Oid::from_str(oid.as_str()).map_err(|e| GitError::from_git2(e, oid.as_str()))
}

fn to_oid(oid: git2::Oid) -> Result<Oid, GitError> {
    Ok(Oid::new(oid.to_string())?)
}

impl Repository for Git {
    fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    fn state(&self) -> GitState {
        match self.repo.state() {
            git2::RepositoryState::Clean => GitState::Clean,
            git2::RepositoryState::Rebase
            | git2::RepositoryState::RebaseInteractive
            | git2::RepositoryState::RebaseMerge => {
                let (current, total) = self.read_rebase_progress();
                GitState::Rebase { current, total }
            }
            git2::RepositoryState::Merge => GitState::Merge,
            git2::RepositoryState::CherryPick | git2::RepositoryState::CherryPickSequence => {
                GitState::CherryPick
            }
            git2::RepositoryState::Revert | git2::RepositoryState::RevertSequence => {
                GitState::Revert
            }
            git2::RepositoryState::Bisect => GitState::Bisect,
            git2::RepositoryState::ApplyMailbox | git2::RepositoryState::ApplyMailboxOrRebase => {
                GitState::ApplyMailbox
            }
        }
    }

    fn worktree_status(&self) -> Result<WorktreeStatus, GitError> {
        let mut result = WorktreeStatus::default();

        for (_, status) in self.statuses()? {
            if status.is_conflicted() {
                result.has_conflicts = true;
            }
            if status.is_index_new()
                || status.is_index_modified()
                || status.is_index_deleted()
                || status.is_index_renamed()
                || status.is_index_typechange()
            {
                result.staged += 1;
            }
            if status.is_wt_modified()
                || status.is_wt_deleted()
                || status.is_wt_renamed()
                || status.is_wt_typechange()
            {
                result.unstaged += 1;
            }
            if status.is_wt_new() {
                result.untracked += 1;
            }
        }

        Ok(result)
    }

    fn untracked_paths(&self) -> Result<Vec<String>, GitError> {
        Ok(self
            .statuses()?
            .into_iter()
            .filter(|(_, status)| status.is_wt_new())
            .map(|(path, _)| path)
            .collect())
    }

    fn changed_paths(&self) -> Result<Vec<String>, GitError> {
        Ok(self
            .statuses()?
            .into_iter()
            .filter(|(_, status)| !status.is_empty() && !status.is_ignored())
            .map(|(path, _)| path)
            .collect())
    }

    fn unstaged_paths(&self) -> Result<Vec<String>, GitError> {
        Ok(self
            .statuses()?
            .into_iter()
            .filter(|(_, status)| {
                status.intersects(
                    git2::Status::WT_NEW
                        | git2::Status::WT_MODIFIED
                        | git2::Status::WT_DELETED
                        | git2::Status::WT_RENAMED
                        | git2::Status::WT_TYPECHANGE,
                )
            })
            .map(|(path, _)| path)
            .collect())
    }

    fn current_branch(&self) -> Result<Option<BranchName>, GitError> {
        let head = match self.repo.head() {
            Ok(h) => h,
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if head.is_branch() {
            if let Some(name) = head.shorthand() {
                return Ok(Some(BranchName::new(name)?));
            }
        }

        Ok(None)
    }

    fn head_oid(&self) -> Result<Oid, GitError> {
        let head = self
            .repo
            .head()
            .map_err(|e| GitError::from_git2(e, "HEAD"))?;
        let commit = head
            .peel_to_commit()
            .map_err(|e| GitError::from_git2(e, "HEAD"))?;
        to_oid(commit.id())
    }

    fn branch_oid(&self, branch: &BranchName) -> Result<Option<Oid>, GitError> {
        match self.find_local_branch(branch)? {
            Some(b) => {
                let commit = b
                    .get()
                    .peel_to_commit()
                    .map_err(|e| GitError::from_git2(e, &branch.refname()))?;
                Ok(Some(to_oid(commit.id())?))
            }
            None => Ok(None),
        }
    }

    fn is_ancestor(&self, ancestor: &Oid, descendant: &Oid) -> Result<bool, GitError> {
        if ancestor == descendant {
            return Ok(true);
        }
        Ok(self
            .repo
            .graph_descendant_of(git2_oid(descendant)?, git2_oid(ancestor)?)?)
    }

    fn upstream(&self, branch: &BranchName) -> Result<Option<Upstream>, GitError> {
        let config = self.repo.config()?.snapshot()?;
        let get = |key: String| match config.get_string(&key) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::from(e)),
        };

        let remote = get(format!("branch.{}.remote", branch))?;
        let merge = get(format!("branch.{}.merge", branch))?;

        match (remote, merge) {
            (Some(remote), Some(merge)) if remote == "." => {
                let name = merge.strip_prefix("refs/heads/").unwrap_or(&merge);
                Ok(Some(Upstream::Local(BranchName::new(name)?)))
            }
            (Some(remote), Some(merge)) => Ok(Some(Upstream::Remote { remote, merge })),
            _ => Ok(None),
        }
    }

    fn set_upstream(&self, branch: &BranchName, upstream: &BranchName) -> Result<(), GitError> {
        let mut config = self.repo.config()?;
        config.set_str(&format!("branch.{}.remote", branch), ".")?;
        config.set_str(&format!("branch.{}.merge", branch), &upstream.refname())?;
        Ok(())
    }

    fn create_branch(&self, branch: &BranchName, at: &Oid) -> Result<(), GitError> {
        let commit = self
            .repo
            .find_commit(git2_oid(at)?)
            .map_err(|e| GitError::from_git2(e, at.as_str()))?;
        self.repo.branch(branch.as_str(), &commit, true)?;
        Ok(())
    }

    fn checkout_branch(&self, branch: &BranchName) -> Result<(), GitError> {
        self.run(&["checkout", "-q", branch.as_str()]).map(|_| ())
    }

    fn checkout_detached(&self) -> Result<(), GitError> {
        self.run(&["checkout", "-q", "--detach"]).map(|_| ())
    }

    fn stage(&self, filter: &PathFilter) -> Result<(), GitError> {
        let paths: Vec<String> = self
            .statuses()?
            .into_iter()
            .map(|(path, _)| path)
            .filter(|path| filter.matches(path))
            .collect();
        self.run_with_paths(&["add", "-A"], &paths)
    }

    fn commit(&self, message: &str) -> Result<Oid, GitError> {
        self.run(&["commit", "-q", "--allow-empty", "--no-verify", "-m", message])?;
        self.head_oid()
    }

    fn apply_mailbox(&self, patches: &[PathBuf]) -> Result<(), GitError> {
        if patches.is_empty() {
            return Ok(());
        }
        let mut args = vec!["am".to_string(), "-q".to_string(), "-p0".to_string()];
        args.extend(patches.iter().map(|p| p.to_string_lossy().into_owned()));
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        self.run(&args).map(|_| ()).map_err(|err| {
            // Leave HEAD where it was so the caller sees a consistent repository.
            let _ = self.run(&["am", "--abort"]);
            err
        })
    }

    fn rebase(&self, upstream: &BranchName) -> Result<RebaseOutcome, GitError> {
        match self.run(&["rebase", "-q", upstream.as_str()]) {
            Ok(_) => Ok(RebaseOutcome::Completed),
            Err(_) if matches!(self.state(), GitState::Rebase { .. }) => Ok(RebaseOutcome::Conflict),
            Err(err) => Err(err),
        }
    }

    fn format_patches(&self, range: &CommitRange, out_dir: &Path) -> Result<Vec<PathBuf>, GitError> {
        let out = out_dir.to_string_lossy();
        let range = range.to_string();
        let mut args = vec!["format-patch"];
        args.extend_from_slice(FORMAT_PATCH_ARGS);
        args.extend_from_slice(&["-o", &out, &range]);

        let stdout = self.run(&args)?;
        Ok(stdout
            .lines()
            .filter(|line| !line.is_empty())
            .map(|line| self.work_dir.join(line))
            .collect())
    }

    fn restore_from(&self, branch: &BranchName, filter: &PathFilter) -> Result<(), GitError> {
        let source = self.tree_paths(branch)?;
        let present: Vec<String> = source.iter().filter(|p| filter.matches(p)).cloned().collect();

        let tracked_gone: Vec<String> = self
            .index_paths()?
            .into_iter()
            .filter(|p| filter.matches(p) && !source.contains(p))
            .collect();
        self.run_with_paths(&["rm", "-q", "-f"], &tracked_gone)?;

        for path in self.untracked_paths()? {
            if filter.matches(&path) && !source.contains(&path) {
                let abs = self.work_dir.join(&path);
                std::fs::remove_file(&abs).map_err(|e| GitError::io(abs, e))?;
            }
        }

        let source_arg = format!("--source={branch}");
        self.run_with_paths(&["restore", &source_arg, "--staged", "--worktree"], &present)
    }

    fn reset_hard(&self, oid: &Oid) -> Result<(), GitError> {
        self.run(&["reset", "-q", "--hard", oid.as_str()]).map(|_| ())
    }
}
