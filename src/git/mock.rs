//! git::mock
//!
//! In-memory [`Repository`] for tests.
//!
//! History, branches, upstreams and the index live in memory; the working
//! tree is a real directory so the generator adapter and patch engine can
//! operate on it unchanged. Commits are full snapshots of the index.
//!
//! `apply_mailbox` keeps each patch's text on the commit it creates;
//! `format_patches` and `rebase` replay that text, so only commits made from
//! mailboxes can be exported or rebased.
//!
//! # Example
//!
//! ```ignore
//! let dir = tempfile::tempdir()?;
//! std::fs::write(dir.path().join("README"), "hello\n")?;
//! let repo = MockRepo::init(dir.path(), "main")?;
//! assert_eq!(repo.current_branch()?.unwrap().as_str(), "main");
//! ```

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::{GitError, GitState, RebaseOutcome, Repository, Upstream, WorktreeStatus};
use crate::core::naming::patch_file_name;
use crate::core::paths::PathFilter;
use crate::core::types::{BranchName, CommitRange, Oid};
use crate::patch::{apply_set, Direction, PatchSet};

type Tree = BTreeMap<String, Vec<u8>>;

#[derive(Debug, Clone)]
struct MockCommit {
    parent: Option<usize>,
    tree: Tree,
    message: String,
    mailbox: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Head {
    Branch(BranchName),
    Detached(usize),
}

#[derive(Debug)]
struct State {
    commits: Vec<MockCommit>,
    branches: BTreeMap<BranchName, usize>,
    upstreams: BTreeMap<BranchName, Upstream>,
    head: Head,
    index: Tree,
    op: GitState,
}

impl State {
    fn head_idx(&self) -> Result<usize, GitError> {
        match &self.head {
            Head::Detached(idx) => Ok(*idx),
            Head::Branch(b) => self.branches.get(b).copied().ok_or_else(|| GitError::RefNotFound {
                refname: b.refname(),
            }),
        }
    }

    fn branch_idx(&self, branch: &BranchName) -> Result<usize, GitError> {
        self.branches
            .get(branch)
            .copied()
            .ok_or_else(|| GitError::RefNotFound {
                refname: branch.refname(),
            })
    }

    /// Resolve a branch name or full object id.
    fn resolve(&self, rev: &str) -> Result<usize, GitError> {
        if let Ok(branch) = BranchName::new(rev) {
            if let Some(idx) = self.branches.get(&branch) {
                return Ok(*idx);
            }
        }
        if rev == "HEAD" {
            return self.head_idx();
        }
        let oid = Oid::new(rev).map_err(|_| GitError::RefNotFound {
            refname: rev.to_string(),
        })?;
        commit_index(&oid, self.commits.len())
    }

    fn is_ancestor(&self, ancestor: usize, descendant: usize) -> bool {
        let mut cursor = Some(descendant);
        while let Some(idx) = cursor {
            if idx == ancestor {
                return true;
            }
            cursor = self.commits[idx].parent;
        }
        false
    }

    fn push_commit(&mut self, message: &str, mailbox: Option<String>) -> Result<usize, GitError> {
        let parent = self.head_idx()?;
        self.commits.push(MockCommit {
            parent: Some(parent),
            tree: self.index.clone(),
            message: message.to_string(),
            mailbox,
        });
        let idx = self.commits.len() - 1;
        self.move_head(idx);
        Ok(idx)
    }

    /// Point HEAD (or the branch it names) at `idx`.
    fn move_head(&mut self, idx: usize) {
        match &self.head {
            Head::Branch(b) => {
                self.branches.insert(b.clone(), idx);
            }
            Head::Detached(_) => self.head = Head::Detached(idx),
        }
    }
}

fn oid_for(idx: usize) -> Result<Oid, GitError> {
    Ok(Oid::new(format!("{:040x}", idx + 1))?)
}

fn commit_index(oid: &Oid, len: usize) -> Result<usize, GitError> {
    let not_found = || GitError::RefNotFound {
        refname: oid.to_string(),
    };
    let n = u128::from_str_radix(oid.as_str(), 16).map_err(|_| not_found())?;
    let idx = usize::try_from(n).map_err(|_| not_found())?;
    if idx == 0 || idx > len {
        return Err(not_found());
    }
    Ok(idx - 1)
}

/// An in-memory repository over a real working directory.
#[derive(Debug)]
pub struct MockRepo {
    work_dir: PathBuf,
    inner: RefCell<State>,
}

impl MockRepo {
    /// Snapshot every file under `work_dir` as the first commit of `branch`.
    pub fn init(work_dir: &Path, branch: &str) -> Result<Self, GitError> {
        let branch = BranchName::new(branch)?;
        let repo = Self {
            work_dir: work_dir.to_path_buf(),
            inner: RefCell::new(State {
                commits: Vec::new(),
                branches: BTreeMap::new(),
                upstreams: BTreeMap::new(),
                head: Head::Branch(branch.clone()),
                index: Tree::new(),
                op: GitState::Clean,
            }),
        };

        let tree = repo.scan()?;
        let mut state = repo.inner.borrow_mut();
        state.commits.push(MockCommit {
            parent: None,
            tree: tree.clone(),
            message: "initial".to_string(),
            mailbox: None,
        });
        state.branches.insert(branch, 0);
        state.index = tree;
        drop(state);

        Ok(repo)
    }

    /// Stage everything in the working tree and commit it.
    pub fn commit_all(&self, message: &str) -> Result<Oid, GitError> {
        let tree = self.scan()?;
        let mut state = self.inner.borrow_mut();
        state.index = tree;
        let idx = state.push_commit(message, None)?;
        oid_for(idx)
    }

    /// Names of all local branches, sorted.
    pub fn branch_names(&self) -> Vec<String> {
        self.inner
            .borrow()
            .branches
            .keys()
            .map(|b| b.to_string())
            .collect()
    }

    /// Every ref and HEAD, for before/after comparisons.
    pub fn refs_snapshot(&self) -> BTreeMap<String, String> {
        let state = self.inner.borrow();
        let mut refs: BTreeMap<String, String> = state
            .branches
            .iter()
            .map(|(b, idx)| (b.refname(), idx.to_string()))
            .collect();
        let head = match &state.head {
            Head::Branch(b) => b.refname(),
            Head::Detached(idx) => idx.to_string(),
        };
        refs.insert("HEAD".to_string(), head);
        refs
    }

    /// Content of `path` in the tip commit of `branch`.
    pub fn file_at(&self, branch: &str, path: &str) -> Option<String> {
        let state = self.inner.borrow();
        let branch = BranchName::new(branch).ok()?;
        let idx = *state.branches.get(&branch)?;
        let bytes = state.commits[idx].tree.get(path)?;
        Some(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Commit messages from `branch` back to the root.
    pub fn log(&self, branch: &str) -> Vec<String> {
        let state = self.inner.borrow();
        let Some(mut cursor) = BranchName::new(branch)
            .ok()
            .and_then(|b| state.branches.get(&b).copied())
        else {
            return Vec::new();
        };
        let mut messages = vec![state.commits[cursor].message.clone()];
        while let Some(parent) = state.commits[cursor].parent {
            messages.push(state.commits[parent].message.clone());
            cursor = parent;
        }
        messages
    }

    /// Read every file of the working directory.
    fn scan(&self) -> Result<Tree, GitError> {
        let mut tree = Tree::new();
        for entry in WalkDir::new(&self.work_dir).sort_by_file_name() {
            let entry = entry.map_err(|e| GitError::Internal {
                message: e.to_string(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(&self.work_dir)
                .map_err(|e| GitError::Internal {
                    message: e.to_string(),
                })?
                .to_string_lossy()
                .replace('\\', "/");
            let bytes = fs::read(entry.path()).map_err(|e| GitError::io(entry.path(), e))?;
            tree.insert(rel, bytes);
        }
        Ok(tree)
    }

    fn write_file(&self, rel: &str, bytes: &[u8]) -> Result<(), GitError> {
        let abs = self.work_dir.join(rel);
        if let Some(parent) = abs.parent() {
            fs::create_dir_all(parent).map_err(|e| GitError::io(parent, e))?;
        }
        fs::write(&abs, bytes).map_err(|e| GitError::io(abs, e))
    }

    fn remove_file(&self, rel: &str) -> Result<(), GitError> {
        let abs = self.work_dir.join(rel);
        match fs::remove_file(&abs) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(GitError::io(abs, e)),
        }
        let mut dir = abs.parent();
        while let Some(d) = dir {
            if d == self.work_dir || fs::remove_dir(d).is_err() {
                break;
            }
            dir = d.parent();
        }
        Ok(())
    }

    /// Make the tracked part of the working tree equal `target`. Files
    /// tracked in `tracked` but absent from `target` are deleted; untracked
    /// files are left alone.
    fn sync_worktree(&self, tracked: &Tree, target: &Tree) -> Result<(), GitError> {
        for path in tracked.keys().filter(|p| !target.contains_key(*p)) {
            self.remove_file(path)?;
        }
        let current = self.scan()?;
        for (path, bytes) in target {
            if current.get(path) != Some(bytes) {
                self.write_file(path, bytes)?;
            }
        }
        Ok(())
    }

    /// Move HEAD to `idx`, updating index and working tree.
    fn hard_reset_to(&self, state: &mut State, idx: usize) -> Result<(), GitError> {
        let mut tracked = state.index.clone();
        tracked.extend(state.commits[state.head_idx()?].tree.clone());
        let target = state.commits[idx].tree.clone();
        self.sync_worktree(&tracked, &target)?;
        state.index = target;
        state.move_head(idx);
        Ok(())
    }

    /// Apply a mailbox patch to the working tree, stage what it touched and
    /// commit it.
    fn replay(&self, state: &mut State, name: &str, text: &str) -> Result<(), String> {
        let set = PatchSet::parse(text).map_err(|e| format!("{name}: {e}"))?;
        let touched = apply_set(&self.work_dir, name, &set, Direction::Forward)
            .map_err(|e| e.to_string())?;
        for path in touched {
            match fs::read(self.work_dir.join(&path)) {
                Ok(bytes) => {
                    state.index.insert(path, bytes);
                }
                Err(_) => {
                    state.index.remove(&path);
                }
            }
        }
        let message = set.subject.unwrap_or_else(|| name.to_string());
        state
            .push_commit(&message, Some(text.to_string()))
            .map_err(|e| e.to_string())?;
        Ok(())
    }
}

fn mock_failure(command: &str, stderr: impl Into<String>) -> GitError {
    GitError::CommandFailed {
        command: command.to_string(),
        status: Some(1),
        stderr: stderr.into(),
    }
}

fn differing<'a>(a: &'a Tree, b: &'a Tree) -> BTreeSet<&'a String> {
    a.keys()
        .chain(b.keys())
        .filter(|p| a.get(*p) != b.get(*p))
        .collect()
}

impl Repository for MockRepo {
    fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    fn state(&self) -> GitState {
        self.inner.borrow().op.clone()
    }

    fn worktree_status(&self) -> Result<WorktreeStatus, GitError> {
        let wt = self.scan()?;
        let state = self.inner.borrow();
        let head = &state.commits[state.head_idx()?].tree;

        let staged = differing(&state.index, head).len();
        let unstaged = differing(&wt, &state.index)
            .into_iter()
            .filter(|p| state.index.contains_key(*p))
            .count();
        let untracked = wt.keys().filter(|p| !state.index.contains_key(*p)).count();

        Ok(WorktreeStatus {
            staged,
            unstaged,
            untracked,
            has_conflicts: false,
        })
    }

    fn untracked_paths(&self) -> Result<Vec<String>, GitError> {
        let wt = self.scan()?;
        let state = self.inner.borrow();
        Ok(wt
            .into_keys()
            .filter(|p| !state.index.contains_key(p))
            .collect())
    }

    fn changed_paths(&self) -> Result<Vec<String>, GitError> {
        let wt = self.scan()?;
        let state = self.inner.borrow();
        let head = &state.commits[state.head_idx()?].tree;
        let mut paths: BTreeSet<String> = differing(&wt, head).into_iter().cloned().collect();
        paths.extend(differing(&state.index, head).into_iter().cloned());
        Ok(paths.into_iter().collect())
    }

    fn unstaged_paths(&self) -> Result<Vec<String>, GitError> {
        let wt = self.scan()?;
        let state = self.inner.borrow();
        Ok(differing(&wt, &state.index).into_iter().cloned().collect())
    }

    fn current_branch(&self) -> Result<Option<BranchName>, GitError> {
        Ok(match &self.inner.borrow().head {
            Head::Branch(b) => Some(b.clone()),
            Head::Detached(_) => None,
        })
    }

    fn head_oid(&self) -> Result<Oid, GitError> {
        oid_for(self.inner.borrow().head_idx()?)
    }

    fn branch_oid(&self, branch: &BranchName) -> Result<Option<Oid>, GitError> {
        self.inner
            .borrow()
            .branches
            .get(branch)
            .map(|idx| oid_for(*idx))
            .transpose()
    }

    fn is_ancestor(&self, ancestor: &Oid, descendant: &Oid) -> Result<bool, GitError> {
        let state = self.inner.borrow();
        let len = state.commits.len();
        Ok(state.is_ancestor(commit_index(ancestor, len)?, commit_index(descendant, len)?))
    }

    fn upstream(&self, branch: &BranchName) -> Result<Option<Upstream>, GitError> {
        Ok(self.inner.borrow().upstreams.get(branch).cloned())
    }

    fn set_upstream(&self, branch: &BranchName, upstream: &BranchName) -> Result<(), GitError> {
        self.inner
            .borrow_mut()
            .upstreams
            .insert(branch.clone(), Upstream::Local(upstream.clone()));
        Ok(())
    }

    fn create_branch(&self, branch: &BranchName, at: &Oid) -> Result<(), GitError> {
        let mut state = self.inner.borrow_mut();
        let idx = commit_index(at, state.commits.len())?;
        state.branches.insert(branch.clone(), idx);
        Ok(())
    }

    fn checkout_branch(&self, branch: &BranchName) -> Result<(), GitError> {
        let mut state = self.inner.borrow_mut();
        let target_idx = state.branch_idx(branch)?;
        let mut tracked = state.index.clone();
        tracked.extend(state.commits[state.head_idx()?].tree.clone());
        let target = state.commits[target_idx].tree.clone();
        self.sync_worktree(&tracked, &target)?;
        state.index = target;
        state.head = Head::Branch(branch.clone());
        Ok(())
    }

    fn checkout_detached(&self) -> Result<(), GitError> {
        let mut state = self.inner.borrow_mut();
        let idx = state.head_idx()?;
        state.head = Head::Detached(idx);
        Ok(())
    }

    fn stage(&self, filter: &PathFilter) -> Result<(), GitError> {
        let wt = self.scan()?;
        let mut state = self.inner.borrow_mut();
        let candidates: BTreeSet<String> = wt
            .keys()
            .chain(state.index.keys())
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        for path in candidates {
            match wt.get(&path) {
                Some(bytes) => {
                    state.index.insert(path, bytes.clone());
                }
                None => {
                    state.index.remove(&path);
                }
            }
        }
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<Oid, GitError> {
        let idx = self.inner.borrow_mut().push_commit(message, None)?;
        oid_for(idx)
    }

    fn apply_mailbox(&self, patches: &[PathBuf]) -> Result<(), GitError> {
        let mut state = self.inner.borrow_mut();
        let start = state.head_idx()?;
        let start_index = state.index.clone();

        for path in patches {
            let text = fs::read_to_string(path).map_err(|e| GitError::io(path, e))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if let Err(reason) = self.replay(&mut state, &name, &text) {
                let mut tracked = state.index.clone();
                tracked.extend(start_index.clone());
                self.sync_worktree(&tracked, &state.commits[start].tree.clone())?;
                state.index = start_index;
                state.move_head(start);
                return Err(mock_failure("am", reason));
            }
        }
        Ok(())
    }

    fn rebase(&self, upstream: &BranchName) -> Result<RebaseOutcome, GitError> {
        let mut state = self.inner.borrow_mut();
        let onto = state.branch_idx(upstream)?;
        let branch = match &state.head {
            Head::Branch(b) => b.clone(),
            Head::Detached(_) => return Err(mock_failure("rebase", "HEAD is detached")),
        };

        let mut todo = Vec::new();
        let mut cursor = Some(state.head_idx()?);
        while let Some(idx) = cursor {
            if state.is_ancestor(idx, onto) {
                break;
            }
            todo.push(idx);
            cursor = state.commits[idx].parent;
        }
        todo.reverse();

        let start = state.head_idx()?;
        state.head = Head::Detached(start);
        self.hard_reset_to(&mut state, onto)?;

        let total = todo.len();
        for (step, idx) in todo.into_iter().enumerate() {
            let Some(text) = state.commits[idx].mailbox.clone() else {
                return Err(mock_failure("rebase", "commit has no mailbox text to replay"));
            };
            let name = state.commits[idx].message.clone();
            if self.replay(&mut state, &name, &text).is_err() {
                state.op = GitState::Rebase {
                    current: Some(step + 1),
                    total: Some(total),
                };
                return Ok(RebaseOutcome::Conflict);
            }
        }

        let tip = state.head_idx()?;
        state.branches.insert(branch.clone(), tip);
        state.head = Head::Branch(branch);
        Ok(RebaseOutcome::Completed)
    }

    fn format_patches(&self, range: &CommitRange, out_dir: &Path) -> Result<Vec<PathBuf>, GitError> {
        let state = self.inner.borrow();
        let base = state.resolve(&range.base)?;
        let tip = state.resolve(&range.tip)?;

        let mut commits = Vec::new();
        let mut cursor = Some(tip);
        while let Some(idx) = cursor {
            if state.is_ancestor(idx, base) {
                break;
            }
            commits.push(idx);
            cursor = state.commits[idx].parent;
        }
        commits.reverse();

        fs::create_dir_all(out_dir).map_err(|e| GitError::io(out_dir, e))?;
        let mut written = Vec::new();
        for (seq, idx) in commits.into_iter().enumerate() {
            let commit = &state.commits[idx];
            let Some(text) = &commit.mailbox else {
                return Err(mock_failure("format-patch", "commit has no mailbox text"));
            };
            let path = out_dir.join(patch_file_name(seq + 1, &commit.message));
            fs::write(&path, text).map_err(|e| GitError::io(&path, e))?;
            written.push(path);
        }
        Ok(written)
    }

    fn restore_from(&self, branch: &BranchName, filter: &PathFilter) -> Result<(), GitError> {
        let wt = self.scan()?;
        let mut state = self.inner.borrow_mut();
        let source = state.commits[state.branch_idx(branch)?].tree.clone();

        let candidates: BTreeSet<String> = source
            .keys()
            .chain(state.index.keys())
            .chain(wt.keys())
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        for path in candidates {
            match source.get(&path) {
                Some(bytes) => {
                    self.write_file(&path, bytes)?;
                    state.index.insert(path, bytes.clone());
                }
                None => {
                    self.remove_file(&path)?;
                    state.index.remove(&path);
                }
            }
        }
        Ok(())
    }

    fn reset_hard(&self, oid: &Oid) -> Result<(), GitError> {
        let mut state = self.inner.borrow_mut();
        let idx = commit_index(oid, state.commits.len())?;
        self.hard_reset_to(&mut state, idx)?;
        state.op = GitState::Clean;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn repo_with(files: &[(&str, &str)]) -> (TempDir, MockRepo) {
        let dir = TempDir::new().unwrap();
        for (path, content) in files {
            let abs = dir.path().join(path);
            fs::create_dir_all(abs.parent().unwrap()).unwrap();
            fs::write(abs, content).unwrap();
        }
        let repo = MockRepo::init(dir.path(), "main").unwrap();
        (dir, repo)
    }

    fn branch(name: &str) -> BranchName {
        BranchName::new(name).unwrap()
    }

    #[test]
    fn init_is_clean() {
        let (_dir, repo) = repo_with(&[("a.txt", "a\n")]);
        assert!(repo.worktree_status().unwrap().is_clean());
        assert_eq!(repo.current_branch().unwrap(), Some(branch("main")));
        assert!(repo.changed_paths().unwrap().is_empty());
    }

    #[test]
    fn edits_show_up_as_changes() {
        let (dir, repo) = repo_with(&[("a.txt", "a\n")]);
        fs::write(dir.path().join("a.txt"), "b\n").unwrap();
        fs::write(dir.path().join("new.txt"), "n\n").unwrap();

        let status = repo.worktree_status().unwrap();
        assert_eq!((status.staged, status.unstaged, status.untracked), (0, 1, 1));
        assert_eq!(repo.untracked_paths().unwrap(), vec!["new.txt"]);
        assert_eq!(repo.changed_paths().unwrap(), vec!["a.txt", "new.txt"]);
    }

    #[test]
    fn checkout_switches_tree() {
        let (dir, repo) = repo_with(&[("a.txt", "a\n")]);
        let start = repo.head_oid().unwrap();
        repo.create_branch(&branch("side"), &start).unwrap();
        repo.checkout_branch(&branch("side")).unwrap();
        fs::write(dir.path().join("b.txt"), "b\n").unwrap();
        repo.commit_all("add b").unwrap();

        repo.checkout_branch(&branch("main")).unwrap();
        assert!(!dir.path().join("b.txt").exists());
        repo.checkout_branch(&branch("side")).unwrap();
        assert!(dir.path().join("b.txt").exists());
        assert_eq!(repo.log("side"), vec!["add b", "initial"]);
    }

    #[test]
    fn ancestry() {
        let (dir, repo) = repo_with(&[("a.txt", "a\n")]);
        let first = repo.head_oid().unwrap();
        fs::write(dir.path().join("a.txt"), "b\n").unwrap();
        let second = repo.commit_all("second").unwrap();
        assert!(repo.is_ancestor(&first, &second).unwrap());
        assert!(!repo.is_ancestor(&second, &first).unwrap());
    }

    #[test]
    fn reset_hard_keeps_untracked() {
        let (dir, repo) = repo_with(&[("a.txt", "a\n")]);
        let start = repo.head_oid().unwrap();
        fs::write(dir.path().join("a.txt"), "changed\n").unwrap();
        fs::write(dir.path().join("untracked.txt"), "u\n").unwrap();

        repo.reset_hard(&start).unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("a.txt")).unwrap(), "a\n");
        assert!(dir.path().join("untracked.txt").exists());
    }

    #[test]
    fn upstream_round_trip() {
        let (_dir, repo) = repo_with(&[("a.txt", "a\n")]);
        assert_eq!(repo.upstream(&branch("x")).unwrap(), None);
        repo.set_upstream(&branch("x"), &branch("main")).unwrap();
        assert_eq!(
            repo.upstream(&branch("x")).unwrap(),
            Some(Upstream::Local(branch("main")))
        );
    }

    #[test]
    fn oid_mapping_rejects_unknown() {
        let (_dir, repo) = repo_with(&[]);
        let bogus = Oid::new("f".repeat(40)).unwrap();
        assert!(repo.is_ancestor(&bogus, &repo.head_oid().unwrap()).is_err());
    }
}
