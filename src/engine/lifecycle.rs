//! engine::lifecycle
//!
//! The branch lifecycle: `unpack` materializes the patch store as a branch
//! pair for editing, `pack` folds the edited pair back into the store.
//!
//! # Branch pair
//!
//! ```text
//! <original> <- <name>-base <- <name>
//!                 revert patches   one commit per patch
//!                 regenerate       (rebased onto the regenerate commit)
//! ```
//!
//! `<name>-base` tracks the branch that was checked out when unpacking
//! started; `<name>` tracks `<name>-base`. `pack` follows those two links
//! back to the original branch.
//!
//! # Gates
//!
//! Every precondition is checked while planning, before any step runs, so a
//! violated gate leaves the working tree and all refs exactly as they were.

use thiserror::Error;

use super::plan::{Plan, PlanStep};
use super::Workspace;
use crate::core::types::{BranchName, BranchPair, CommitRange, Oid, TypeError};
use crate::git::{GitError, GitState, Repository, Upstream};
use crate::patch::StoreError;
use crate::ui::output;

/// Commit message of the patches-reverted state on the base branch.
pub const REVERT_MESSAGE: &str = "revert patches";
/// Commit message of the regenerated tree on the base branch.
pub const REGENERATE_MESSAGE: &str = "regenerate from upstream";
/// Default patch branch name for `unpack`.
pub const DEFAULT_BRANCH_NAME: &str = "tsflower";

/// A precondition that does not hold. Nothing was changed.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Tracked files have uncommitted changes.
    #[error("working tree has uncommitted changes ({staged} staged, {unstaged} unstaged)")]
    Dirty {
        /// Staged paths
        staged: usize,
        /// Unstaged paths
        unstaged: usize,
    },

    /// Generated declaration files exist that git does not track.
    #[error("untracked generated files would be lost:\n{}", output::format_list(paths, "  "))]
    UntrackedGenerated {
        /// The untracked files
        paths: Vec<String>,
    },

    /// HEAD is not on a branch.
    #[error("HEAD is detached; check out a branch first")]
    DetachedHead,

    /// A pair branch exists with commits not reachable from HEAD.
    #[error(
        "branch(es) already exist with commits not in the current history: {}",
        branches.iter().map(BranchName::as_str).collect::<Vec<_>>().join(", ")
    )]
    Collision {
        /// The colliding branches
        branches: Vec<BranchName>,
    },

    /// `unpack` was started from one of the pair's own branches.
    #[error("already on '{branch}', which belongs to the branch pair being created")]
    AlreadyUnpacked {
        /// Current branch
        branch: BranchName,
    },

    /// A rebase, merge or similar is in progress.
    #[error("a {state} is in progress")]
    OperationInProgress {
        /// The in-progress operation
        state: GitState,
    },

    /// The current branch has no upstream.
    #[error("branch '{branch}' has no upstream; expected it to track '{expected}'")]
    MissingUpstream {
        /// Current branch
        branch: BranchName,
        /// The base branch it should track
        expected: BranchName,
    },

    /// The current branch tracks something other than its base branch.
    #[error("branch '{branch}' tracks '{found}', expected '{expected}'")]
    WrongUpstream {
        /// Current branch
        branch: BranchName,
        /// The base branch it should track
        expected: BranchName,
        /// What it tracks instead
        found: String,
    },

    /// The base branch does not track a local branch.
    #[error("{}", match found {
        Some(found) => format!("base branch '{base}' tracks '{found}', which is not a local branch"),
        None => format!("base branch '{base}' has no upstream"),
    })]
    BaseNotTrackingLocal {
        /// The base branch
        base: BranchName,
        /// Its upstream, if any
        found: Option<String>,
    },

    /// A branch named by the tracking links does not exist.
    #[error("branch '{branch}' does not exist")]
    MissingBranch {
        /// The missing branch
        branch: BranchName,
    },

    /// Reading the repository failed.
    #[error("git error: {0}")]
    Git(#[from] GitError),

    /// Listing the patch store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A derived branch name is invalid.
    #[error(transparent)]
    Type(#[from] TypeError),
}

impl LifecycleError {
    /// Remedy text for the user, when there is a useful one.
    pub fn hint(&self) -> Option<String> {
        match self {
            LifecycleError::Dirty { .. } => {
                Some("commit or stash your changes, then retry".to_string())
            }
            LifecycleError::UntrackedGenerated { .. } => Some(
                "add them with `git add` or delete them, then retry".to_string(),
            ),
            LifecycleError::DetachedHead => {
                Some("run `git checkout <branch>` and retry".to_string())
            }
            LifecycleError::Collision { branches } => {
                let names: Vec<&str> = branches.iter().map(BranchName::as_str).collect();
                let names = names.join(" ");
                Some(format!(
                    "delete them with `git branch -D {names}`,\n\
                     or, if they hold nothing you need, reset each with `git branch -f <branch> HEAD`"
                ))
            }
            LifecycleError::AlreadyUnpacked { .. } => Some(
                "run `typestack pack` to fold the pair back, or check out the original branch"
                    .to_string(),
            ),
            LifecycleError::OperationInProgress { state } => Some(match state {
                GitState::Rebase { .. } => {
                    "finish it with `git rebase --continue` or `git rebase --abort`".to_string()
                }
                _ => format!("finish or abort the {} first", state.description()),
            }),
            LifecycleError::MissingUpstream { branch, expected }
            | LifecycleError::WrongUpstream {
                branch, expected, ..
            } => Some(format!(
                "run `typestack pack` from a branch created by `typestack unpack`,\n\
                 or link it with `git branch --set-upstream-to={expected} {branch}`"
            )),
            LifecycleError::BaseNotTrackingLocal { base, .. } => Some(format!(
                "link it to the original branch with `git branch --set-upstream-to=<branch> {base}`"
            )),
            _ => None,
        }
    }
}

/// Where the repository stands in the unpack/pack cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleState {
    /// No branch pair is checked out.
    Clean,
    /// An `unpack` rebase stopped on a conflict.
    Unpacking,
    /// A branch pair is checked out and editable.
    Unpacked {
        /// The pair
        pair: BranchPair,
        /// The branch `pack` returns to
        original: BranchName,
    },
    /// `pack` is running. Only observable from inside the executor.
    Packing,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleState::Clean => write!(f, "clean"),
            LifecycleState::Unpacking => write!(f, "unpacking (rebase stopped on a conflict)"),
            LifecycleState::Unpacked { pair, original } => write!(
                f,
                "unpacked: '{}' on '{}', packs into '{}'",
                pair.patch, pair.base, original
            ),
            LifecycleState::Packing => write!(f, "packing"),
        }
    }
}

// =============================================================================
// Gates
// =============================================================================

/// Fail if a rebase, merge or similar is in progress.
pub fn require_no_operation(repo: &dyn Repository) -> Result<(), LifecycleError> {
    let state = repo.state();
    if state.is_in_progress() {
        return Err(LifecycleError::OperationInProgress { state });
    }
    Ok(())
}

/// Fail if tracked files have staged or unstaged changes.
pub fn require_clean(repo: &dyn Repository) -> Result<(), LifecycleError> {
    let status = repo.worktree_status()?;
    if !status.is_clean() {
        return Err(LifecycleError::Dirty {
            staged: status.staged,
            unstaged: status.unstaged,
        });
    }
    Ok(())
}

/// Fail if any generated declaration file is untracked.
pub fn require_no_untracked_generated(ws: &Workspace<'_>) -> Result<(), LifecycleError> {
    let paths: Vec<String> = ws
        .repo
        .untracked_paths()?
        .into_iter()
        .filter(|p| ws.layout.is_generated(p))
        .collect();
    if !paths.is_empty() {
        return Err(LifecycleError::UntrackedGenerated { paths });
    }
    Ok(())
}

/// The checked-out branch; fails when HEAD is detached.
pub fn require_branch(repo: &dyn Repository) -> Result<BranchName, LifecycleError> {
    repo.current_branch()?.ok_or(LifecycleError::DetachedHead)
}

/// Fail if either branch of `pair` exists and is not an ancestor of `head`.
///
/// A branch that is an ancestor holds nothing HEAD lacks and may be reset.
pub fn guard_collisions(
    repo: &dyn Repository,
    pair: &BranchPair,
    head: &Oid,
) -> Result<(), LifecycleError> {
    let mut colliding = Vec::new();
    for branch in pair.branches() {
        if let Some(tip) = repo.branch_oid(branch)? {
            if !repo.is_ancestor(&tip, head)? {
                colliding.push(branch.clone());
            }
        }
    }
    if !colliding.is_empty() {
        return Err(LifecycleError::Collision {
            branches: colliding,
        });
    }
    Ok(())
}

// =============================================================================
// Plans
// =============================================================================

/// Plan `unpack NAME`.
///
/// With `shortcut`, the regenerate-and-rebase tail is skipped and `NAME`
/// holds the patches replayed on the reverted state.
pub fn plan_unpack(
    ws: &Workspace<'_>,
    name: &BranchName,
    shortcut: bool,
) -> Result<Plan, LifecycleError> {
    let repo = ws.repo;

    require_no_operation(repo)?;
    require_clean(repo)?;
    require_no_untracked_generated(ws)?;
    let original = require_branch(repo)?;

    let pair = BranchPair::for_name(name)?;
    if original == pair.patch || original == pair.base {
        return Err(LifecycleError::AlreadyUnpacked { branch: original });
    }

    let head = repo.head_oid()?;
    guard_collisions(repo, &pair, &head)?;

    let patches = ws.store().list()?.into_iter().map(|p| p.path).collect();

    let mut plan = Plan::new("unpack").with_steps([
        PlanStep::CreateBranch {
            branch: pair.base.clone(),
            at: Some(head),
        },
        PlanStep::SetUpstream {
            branch: pair.base.clone(),
            upstream: original,
        },
        PlanStep::Checkout {
            branch: pair.base.clone(),
        },
        PlanStep::UnapplyPatches,
        PlanStep::StageGenerated,
        PlanStep::Commit {
            message: REVERT_MESSAGE.to_string(),
        },
        PlanStep::DetachHead,
        PlanStep::ReplayPatches { patches },
        PlanStep::CreateBranch {
            branch: pair.patch.clone(),
            at: None,
        },
        PlanStep::SetUpstream {
            branch: pair.patch.clone(),
            upstream: pair.base.clone(),
        },
        PlanStep::Checkout {
            branch: pair.patch.clone(),
        },
    ]);

    if !shortcut {
        plan = plan.with_steps([
            PlanStep::Checkout {
                branch: pair.base.clone(),
            },
            PlanStep::Regenerate,
            PlanStep::StageGenerated,
            PlanStep::Commit {
                message: REGENERATE_MESSAGE.to_string(),
            },
            PlanStep::Checkout {
                branch: pair.patch.clone(),
            },
            PlanStep::Rebase { onto: pair.base },
        ]);
    }

    Ok(plan)
}

/// Follow the tracking links from `branch`: `branch` must track
/// `branch-base`, which must track a local branch.
fn resolve_links(
    repo: &dyn Repository,
    branch: &BranchName,
) -> Result<(BranchPair, BranchName), LifecycleError> {
    let pair = BranchPair::for_name(branch)?;

    match repo.upstream(&pair.patch)? {
        None => {
            return Err(LifecycleError::MissingUpstream {
                branch: pair.patch,
                expected: pair.base,
            })
        }
        Some(Upstream::Local(found)) if found == pair.base => {}
        Some(found) => {
            return Err(LifecycleError::WrongUpstream {
                branch: pair.patch,
                expected: pair.base,
                found: found.to_string(),
            })
        }
    }

    if repo.branch_oid(&pair.base)?.is_none() {
        return Err(LifecycleError::MissingBranch { branch: pair.base });
    }

    let original = match repo.upstream(&pair.base)? {
        Some(Upstream::Local(original)) => original,
        found => {
            return Err(LifecycleError::BaseNotTrackingLocal {
                base: pair.base,
                found: found.map(|u| u.to_string()),
            })
        }
    };
    if repo.branch_oid(&original)?.is_none() {
        return Err(LifecycleError::MissingBranch { branch: original });
    }

    Ok((pair, original))
}

/// Plan `pack` from the current branch.
///
/// Leaves the regenerated store and declarations staged on the original
/// branch; committing is up to the caller.
pub fn plan_pack(ws: &Workspace<'_>) -> Result<Plan, LifecycleError> {
    let repo = ws.repo;

    require_no_operation(repo)?;
    require_clean(repo)?;
    let branch = require_branch(repo)?;
    let (pair, original) = resolve_links(repo, &branch)?;

    let range = CommitRange::new(pair.base.as_str(), pair.patch.as_str());

    Ok(Plan::new("pack").with_steps([
        PlanStep::Checkout { branch: original },
        PlanStep::RestoreGenerated { from: pair.patch },
        PlanStep::WritePatches { range },
        PlanStep::StageOutputs,
    ]))
}

/// Detect the lifecycle state from the repository.
pub fn detect_state(repo: &dyn Repository) -> Result<LifecycleState, LifecycleError> {
    if matches!(repo.state(), GitState::Rebase { .. }) {
        return Ok(LifecycleState::Unpacking);
    }
    let Some(branch) = repo.current_branch()? else {
        return Ok(LifecycleState::Clean);
    };
    match resolve_links(repo, &branch) {
        Ok((pair, original)) => Ok(LifecycleState::Unpacked { pair, original }),
        Err(LifecycleError::Git(err)) => Err(LifecycleError::Git(err)),
        Err(_) => Ok(LifecycleState::Clean),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::paths::Layout;
    use crate::engine::exec::{ExecuteResult, Executor};
    use crate::engine::test_support::FixedGenerator;
    use crate::engine::{run_plan, Context};
    use crate::git::MockRepo;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    const FOO: &str = "types/demo-pkg/foo.js.flow";
    const PATCH_NAME: &str = "0001-fix-foo.patch";

    const UNPATCHED: &str = "/* @flow */\ndeclare export function foo(): any;\ndeclare export var bar: number;\n";
    const PATCHED: &str = "/* @flow */\ndeclare export function foo(): string;\ndeclare export var bar: number;\n";

    const FIX_FOO: &str = "\
From 0000000000000000000000000000000000000000 Mon Sep 17 00:00:00 2001
From: Dev <dev@example.com>
Date: Tue, 4 Jun 2024 10:00:00 +0000
Subject: [PATCH] fix foo

---
diff --git types/demo-pkg/foo.js.flow types/demo-pkg/foo.js.flow
index 1111111..2222222 100644
--- types/demo-pkg/foo.js.flow
+++ types/demo-pkg/foo.js.flow
@@ -1,3 +1,3 @@
 /* @flow */
-declare export function foo(): any;
+declare export function foo(): string;
 declare export var bar: number;
";

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn read(root: &Path, rel: &str) -> String {
        fs::read_to_string(root.join(rel)).unwrap()
    }

    fn branch(name: &str) -> BranchName {
        BranchName::new(name).unwrap()
    }

    /// A committed, patched tree on `main` with one patch in the store.
    fn fixture() -> (TempDir, MockRepo) {
        let dir = TempDir::new().unwrap();
        write(dir.path(), FOO, PATCHED);
        write(dir.path(), &format!("types/patches/{PATCH_NAME}"), FIX_FOO);
        write(dir.path(), "src/app.js", "app\n");
        let repo = MockRepo::init(dir.path(), "main").unwrap();
        (dir, repo)
    }

    fn workspace<'a>(repo: &'a MockRepo, gen: &'a FixedGenerator) -> Workspace<'a> {
        Workspace {
            repo,
            generator: gen,
            layout: Layout::new(repo.work_dir().to_path_buf(), "types", "types/patches", "js.flow"),
            packages: vec![],
        }
    }

    fn quiet() -> Context {
        Context {
            quiet: true,
            ..Context::default()
        }
    }

    fn unpack(ws: &Workspace<'_>, shortcut: bool) -> ExecuteResult {
        run_plan(ws, &quiet(), |ws| plan_unpack(ws, &branch("tsflower"), shortcut)).unwrap()
    }

    #[test]
    fn unpack_shortcut_builds_pair() {
        let (dir, repo) = fixture();
        let gen = FixedGenerator::new(dir.path(), &[(FOO, UNPATCHED)]);
        let ws = workspace(&repo, &gen);

        assert!(unpack(&ws, true).is_success());

        assert_eq!(repo.current_branch().unwrap(), Some(branch("tsflower")));
        assert_eq!(repo.file_at("tsflower-base", FOO).unwrap(), UNPATCHED);
        assert_eq!(repo.file_at("tsflower", FOO).unwrap(), PATCHED);
        assert_eq!(repo.log("tsflower"), vec!["fix foo", REVERT_MESSAGE, "initial"]);
        assert_eq!(
            repo.upstream(&branch("tsflower")).unwrap(),
            Some(Upstream::Local(branch("tsflower-base")))
        );
        assert_eq!(
            repo.upstream(&branch("tsflower-base")).unwrap(),
            Some(Upstream::Local(branch("main")))
        );
        assert_eq!(gen.runs.get(), 0);
        assert_eq!(read(dir.path(), FOO), PATCHED);
    }

    #[test]
    fn unpack_regenerates_and_rebases() {
        let (dir, repo) = fixture();
        let gen = FixedGenerator::new(dir.path(), &[(FOO, UNPATCHED)]);
        let ws = workspace(&repo, &gen);

        assert!(unpack(&ws, false).is_success());

        assert_eq!(gen.runs.get(), 1);
        assert_eq!(
            repo.log("tsflower"),
            vec!["fix foo", REGENERATE_MESSAGE, REVERT_MESSAGE, "initial"]
        );
        assert_eq!(repo.current_branch().unwrap(), Some(branch("tsflower")));
        assert_eq!(read(dir.path(), FOO), PATCHED);
    }

    #[test]
    fn unpack_then_pack_reproduces_store() {
        let (dir, repo) = fixture();
        let gen = FixedGenerator::new(dir.path(), &[(FOO, UNPATCHED)]);
        let ws = workspace(&repo, &gen);
        let before = ws.store().digest().unwrap();

        assert!(unpack(&ws, false).is_success());
        let packed = run_plan(&ws, &quiet(), plan_pack).unwrap();
        assert!(packed.is_success());

        assert_eq!(repo.current_branch().unwrap(), Some(branch("main")));
        assert_eq!(read(dir.path(), &format!("types/patches/{PATCH_NAME}")), FIX_FOO);
        assert_eq!(ws.store().digest().unwrap(), before);
        assert_eq!(read(dir.path(), FOO), PATCHED);
        assert!(repo.worktree_status().unwrap().is_clean());
    }

    #[test]
    fn rebase_conflict_pauses() {
        let (dir, repo) = fixture();
        let upgraded = "/* @flow */\ndeclare export function foo(): mixed;\ndeclare export var bar: number;\n";
        let gen = FixedGenerator::new(dir.path(), &[(FOO, upgraded)]);
        let ws = workspace(&repo, &gen);

        match unpack(&ws, false) {
            ExecuteResult::Paused {
                branch: paused,
                remaining_steps,
                ..
            } => {
                assert_eq!(paused, "tsflower");
                assert!(remaining_steps.is_empty());
            }
            other => panic!("expected pause, got {other:?}"),
        }
        assert_eq!(detect_state(&repo).unwrap(), LifecycleState::Unpacking);
    }

    #[test]
    fn collision_changes_nothing() {
        let (dir, repo) = fixture();
        let head = repo.head_oid().unwrap();
        repo.create_branch(&branch("tsflower"), &head).unwrap();
        repo.checkout_branch(&branch("tsflower")).unwrap();
        write(dir.path(), "src/app.js", "work in progress\n");
        repo.commit_all("unmerged work").unwrap();
        repo.checkout_branch(&branch("main")).unwrap();

        let gen = FixedGenerator::new(dir.path(), &[]);
        let ws = workspace(&repo, &gen);
        let refs = repo.refs_snapshot();

        let err = plan_unpack(&ws, &branch("tsflower"), false).unwrap_err();
        match &err {
            LifecycleError::Collision { branches } => assert_eq!(branches, &vec![branch("tsflower")]),
            other => panic!("expected collision, got {other}"),
        }
        assert!(err.hint().unwrap().contains("git branch -D tsflower"));
        assert_eq!(repo.refs_snapshot(), refs);
        assert_eq!(read(dir.path(), FOO), PATCHED);
    }

    #[test]
    fn ancestor_branches_are_reset() {
        let (dir, repo) = fixture();
        let head = repo.head_oid().unwrap();
        repo.create_branch(&branch("tsflower"), &head).unwrap();
        write(dir.path(), "src/app.js", "newer\n");
        repo.commit_all("newer").unwrap();

        let gen = FixedGenerator::new(dir.path(), &[]);
        let ws = workspace(&repo, &gen);
        assert!(plan_unpack(&ws, &branch("tsflower"), true).is_ok());
    }

    #[test]
    fn dirty_tree_is_refused() {
        let (dir, repo) = fixture();
        write(dir.path(), FOO, UNPATCHED);
        let gen = FixedGenerator::new(dir.path(), &[]);
        let ws = workspace(&repo, &gen);

        assert!(matches!(
            plan_unpack(&ws, &branch("tsflower"), true),
            Err(LifecycleError::Dirty { unstaged: 1, .. })
        ));
    }

    #[test]
    fn untracked_generated_is_refused() {
        let (dir, repo) = fixture();
        write(dir.path(), "types/demo-pkg/extra.js.flow", "x\n");
        let gen = FixedGenerator::new(dir.path(), &[]);
        let ws = workspace(&repo, &gen);

        match plan_unpack(&ws, &branch("tsflower"), true) {
            Err(LifecycleError::UntrackedGenerated { paths }) => {
                assert_eq!(paths, vec!["types/demo-pkg/extra.js.flow"])
            }
            other => panic!("expected untracked error, got {other:?}"),
        }
    }

    #[test]
    fn unpack_from_pair_branch_is_refused() {
        let (dir, repo) = fixture();
        let gen = FixedGenerator::new(dir.path(), &[]);
        let ws = workspace(&repo, &gen);
        assert!(unpack(&ws, true).is_success());

        assert!(matches!(
            plan_unpack(&ws, &branch("tsflower"), true),
            Err(LifecycleError::AlreadyUnpacked { .. })
        ));
    }

    #[test]
    fn pack_names_missing_links() {
        let (dir, repo) = fixture();
        let gen = FixedGenerator::new(dir.path(), &[]);
        let ws = workspace(&repo, &gen);

        assert!(matches!(plan_pack(&ws), Err(LifecycleError::MissingUpstream { .. })));

        repo.set_upstream(&branch("main"), &branch("elsewhere")).unwrap();
        assert!(matches!(plan_pack(&ws), Err(LifecycleError::WrongUpstream { .. })));

        repo.set_upstream(&branch("main"), &branch("main-base")).unwrap();
        assert!(matches!(plan_pack(&ws), Err(LifecycleError::MissingBranch { .. })));

        let head = repo.head_oid().unwrap();
        repo.create_branch(&branch("main-base"), &head).unwrap();
        let err = plan_pack(&ws).unwrap_err();
        assert!(matches!(err, LifecycleError::BaseNotTrackingLocal { found: None, .. }));
        assert!(err.to_string().contains("main-base"));
    }

    #[test]
    fn pack_plan_shape() {
        let (dir, repo) = fixture();
        let gen = FixedGenerator::new(dir.path(), &[]);
        let ws = workspace(&repo, &gen);
        let ctx = quiet();
        assert!(unpack(&ws, true).is_success());

        let plan = plan_pack(&ws).unwrap();
        assert_eq!(
            plan.steps,
            vec![
                PlanStep::Checkout { branch: branch("main") },
                PlanStep::RestoreGenerated { from: branch("tsflower") },
                PlanStep::WritePatches {
                    range: CommitRange::new("tsflower-base", "tsflower"),
                },
                PlanStep::StageOutputs,
            ]
        );
        assert!(Executor::new(&ws).execute(&plan, &ctx).unwrap().is_success());
    }

    #[test]
    fn state_detection() {
        let (dir, repo) = fixture();
        let gen = FixedGenerator::new(dir.path(), &[]);
        let ws = workspace(&repo, &gen);
        assert_eq!(detect_state(&repo).unwrap(), LifecycleState::Clean);

        assert!(unpack(&ws, true).is_success());
        match detect_state(&repo).unwrap() {
            LifecycleState::Unpacked { pair, original } => {
                assert_eq!(pair.patch, branch("tsflower"));
                assert_eq!(original, branch("main"));
            }
            other => panic!("expected unpacked, got {other}"),
        }
    }
}
