//! engine::exec
//!
//! The single executor.
//!
//! # Architecture
//!
//! The executor is the only component that mutates the working tree or
//! the repository. It runs a [`Plan`]'s steps strictly in order.
//!
//! # Executor Contract
//!
//! - The first failing step ends execution; later steps never run
//! - Nothing that already happened is rolled back; errors say which patch
//!   or tool failed so the user can recover by hand
//! - A rebase that stops on a conflict is not an error: execution ends with
//!   [`ExecuteResult::Paused`] and the repository is left in git's native
//!   conflict state
//!
//! # Example
//!
//! ```ignore
//! use typestack::engine::exec::{Executor, ExecuteResult};
//!
//! match Executor::new(&workspace).execute(&plan, &ctx)? {
//!     ExecuteResult::Success { .. } => println!("done"),
//!     ExecuteResult::Paused { branch, .. } => println!("conflict on {branch}"),
//! }
//! ```

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::plan::{Plan, PlanStep};
use super::{Context, Workspace};
use crate::generate::GenerateError;
use crate::git::{GitError, GitState, RebaseOutcome};
use crate::patch::{apply_all, Direction, PatchError, StoreError};
use crate::ui::output::{self, Verbosity};

/// Errors from execution.
#[derive(Debug, Error)]
pub enum ExecuteError {
    /// Git operation failed.
    #[error("git error: {0}")]
    Git(#[from] GitError),

    /// A patch failed to parse or apply.
    #[error(transparent)]
    Patch(#[from] PatchError),

    /// The patch store could not be read or rewritten.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Regeneration failed.
    #[error(transparent)]
    Generate(#[from] GenerateError),

    /// Patches change files other than generated declarations.
    #[error("patches should only apply to type definitions; also changed:\n{}", output::format_list(paths, "  "))]
    ForbiddenPaths {
        /// Offending paths
        paths: Vec<String>,
    },

    /// Regenerating produced different declarations than are committed.
    #[error("type definitions are stale; regenerating changed:\n{}", output::format_list(paths, "  "))]
    Stale {
        /// Paths that differ
        paths: Vec<String>,
    },

    /// Filesystem error outside patch and generator handling.
    #[error("cannot remove {path}: {source}")]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },
}

impl ExecuteError {
    /// Remedy text for the user, when there is a useful one.
    pub fn hint(&self) -> Option<String> {
        match self {
            ExecuteError::Patch(err) => err.patch_name().map(|name| {
                format!(
                    "resolve '{name}' by hand: fix the patch file or the declarations it targets,\n\
                     or restore the working tree with `git reset --hard` and retry"
                )
            }),
            ExecuteError::ForbiddenPaths { .. } | ExecuteError::Stale { .. } => Some(
                "the working tree was left as the check found it; inspect it with `git status` \
                 and `git diff`, then restore it with `git reset --hard`"
                    .to_string(),
            ),
            _ => None,
        }
    }
}

/// Result of executing a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecuteResult {
    /// Plan executed successfully.
    Success {
        /// Number of steps run
        steps: usize,
    },

    /// Execution paused for conflict resolution.
    Paused {
        /// Branch being rebased
        branch: String,
        /// Git state (rebase, merge, etc.)
        git_state: GitState,
        /// Steps that did not run
        remaining_steps: Vec<PlanStep>,
    },
}

impl ExecuteResult {
    /// Check if execution was successful.
    pub fn is_success(&self) -> bool {
        matches!(self, ExecuteResult::Success { .. })
    }
}

/// Outcome of a single step.
enum StepResult {
    Continue,
    Pause { branch: String, git_state: GitState },
}

/// The executor.
pub struct Executor<'a> {
    ws: &'a Workspace<'a>,
}

impl<'a> Executor<'a> {
    /// Create a new executor.
    pub fn new(ws: &'a Workspace<'a>) -> Self {
        Self { ws }
    }

    /// Execute a plan.
    ///
    /// # Returns
    ///
    /// - `ExecuteResult::Success` if all steps completed
    /// - `ExecuteResult::Paused` if a rebase stopped on a conflict
    ///
    /// # Errors
    ///
    /// The first failing step's error. Earlier steps stay applied.
    pub fn execute(&self, plan: &Plan, ctx: &Context) -> Result<ExecuteResult, ExecuteError> {
        let verbosity = ctx.verbosity();

        if plan.is_empty() {
            output::debug("Empty plan, nothing to execute", verbosity);
            return Ok(ExecuteResult::Success { steps: 0 });
        }

        output::debug(
            format!("Plan for '{}':\n{}", plan.command, plan.preview()),
            verbosity,
        );

        let mut steps = plan.steps.iter().enumerate();
        while let Some((i, step)) = steps.next() {
            output::debug(
                format!("Executing step {}: {}", i + 1, step.description()),
                verbosity,
            );

            match self.execute_step(step, verbosity)? {
                StepResult::Continue => {}
                StepResult::Pause { branch, git_state } => {
                    return Ok(ExecuteResult::Paused {
                        branch,
                        git_state,
                        remaining_steps: steps.map(|(_, s)| s.clone()).collect(),
                    });
                }
            }
        }

        Ok(ExecuteResult::Success {
            steps: plan.step_count(),
        })
    }

    fn execute_step(&self, step: &PlanStep, verbosity: Verbosity) -> Result<StepResult, ExecuteError> {
        let repo = self.ws.repo;
        let layout = &self.ws.layout;

        match step {
            PlanStep::Regenerate => {
                let reports = self.ws.generator.regenerate(&self.ws.packages)?;
                for report in &reports {
                    output::debug(
                        format!(
                            "{}: {} declaration file(s){}",
                            report.name,
                            report.files,
                            if report.synthesized_index {
                                ", index synthesized"
                            } else {
                                ""
                            }
                        ),
                        verbosity,
                    );
                }
            }

            PlanStep::ApplyPatches | PlanStep::UnapplyPatches => {
                let (direction, verb) = if *step == PlanStep::ApplyPatches {
                    (Direction::Forward, "Applied")
                } else {
                    (Direction::Reverse, "Unapplied")
                };
                let patches = self.ws.store().list()?;
                let applied = apply_all(layout.work_dir(), &patches, direction)?;
                for name in &applied {
                    output::debug(format!("{verb} {name}"), verbosity);
                }
                output::print(format!("{} {} patch(es)", verb, applied.len()), verbosity);
            }

            PlanStep::CreateBranch { branch, at } => {
                let at = match at {
                    Some(oid) => oid.clone(),
                    None => repo.head_oid()?,
                };
                repo.create_branch(branch, &at)?;
            }

            PlanStep::SetUpstream { branch, upstream } => {
                repo.set_upstream(branch, upstream)?;
            }

            PlanStep::Checkout { branch } => {
                repo.checkout_branch(branch)?;
                output::debug(format!("Now on '{branch}'"), verbosity);
            }

            PlanStep::DetachHead => repo.checkout_detached()?,

            PlanStep::StageGenerated => repo.stage(&layout.generated_filter())?,

            PlanStep::StageOutputs => repo.stage(&layout.outputs_filter())?,

            PlanStep::Commit { message } => {
                let oid = repo.commit(message)?;
                output::print(format!("[{}] {}", oid.short(7), message), verbosity);
            }

            PlanStep::ReplayPatches { patches } => {
                repo.apply_mailbox(patches)?;
                output::print(format!("Replayed {} patch(es) as commits", patches.len()), verbosity);
            }

            PlanStep::Rebase { onto } => {
                let branch = repo
                    .current_branch()?
                    .map(|b| b.to_string())
                    .unwrap_or_else(|| "HEAD".to_string());
                if repo.rebase(onto)? == RebaseOutcome::Conflict {
                    return Ok(StepResult::Pause {
                        branch,
                        git_state: repo.state(),
                    });
                }
            }

            PlanStep::RestoreGenerated { from } => {
                repo.restore_from(from, &layout.generated_filter())?;
            }

            PlanStep::WritePatches { range } => {
                let store = self.ws.store();
                let before = store.digest()?;
                let written = store.write_patches(repo, range)?;
                let note = if store.digest()? == before {
                    " (unchanged)"
                } else {
                    ""
                };
                output::print(
                    format!("Wrote {} patch(es) from {}{}", written.len(), range, note),
                    verbosity,
                );
            }

            PlanStep::RequireOnlyGenerated { preexisting } => {
                let preexisting: HashSet<&str> = preexisting.iter().map(String::as_str).collect();
                let forbidden: Vec<String> = repo
                    .changed_paths()?
                    .into_iter()
                    .filter(|p| !preexisting.contains(p.as_str()) && !layout.is_generated(p))
                    .collect();
                if !forbidden.is_empty() {
                    return Err(ExecuteError::ForbiddenPaths { paths: forbidden });
                }
            }

            PlanStep::RequireNoDrift { preexisting } => {
                let preexisting: HashSet<&str> = preexisting.iter().map(String::as_str).collect();
                let types = layout.types_filter();
                let drifted: Vec<String> = repo
                    .unstaged_paths()?
                    .into_iter()
                    .filter(|p| !preexisting.contains(p.as_str()) && types.matches(p))
                    .collect();
                if !drifted.is_empty() {
                    return Err(ExecuteError::Stale { paths: drifted });
                }
            }

            PlanStep::ResetHard { to } => repo.reset_hard(to)?,

            PlanStep::RemoveNewUntracked { preexisting } => {
                let preexisting: HashSet<&str> = preexisting.iter().map(String::as_str).collect();
                for path in repo.untracked_paths()? {
                    if preexisting.contains(path.as_str()) {
                        continue;
                    }
                    let abs = layout.resolve(&path);
                    fs::remove_file(&abs).map_err(|source| ExecuteError::Io {
                        path: abs.clone(),
                        source,
                    })?;
                    output::debug(format!("Removed {path}"), verbosity);
                    // Drop directories the removal left empty.
                    let mut dir = abs.parent();
                    while let Some(d) = dir {
                        if d == layout.work_dir() || fs::remove_dir(d).is_err() {
                            break;
                        }
                        dir = d.parent();
                    }
                }
            }
        }

        Ok(StepResult::Continue)
    }
}
