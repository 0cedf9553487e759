//! engine::plan
//!
//! Typed plans: the only representation between gating and mutation.
//!
//! # Architecture
//!
//! Every subcommand is compiled into a [`Plan`], an ordered list of
//! [`PlanStep`]s. Planning reads the repository (gates, branch tips, the
//! patch store listing) but never writes to it. The executor then runs the
//! steps in order and stops at the first failure.
//!
//! Plans are:
//! - **Deterministic**: Same repository state always produces the same plan
//! - **Previewable**: `--debug` traces each step's description
//! - **Typed**: Steps carry their branch names, commits and ranges
//!
//! # Example
//!
//! ```
//! use typestack::engine::plan::{Plan, PlanStep};
//!
//! let plan = Plan::new("run")
//!     .with_step(PlanStep::Regenerate)
//!     .with_step(PlanStep::ApplyPatches);
//!
//! assert_eq!(plan.step_count(), 2);
//! assert!(plan.has_mutations());
//! ```

use std::path::PathBuf;

use crate::core::types::{BranchName, CommitRange, Oid};

/// A typed plan step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanStep {
    /// Run the generator adapter over every tracked package.
    Regenerate,

    /// Apply the patch store, in order.
    ApplyPatches,

    /// Reverse-apply the patch store, in reverse order.
    UnapplyPatches,

    /// Create or reset a branch.
    CreateBranch {
        /// Branch to create
        branch: BranchName,
        /// Commit to point it at; `None` means the current HEAD
        at: Option<Oid>,
    },

    /// Make `branch` track the local branch `upstream`.
    SetUpstream {
        /// Tracking branch
        branch: BranchName,
        /// Tracked branch
        upstream: BranchName,
    },

    /// Check out a branch.
    Checkout {
        /// Branch to check out
        branch: BranchName,
    },

    /// Detach HEAD at the current commit.
    DetachHead,

    /// Stage additions, changes and deletions of generated declarations.
    StageGenerated,

    /// Stage generated declarations and patch files.
    StageOutputs,

    /// Commit the index.
    Commit {
        /// Commit message
        message: String,
    },

    /// Replay patch files as one commit each.
    ReplayPatches {
        /// Patch files, in store order
        patches: Vec<PathBuf>,
    },

    /// Rebase the current branch. May pause on a conflict.
    Rebase {
        /// New base
        onto: BranchName,
    },

    /// Copy generated declarations from a branch, deleting those it lacks.
    RestoreGenerated {
        /// Source branch
        from: BranchName,
    },

    /// Replace the patch store with the commits of a range.
    WritePatches {
        /// Commits to export
        range: CommitRange,
    },

    /// Fail unless every changed path is a generated declaration.
    RequireOnlyGenerated {
        /// Untracked paths present before the plan ran; ignored
        preexisting: Vec<String>,
    },

    /// Fail if the working tree differs from the index under the types
    /// directory.
    RequireNoDrift {
        /// Untracked paths present before the plan ran; ignored
        preexisting: Vec<String>,
    },

    /// Reset HEAD, index and working tree.
    ResetHard {
        /// Commit to reset to
        to: Oid,
    },

    /// Delete untracked files that were not present before.
    RemoveNewUntracked {
        /// Untracked paths present before the plan ran; kept
        preexisting: Vec<String>,
    },
}

impl PlanStep {
    /// Whether this step changes the repository or working tree.
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            PlanStep::RequireOnlyGenerated { .. } | PlanStep::RequireNoDrift { .. }
        )
    }

    /// Get a human-readable description of this step.
    pub fn description(&self) -> String {
        match self {
            PlanStep::Regenerate => "Regenerate tracked packages".to_string(),
            PlanStep::ApplyPatches => "Apply patches".to_string(),
            PlanStep::UnapplyPatches => "Unapply patches".to_string(),
            PlanStep::CreateBranch { branch, at: Some(at) } => {
                format!("Create branch '{}' at {}", branch, at.short(7))
            }
            PlanStep::CreateBranch { branch, at: None } => {
                format!("Create branch '{}' at HEAD", branch)
            }
            PlanStep::SetUpstream { branch, upstream } => {
                format!("Set upstream of '{}' to '{}'", branch, upstream)
            }
            PlanStep::Checkout { branch } => format!("Checkout '{}'", branch),
            PlanStep::DetachHead => "Detach HEAD".to_string(),
            PlanStep::StageGenerated => "Stage generated declarations".to_string(),
            PlanStep::StageOutputs => "Stage generated declarations and patches".to_string(),
            PlanStep::Commit { message } => format!("Commit \"{}\"", message),
            PlanStep::ReplayPatches { patches } => {
                format!("Replay {} patch(es) as commits", patches.len())
            }
            PlanStep::Rebase { onto } => format!("Rebase onto '{}'", onto),
            PlanStep::RestoreGenerated { from } => {
                format!("Restore generated declarations from '{}'", from)
            }
            PlanStep::WritePatches { range } => format!("Write patches for {}", range),
            PlanStep::RequireOnlyGenerated { .. } => {
                "Verify patches touch only generated declarations".to_string()
            }
            PlanStep::RequireNoDrift { .. } => {
                "Verify regenerated declarations match".to_string()
            }
            PlanStep::ResetHard { to } => format!("Reset to {}", to.short(7)),
            PlanStep::RemoveNewUntracked { .. } => "Remove files created by this run".to_string(),
        }
    }
}

/// A complete execution plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    /// Command that generated this plan.
    pub command: String,
    /// Ordered steps to execute.
    pub steps: Vec<PlanStep>,
}

impl Plan {
    /// Create a new empty plan.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            steps: vec![],
        }
    }

    /// Add a step to the plan (builder pattern).
    pub fn with_step(mut self, step: PlanStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Add multiple steps.
    pub fn with_steps(mut self, steps: impl IntoIterator<Item = PlanStep>) -> Self {
        self.steps.extend(steps);
        self
    }

    /// Check if the plan has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Check if any step mutates.
    pub fn has_mutations(&self) -> bool {
        self.steps.iter().any(PlanStep::is_mutation)
    }

    /// Number of steps.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Numbered step descriptions, one per line.
    pub fn preview(&self) -> String {
        self.steps
            .iter()
            .enumerate()
            .map(|(i, step)| format!("{:>2}. {}", i + 1, step.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// `run`: regenerate, then apply the store.
pub fn plan_run() -> Plan {
    Plan::new("run").with_steps([PlanStep::Regenerate, PlanStep::ApplyPatches])
}

/// `run-only`: regenerate without patches.
pub fn plan_run_only() -> Plan {
    Plan::new("run-only").with_step(PlanStep::Regenerate)
}

/// `apply-patches`.
pub fn plan_apply() -> Plan {
    Plan::new("apply-patches").with_step(PlanStep::ApplyPatches)
}

/// `unapply-patches`.
pub fn plan_unapply() -> Plan {
    Plan::new("unapply-patches").with_step(PlanStep::UnapplyPatches)
}

/// `write-patches RANGE`.
pub fn plan_write_patches(range: CommitRange) -> Plan {
    Plan::new("write-patches").with_step(PlanStep::WritePatches { range })
}
