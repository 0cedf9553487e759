//! engine::check
//!
//! The consistency check: the committed declarations must equal a fresh
//! regeneration plus the patch store, and the patches may only touch
//! generated declarations.
//!
//! On success the check leaves no trace: HEAD, index and working tree are
//! reset to where they were and files it created are removed. On failure
//! the tree is left as the failing step found it, for inspection.

use super::lifecycle::{require_clean, require_no_operation, require_no_untracked_generated, LifecycleError};
use super::plan::{Plan, PlanStep};
use super::Workspace;

/// Plan `check`.
pub fn plan_check(ws: &Workspace<'_>) -> Result<Plan, LifecycleError> {
    let repo = ws.repo;

    require_no_operation(repo)?;
    require_clean(repo)?;
    // `reset --hard` would delete untracked files once they are staged.
    require_no_untracked_generated(ws)?;

    let head = repo.head_oid()?;
    let preexisting = repo.untracked_paths()?;

    Ok(Plan::new("check").with_steps([
        PlanStep::UnapplyPatches,
        PlanStep::RequireOnlyGenerated {
            preexisting: preexisting.clone(),
        },
        PlanStep::StageGenerated,
        PlanStep::Regenerate,
        PlanStep::RequireNoDrift {
            preexisting: preexisting.clone(),
        },
        PlanStep::ResetHard { to: head },
        PlanStep::RemoveNewUntracked { preexisting },
    ]))
}
