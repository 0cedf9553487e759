//! unpack and pack commands - Edit the patch store as a branch pair
//!
//! `unpack` may stop on a rebase conflict. That is reported as an expected
//! pause with the manual-resolution path, not as an error.

use anyhow::{Context as _, Result};

use super::session::Session;
use crate::core::types::{BranchName, BranchPair};
use crate::engine::{plan_pack, plan_unpack, Context, ExecuteResult};
use crate::ui::output;

/// Materialize the patch store as `NAME-base` / `NAME`.
pub fn unpack(ctx: &Context, name: Option<&str>, shortcut: bool) -> Result<()> {
    let verbosity = ctx.verbosity();
    let session = Session::open(ctx)?;

    let name = match name {
        Some(name) => BranchName::new(name).context("Invalid branch name")?,
        None => session
            .config
            .default_branch()
            .context("Invalid default_branch in configuration")?,
    };
    let pair = BranchPair::for_name(&name).context("Invalid branch name")?;

    match session.run(ctx, "unpack", |ws| plan_unpack(ws, &name, shortcut))? {
        ExecuteResult::Success { .. } => {
            output::success(
                format!("Unpacked into '{}' (tracking '{}').", pair.patch, pair.base),
                verbosity,
            );
            output::print(
                format!("Edit the commits on '{}', then run `typestack pack`.", pair.patch),
                verbosity,
            );
        }
        ExecuteResult::Paused {
            branch, git_state, ..
        } => {
            output::print(
                format!("Conflict while rebasing '{}' onto '{}' ({}).", branch, pair.base, git_state),
                verbosity,
            );
            output::hint(
                "resolve the conflicts, `git add` them and run `git rebase --continue`;\n\
                 once the rebase finishes, run `typestack pack`",
            );
        }
    }
    Ok(())
}

/// Fold the checked-out branch pair back into the patch store.
pub fn pack(ctx: &Context) -> Result<()> {
    let session = Session::open(ctx)?;
    session.run(ctx, "pack", plan_pack)?;
    output::success("Packed. Review and commit the staged changes.", ctx.verbosity());
    Ok(())
}
