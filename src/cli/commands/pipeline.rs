//! pipeline commands - run, run-only, apply-patches, unapply-patches, write-patches
//!
//! These commands have fixed plans and no preconditions beyond an openable
//! repository.

use anyhow::{Context as _, Result};

use super::session::Session;
use crate::core::types::CommitRange;
use crate::engine::plan::{plan_apply, plan_run, plan_run_only, plan_unapply, plan_write_patches};
use crate::engine::Context;
use crate::ui::output;

/// Regenerate, then apply the patch store.
pub fn run(ctx: &Context) -> Result<()> {
    let session = Session::open(ctx)?;
    session.run(ctx, "run", |_| Ok(plan_run()))?;
    output::success("Type definitions regenerated and patched.", ctx.verbosity());
    Ok(())
}

/// Regenerate without applying patches.
pub fn run_only(ctx: &Context) -> Result<()> {
    let session = Session::open(ctx)?;
    session.run(ctx, "run-only", |_| Ok(plan_run_only()))?;
    output::success("Type definitions regenerated.", ctx.verbosity());
    Ok(())
}

/// Apply the patch store.
pub fn apply_patches(ctx: &Context) -> Result<()> {
    let session = Session::open(ctx)?;
    session.run(ctx, "apply-patches", |_| Ok(plan_apply()))?;
    Ok(())
}

/// Reverse-apply the patch store.
pub fn unapply_patches(ctx: &Context) -> Result<()> {
    let session = Session::open(ctx)?;
    session.run(ctx, "unapply-patches", |_| Ok(plan_unapply()))?;
    Ok(())
}

/// Rewrite the patch store from `range`, or the configured default range.
pub fn write_patches(ctx: &Context, range: Option<&str>) -> Result<()> {
    let session = Session::open(ctx)?;
    let range: CommitRange = match range {
        Some(range) => range.parse().context("Invalid commit range")?,
        None => session
            .config
            .default_range()
            .context("Invalid default_range in configuration")?,
    };
    session.run(ctx, "write-patches", |_| Ok(plan_write_patches(range)))?;
    Ok(())
}
