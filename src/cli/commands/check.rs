//! check command - Verify the committed definitions are consistent

use anyhow::Result;

use super::session::Session;
use crate::engine::{plan_check, Context};
use crate::ui::output;

/// Verify that the committed declarations equal a regeneration plus the
/// patch store, and that patches touch only generated declarations.
pub fn check(ctx: &Context) -> Result<()> {
    let session = Session::open(ctx)?;
    session.run(ctx, "check", plan_check)?;
    output::success("Type definitions are up to date.", ctx.verbosity());
    Ok(())
}
