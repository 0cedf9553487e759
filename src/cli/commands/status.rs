//! status command - Report the lifecycle state and the patch store

use anyhow::{Context as _, Result};

use super::session::Session;
use crate::engine::{detect_state, Context, LifecycleState};
use crate::ui::output;

/// Show where the repository stands in the unpack/pack cycle, the patch
/// store and the tracked packages.
pub fn status(ctx: &Context) -> Result<()> {
    let session = Session::open(ctx)?;
    let ws = session.workspace();

    let state = detect_state(ws.repo).context("Failed to read repository state")?;
    let branch = ws
        .repo
        .current_branch()?
        .map(|b| b.to_string())
        .unwrap_or_else(|| "(detached HEAD)".to_string());

    // Status output is the point of this command; it ignores --quiet.
    println!("On branch {}", branch);
    println!("State: {}", state);

    let patches = ws.store().list().context("Failed to list patches")?;
    println!(
        "Patches ({}) in {}:",
        patches.len(),
        ws.layout.patches_path().display()
    );
    if !patches.is_empty() {
        let names: Vec<&str> = patches.iter().map(|p| p.name.as_str()).collect();
        println!("{}", output::format_list(&names, "  "));
    }

    println!("Tracked packages ({}):", ws.packages.len());
    for package in &ws.packages {
        println!("  {} ({} -> {})", package.name, package.source, package.dest);
    }

    match state {
        LifecycleState::Unpacked { .. } => {
            output::hint("run `typestack pack` to fold the branch pair back into the store")
        }
        LifecycleState::Unpacking => output::hint(
            "finish the rebase with `git rebase --continue`, then run `typestack pack`",
        ),
        LifecycleState::Clean | LifecycleState::Packing => {}
    }

    Ok(())
}
