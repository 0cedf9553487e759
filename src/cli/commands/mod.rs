//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Opens a [`session::Session`] (repository, configuration, generator)
//! 2. Calls the engine to gate, plan and execute the command
//! 3. Formats and displays output
//!
//! Handlers do NOT perform repository mutations directly.

mod check;
mod completion;
mod lifecycle;
mod pipeline;
mod session;
mod status;

// Re-export command functions for testing and direct invocation
pub use check::check;
pub use completion::completion;
pub use lifecycle::{pack, unpack};
pub use pipeline::{apply_patches, run, run_only, unapply_patches, write_patches};
pub use session::Session;
pub use status::status;

use crate::cli::args::Command;
use crate::engine::Context;
use anyhow::Result;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Run => pipeline::run(ctx),
        Command::Check => check::check(ctx),
        Command::RunOnly => pipeline::run_only(ctx),
        Command::ApplyPatches => pipeline::apply_patches(ctx),
        Command::UnapplyPatches => pipeline::unapply_patches(ctx),
        Command::WritePatches { range } => pipeline::write_patches(ctx, range.as_deref()),
        Command::Unpack { name, shortcut } => lifecycle::unpack(ctx, name.as_deref(), shortcut),
        Command::Pack => lifecycle::pack(ctx),
        Command::Status => status::status(ctx),
        Command::Completion { shell } => completion::completion(shell),
    }
}
