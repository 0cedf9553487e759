//! cli
//!
//! Command-line interface layer for typestack.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Delegate to command handlers
//! - Does NOT perform repository mutations directly
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap and dispatches to the
//! [`crate::engine`] for execution. All working-tree and repository changes
//! flow through the engine's executor.

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use crate::engine::{self, EngineError, ExecuteError, LifecycleError};
use anyhow::Result;

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let ctx = engine::Context {
        cwd: cli.cwd.clone(),
        debug: cli.debug,
        quiet: cli.quiet,
    };

    commands::dispatch(cli.command, &ctx)
}

/// Remedy text for an error returned by [`run`], if any error in its chain
/// carries one.
pub fn hint_for(err: &anyhow::Error) -> Option<String> {
    err.chain().find_map(|cause| {
        if let Some(e) = cause.downcast_ref::<EngineError>() {
            e.hint()
        } else if let Some(e) = cause.downcast_ref::<LifecycleError>() {
            e.hint()
        } else if let Some(e) = cause.downcast_ref::<ExecuteError>() {
            e.hint()
        } else {
            None
        }
    })
}
