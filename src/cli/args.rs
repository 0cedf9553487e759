//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--cwd <path>`: Run as if in that directory
//! - `--debug`: Trace every plan step
//! - `--quiet` / `-q`: Errors only
//!
//! Running without a command prints usage and exits with status 2.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// typestack - Regenerate Flow type definitions and keep a patch stack on top
#[derive(Parser, Debug)]
#[command(name = "typestack")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Run as if typestack was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Regenerate type definitions, then apply the patches
    #[command(
        name = "run",
        long_about = "Regenerate the type definitions of every tracked package, then apply \
            the patch store on top.\n\n\
            Stops at the first generator failure or the first patch that does not apply \
            cleanly. Patches applied before the failing one stay applied.",
        after_help = "\
WORKFLOW EXAMPLES:
    # After upgrading an upstream package
    typestack run
    git diff types/"
    )]
    Run,

    /// Verify the committed definitions match a fresh regeneration
    #[command(
        name = "check",
        long_about = "Verify that the committed type definitions are exactly what \
            `typestack run` would produce, and that the patches only touch generated \
            type definitions.\n\n\
            On success the working tree is left exactly as it was. On failure it is left \
            mid-check for inspection; restore it with `git reset --hard`.",
        after_help = "\
WORKFLOW EXAMPLES:
    # In CI, before merging
    typestack check"
    )]
    Check,

    /// Regenerate type definitions without applying patches
    #[command(name = "run-only")]
    RunOnly,

    /// Apply the patch store to the working tree
    #[command(name = "apply-patches")]
    ApplyPatches,

    /// Reverse-apply the patch store, last patch first
    #[command(name = "unapply-patches")]
    UnapplyPatches,

    /// Rewrite the patch store from a commit range
    #[command(
        name = "write-patches",
        long_about = "Replace every patch file in the store with one patch per commit of \
            RANGE. Output is normalized so equivalent history always produces \
            byte-identical files."
    )]
    WritePatches {
        /// Commit range, BASE..TIP (default from config, else upstream..tsflower)
        range: Option<String>,
    },

    /// Turn the patch store into a branch pair for editing
    #[command(
        name = "unpack",
        long_about = "Materialize the patch store as branches: NAME-base holds the \
            unpatched definitions, NAME holds one commit per patch on top. Edit, reorder \
            or add commits on NAME with ordinary git, then run `typestack pack`.\n\n\
            Unless --shortcut is given, the definitions are regenerated on NAME-base \
            and NAME is rebased onto the result. A conflict stops the rebase for manual \
            resolution.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Edit the patches
    typestack unpack
    git commit --amend            # or rebase -i tsflower-base, etc.
    typestack pack
    git commit -m 'types: update patches'

    # After a conflict
    git rebase --continue
    typestack pack"
    )]
    Unpack {
        /// Name of the patch branch (default from config, else tsflower)
        name: Option<String>,

        /// Skip regenerating and rebasing
        #[arg(short, long)]
        shortcut: bool,
    },

    /// Fold an unpacked branch pair back into the patch store
    #[command(
        name = "pack",
        long_about = "From the patch branch created by `typestack unpack`, check out the \
            original branch, take the type definitions from the patch branch and rewrite \
            the patch store from its commits. The result is staged but not committed."
    )]
    Pack,

    /// Show the unpack/pack state and the patch store
    #[command(name = "status")]
    Status,

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        after_help = "\
INSTALLATION:
    # Bash
    typestack completion bash > ~/.local/share/bash-completion/completions/typestack

    # Zsh
    typestack completion zsh > \"${fpath[1]}/_typestack\"

    # Fish
    typestack completion fish > ~/.config/fish/completions/typestack.fish"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completion.
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}
