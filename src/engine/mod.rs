//! engine
//!
//! Orchestrates the command lifecycle: Gate -> Plan -> Execute.
//!
//! # Architecture
//!
//! Every typestack command is a pipeline of stages over one working tree:
//!
//! 1. **Gate**: Read-only preconditions (clean tree, branch links, collision
//!    guard). A violated gate aborts before anything changes.
//! 2. **Plan**: Compile the command into an ordered list of typed steps.
//! 3. **Execute**: Run the steps through the single [`Executor`], stopping
//!    at the first failure.
//!
//! Gating and planning happen together in the `plan_*` functions of
//! [`lifecycle`] and [`check`]; they only read the repository.
//!
//! # Invariants
//!
//! - The engine never mutates directly; all mutation flows through the Executor
//! - A gate failure leaves disk and refs untouched
//! - A rebase conflict during `unpack` is a pause, not a failure
//!
//! # Example
//!
//! ```ignore
//! use typestack::engine::{run_plan, lifecycle, Context, Workspace};
//!
//! let result = run_plan(&ws, &ctx, |ws| lifecycle::plan_pack(ws))?;
//! ```

pub mod check;
pub mod exec;
pub mod lifecycle;
pub mod plan;

pub use check::plan_check;
pub use exec::{ExecuteError, ExecuteResult, Executor};
pub use lifecycle::{detect_state, plan_pack, plan_unpack, LifecycleError, LifecycleState};
pub use plan::{Plan, PlanStep};

use std::path::PathBuf;

use crate::core::config::TrackedPackage;
use crate::core::paths::Layout;
use crate::generate::Generator;
use crate::git::Repository;
use crate::patch::PatchStore;
use crate::ui::output::{self, Verbosity};

/// Execution context for commands.
///
/// Contains global settings derived from CLI flags that affect command behavior.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Working directory override.
    pub cwd: Option<PathBuf>,
    /// Debug logging enabled.
    pub debug: bool,
    /// Quiet mode (minimal output).
    pub quiet: bool,
}

impl Context {
    /// Output verbosity for these flags.
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.debug)
    }
}

/// Everything a plan reads and the executor mutates.
pub struct Workspace<'a> {
    /// The repository.
    pub repo: &'a dyn Repository,
    /// Regenerates tracked packages.
    pub generator: &'a dyn Generator,
    /// Where generated declarations and patches live.
    pub layout: Layout,
    /// Packages to regenerate, in order.
    pub packages: Vec<TrackedPackage>,
}

impl<'a> Workspace<'a> {
    /// The patch store of this workspace.
    pub fn store(&self) -> PatchStore {
        PatchStore::new(self.layout.patches_path())
    }
}

/// Errors from engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A precondition did not hold; nothing was changed.
    #[error(transparent)]
    Gate(#[from] LifecycleError),

    /// A step failed during execution.
    #[error(transparent)]
    Execute(#[from] ExecuteError),
}

impl EngineError {
    /// Remedy text for the user, when there is a useful one.
    pub fn hint(&self) -> Option<String> {
        match self {
            EngineError::Gate(err) => err.hint(),
            EngineError::Execute(err) => err.hint(),
        }
    }
}

/// Gate and plan with `plan_fn`, then execute the plan.
///
/// A pause (rebase conflict) is returned as `Ok(ExecuteResult::Paused)`;
/// the caller decides how to report it.
pub fn run_plan<F>(ws: &Workspace<'_>, ctx: &Context, plan_fn: F) -> Result<ExecuteResult, EngineError>
where
    F: FnOnce(&Workspace<'_>) -> Result<Plan, LifecycleError>,
{
    // 1-2. Gate and plan
    let plan = plan_fn(ws)?;
    output::debug(
        format!("Planned '{}' with {} step(s)", plan.command, plan.step_count()),
        ctx.verbosity(),
    );

    // 3. Execute
    let result = Executor::new(ws).execute(&plan, ctx)?;
    Ok(result)
}
