//! session - Shared setup for commands that touch the repository
//!
//! Opens the repository, loads configuration and builds the generator
//! adapter, then hands out an engine [`Workspace`] over them.

use anyhow::{Context as _, Result};

use crate::core::config::Config;
use crate::engine::{
    run_plan, Context, ExecuteResult, LifecycleError, Plan, Workspace,
};
use crate::generate::GeneratorAdapter;
use crate::git::{Git, Repository};
use crate::ui::output;

/// An opened repository with its configuration.
pub struct Session {
    /// The repository.
    pub git: Git,
    /// Merged configuration.
    pub config: Config,
    generator: GeneratorAdapter,
}

impl Session {
    /// Open the repository containing `ctx.cwd` (or the current directory).
    pub fn open(ctx: &Context) -> Result<Self> {
        let verbosity = ctx.verbosity();
        let cwd = match &ctx.cwd {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().context("Failed to determine current directory")?,
        };

        let git = Git::open(&cwd).context("Failed to open repository")?;
        let loaded = Config::load(Some(git.work_dir())).context("Failed to load configuration")?;
        for warning in &loaded.warnings {
            output::warn(
                format!("{}: {}", warning.path.display(), warning.message),
                verbosity,
            );
        }
        let config = loaded.config;
        for path in [config.global_config_loaded_from(), config.repo_config_loaded_from()]
            .into_iter()
            .flatten()
        {
            output::debug(format!("Loaded {}", path.display()), verbosity);
        }

        let generator = GeneratorAdapter::new(
            git.work_dir(),
            config.extension(),
            config.generator_command(),
            config.formatter_command(),
            verbosity,
        )
        .context("Invalid tool configuration")?;

        Ok(Self {
            git,
            config,
            generator,
        })
    }

    /// The engine's view of this session.
    pub fn workspace(&self) -> Workspace<'_> {
        Workspace {
            repo: &self.git,
            generator: &self.generator,
            layout: self.config.layout(self.git.work_dir()),
            packages: self.config.packages(),
        }
    }

    /// Gate, plan and execute, naming the command in any error.
    pub fn run<F>(&self, ctx: &Context, command: &str, plan_fn: F) -> Result<ExecuteResult>
    where
        F: FnOnce(&Workspace<'_>) -> Result<Plan, LifecycleError>,
    {
        let ws = self.workspace();
        run_plan(&ws, ctx, plan_fn).with_context(|| format!("{command} failed"))
    }
}
