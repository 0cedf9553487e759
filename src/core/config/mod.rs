//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! typestack has two configuration scopes:
//! - **Global**: user-level tool overrides
//! - **Repo**: the committed `typestack.toml` (tracked packages, layout)
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Repo config file
//! 4. CLI arguments (not handled here)
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. `$TYPESTACK_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/typestack/config.toml`
//! 3. `~/.typestack/config.toml`
//!
//! # Example
//!
//! ```no_run
//! use typestack::core::config::Config;
//! use std::path::Path;
//!
//! let result = Config::load(Some(Path::new("/path/to/repo"))).unwrap();
//! let config = result.config;
//!
//! for package in config.packages() {
//!     println!("{} -> {}", package.name, package.dest);
//! }
//! println!("unpack branch: {}", config.default_branch().unwrap());
//! ```

pub mod schema;

pub use schema::{GlobalConfig, PackageConfig, RepoConfig, ToolConfig};

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::paths::Layout;
use crate::core::types::{BranchName, CommitRange, TypeError};

/// File name of the repo configuration, at the repository root.
pub const REPO_CONFIG_FILE: &str = "typestack.toml";

const DEFAULT_TYPES_DIR: &str = "types";
const DEFAULT_EXTENSION: &str = "js.flow";
const DEFAULT_BRANCH: &str = "tsflower";
const DEFAULT_RANGE: &str = "upstream..tsflower";
const DEFAULT_GENERATOR: &[&str] = &["npx", "tsflower", "tree", "{source}", "{dest}"];
const DEFAULT_FORMATTER: &[&str] = &["npx", "prettier", "--write", "--loglevel=warn"];

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Warnings generated during config loading.
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    /// The warning message.
    pub message: String,
    /// The path that triggered the warning.
    pub path: PathBuf,
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: Config,
    /// Any warnings generated during loading.
    pub warnings: Vec<ConfigWarning>,
}

/// A tracked package with every default resolved.
///
/// Paths are repo-relative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedPackage {
    /// Package name
    pub name: String,
    /// Where the upstream package lives
    pub source: String,
    /// Where its declarations are written
    pub dest: String,
    /// Subdirectories of `dest` removed after generation
    pub prune: Vec<String>,
    /// Whether to synthesize an index re-export file
    pub index: bool,
}

/// Merged configuration from all sources.
///
/// This struct provides accessor methods that apply precedence rules
/// automatically. Repo config overrides global config.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration
    pub global: GlobalConfig,
    /// Repository configuration (if present)
    pub repo: Option<RepoConfig>,
    global_path: Option<PathBuf>,
    repo_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// If `repo_path` is provided, also loads `typestack.toml` from it.
    ///
    /// # Errors
    ///
    /// Returns an error if config files exist but cannot be parsed or fail
    /// validation. Missing config files are not an error.
    pub fn load(repo_path: Option<&Path>) -> Result<ConfigLoadResult, ConfigError> {
        let (global, global_path) = Self::load_global()?;

        let (repo, repo_path_found) = match repo_path {
            Some(path) => Self::load_repo(path)?,
            None => (None, None),
        };

        global.validate()?;
        if let Some(ref r) = repo {
            r.validate()?;
        }

        let config = Config {
            global,
            repo,
            global_path,
            repo_path: repo_path_found,
        };
        let warnings = config.collect_warnings();

        Ok(ConfigLoadResult { config, warnings })
    }

    /// Load global configuration from standard locations.
    fn load_global() -> Result<(GlobalConfig, Option<PathBuf>), ConfigError> {
        let mut candidates = Vec::new();
        if let Ok(path) = std::env::var("TYPESTACK_CONFIG") {
            candidates.push(PathBuf::from(path));
        }
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            candidates.push(PathBuf::from(xdg_home).join("typestack/config.toml"));
        }
        if let Some(home) = dirs::home_dir() {
            candidates.push(home.join(".typestack/config.toml"));
        }

        for path in candidates {
            if path.exists() {
                let config = read_toml(&path)?;
                return Ok((config, Some(path)));
            }
        }

        Ok((GlobalConfig::default(), None))
    }

    /// Load `typestack.toml` from the repository root.
    fn load_repo(repo_path: &Path) -> Result<(Option<RepoConfig>, Option<PathBuf>), ConfigError> {
        let path = repo_path.join(REPO_CONFIG_FILE);
        if !path.exists() {
            return Ok((None, None));
        }
        let config = read_toml(&path)?;
        Ok((Some(config), Some(path)))
    }

    fn collect_warnings(&self) -> Vec<ConfigWarning> {
        let Some(path) = self.repo_path.clone() else {
            return Vec::new();
        };
        let prefix = format!("{}/", self.types_dir().trim_end_matches('/'));

        let mut warnings = Vec::new();
        if self.repo.as_ref().map_or(true, |r| r.packages.is_empty()) {
            warnings.push(ConfigWarning {
                message: "no [[package]] entries; regeneration will do nothing".to_string(),
                path: path.clone(),
            });
        }
        for package in self.packages() {
            if !package.dest.starts_with(&prefix) {
                warnings.push(ConfigWarning {
                    message: format!(
                        "package '{}' writes to '{}', outside '{}'; its files will not be treated as generated",
                        package.name,
                        package.dest,
                        self.types_dir()
                    ),
                    path: path.clone(),
                });
            }
        }
        warnings
    }

    // =========================================================================
    // Accessor methods with precedence
    // =========================================================================

    /// Root of the generated declarations.
    pub fn types_dir(&self) -> &str {
        self.repo
            .as_ref()
            .and_then(|r| r.types_dir.as_deref())
            .unwrap_or(DEFAULT_TYPES_DIR)
    }

    /// Patch store directory. Defaults to `<types_dir>/patches`.
    pub fn patches_dir(&self) -> String {
        self.repo
            .as_ref()
            .and_then(|r| r.patches_dir.clone())
            .unwrap_or_else(|| format!("{}/patches", self.types_dir().trim_end_matches('/')))
    }

    /// Declaration file extension.
    pub fn extension(&self) -> &str {
        self.repo
            .as_ref()
            .and_then(|r| r.extension.as_deref())
            .unwrap_or(DEFAULT_EXTENSION)
    }

    /// Branch name `unpack` uses when none is given.
    pub fn default_branch(&self) -> Result<BranchName, TypeError> {
        BranchName::new(
            self.repo
                .as_ref()
                .and_then(|r| r.default_branch.as_deref())
                .unwrap_or(DEFAULT_BRANCH),
        )
    }

    /// Range `write-patches` uses when none is given.
    pub fn default_range(&self) -> Result<CommitRange, TypeError> {
        self.repo
            .as_ref()
            .and_then(|r| r.default_range.as_deref())
            .unwrap_or(DEFAULT_RANGE)
            .parse()
    }

    /// Generator argv: repo, then global, then the built-in default.
    pub fn generator_command(&self) -> Vec<String> {
        self.repo
            .as_ref()
            .and_then(|r| r.generator.as_ref())
            .or(self.global.generator.as_ref())
            .map(|t| t.command.clone())
            .unwrap_or_else(|| DEFAULT_GENERATOR.iter().map(|s| s.to_string()).collect())
    }

    /// Formatter argv, or `None` when formatting is disabled.
    pub fn formatter_command(&self) -> Option<Vec<String>> {
        let command = self
            .repo
            .as_ref()
            .and_then(|r| r.formatter.as_ref())
            .or(self.global.formatter.as_ref())
            .map(|t| t.command.clone())
            .unwrap_or_else(|| DEFAULT_FORMATTER.iter().map(|s| s.to_string()).collect());
        (!command.is_empty()).then_some(command)
    }

    /// The tracked package set, defaults resolved, in configuration order.
    pub fn packages(&self) -> Vec<TrackedPackage> {
        let types_dir = self.types_dir().trim_end_matches('/');
        self.repo
            .iter()
            .flat_map(|r| r.packages.iter())
            .map(|p| TrackedPackage {
                name: p.name.clone(),
                source: p
                    .source
                    .clone()
                    .unwrap_or_else(|| format!("node_modules/{}", p.name)),
                dest: p
                    .dest
                    .clone()
                    .unwrap_or_else(|| format!("{}/{}", types_dir, p.name)),
                prune: p.prune.clone(),
                index: p.index.unwrap_or(true),
            })
            .collect()
    }

    /// Path layout for a working directory.
    pub fn layout(&self, work_dir: &Path) -> Layout {
        Layout::new(
            work_dir.to_path_buf(),
            self.types_dir(),
            &self.patches_dir(),
            self.extension(),
        )
    }

    /// Get the path to the loaded global config file.
    pub fn global_config_loaded_from(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    /// Get the path to the loaded repo config file.
    pub fn repo_config_loaded_from(&self) -> Option<&Path> {
        self.repo_path.as_deref()
    }
}

/// Read and parse a TOML config file.
fn read_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
