//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Global Config
//!
//! Located at (in order of precedence):
//! 1. `$TYPESTACK_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/typestack/config.toml`
//! 3. `~/.typestack/config.toml`
//!
//! # Repo Config
//!
//! Located at `typestack.toml` in the repository root. It is committed
//! alongside the generated declarations because it defines the tracked
//! package set.
//!
//! # Validation
//!
//! Config values are validated after parsing: paths must stay inside the
//! repository, package names must be unique, and the default branch and
//! range must be well formed.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::{BranchName, CommitRange};

/// Global configuration (user scope).
///
/// Lets a developer point at locally installed tools without touching the
/// committed repo configuration.
///
/// # Example
///
/// ```toml
/// [generator]
/// command = ["/opt/tsflower/bin/tsflower", "tree", "{source}", "{dest}"]
///
/// [formatter]
/// command = ["prettier", "--write"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Generator command override
    pub generator: Option<ToolConfig>,

    /// Formatter command override
    pub formatter: Option<ToolConfig>,
}

impl GlobalConfig {
    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(generator) = &self.generator {
            generator.validate_required("generator")?;
        }
        Ok(())
    }
}

/// Repository configuration.
///
/// # Example
///
/// ```toml
/// types_dir = "types"
/// default_branch = "tsflower"
/// default_range = "upstream..tsflower"
///
/// [generator]
/// command = ["npx", "tsflower", "tree", "{source}", "{dest}"]
///
/// [[package]]
/// name = "@react-navigation/stack"
///
/// [[package]]
/// name = "react-native-safe-area-context"
/// prune = ["example"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RepoConfig {
    /// Root of the generated declarations (default: "types")
    pub types_dir: Option<String>,

    /// Patch store directory (default: "<types_dir>/patches")
    pub patches_dir: Option<String>,

    /// Declaration file extension without leading dot (default: "js.flow")
    pub extension: Option<String>,

    /// Range used by `write-patches` without an argument
    pub default_range: Option<String>,

    /// Branch name used by `unpack` without an argument
    pub default_branch: Option<String>,

    /// Generator command
    pub generator: Option<ToolConfig>,

    /// Formatter command
    pub formatter: Option<ToolConfig>,

    /// Tracked packages, regenerated in this order
    #[serde(rename = "package")]
    pub packages: Vec<PackageConfig>,
}

impl RepoConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("types_dir", &self.types_dir),
            ("patches_dir", &self.patches_dir),
        ] {
            if let Some(dir) = value {
                validate_relative(key, dir)?;
            }
        }

        if let Some(extension) = &self.extension {
            if extension.trim_start_matches('.').is_empty() {
                return Err(ConfigError::InvalidValue(
                    "extension cannot be empty".to_string(),
                ));
            }
        }

        if let Some(branch) = &self.default_branch {
            BranchName::new(branch).map_err(|e| {
                ConfigError::InvalidValue(format!("invalid default_branch: {}", e))
            })?;
        }

        if let Some(range) = &self.default_range {
            range
                .parse::<CommitRange>()
                .map_err(|e| ConfigError::InvalidValue(format!("invalid default_range: {}", e)))?;
        }

        if let Some(generator) = &self.generator {
            generator.validate_required("generator")?;
        }

        let mut seen = HashSet::new();
        for package in &self.packages {
            package.validate()?;
            if !seen.insert(package.name.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "package '{}' is listed twice",
                    package.name
                )));
            }
        }

        Ok(())
    }
}

/// An external command, as an argv vector.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ToolConfig {
    /// Program followed by its arguments. Empty disables an optional tool.
    pub command: Vec<String>,
}

impl ToolConfig {
    fn validate_required(&self, what: &str) -> Result<(), ConfigError> {
        if self.command.first().map_or(true, |program| program.is_empty()) {
            return Err(ConfigError::InvalidValue(format!(
                "{what} command cannot be empty"
            )));
        }
        Ok(())
    }
}

/// One tracked upstream package.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PackageConfig {
    /// Package name as published (e.g. "@react-navigation/stack")
    pub name: String,

    /// Package location (default: "node_modules/<name>")
    #[serde(default)]
    pub source: Option<String>,

    /// Declaration destination (default: "<types_dir>/<name>")
    #[serde(default)]
    pub dest: Option<String>,

    /// Subdirectories of the destination removed after generation
    #[serde(default)]
    pub prune: Vec<String>,

    /// Synthesize an index re-export file when the generator emits none
    #[serde(default)]
    pub index: Option<bool>,
}

impl PackageConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::InvalidValue(
                "package name cannot be empty".to_string(),
            ));
        }
        validate_relative(&format!("package '{}' name", self.name), &self.name)?;
        if let Some(source) = &self.source {
            validate_relative(&format!("package '{}' source", self.name), source)?;
        }
        if let Some(dest) = &self.dest {
            validate_relative(&format!("package '{}' dest", self.name), dest)?;
        }
        for sub in &self.prune {
            validate_relative(&format!("package '{}' prune entry", self.name), sub)?;
        }
        Ok(())
    }
}

/// Reject empty, absolute, and `..`-escaping paths.
fn validate_relative(what: &str, path: &str) -> Result<(), ConfigError> {
    let escapes = path.split('/').any(|component| component == "..");
    if path.trim_matches('/').is_empty() || path.starts_with('/') || escapes {
        return Err(ConfigError::InvalidValue(format!(
            "{what} must be a relative path inside the repository, got '{path}'"
        )));
    }
    Ok(())
}
