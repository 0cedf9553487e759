//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`BranchName`] - Validated Git branch name
//! - [`Oid`] - Git object identifier (SHA)
//! - [`BranchPair`] - The `<name>-base` / `<name>` editing branches
//! - [`CommitRange`] - A `base..tip` range used to rewrite the patch store
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, preventing entire classes of bugs.
//!
//! # Examples
//!
//! ```
//! use typestack::core::types::{BranchName, BranchPair, Oid};
//!
//! let branch = BranchName::new("tsflower").unwrap();
//! let pair = BranchPair::for_name(&branch).unwrap();
//! assert_eq!(pair.base.as_str(), "tsflower-base");
//!
//! assert!(BranchName::new("invalid..name").is_err());
//! assert!(Oid::new("not-a-sha").is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid object id: {0}")]
    InvalidOid(String),

    #[error("invalid commit range: {0}")]
    InvalidRange(String),
}

/// A validated Git branch name.
///
/// Branch names must conform to Git's refname rules (see `git check-ref-format`):
/// - Cannot be empty or exactly `@`
/// - Cannot start with `.` or `-`
/// - Cannot end with `.lock` or `/`
/// - Cannot contain `..`, `@{`, `//`, or ASCII control characters
/// - Cannot contain spaces, `~`, `^`, `:`, `\`, `?`, `*`, `[`
///
/// # Example
///
/// ```
/// use typestack::core::types::BranchName;
///
/// let name = BranchName::new("tsflower").unwrap();
/// assert_eq!(name.as_str(), "tsflower");
///
/// assert!(BranchName::new("").is_err());
/// assert!(BranchName::new("branch.lock").is_err());
/// assert!(BranchName::new("has space").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchName` if the name violates Git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        let reject = |why: &str| Err(TypeError::InvalidBranchName(format!("'{name}' {why}")));

        if name.is_empty() {
            return reject("is empty");
        }
        if name == "@" {
            return reject("is reserved");
        }
        if name.starts_with('-') {
            return reject("starts with '-'");
        }
        if name.ends_with('/') {
            return reject("ends with '/'");
        }
        for forbidden in ["..", "@{", "//"] {
            if name.contains(forbidden) {
                return reject(&format!("contains '{forbidden}'"));
            }
        }
        const INVALID_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];
        if let Some(c) = name
            .chars()
            .find(|c| INVALID_CHARS.contains(c) || c.is_ascii_control())
        {
            return reject(&format!("contains {c:?}"));
        }
        for component in name.split('/').filter(|c| !c.is_empty()) {
            if component.starts_with('.') {
                return reject("has a component starting with '.'");
            }
            if component.ends_with(".lock") {
                return reject("has a component ending with '.lock'");
            }
        }
        Ok(())
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Full ref name (`refs/heads/<name>`).
    pub fn refname(&self) -> String {
        format!("refs/heads/{}", self.0)
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A Git object identifier (SHA-1 or SHA-256), normalized to lowercase.
///
/// # Example
///
/// ```
/// use typestack::core::types::Oid;
///
/// let oid = Oid::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
/// assert_eq!(oid.as_str(), "abc123def4567890abc123def4567890abc12345");
/// assert_eq!(oid.short(7), "abc123d");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// Create a new validated object id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidOid` if the string is not a 40 or 64 character hex id.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().to_ascii_lowercase();
        if oid.len() != 40 && oid.len() != 64 {
            return Err(TypeError::InvalidOid(format!(
                "expected 40 or 64 hex characters, got {}",
                oid.len()
            )));
        }
        if !oid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid(
                "object id must be hexadecimal".into(),
            ));
        }
        Ok(Self(oid))
    }

    /// Abbreviated form: the first `len` characters.
    pub fn short(&self, len: usize) -> &str {
        &self.0[..len.min(self.0.len())]
    }

    /// Get the object id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The two branches materialized by `unpack`.
///
/// `patch` carries one commit per patch and tracks `base`; `base` carries
/// the patches-reverted state (plus the regenerated tree) and tracks the
/// branch that was checked out when unpacking started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchPair {
    /// The branch holding one commit per patch (`<name>`).
    pub patch: BranchName,
    /// The branch holding the unpatched tree (`<name>-base`).
    pub base: BranchName,
}

impl BranchPair {
    /// Suffix appended to the patch branch name to form the base branch.
    pub const BASE_SUFFIX: &'static str = "-base";

    /// Build the pair for a patch branch name.
    pub fn for_name(name: &BranchName) -> Result<Self, TypeError> {
        Ok(Self {
            patch: name.clone(),
            base: BranchName::new(format!("{}{}", name, Self::BASE_SUFFIX))?,
        })
    }

    /// Both branches, base first.
    pub fn branches(&self) -> [&BranchName; 2] {
        [&self.base, &self.patch]
    }
}

/// A `base..tip` commit range.
///
/// # Example
///
/// ```
/// use typestack::core::types::CommitRange;
///
/// let range: CommitRange = "upstream..tsflower".parse().unwrap();
/// assert_eq!(range.base, "upstream");
/// assert_eq!(range.tip, "tsflower");
/// assert!("tsflower".parse::<CommitRange>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRange {
    /// Exclusive lower bound (any revision git understands).
    pub base: String,
    /// Inclusive upper bound.
    pub tip: String,
}

impl CommitRange {
    /// Create a range from two revisions.
    pub fn new(base: impl Into<String>, tip: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            tip: tip.into(),
        }
    }
}

impl std::str::FromStr for CommitRange {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once("..") {
            Some((base, tip))
                if !base.is_empty() && !tip.is_empty() && !tip.starts_with('.') =>
            {
                Ok(Self::new(base, tip))
            }
            _ => Err(TypeError::InvalidRange(format!(
                "'{s}' is not of the form <base>..<tip>"
            ))),
        }
    }
}

impl std::fmt::Display for CommitRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.base, self.tip)
    }
}
