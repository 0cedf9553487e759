//! core::paths
//!
//! Centralized path routing for the generated-declarations tree.
//!
//! # Layout
//!
//! Relative to the repository working directory (defaults shown):
//! - `types/` - generated declarations, one subtree per tracked package
//! - `types/**/*.js.flow` - generated (and patched) declaration files
//! - `types/patches/*.patch` - the patch store
//!
//! **Hard rule:** no code outside this module decides whether a path is a
//! generated declaration or a patch file. Classification goes through
//! [`Layout`] and the [`PathFilter`]s it hands out.
//!
//! Repository-relative paths are always `/`-separated strings, the form
//! git reports them in.
//!
//! # Example
//!
//! ```
//! use typestack::core::paths::Layout;
//! use std::path::PathBuf;
//!
//! let layout = Layout::new(PathBuf::from("/repo"), "types", "types/patches", "js.flow");
//!
//! assert!(layout.is_generated("types/demo-pkg/foo.js.flow"));
//! assert!(!layout.is_generated("src/foo.js"));
//! assert!(layout.is_patch("types/patches/0001-fix-foo.patch"));
//! assert_eq!(layout.patches_path(), PathBuf::from("/repo/types/patches"));
//! ```

use std::path::{Path, PathBuf};

/// A set of `(directory prefix, file suffix)` rules over repo-relative paths.
///
/// A path matches when it lies under one rule's directory and ends with
/// that rule's suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathFilter {
    rules: Vec<(String, String)>,
}

impl PathFilter {
    fn rule(dir: &str, suffix: &str) -> Self {
        Self {
            rules: vec![(normalize_dir(dir), suffix.to_string())],
        }
    }

    /// Combine two filters; the result matches what either matches.
    pub fn union(mut self, other: PathFilter) -> Self {
        self.rules.extend(other.rules);
        self
    }

    /// Check whether a repo-relative path matches.
    pub fn matches(&self, path: &str) -> bool {
        let path = path.trim_start_matches("./");
        self.rules
            .iter()
            .any(|(dir, suffix)| path.starts_with(dir.as_str()) && path.ends_with(suffix.as_str()))
    }
}

/// Strip leading `./` and surrounding slashes, then add one trailing slash.
fn normalize_dir(dir: &str) -> String {
    let trimmed = dir.trim_start_matches("./").trim_matches('/');
    format!("{trimmed}/")
}

/// Paths of the generated-declarations tree inside one working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    work_dir: PathBuf,
    types_dir: String,
    patches_dir: String,
    extension: String,
}

impl Layout {
    /// Create a layout. Directories are repo-relative; `extension` has no
    /// leading dot (e.g. `js.flow`).
    pub fn new(
        work_dir: PathBuf,
        types_dir: &str,
        patches_dir: &str,
        extension: &str,
    ) -> Self {
        Self {
            work_dir,
            types_dir: normalize_dir(types_dir).trim_end_matches('/').to_string(),
            patches_dir: normalize_dir(patches_dir).trim_end_matches('/').to_string(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    /// The repository working directory.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Repo-relative types directory (no trailing slash).
    pub fn types_dir(&self) -> &str {
        &self.types_dir
    }

    /// Declaration file extension, without a leading dot.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// `.<extension>`, the suffix of every generated declaration file.
    pub fn declaration_suffix(&self) -> String {
        format!(".{}", self.extension)
    }

    /// Absolute path of the patch store directory.
    pub fn patches_path(&self) -> PathBuf {
        self.work_dir.join(&self.patches_dir)
    }

    /// Resolve a repo-relative path against the working directory.
    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.work_dir.join(relative)
    }

    /// Filter matching generated declaration files.
    pub fn generated_filter(&self) -> PathFilter {
        PathFilter::rule(&self.types_dir, &self.declaration_suffix())
    }

    /// Filter matching patch files of the store.
    pub fn patch_filter(&self) -> PathFilter {
        PathFilter::rule(&self.patches_dir, ".patch")
    }

    /// Filter matching everything under the types directory.
    pub fn types_filter(&self) -> PathFilter {
        PathFilter::rule(&self.types_dir, "")
    }

    /// Generated declarations plus patch files: what `pack` stages.
    pub fn outputs_filter(&self) -> PathFilter {
        self.generated_filter().union(self.patch_filter())
    }

    /// Check if a repo-relative path is a generated declaration file.
    pub fn is_generated(&self, path: &str) -> bool {
        self.generated_filter().matches(path)
    }

    /// Check if a repo-relative path is a patch file.
    pub fn is_patch(&self, path: &str) -> bool {
        self.patch_filter().matches(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> Layout {
        Layout::new(PathBuf::from("/repo"), "./types/", "types/patches", ".js.flow")
    }

    #[test]
    fn normalizes_inputs() {
        let layout = layout();
        assert_eq!(layout.types_dir(), "types");
        assert_eq!(layout.extension(), "js.flow");
        assert_eq!(layout.declaration_suffix(), ".js.flow");
    }

    #[test]
    fn generated_requires_dir_and_suffix() {
        let layout = layout();
        assert!(layout.is_generated("types/a/b/c.js.flow"));
        assert!(!layout.is_generated("types/a/b/c.js"));
        assert!(!layout.is_generated("typesx/c.js.flow"));
        assert!(!layout.is_generated("src/types/c.js.flow"));
    }

    #[test]
    fn patch_filter_is_store_only() {
        let layout = layout();
        assert!(layout.is_patch("types/patches/0001-x.patch"));
        assert!(!layout.is_patch("types/other/0001-x.patch"));
        assert!(!layout.is_patch("types/patches/README.md"));
    }

    #[test]
    fn outputs_is_union() {
        let filter = layout().outputs_filter();
        assert!(filter.matches("types/patches/0001-x.patch"));
        assert!(filter.matches("types/pkg/index.js.flow"));
        assert!(!filter.matches("package.json"));
    }

    #[test]
    fn resolve_joins_work_dir() {
        assert_eq!(
            layout().resolve("types/pkg/index.js.flow"),
            PathBuf::from("/repo/types/pkg/index.js.flow")
        );
    }
}
