//! core::naming
//!
//! Patch file naming rules.
//!
//! Patch files are named `NNNN-<sanitized subject>.patch`, the same scheme
//! `git format-patch` uses, so that a store written by git and one written
//! by the in-memory repository used in tests agree on identities.

/// Maximum length of a patch file name, suffix included.
pub const MAX_FILE_NAME_LEN: usize = 64;

/// Extension of patch files in the store.
pub const PATCH_SUFFIX: &str = ".patch";

/// Sanitize a commit subject into a file name fragment.
///
/// Runs of characters other than ASCII alphanumerics, `.` and `_` collapse
/// into a single `-`; repeated dots collapse; leading separators are dropped
/// and trailing `.`/`-` are trimmed.
///
/// # Example
///
/// ```
/// use typestack::core::naming::sanitize_subject;
///
/// assert_eq!(sanitize_subject("Fix foo: widen type"), "Fix-foo-widen-type");
/// assert_eq!(sanitize_subject("types: v1..v2 ..."), "types-v1.v2");
/// ```
pub fn sanitize_subject(subject: &str) -> String {
    let mut out = String::with_capacity(subject.len());
    let mut pending_separator = false;
    let mut last_was_dot = false;

    for c in subject.chars() {
        if c.is_ascii_alphanumeric() || c == '.' || c == '_' {
            if c == '.' && last_was_dot {
                continue;
            }
            if pending_separator && !out.is_empty() {
                out.push('-');
            }
            pending_separator = false;
            last_was_dot = c == '.';
            out.push(c);
        } else {
            pending_separator = true;
            last_was_dot = false;
        }
    }

    let trimmed = out.trim_end_matches(['.', '-']).len();
    out.truncate(trimmed);
    out
}

/// File name for the patch at 1-based position `seq` with the given subject.
///
/// # Example
///
/// ```
/// use typestack::core::naming::patch_file_name;
///
/// assert_eq!(patch_file_name(1, "fix foo"), "0001-fix-foo.patch");
/// ```
pub fn patch_file_name(seq: usize, subject: &str) -> String {
    let mut stem = format!("{seq:04}-{}", sanitize_subject(subject));
    let max_stem = MAX_FILE_NAME_LEN - PATCH_SUFFIX.len();
    if stem.len() > max_stem {
        stem.truncate(max_stem);
    }
    format!("{stem}{PATCH_SUFFIX}")
}
