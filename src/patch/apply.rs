//! patch::apply
//!
//! Zero-fuzz patch application against the working tree.
//!
//! Every hunk's old side (context plus removed lines) must match the file
//! exactly. A hunk may land at an offset from its recorded line when lines
//! were added or removed above it; the nearest exact match wins, and a hunk
//! never matches before the end of the previous one.
//!
//! A patch is applied all-or-nothing: every file it touches is computed in
//! memory and nothing is written unless all hunks matched.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use super::parse::{FilePatch, Hunk, PatchSet};
use super::store::PatchFile;
use super::PatchError;

/// Which way to apply a patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Old side to new side
    Forward,
    /// New side to old side (`patch -R`)
    Reverse,
}

/// File content as lines plus end-of-file newline state.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Text {
    lines: Vec<String>,
    trailing_newline: bool,
}

impl Text {
    fn parse(content: &str) -> Self {
        if content.is_empty() {
            return Self {
                lines: Vec::new(),
                trailing_newline: false,
            };
        }
        let trailing_newline = content.ends_with('\n');
        let body = content.strip_suffix('\n').unwrap_or(content);
        Self {
            lines: body.split('\n').map(str::to_string).collect(),
            trailing_newline,
        }
    }

    fn render(&self) -> String {
        let mut out = self.lines.join("\n");
        if self.trailing_newline && !self.lines.is_empty() {
            out.push('\n');
        }
        out
    }
}

/// Apply one file diff (already oriented) to optional original content.
///
/// Returns the new content, or `None` when the file is deleted.
fn apply_file(original: Option<&str>, file: &FilePatch) -> Result<Option<String>, String> {
    match (&file.old_path, &file.new_path) {
        (None, _) => {
            if original.is_some_and(|content| !content.is_empty()) {
                return Err("file to be created already exists".to_string());
            }
            let mut text = Text::parse("");
            apply_hunks(&mut text, &file.hunks)?;
            Ok(Some(text.render()))
        }
        (Some(_), None) => {
            let content = original.ok_or("file to be deleted does not exist")?;
            let mut text = Text::parse(content);
            apply_hunks(&mut text, &file.hunks)?;
            if !text.lines.is_empty() {
                return Err("file to be deleted has content the patch does not remove".to_string());
            }
            Ok(None)
        }
        (Some(_), Some(_)) => {
            let content = original.ok_or("file does not exist")?;
            let mut text = Text::parse(content);
            apply_hunks(&mut text, &file.hunks)?;
            Ok(Some(text.render()))
        }
    }
}

fn apply_hunks(text: &mut Text, hunks: &[Hunk]) -> Result<(), String> {
    let mut shift: isize = 0;
    let mut floor = 0usize;

    for (n, hunk) in hunks.iter().enumerate() {
        let old = hunk.old_lines();
        let new = hunk.new_lines();

        let recorded = if old.is_empty() {
            hunk.old_start
        } else {
            hunk.old_start.saturating_sub(1)
        };
        let expected = usize::try_from(recorded as isize + shift).unwrap_or(0);

        let pos = find_hunk(text, hunk, &old, expected, floor).ok_or_else(|| {
            format!(
                "hunk #{} at line {} does not match",
                n + 1,
                hunk.old_start
            )
        })?;

        let at_eof = pos + old.len() == text.lines.len();
        text.lines
            .splice(pos..pos + old.len(), new.iter().map(|s| s.to_string()));
        if at_eof {
            text.trailing_newline = if new.is_empty() {
                !text.lines.is_empty()
            } else {
                !hunk.new_missing_newline
            };
        }

        shift = pos as isize - recorded as isize + new.len() as isize - old.len() as isize;
        floor = pos + new.len();
    }

    Ok(())
}

/// Nearest position at or after `floor` where the hunk's old side matches.
fn find_hunk(text: &Text, hunk: &Hunk, old: &[&str], expected: usize, floor: usize) -> Option<usize> {
    let max_pos = text.lines.len().checked_sub(old.len())?;
    if floor > max_pos {
        return None;
    }

    let matches_at = |pos: usize| {
        let window = &text.lines[pos..pos + old.len()];
        if window.iter().zip(old).any(|(have, want)| have != want) {
            return false;
        }
        if old.is_empty() {
            return true;
        }
        let at_eof = pos + old.len() == text.lines.len();
        if at_eof {
            text.trailing_newline != hunk.old_missing_newline
        } else {
            !hunk.old_missing_newline
        }
    };

    let start = expected.clamp(floor, max_pos);
    if old.is_empty() {
        return Some(start);
    }

    for distance in 0..=(max_pos - floor) {
        let after = start + distance;
        if after <= max_pos && matches_at(after) {
            return Some(after);
        }
        if distance > 0 && start >= floor + distance && matches_at(start - distance) {
            return Some(start - distance);
        }
        if after > max_pos && start < floor + distance {
            break;
        }
    }
    None
}

fn read_optional(path: &Path) -> Result<Option<String>, PatchError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(PatchError::Read {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

fn write_result(root: &Path, rel: &str, content: Option<&str>) -> Result<(), PatchError> {
    let path = root.join(rel);
    let write_err = |source| PatchError::Write {
        path: path.clone(),
        source,
    };

    match content {
        Some(content) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(write_err)?;
            }
            fs::write(&path, content).map_err(write_err)
        }
        None => {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(write_err(e)),
            }
            // Drop directories the deletion left empty.
            let mut dir = path.parent();
            while let Some(d) = dir {
                if d == root || fs::remove_dir(d).is_err() {
                    break;
                }
                dir = d.parent();
            }
            Ok(())
        }
    }
}

/// Apply one parsed patch under `root`.
///
/// `name` identifies the patch in errors. Returns the repo-relative paths
/// that were written or deleted.
pub fn apply_set(
    root: &Path,
    name: &str,
    set: &PatchSet,
    direction: Direction,
) -> Result<Vec<String>, PatchError> {
    let files: Vec<FilePatch> = match direction {
        Direction::Forward => set.files.clone(),
        Direction::Reverse => set.files.iter().rev().map(FilePatch::reversed).collect(),
    };

    let mut results: BTreeMap<String, Option<String>> = BTreeMap::new();
    for file in &files {
        let source = file.old_path.as_deref().or(file.new_path.as_deref());
        let Some(source) = source else {
            continue;
        };

        let original = match results.get(source) {
            Some(pending) => pending.clone(),
            None => read_optional(&root.join(source))?,
        };

        let updated = apply_file(original.as_deref(), file).map_err(|reason| {
            PatchError::ApplyFailed {
                patch: name.to_string(),
                file: file.display_path().to_string(),
                reason,
            }
        })?;

        match (file.old_path.as_deref(), file.new_path.as_deref()) {
            (Some(old), Some(new)) if old != new => {
                results.insert(old.to_string(), None);
                results.insert(new.to_string(), updated);
            }
            (_, Some(new)) => {
                results.insert(new.to_string(), updated);
            }
            (Some(old), None) => {
                results.insert(old.to_string(), None);
            }
            (None, None) => {}
        }
    }

    for (path, content) in &results {
        write_result(root, path, content.as_deref())?;
    }

    Ok(results.into_keys().collect())
}

/// Apply patch files in store order, or reverse-apply them in reverse
/// order, stopping at the first failure.
///
/// Patches before the failing one stay applied; the failing one is not
/// applied at all. Returns the names of the patches applied.
pub fn apply_all(
    root: &Path,
    patches: &[PatchFile],
    direction: Direction,
) -> Result<Vec<String>, PatchError> {
    let ordered: Vec<&PatchFile> = match direction {
        Direction::Forward => patches.iter().collect(),
        Direction::Reverse => patches.iter().rev().collect(),
    };

    let mut applied = Vec::with_capacity(ordered.len());
    for patch in ordered {
        let set = patch.load()?;
        apply_set(root, &patch.name, &set, direction)?;
        applied.push(patch.name.clone());
    }
    Ok(applied)
}
