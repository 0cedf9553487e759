//! patch::parse
//!
//! Parser for `git format-patch` mail files and plain unified diffs.
//!
//! # Format
//!
//! A patch file is an optional mail header (`From`, `Date`, `Subject`),
//! the commit message, an optional diffstat, and one or more file diffs:
//!
//! ```text
//! Subject: [PATCH] fix foo
//!
//! ---
//!  types/demo-pkg/foo.js.flow | 2 +-
//!
//! diff --git types/demo-pkg/foo.js.flow types/demo-pkg/foo.js.flow
//! --- types/demo-pkg/foo.js.flow
//! +++ types/demo-pkg/foo.js.flow
//! @@ -1,3 +1,3 @@
//!  line
//! -old
//! +new
//!  line
//! ```
//!
//! Paths are taken verbatim: the store uses the zero-prefix convention, so
//! no leading component is stripped.

use thiserror::Error;

/// Errors from patch parsing.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct ParseError {
    /// 1-based line number in the patch text
    pub line: usize,
    /// What was wrong
    pub message: String,
}

impl ParseError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// One line of a hunk body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HunkLine {
    /// Present on both sides (` ` prefix)
    Context(String),
    /// Only on the old side (`-` prefix)
    Removed(String),
    /// Only on the new side (`+` prefix)
    Added(String),
}

/// A single `@@` hunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    /// 1-based start line on the old side (0 for an empty old side)
    pub old_start: usize,
    /// Number of old-side lines
    pub old_len: usize,
    /// 1-based start line on the new side (0 for an empty new side)
    pub new_start: usize,
    /// Number of new-side lines
    pub new_len: usize,
    /// Body lines in order
    pub lines: Vec<HunkLine>,
    /// The last old-side line has no trailing newline
    pub old_missing_newline: bool,
    /// The last new-side line has no trailing newline
    pub new_missing_newline: bool,
}

impl Hunk {
    /// Lines the file must contain before the hunk applies.
    pub fn old_lines(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter_map(|line| match line {
                HunkLine::Context(s) | HunkLine::Removed(s) => Some(s.as_str()),
                HunkLine::Added(_) => None,
            })
            .collect()
    }

    /// Lines the file contains after the hunk applies.
    pub fn new_lines(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter_map(|line| match line {
                HunkLine::Context(s) | HunkLine::Added(s) => Some(s.as_str()),
                HunkLine::Removed(_) => None,
            })
            .collect()
    }

    /// The same hunk with old and new sides swapped.
    pub fn reversed(&self) -> Hunk {
        Hunk {
            old_start: self.new_start,
            old_len: self.new_len,
            new_start: self.old_start,
            new_len: self.old_len,
            lines: self
                .lines
                .iter()
                .map(|line| match line {
                    HunkLine::Context(s) => HunkLine::Context(s.clone()),
                    HunkLine::Removed(s) => HunkLine::Added(s.clone()),
                    HunkLine::Added(s) => HunkLine::Removed(s.clone()),
                })
                .collect(),
            old_missing_newline: self.new_missing_newline,
            new_missing_newline: self.old_missing_newline,
        }
    }
}

/// The changes a patch makes to one file.
///
/// `old_path` is `None` when the file is created, `new_path` is `None`
/// when it is deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePatch {
    /// Path before the change
    pub old_path: Option<String>,
    /// Path after the change
    pub new_path: Option<String>,
    /// Hunks in file order
    pub hunks: Vec<Hunk>,
}

impl FilePatch {
    /// The path this diff is about, for diagnostics.
    pub fn display_path(&self) -> &str {
        self.new_path
            .as_deref()
            .or(self.old_path.as_deref())
            .unwrap_or("<unknown>")
    }

    /// The same file diff with old and new sides swapped.
    pub fn reversed(&self) -> FilePatch {
        FilePatch {
            old_path: self.new_path.clone(),
            new_path: self.old_path.clone(),
            hunks: self.hunks.iter().map(Hunk::reversed).collect(),
        }
    }
}

/// A parsed patch file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchSet {
    /// Commit subject, `[PATCH ...]` tag removed
    pub subject: Option<String>,
    /// Per-file diffs in the order they appear
    pub files: Vec<FilePatch>,
}

impl PatchSet {
    /// Parse patch text.
    ///
    /// # Example
    ///
    /// ```
    /// use typestack::patch::PatchSet;
    ///
    /// let text = "Subject: [PATCH] fix foo\n\n---\n\
    ///     --- types/a.js.flow\n+++ types/a.js.flow\n@@ -1 +1 @@\n-old\n+new\n";
    /// let set = PatchSet::parse(text).unwrap();
    /// assert_eq!(set.subject.as_deref(), Some("fix foo"));
    /// assert_eq!(set.files[0].display_path(), "types/a.js.flow");
    /// ```
    pub fn parse(text: &str) -> Result<PatchSet, ParseError> {
        Parser::new(text).parse()
    }
}

/// Marker git writes after a line with no trailing newline.
const NO_NEWLINE_MARKER: char = '\\';

struct Parser<'a> {
    lines: Vec<&'a str>,
    pos: usize,
}

/// File-level facts collected from a `diff --git` extended header.
#[derive(Default)]
struct GitHeader {
    path: Option<String>,
    new_file: bool,
    deleted_file: bool,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        let mut lines: Vec<&str> = text.split('\n').collect();
        if lines.last() == Some(&"") {
            lines.pop();
        }
        Self { lines, pos: 0 }
    }

    fn parse(mut self) -> Result<PatchSet, ParseError> {
        let subject = self.parse_subject();
        let mut files = Vec::new();
        let mut header: Option<GitHeader> = None;

        while let Some(line) = self.peek() {
            if let Some(rest) = line.strip_prefix("diff --git ") {
                flush_header(&mut header, &mut files);
                header = Some(GitHeader {
                    path: split_git_paths(rest),
                    ..Default::default()
                });
                self.pos += 1;
            } else if line.starts_with("--- ") && self.peek_at(1).is_some_and(|l| l.starts_with("+++ ")) {
                header = None;
                files.push(self.parse_file()?);
            } else {
                if let Some(h) = header.as_mut() {
                    if line.starts_with("new file mode") {
                        h.new_file = true;
                    } else if line.starts_with("deleted file mode") {
                        h.deleted_file = true;
                    } else if line.starts_with("rename from") || line.starts_with("copy from") {
                        return Err(ParseError::new(
                            self.pos + 1,
                            "renames and copies are not supported; write patches with --no-renames",
                        ));
                    } else if line.starts_with("GIT binary patch") || line.starts_with("Binary files") {
                        return Err(ParseError::new(self.pos + 1, "binary patches are not supported"));
                    }
                }
                self.pos += 1;
            }
        }
        flush_header(&mut header, &mut files);

        Ok(PatchSet { subject, files })
    }

    fn peek(&self) -> Option<&'a str> {
        self.lines.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<&'a str> {
        self.lines.get(self.pos + ahead).copied()
    }

    /// Read `Subject:` from the mail header, if the text starts with one.
    ///
    /// Does not consume input; the header block is skipped by the main loop.
    fn parse_subject(&self) -> Option<String> {
        let mut subject: Option<String> = None;
        for line in &self.lines {
            if line.is_empty() || line.starts_with("diff --git ") || line.starts_with("--- ") {
                break;
            }
            if let Some(rest) = line.strip_prefix("Subject: ") {
                subject = Some(rest.trim().to_string());
            } else if line.starts_with([' ', '\t']) {
                if let Some(s) = subject.as_mut() {
                    s.push(' ');
                    s.push_str(line.trim());
                }
            } else if subject.is_some() {
                break;
            }
        }
        subject.map(|s| strip_patch_tag(&s).to_string())
    }

    fn parse_file(&mut self) -> Result<FilePatch, ParseError> {
        let old_path = header_path(self.lines[self.pos], "--- ");
        let new_path = header_path(self.lines[self.pos + 1], "+++ ");
        self.pos += 2;

        if old_path.is_none() && new_path.is_none() {
            return Err(ParseError::new(self.pos - 1, "both sides of the diff are /dev/null"));
        }

        let mut hunks = Vec::new();
        while let Some(line) = self.peek() {
            if !line.starts_with("@@ ") {
                break;
            }
            hunks.push(self.parse_hunk()?);
        }

        Ok(FilePatch {
            old_path,
            new_path,
            hunks,
        })
    }

    fn parse_hunk(&mut self) -> Result<Hunk, ParseError> {
        let header_line = self.pos + 1;
        let (old_start, old_len, new_start, new_len) = parse_hunk_header(self.lines[self.pos])
            .ok_or_else(|| ParseError::new(header_line, "malformed hunk header"))?;
        self.pos += 1;

        let mut hunk = Hunk {
            old_start,
            old_len,
            new_start,
            new_len,
            lines: Vec::new(),
            old_missing_newline: false,
            new_missing_newline: false,
        };

        let (mut old_seen, mut new_seen) = (0, 0);
        while old_seen < old_len || new_seen < new_len {
            let Some(line) = self.peek() else {
                return Err(ParseError::new(header_line, "hunk is truncated"));
            };
            let body = line.get(1..).unwrap_or("").to_string();
            match line.chars().next() {
                Some(' ') | None => {
                    hunk.lines.push(HunkLine::Context(body));
                    old_seen += 1;
                    new_seen += 1;
                }
                Some('-') => {
                    hunk.lines.push(HunkLine::Removed(body));
                    old_seen += 1;
                }
                Some('+') => {
                    hunk.lines.push(HunkLine::Added(body));
                    new_seen += 1;
                }
                Some(NO_NEWLINE_MARKER) => self.mark_missing_newline(&mut hunk),
                Some(_) => {
                    return Err(ParseError::new(
                        self.pos + 1,
                        format!("unexpected line in hunk: {line:?}"),
                    ))
                }
            }
            self.pos += 1;
            if old_seen > old_len || new_seen > new_len {
                return Err(ParseError::new(header_line, "hunk is longer than its header says"));
            }
        }

        if self.peek().is_some_and(|l| l.starts_with(NO_NEWLINE_MARKER)) {
            self.mark_missing_newline(&mut hunk);
            self.pos += 1;
        }

        Ok(hunk)
    }

    /// Attach a `\ No newline at end of file` marker to the preceding line.
    fn mark_missing_newline(&self, hunk: &mut Hunk) {
        match hunk.lines.last() {
            Some(HunkLine::Removed(_)) => hunk.old_missing_newline = true,
            Some(HunkLine::Added(_)) => hunk.new_missing_newline = true,
            Some(HunkLine::Context(_)) => {
                hunk.old_missing_newline = true;
                hunk.new_missing_newline = true;
            }
            None => {}
        }
    }
}

/// Emit a file entry for a `diff --git` header that had no `---`/`+++`
/// lines (creation or deletion of an empty file).
fn flush_header(header: &mut Option<GitHeader>, files: &mut Vec<FilePatch>) {
    let Some(h) = header.take() else {
        return;
    };
    let Some(path) = h.path else {
        return;
    };
    if h.new_file {
        files.push(FilePatch {
            old_path: None,
            new_path: Some(path),
            hunks: Vec::new(),
        });
    } else if h.deleted_file {
        files.push(FilePatch {
            old_path: Some(path),
            new_path: None,
            hunks: Vec::new(),
        });
    }
}

/// Recover the path from `diff --git <old> <new>` when both sides agree.
fn split_git_paths(rest: &str) -> Option<String> {
    if rest.starts_with('"') {
        let (old, tail) = parse_quoted(rest)?;
        let tail = tail.strip_prefix(' ')?;
        let new = if tail.starts_with('"') {
            let (new, tail) = parse_quoted(tail)?;
            tail.is_empty().then_some(new)?
        } else {
            tail.to_string()
        };
        return (old == new).then_some(old);
    }
    let half = rest.len().checked_sub(1)? / 2;
    let (old, new) = (rest.get(..half)?, rest.get(half + 1..)?);
    (rest.as_bytes().get(half) == Some(&b' ') && old == new).then(|| old.to_string())
}

/// Path from a `---`/`+++` line; `None` for `/dev/null`.
fn header_path(line: &str, prefix: &str) -> Option<String> {
    let rest = line.strip_prefix(prefix)?;
    if rest.starts_with('"') {
        return parse_quoted(rest).map(|(path, _)| path);
    }
    let path = rest.split('\t').next().unwrap_or(rest).trim_end();
    (path != "/dev/null").then(|| path.to_string())
}

/// Decode a C-quoted path as git writes it for non-ASCII bytes, quotes,
/// backslashes and control characters. Returns the path and the text after
/// the closing quote.
fn parse_quoted(text: &str) -> Option<(String, &str)> {
    let body = text.strip_prefix('"')?;
    let bytes = body.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                let path = String::from_utf8(out).ok()?;
                return Some((path, &body[i + 1..]));
            }
            b'\\' => {
                let escaped = *bytes.get(i + 1)?;
                i += 2;
                let byte = match escaped {
                    b'a' => 0x07,
                    b'b' => 0x08,
                    b't' => b'\t',
                    b'n' => b'\n',
                    b'v' => 0x0b,
                    b'f' => 0x0c,
                    b'r' => b'\r',
                    b'"' => b'"',
                    b'\\' => b'\\',
                    b'0'..=b'3' => {
                        let digits = bytes.get(i - 1..i + 2)?;
                        if !digits.iter().all(|d| (b'0'..=b'7').contains(d)) {
                            return None;
                        }
                        i += 2;
                        digits.iter().fold(0u8, |acc, d| (acc << 3) | (d - b'0'))
                    }
                    _ => return None,
                };
                out.push(byte);
            }
            byte => {
                out.push(byte);
                i += 1;
            }
        }
    }
    None
}

/// Parse `@@ -a[,b] +c[,d] @@ ...`.
fn parse_hunk_header(line: &str) -> Option<(usize, usize, usize, usize)> {
    let rest = line.strip_prefix("@@ -")?;
    let (ranges, _) = rest.split_once(" @@")?;
    let (old, new) = ranges.split_once(" +")?;
    let (old_start, old_len) = parse_range(old)?;
    let (new_start, new_len) = parse_range(new)?;
    Some((old_start, old_len, new_start, new_len))
}

fn parse_range(range: &str) -> Option<(usize, usize)> {
    match range.split_once(',') {
        Some((start, len)) => Some((start.parse().ok()?, len.parse().ok()?)),
        None => Some((range.parse().ok()?, 1)),
    }
}

/// Remove a leading `[PATCH]` / `[PATCH 2/5]` style tag.
fn strip_patch_tag(subject: &str) -> &str {
    if subject.starts_with("[PATCH") {
        if let Some((_, rest)) = subject.split_once(']') {
            return rest.trim_start();
        }
    }
    subject
}
