//! generate::tool
//!
//! Running the configured generator and formatter commands.
//!
//! Commands are argv vectors. The tool inherits stdout/stderr so its own
//! diagnostics reach the user, and its exit status decides success. There
//! is no retry and no timeout.

use std::path::Path;
use std::process::Command;

use super::GenerateError;

/// Placeholder replaced by the package source directory.
pub const SOURCE_PLACEHOLDER: &str = "{source}";
/// Placeholder replaced by the package destination directory.
pub const DEST_PLACEHOLDER: &str = "{dest}";

/// An external command, with the role it plays for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    role: &'static str,
    argv: Vec<String>,
}

impl ToolCommand {
    /// Wrap an argv. Fails on an empty argv.
    pub fn new(role: &'static str, argv: Vec<String>) -> Result<Self, GenerateError> {
        if argv.first().map_or(true, |program| program.is_empty()) {
            return Err(GenerateError::EmptyCommand { role });
        }
        Ok(Self { role, argv })
    }

    /// Program name (first argv element).
    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    /// Arguments for a generator run: placeholders substituted, or source
    /// and dest appended when the argv names neither.
    pub fn generator_args(&self, source: &Path, dest: &Path) -> Vec<String> {
        let source = source.to_string_lossy();
        let dest = dest.to_string_lossy();

        let mentions = self.argv[1..]
            .iter()
            .any(|arg| arg.contains(SOURCE_PLACEHOLDER) || arg.contains(DEST_PLACEHOLDER));

        let mut args: Vec<String> = self.argv[1..]
            .iter()
            .map(|arg| {
                arg.replace(SOURCE_PLACEHOLDER, &source)
                    .replace(DEST_PLACEHOLDER, &dest)
            })
            .collect();
        if !mentions {
            args.push(source.into_owned());
            args.push(dest.into_owned());
        }
        args
    }

    /// Run the program with exactly `args` in `cwd`. `subject` names what
    /// the run is for.
    pub fn run(&self, cwd: &Path, args: &[String], subject: &str) -> Result<(), GenerateError> {
        let status = Command::new(self.program())
            .args(args)
            .current_dir(cwd)
            .status()
            .map_err(|source| GenerateError::Spawn {
                role: self.role,
                program: self.program().to_string(),
                source,
            })?;

        if !status.success() {
            return Err(GenerateError::ToolFailed {
                role: self.role,
                program: self.program().to_string(),
                subject: subject.to_string(),
                status: status.code(),
            });
        }
        Ok(())
    }

    /// Run with the configured arguments followed by `extra`.
    pub fn run_appending(&self, cwd: &Path, extra: &[String], subject: &str) -> Result<(), GenerateError> {
        let mut args = self.argv[1..].to_vec();
        args.extend_from_slice(extra);
        self.run(cwd, &args, subject)
    }
}
