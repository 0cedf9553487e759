//! generate
//!
//! The generator adapter: rebuilds each tracked package's declarations.
//!
//! # Steps
//!
//! For each package, in configuration order:
//!
//! 1. Delete every declaration file under the destination. Other files are
//!    left in place.
//! 2. Run the generator over the package source.
//! 3. If no `index.<ext>` came out and the package wants one, write a
//!    re-export of the manifest's type entry.
//! 4. Remove the configured prune subdirectories.
//! 5. Run the formatter over the declaration files, if one is configured.
//!
//! Any tool failure aborts the whole run.

pub mod manifest;
pub mod tool;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

use crate::core::config::TrackedPackage;
use crate::ui::output::{self, Verbosity};

pub use tool::ToolCommand;

/// Errors from regeneration.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// No generator or formatter program was configured.
    #[error("{role} command is empty")]
    EmptyCommand {
        /// "generator" or "formatter"
        role: &'static str,
    },

    /// The tool could not be started.
    #[error("cannot run {role} '{program}': {source}")]
    Spawn {
        /// "generator" or "formatter"
        role: &'static str,
        /// Program name
        program: String,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// The tool ran and exited non-zero.
    #[error("{role} '{program}' failed for {subject}{}", status.map(|c| format!(" (exit code {c})")).unwrap_or_default())]
    ToolFailed {
        /// "generator" or "formatter"
        role: &'static str,
        /// Program name
        program: String,
        /// Package being processed
        subject: String,
        /// Exit code, if the process exited normally
        status: Option<i32>,
    },

    /// A package source directory is missing.
    #[error("source of package '{package}' not found at {path}")]
    SourceMissing {
        /// Package name
        package: String,
        /// Expected location
        path: PathBuf,
    },

    /// `package.json` is not valid JSON.
    #[error("invalid package manifest {path}: {source}")]
    Manifest {
        /// Manifest path
        path: PathBuf,
        /// Parse failure
        #[source]
        source: serde_json::Error,
    },

    /// The manifest declares neither `types` nor `typings`.
    #[error("package '{package}' has no index file and declares no `types` entry in {path}")]
    NoTypeEntry {
        /// Package name
        package: String,
        /// Manifest path
        path: PathBuf,
    },

    /// Filesystem error while clearing, writing or pruning.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },
}

/// What regenerating one package produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageReport {
    /// Package name
    pub name: String,
    /// Declaration files present after generation
    pub files: usize,
    /// Stale declaration files deleted before generation
    pub cleared: usize,
    /// Whether an index file was synthesized
    pub synthesized_index: bool,
}

/// Regenerates tracked packages.
///
/// The engine depends on this trait, not on [`GeneratorAdapter`], so tests
/// can substitute a generator that needs no external tools.
pub trait Generator {
    /// Regenerate every package, in order, stopping at the first failure.
    fn regenerate(&self, packages: &[TrackedPackage]) -> Result<Vec<PackageReport>, GenerateError>;
}

/// The production generator: external generator and formatter commands.
#[derive(Debug, Clone)]
pub struct GeneratorAdapter {
    work_dir: PathBuf,
    extension: String,
    generator: ToolCommand,
    formatter: Option<ToolCommand>,
    verbosity: Verbosity,
}

impl GeneratorAdapter {
    /// Create an adapter for a working directory.
    ///
    /// `extension` is the declaration extension without a leading dot.
    pub fn new(
        work_dir: &Path,
        extension: &str,
        generator: Vec<String>,
        formatter: Option<Vec<String>>,
        verbosity: Verbosity,
    ) -> Result<Self, GenerateError> {
        Ok(Self {
            work_dir: work_dir.to_path_buf(),
            extension: extension.trim_start_matches('.').to_string(),
            generator: ToolCommand::new("generator", generator)?,
            formatter: formatter
                .map(|argv| ToolCommand::new("formatter", argv))
                .transpose()?,
            verbosity,
        })
    }

    fn regenerate_package(&self, package: &TrackedPackage) -> Result<PackageReport, GenerateError> {
        let source = self.work_dir.join(&package.source);
        let dest = self.work_dir.join(&package.dest);

        if !source.is_dir() {
            return Err(GenerateError::SourceMissing {
                package: package.name.clone(),
                path: source,
            });
        }

        let cleared = clear_declarations(&dest, &self.extension)?;
        output::debug(
            format!("{}: cleared {} stale file(s)", package.name, cleared),
            self.verbosity,
        );

        fs::create_dir_all(&dest).map_err(|e| io_err(&dest, e))?;
        let args = self.generator.generator_args(&source, &dest);
        output::debug(
            format!("{}: {} {}", package.name, self.generator.program(), args.join(" ")),
            self.verbosity,
        );
        self.generator.run(&self.work_dir, &args, &package.name)?;

        let index = manifest::index_path(&dest, &self.extension);
        let synthesized_index = package.index && !index.exists();
        if synthesized_index {
            let module = manifest::type_entry_module(&package.name, &source)?;
            fs::write(&index, manifest::index_source(&module)).map_err(|e| io_err(&index, e))?;
            output::debug(
                format!("{}: synthesized index re-exporting '{}'", package.name, module),
                self.verbosity,
            );
        }

        for sub in &package.prune {
            let path = dest.join(sub);
            if path.exists() {
                fs::remove_dir_all(&path).map_err(|e| io_err(&path, e))?;
            }
        }

        let files = declaration_files(&dest, &self.extension)?;
        if let Some(formatter) = &self.formatter {
            if !files.is_empty() {
                let paths: Vec<String> = files
                    .iter()
                    .map(|p| p.to_string_lossy().into_owned())
                    .collect();
                formatter.run_appending(&self.work_dir, &paths, &package.name)?;
            }
        }

        Ok(PackageReport {
            name: package.name.clone(),
            files: files.len(),
            cleared,
            synthesized_index,
        })
    }
}

impl Generator for GeneratorAdapter {
    fn regenerate(&self, packages: &[TrackedPackage]) -> Result<Vec<PackageReport>, GenerateError> {
        let mut reports = Vec::with_capacity(packages.len());
        for package in packages {
            output::print(format!("Generating {}", package.name), self.verbosity);
            reports.push(self.regenerate_package(package)?);
        }
        Ok(reports)
    }
}

fn io_err(path: &Path, source: io::Error) -> GenerateError {
    GenerateError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Declaration files under `dir`, sorted. A missing directory has none.
pub fn declaration_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, GenerateError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let suffix = format!(".{}", extension.trim_start_matches('.'));

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            GenerateError::Io {
                path,
                source: e.into(),
            }
        })?;
        if entry.file_type().is_file() && entry.file_name().to_string_lossy().ends_with(&suffix) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Delete every declaration file under `dir`; returns how many.
fn clear_declarations(dir: &Path, extension: &str) -> Result<usize, GenerateError> {
    let files = declaration_files(dir, extension)?;
    for file in &files {
        fs::remove_file(file).map_err(|e| io_err(file, e))?;
    }
    Ok(files.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn package(name: &str) -> TrackedPackage {
        TrackedPackage {
            name: name.to_string(),
            source: format!("node_modules/{name}"),
            dest: format!("types/{name}"),
            prune: vec![],
            index: true,
        }
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    /// A generator that copies `*.d.ts` to `*.js.flow` with a Flow header.
    #[cfg(unix)]
    fn copy_generator() -> Vec<String> {
        let script = r#"cd "$0" && find . -name '*.d.ts' | while read f; do
  out="$1/${f%.d.ts}.js.flow"; mkdir -p "$(dirname "$out")"
  { echo '/* @flow */'; cat "$f"; } > "$out"
done"#;
        vec![
            "sh".into(),
            "-c".into(),
            script.into(),
            "{source}".into(),
            "{dest}".into(),
        ]
    }

    #[test]
    fn declaration_files_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "b.js.flow", "");
        write(dir.path(), "a/z.js.flow", "");
        write(dir.path(), "a/readme.md", "");
        let files = declaration_files(dir.path(), "js.flow").unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a/z.js.flow", "b.js.flow"]);
    }

    #[test]
    fn missing_source_is_reported() {
        let dir = TempDir::new().unwrap();
        let adapter = GeneratorAdapter::new(
            dir.path(),
            "js.flow",
            vec!["true".into()],
            None,
            Verbosity::Quiet,
        )
        .unwrap();
        let err = adapter.regenerate(&[package("demo-pkg")]).unwrap_err();
        assert!(matches!(err, GenerateError::SourceMissing { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn regenerates_with_index_and_prune() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "node_modules/demo-pkg/package.json", r#"{"types": "lib/main.d.ts"}"#);
        write(root, "node_modules/demo-pkg/lib/main.d.ts", "export declare const x: number;\n");
        write(root, "node_modules/demo-pkg/example/demo.d.ts", "export {};\n");
        write(root, "types/demo-pkg/stale.js.flow", "stale\n");
        write(root, "types/demo-pkg/NOTES.md", "hand-written\n");

        let mut pkg = package("demo-pkg");
        pkg.prune = vec!["example".into()];

        let adapter =
            GeneratorAdapter::new(root, "js.flow", copy_generator(), None, Verbosity::Quiet).unwrap();
        let reports = adapter.regenerate(&[pkg]).unwrap();

        assert_eq!(reports[0].cleared, 1);
        assert!(reports[0].synthesized_index);
        assert!(!root.join("types/demo-pkg/stale.js.flow").exists());
        assert!(!root.join("types/demo-pkg/example").exists());
        assert!(root.join("types/demo-pkg/NOTES.md").exists());
        assert_eq!(
            fs::read_to_string(root.join("types/demo-pkg/lib/main.js.flow")).unwrap(),
            "/* @flow */\nexport declare const x: number;\n"
        );
        assert_eq!(
            fs::read_to_string(root.join("types/demo-pkg/index.js.flow")).unwrap(),
            "/* @flow */\nexport * from './lib/main';\n"
        );
        assert_eq!(reports[0].files, 2);
    }

    #[cfg(unix)]
    #[test]
    fn generator_failure_aborts() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "node_modules/demo-pkg/package.json", "{}");
        let adapter = GeneratorAdapter::new(
            dir.path(),
            "js.flow",
            vec!["false".into()],
            None,
            Verbosity::Quiet,
        )
        .unwrap();
        let err = adapter
            .regenerate(&[package("demo-pkg"), package("other")])
            .unwrap_err();
        assert!(matches!(err, GenerateError::ToolFailed { .. }), "{err}");
    }

    #[cfg(unix)]
    #[test]
    fn formatter_receives_sorted_files() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "node_modules/demo-pkg/b.d.ts", "b\n");
        write(root, "node_modules/demo-pkg/a.d.ts", "a\n");

        let mut pkg = package("demo-pkg");
        pkg.index = false;

        let log = root.join("formatted.txt");
        let formatter = vec![
            "sh".into(),
            "-c".into(),
            format!("for f in \"$@\"; do basename \"$f\" >> {}; done", log.display()),
            "fmt".into(),
        ];
        let adapter =
            GeneratorAdapter::new(root, "js.flow", copy_generator(), Some(formatter), Verbosity::Quiet)
                .unwrap();
        adapter.regenerate(&[pkg]).unwrap();

        assert_eq!(fs::read_to_string(log).unwrap(), "a.js.flow\nb.js.flow\n");
    }
}
