//! generate::manifest
//!
//! Reading a package's declared type entry from `package.json`, and the
//! index re-export synthesized from it.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::GenerateError;

/// The `package.json` fields we read.
#[derive(Debug, Default, Deserialize)]
struct Manifest {
    types: Option<String>,
    typings: Option<String>,
}

/// Module path of a package's type entry, relative to the package root,
/// without extension: `"./lib/typescript/index.d.ts"` becomes
/// `"lib/typescript/index"`.
pub fn type_entry_module(package: &str, source: &Path) -> Result<String, GenerateError> {
    let path = source.join("package.json");
    let text = fs::read_to_string(&path).map_err(|e| GenerateError::Io {
        path: path.clone(),
        source: e,
    })?;
    let manifest: Manifest =
        serde_json::from_str(&text).map_err(|e| GenerateError::Manifest {
            path: path.clone(),
            source: e,
        })?;

    let entry = manifest
        .types
        .or(manifest.typings)
        .filter(|entry| !entry.trim().is_empty())
        .ok_or_else(|| GenerateError::NoTypeEntry {
            package: package.to_string(),
            path: path.clone(),
        })?;

    Ok(module_path(&entry))
}

/// Strip a declaration/TypeScript suffix and a leading `./`.
fn module_path(entry: &str) -> String {
    let entry = entry.trim();
    let entry = entry
        .strip_suffix(".d.ts")
        .or_else(|| entry.strip_suffix(".ts"))
        .unwrap_or(entry);
    entry.trim_start_matches("./").to_string()
}

/// Content of a synthesized index: a single re-export of the entry module.
pub fn index_source(module: &str) -> String {
    format!("/* @flow */\nexport * from './{module}';\n")
}

/// Path of the index file inside a destination directory.
pub fn index_path(dest: &Path, extension: &str) -> PathBuf {
    dest.join(format!("index.{extension}"))
}
