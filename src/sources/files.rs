//! Source file lookup, including `*` patterns over a directory.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::{Result, SynthError};

/// Expand a file name that may contain `*` wildcards within `dir`.
///
/// Matches are returned sorted by file name so that concatenated tables come
/// out in the same order on every platform. A plain name resolves to itself.
pub fn resolve_files(dir: &Path, file: &str) -> Result<Vec<PathBuf>> {
    if !file.contains('*') {
        let path = dir.join(file);
        if !path.is_file() {
            return Err(SynthError::MissingSource(path));
        }
        return Ok(vec![path]);
    }

    let pattern = wildcard_regex(file)?;
    let entries = fs::read_dir(dir).map_err(|e| SynthError::io(dir, e))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| SynthError::io(dir, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if pattern.is_match(&name) && entry.path().is_file() {
            names.push(name);
        }
    }

    if names.is_empty() {
        return Err(SynthError::MissingSource(dir.join(file)));
    }

    names.sort();
    Ok(names.into_iter().map(|name| dir.join(name)).collect())
}

fn wildcard_regex(file: &str) -> Result<Regex> {
    let body = file
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Ok(Regex::new(&format!("^{}$", body))?)
}
