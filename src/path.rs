//! # path
//!
//! File path traversal utilities.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use std::path::PathBuf;

/// Walk a directory and filter invalid paths.
pub fn walk_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let files: Vec<_> = fs::read_dir(dir)
        .with_context(|| format!("Cannot read directory: {}.", dir.display()))?
        .filter_map(|x| x.ok())
        .map(|x| x.path())
        .collect();
    Ok(files)
}

/// Extract the file stem from a path.
pub fn extract_file_stem(path: &Path) -> Result<String> {
    let file_stem = path
        .file_stem()
        .context("Cannot parse file stem.")?
        .to_str()
        .context("Cannot convert file stem to string.")?
        .to_string();
    Ok(file_stem)
}

/// Parse a capture timestamp (integer nanoseconds) from a file stem.
pub fn parse_timestamp_ns(path: &Path) -> Result<u64> {
    let stem = extract_file_stem(path)?;
    stem.parse::<u64>()
        .with_context(|| format!("Cannot parse timestamp from file stem: {stem}."))
}
