//! Backing-file and default-resource naming.

use std::path::{Path, PathBuf};

use errors::{ConfigError, ConfigResult};
use tracing::debug;

/// Extensions tried, in order, after a scope's file stem.
pub const CANDIDATE_EXTENSIONS: [&str; 4] = [".conf", ".json", ".conf.json", ".json.conf"];

/// Resource name suffixes that mark a bundled default layer.
pub const DEFAULT_RESOURCE_SUFFIXES: [&str; 4] = [
    "default.conf",
    "default.json",
    "default.conf.json",
    "default.json.conf",
];

/// Candidate backing-file names for a scope stem, in lookup order.
pub fn candidate_file_names(stem: &str) -> Vec<String> {
    CANDIDATE_EXTENSIONS
        .iter()
        .map(|ext| format!("{stem}{ext}"))
        .collect()
}

/// First existing candidate file for `stem` inside `dir`.
///
/// Returns `DirectoryNotFound` when `dir` does not exist and `Ok(None)` when
/// no candidate is present.
pub fn find_backing_file(dir: &Path, stem: &str) -> ConfigResult<Option<PathBuf>> {
    if !dir.is_dir() {
        return Err(ConfigError::DirectoryNotFound {
            path: dir.display().to_string(),
        });
    }
    let found = candidate_file_names(stem)
        .into_iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file());
    debug!("Backing file for '{}' in {:?}: {:?}", stem, dir, found);
    Ok(found)
}

/// Whether a bundled resource name designates a default layer.
pub fn is_default_resource(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    DEFAULT_RESOURCE_SUFFIXES
        .iter()
        .any(|suffix| lower.ends_with(suffix))
}
