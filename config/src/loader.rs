//! # Configuration Text Loading
//!
//! Reads configuration text into trees and writes trees back as pretty JSON.
//!
//! # Input Format
//! JSON object, array or scalar syntax. Lines whose first non-whitespace
//! character is `#` are comments and are removed before parsing. A file with
//! nothing but comments and whitespace is an empty mapping.

use std::fs;
use std::io::Write;
use std::path::Path;

use errors::{ConfigError, ConfigResult};
use lc_core::ConfigValue;
use tempfile::NamedTempFile;
use tracing::debug;

/// Blank out `#` comment lines, keeping line numbers intact for parser
/// error messages.
pub fn strip_comments(text: &str) -> String {
    text.lines()
        .map(|line| {
            if line.trim_start().starts_with('#') {
                ""
            } else {
                line
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse configuration text, tagging every node with `from_default`.
pub fn parse_text(text: &str, source_name: &str, from_default: bool) -> ConfigResult<ConfigValue> {
    let stripped = strip_comments(text);
    if stripped.trim().is_empty() {
        return Ok(ConfigValue::mapping().with_provenance(from_default));
    }
    let json: serde_json::Value =
        serde_json::from_str(&stripped).map_err(|e| ConfigError::parse(source_name, e))?;
    Ok(ConfigValue::from_json(&json, from_default))
}

/// Read and parse a configuration file.
pub fn read_tree(path: &Path, from_default: bool) -> ConfigResult<ConfigValue> {
    let text = fs::read_to_string(path).map_err(|e| ConfigError::io(path, &e))?;
    parse_text(&text, &path.display().to_string(), from_default)
}

/// Pretty-printed JSON text of a tree, newline terminated.
pub fn render(tree: &ConfigValue) -> ConfigResult<String> {
    let mut text = serde_json::to_string_pretty(&tree.to_json())
        .map_err(|e| ConfigError::parse("rendered tree", e))?;
    text.push('\n');
    Ok(text)
}

/// Replace `path` with `contents` through a temp file in the same directory,
/// so readers never see a half-written file.
pub fn write_atomic(path: &Path, contents: &str) -> ConfigResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir).map_err(|e| ConfigError::io(dir, &e))?;
    file.write_all(contents.as_bytes())
        .and_then(|()| file.as_file().sync_all())
        .map_err(|e| ConfigError::io(file.path(), &e))?;
    file.persist(path)
        .map_err(|e| ConfigError::io(path, &e.error))?;
    debug!("Wrote {} bytes to {:?}", contents.len(), path);
    Ok(())
}
