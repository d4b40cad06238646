//! # Layered Configuration Errors
//!
//! Error handling shared by every crate of the layered configuration system.
//!
//! - Uses `thiserror` for structured error definitions
//! - Named fields on every variant so messages carry their context

use std::path::Path;

use thiserror::Error;

/// Errors raised by merging, parsing, navigating and persisting configuration
/// trees.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Two colliding values (or a value and a typed accessor) disagree on
    /// their structural kind.
    #[error("Type mismatch at '{path}': expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: String,
        found: String,
    },

    #[error("Failed to parse {source_name}: {reason}")]
    Parse { source_name: String, reason: String },

    /// Only raised by strict lookups; safe navigation never produces it.
    #[error("Key not found: {key}")]
    KeyNotFound { key: String },

    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: String },

    #[error("IO error on {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("File watcher error: {reason}")]
    Watch { reason: String },

    #[error("Invalid options: {reason}")]
    InvalidOptions { reason: String },
}

impl ConfigError {
    pub fn type_mismatch(
        path: impl Into<String>,
        expected: impl ToString,
        found: impl ToString,
    ) -> Self {
        Self::TypeMismatch {
            path: path.into(),
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    pub fn parse(source_name: impl Into<String>, reason: impl ToString) -> Self {
        Self::Parse {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }

    pub fn io(path: &Path, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            reason: err.to_string(),
        }
    }

    /// Whether a watcher-driven reload hitting this error should keep the
    /// previous effective tree and carry on.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Parse { .. } | Self::Io { .. } | Self::TypeMismatch { .. })
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_mismatch_message_names_path_and_kinds() {
        let err = ConfigError::type_mismatch("server.port", "integer", "string");
        assert_eq!(
            err.to_string(),
            "Type mismatch at 'server.port': expected integer, found string"
        );
    }

    #[test]
    fn test_io_error_carries_path() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = ConfigError::io(Path::new("/tmp/settings.json"), &io);
        assert!(err.to_string().contains("/tmp/settings.json"));
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_transient_errors() {
        assert!(ConfigError::parse("settings.json", "eof").is_transient());
        assert!(
            !ConfigError::KeyNotFound {
                key: "a".to_string()
            }
            .is_transient()
        );
        assert!(
            !ConfigError::Watch {
                reason: "no inotify".to_string()
            }
            .is_transient()
        );
    }
}
