//! # Backing File Watcher
//!
//! Watches a single configuration file for external edits.
//!
//! The watch is placed on the file's parent directory and events are filtered
//! by file name, so a file that does not exist yet, or that an editor replaces
//! by renaming a temp file over it, is still observed.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use errors::{ConfigError, ConfigResult};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};

/// Change observed on a watched file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEvent {
    /// File content was created, modified, or replaced
    Changed(PathBuf),

    /// File was deleted or renamed away
    Removed(PathBuf),
}

/// Live watch on one file. Dropping it stops delivery.
pub struct FileWatcher {
    path: PathBuf,
    _watcher: RecommendedWatcher,
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher").field("path", &self.path).finish()
    }
}

impl FileWatcher {
    /// Start watching `path`, invoking `on_event` from the watcher's own
    /// thread for every relevant change.
    ///
    /// ## Error Handling
    /// Returns `ConfigError::Watch` when the path has no file name, the parent
    /// directory is missing, or the platform watcher cannot be created.
    pub fn start<F>(path: &Path, on_event: F) -> ConfigResult<Self>
    where
        F: Fn(FileEvent) + Send + 'static,
    {
        let file_name = path
            .file_name()
            .map(|n| n.to_os_string())
            .ok_or_else(|| ConfigError::Watch {
                reason: format!("{:?} does not name a file", path),
            })?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let target = path.to_path_buf();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Some(file_event) = classify(&event, &file_name, &target) {
                    on_event(file_event);
                }
            }
            Err(e) => warn!("Watch error: {}", e),
        })
        .map_err(|e| ConfigError::Watch {
            reason: format!("Failed to create file watcher: {}", e),
        })?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| ConfigError::Watch {
                reason: format!("Failed to watch {:?}: {}", dir, e),
            })?;

        info!("Watching config file: {:?}", path);

        Ok(Self {
            path: path.to_path_buf(),
            _watcher: watcher,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Map a raw notify event to a change of the watched file, if it is one.
fn classify(event: &Event, file_name: &OsString, target: &Path) -> Option<FileEvent> {
    let is_target = |p: &PathBuf| p.file_name() == Some(file_name.as_os_str());
    if !event.paths.iter().any(is_target) {
        return None;
    }

    // A paired rename lists the source first and the destination second.
    let renamed_away = matches!(
        event.kind,
        EventKind::Modify(ModifyKind::Name(RenameMode::Both))
    ) && !event.paths.last().is_some_and(is_target);

    match event.kind {
        EventKind::Modify(ModifyKind::Metadata(_)) => None,
        _ if renamed_away => {
            warn!("Config file renamed away: {:?}", target);
            Some(FileEvent::Removed(target.to_path_buf()))
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) | EventKind::Remove(_) => {
            warn!("Config file removed: {:?}", target);
            Some(FileEvent::Removed(target.to_path_buf()))
        }
        EventKind::Create(_) | EventKind::Modify(_) => {
            debug!("Config file updated: {:?}", target);
            Some(FileEvent::Changed(target.to_path_buf()))
        }
        _ => {
            debug!("Ignoring event: {:?}", event.kind);
            None
        }
    }
}
