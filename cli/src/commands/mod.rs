pub mod get;
pub mod merge;
pub mod set;
pub mod show;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use config::{ConfigStore, EmbeddedDefaults, GLOBAL_SCOPE, Registry, RegistryOptions};
use tracing::debug;

/// Resource name the `--defaults` file is registered under.
const DEFAULTS_RESOURCE: &str = "default.json";

#[derive(Parser)]
#[command(
    name = "layerconf",
    author,
    version,
    about = "layerconf - layered configuration with defaults and user overrides",
    long_about = "Merge configuration layers, inspect the effective configuration of a scope, \
                  and edit its user overrides.\n\nA scope reads <scope>.conf, <scope>.json, \
                  <scope>.conf.json or <scope>.json.conf from the configuration directory; the \
                  global scope uses the settings stem."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Merge configuration files, first file wins")]
    Merge(merge::MergeArgs),

    #[command(about = "Show the effective configuration of a scope")]
    Show(show::ShowArgs),

    #[command(about = "Read a value by dotted path")]
    Get(get::GetArgs),

    #[command(about = "Set a user override by dotted path and save it")]
    Set(set::SetArgs),

    #[command(about = "Print configuration changes as the backing file is edited")]
    Watch(watch::WatchArgs)
}

/// Which store a command works on.
#[derive(Args, Debug, Clone)]
pub struct ScopeArgs {
    #[arg(long, short, default_value = GLOBAL_SCOPE, help = "Scope (component) name")]
    pub scope: String,

    #[arg(
        long,
        short,
        env = "LAYERCONF_DIR",
        help = "Directory holding the backing files [default: .]"
    )]
    pub dir: Option<PathBuf>,

    #[arg(long, help = "File providing the default layer of the scope")]
    pub defaults: Option<PathBuf>
}

impl ScopeArgs {
    /// Registry over `--dir`, with the `--defaults` file bundled for the
    /// selected scope.
    pub fn registry(&self, watch: bool) -> Result<Registry> {
        let mut options = RegistryOptions::from_env()?;
        if let Some(dir) = &self.dir {
            options.search_dir = dir.clone();
        }
        options.store.watch = watch;

        let mut defaults = EmbeddedDefaults::new();
        if let Some(path) = &self.defaults {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read defaults file {}", path.display()))?;
            defaults.register(self.scope.clone(), DEFAULTS_RESOURCE, text);
        }
        Ok(Registry::new(options.validated()?, defaults))
    }

    /// The scope's store with its backing file loaded.
    pub fn open(&self, watch: bool) -> Result<Arc<ConfigStore>> {
        let registry = self.registry(watch)?;
        let store = registry
            .open(&self.scope)
            .with_context(|| format!("Failed to open scope '{}'", self.scope))?;
        debug!("Opened '{}' backed by {:?}", self.scope, store.backing_file());
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn scope_args(dir: &TempDir, defaults: Option<PathBuf>) -> ScopeArgs {
        ScopeArgs {
            scope: "app".to_string(),
            dir: Some(dir.path().to_path_buf()),
            defaults
        }
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_open_applies_defaults_file() {
        let dir = TempDir::new().unwrap();
        let defaults = dir.path().join("app.defaults");
        fs::write(&defaults, r#"{"retries": 3}"#).unwrap();
        fs::write(dir.path().join("app.json"), r#"{"name": "svc"}"#).unwrap();

        let store = scope_args(&dir, Some(defaults)).open(false).unwrap();
        let tree = store.effective();
        assert_eq!(tree.get("retries").as_int().unwrap(), 3);
        assert!(tree.get("retries").is_default());
        assert_eq!(tree.get("name").as_str().unwrap(), "svc");
    }

    #[test]
    fn test_open_missing_defaults_file_fails() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.json");
        let err = scope_args(&dir, Some(missing)).open(false).unwrap_err();
        assert!(err.to_string().contains("Failed to read defaults file"));
    }
}
