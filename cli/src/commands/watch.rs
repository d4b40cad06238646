use anyhow::Result;
use clap::Args;
use colored::Colorize;
use config::ConfigEvent;
use tokio::sync::broadcast::error::RecvError;

use super::ScopeArgs;
use crate::output;

#[derive(Args)]
pub struct WatchArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,

    #[arg(long, help = "Print the effective configuration after each reload")]
    pub print: bool
}

pub async fn run(args: WatchArgs) -> Result<()> {
    let store = args.scope.open(true)?;
    let mut events = store.subscribe();

    match store.backing_file() {
        Some(path) => output::info(&format!("Watching {} (Ctrl-C to stop)", path.display())),
        None => output::warn("Scope has no backing file")
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(ConfigEvent::Reloaded { path, .. }) => {
                    println!("{} {}", "reloaded".green().bold(), path.display());
                    if args.print {
                        output::json(&store.effective())?;
                    }
                }
                Ok(ConfigEvent::ReloadFailed { path, error, .. }) => {
                    println!("{} {}: {}", "failed".red().bold(), path.display(), error);
                }
                Ok(ConfigEvent::Removed { path, .. }) => {
                    println!("{} {}", "removed".yellow().bold(), path.display());
                }
                Ok(ConfigEvent::Updated { scope }) => {
                    println!("{} {}", "updated".blue().bold(), scope);
                }
                Err(RecvError::Lagged(skipped)) => {
                    output::warn(&format!("Missed {skipped} change events"));
                }
                Err(RecvError::Closed) => break
            }
        }
    }

    store.stop_watching();
    Ok(())
}
