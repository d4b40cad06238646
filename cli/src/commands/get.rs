use anyhow::Result;
use clap::Args;

use super::ScopeArgs;
use crate::output;

#[derive(Args)]
pub struct GetArgs {
    #[arg(help = "Dotted path, list items by index (e.g. server.hosts.0)")]
    pub path: String,

    #[command(flatten)]
    pub scope: ScopeArgs,

    #[arg(long, help = "Fail when the path does not exist instead of printing null")]
    pub strict: bool
}

pub fn run(args: GetArgs) -> Result<()> {
    let store = args.scope.open(false)?;
    let tree = store.effective();
    let value = if args.strict {
        tree.try_path(&args.path)?
    } else {
        tree.path(&args.path)
    };
    output::json(value)
}
