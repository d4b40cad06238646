use anyhow::Result;
use clap::Args;

use super::ScopeArgs;
use crate::output;

#[derive(Args)]
pub struct ShowArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,

    #[arg(long, help = "List leaf values with the layer each comes from")]
    pub sources: bool,

    #[arg(long, help = "Show only the user layer")]
    pub user: bool
}

pub fn run(args: ShowArgs) -> Result<()> {
    let store = args.scope.open(false)?;

    if args.sources {
        output::header(&format!("Scope '{}'", store.scope()));
        match store.backing_file() {
            Some(path) => output::hint(&format!("backing file: {}", path.display())),
            None => output::hint("no backing file")
        }
        output::sources(&store.effective());
        return Ok(());
    }

    if args.user {
        output::json(&store.user_config())
    } else {
        output::json(&store.effective())
    }
}
