use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Args;
use config::read_tree;
use lc_core::{ConfigValue, merge_all};

#[derive(Args)]
pub struct MergeArgs {
    #[arg(required = true, help = "Files to merge, highest precedence first")]
    pub files: Vec<PathBuf>,

    #[arg(
        long,
        help = "Treat the last file as the default layer and print only entries not taken from it"
    )]
    pub strip_defaults: bool
}

pub fn run(args: MergeArgs) -> Result<()> {
    let merged = merge_files(&args.files, args.strip_defaults)?;
    crate::output::json(&merged)
}

pub fn merge_files(files: &[PathBuf], strip_defaults: bool) -> Result<ConfigValue> {
    if strip_defaults && files.len() < 2 {
        bail!("--strip-defaults needs at least one file besides the default layer");
    }
    let last = files.len().saturating_sub(1);
    let trees = files
        .iter()
        .enumerate()
        .map(|(i, path)| read_tree(path, strip_defaults && i == last))
        .collect::<Result<Vec<_>, _>>()?;

    let merged = merge_all(&trees)?;
    let merged = if strip_defaults {
        merged.without_defaults()
    } else {
        merged
    };
    Ok(match merged {
        ConfigValue::Empty => ConfigValue::mapping(),
        tree => tree
    })
}
