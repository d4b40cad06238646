use anyhow::{Context, Result};
use clap::Args;
use lc_core::ConfigValue;

use super::ScopeArgs;
use crate::output;

#[derive(Args)]
pub struct SetArgs {
    #[arg(help = "Dotted path to assign (e.g. server.port)")]
    pub path: String,

    #[arg(help = "JSON value; bare words are taken as strings")]
    pub value: String,

    #[command(flatten)]
    pub scope: ScopeArgs
}

pub fn run(args: SetArgs) -> Result<()> {
    let store = args.scope.open(false)?;
    let mut user = store.user_config();
    user.set_path(&args.path, parse_value(&args.value))
        .with_context(|| format!("Cannot set '{}'", args.path))?;
    store.set_user_config(user)?;

    let target = store
        .backing_file()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    output::success(&format!("Set {} in {}", args.path, target));
    Ok(())
}

/// JSON text as a user-layer value, falling back to a plain string.
fn parse_value(raw: &str) -> ConfigValue {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(json) => ConfigValue::from(json),
        Err(_) => ConfigValue::from(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("42").as_int().unwrap(), 42);
        assert!(parse_value("true").as_bool().unwrap());
        assert_eq!(parse_value("\"x\"").as_str().unwrap(), "x");
        assert_eq!(parse_value("localhost").as_str().unwrap(), "localhost");
        assert_eq!(parse_value("[1, 2]").as_list().unwrap().len(), 2);
        assert!(!parse_value("null").is_present());
        assert!(!parse_value("7").is_default());
    }
}
