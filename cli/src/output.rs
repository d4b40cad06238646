use colored::Colorize;
use lc_core::ConfigValue;

pub fn header(title: &str) {
    println!("{}", title.bold().underline());
}

pub fn hint(msg: &str) {
    println!("{} {}", "hint:".cyan().bold(), msg.dimmed());
}

pub fn info(msg: &str) {
    eprintln!("{} {}", "info:".blue().bold(), msg);
}

pub fn warn(msg: &str) {
    eprintln!("{} {}", "warning:".yellow().bold(), msg);
}

pub fn success(msg: &str) {
    println!("{} {}", "✓".green().bold(), msg);
}

/// Pretty JSON of a tree on stdout.
pub fn json(tree: &ConfigValue) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&tree.to_json())?);
    Ok(())
}

/// One `path = value` line per leaf, tagged with the layer it came from.
pub fn sources(tree: &ConfigValue) {
    let mut lines = Vec::new();
    collect_leaves(tree, String::new(), &mut lines);
    if lines.is_empty() {
        hint("No entries");
        return;
    }
    for (path, value, from_default) in lines {
        let origin = if from_default {
            "default".dimmed()
        } else {
            "user".green()
        };
        println!("  {} = {} {}", path.cyan(), value, format!("({origin})").dimmed());
    }
}

fn collect_leaves(tree: &ConfigValue, prefix: String, out: &mut Vec<(String, String, bool)>) {
    match tree {
        ConfigValue::Mapping { entries, .. } if !entries.is_empty() => {
            for (key, child) in entries {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                collect_leaves(child, path, out);
            }
        }
        ConfigValue::List { items, .. } if !items.is_empty() => {
            for (index, child) in items.iter().enumerate() {
                collect_leaves(child, format!("{prefix}.{index}"), out);
            }
        }
        ConfigValue::Empty => {}
        leaf if !prefix.is_empty() => {
            out.push((prefix, leaf.to_json().to_string(), leaf.is_default()));
        }
        _ => {}
    }
}
