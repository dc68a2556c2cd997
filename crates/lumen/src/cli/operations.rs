//! The `lumen operations` command: list operations and their defaults.

use clap::Args;
use console::style;
use lumen_core::operation::NamedParams;
use lumen_core::{Config, OperationRegistry};
use std::collections::BTreeMap;

/// Arguments for the `operations` command.
#[derive(Args, Debug)]
pub struct OperationsArgs {
    /// Print as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

/// Execute the operations command.
pub fn execute(args: OperationsArgs, config: &Config) -> anyhow::Result<()> {
    let registry = OperationRegistry::new();

    if args.json {
        let table: BTreeMap<&str, NamedParams> = registry
            .kinds()
            .iter()
            .map(|kind| (kind.name(), config.operations.params_for(*kind)))
            .collect();
        println!("{}", serde_json::to_string_pretty(&table)?);
        return Ok(());
    }

    for line in describe(registry, config) {
        println!("{line}");
    }
    Ok(())
}

/// One line per operation: name, then `key=default` for each parameter.
fn describe(registry: OperationRegistry, config: &Config) -> Vec<String> {
    registry
        .kinds()
        .iter()
        .map(|kind| {
            let defaults = config.operations.params_for(*kind);
            let params: Vec<String> = kind
                .parameter_names()
                .iter()
                .map(|key| match defaults.get(*key) {
                    Some(value) => format!("{key}={value}"),
                    None => format!("{key}=<required>"),
                })
                .collect();
            let params = if params.is_empty() {
                style("(no parameters)").dim().to_string()
            } else {
                params.join(" ")
            };
            format!("  {:<24} {}", style(kind.name()).cyan(), params)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_lists_every_operation_with_defaults() {
        console::set_colors_enabled(false);
        let lines = describe(OperationRegistry::new(), &Config::default());
        assert_eq!(lines.len(), 10);
        assert!(lines[0].contains("resize"));
        assert!(lines[0].contains("scale_x=2"));
        assert!(lines
            .iter()
            .any(|l| l.contains("histogram_equalization") && l.contains("no parameters")));
    }
}
