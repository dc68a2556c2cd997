//! Config overrides from command-line flags and up-front operation checks.

use lumen_core::operation::ParamValue;
use lumen_core::pipeline::ImageFormatChoice;
use lumen_core::{Config, OperationKind, OperationRegistry, OutputFormat as CoreOutputFormat};

use super::ProcessArgs;

/// Layer command-line flags over the loaded configuration.
pub fn apply_overrides(args: &ProcessArgs, config: &mut Config) -> anyhow::Result<()> {
    if let Some(parallel) = args.parallel {
        config.processing.parallel_workers = parallel;
    }
    if let Some(op_workers) = args.op_workers {
        config.processing.operation_workers = op_workers;
    }

    if let Some(format) = &args.format {
        if ImageFormatChoice::from_extension(format).is_none() {
            anyhow::bail!(
                "Unsupported output format: {format}\n\n  \
                 Hint: Use one of png, jpg, webp, bmp, tiff, pnm."
            );
        }
        config.output.format = format.clone();
    }
    if let Some(naming) = args.naming {
        config.output.naming = naming.into();
    }

    for raw in &args.params {
        let (kind, key, value) = parse_param_override(raw)?;
        tracing::debug!("Parameter override {}.{} = {}", kind, key, value);
        config.operations.set(kind, &key, value);
    }

    Ok(())
}

/// Parse `op.key=value`, e.g. `blur.kernel_size=7` or
/// `filter.kernel=[[0,-1,0],[-1,5,-1],[0,-1,0]]`.
pub fn parse_param_override(raw: &str) -> anyhow::Result<(OperationKind, String, ParamValue)> {
    let Some((target, value)) = raw.split_once('=') else {
        anyhow::bail!("Invalid --param '{raw}': expected op.key=value");
    };
    let Some((op, key)) = target.trim().split_once('.') else {
        anyhow::bail!("Invalid --param '{raw}': expected op.key=value");
    };

    let kind: OperationKind = op.parse()?;
    let key = key.trim();
    if !kind.parameter_names().contains(&key) {
        anyhow::bail!(
            "Unknown parameter '{key}' for {kind}; expected one of: {}",
            kind.parameter_names().join(", ")
        );
    }
    let Some(value) = ParamValue::parse(value) else {
        anyhow::bail!("Invalid value for {kind}.{key}: '{}'", value.trim());
    };

    Ok((kind, key.to_string(), value))
}

/// Fail on any operation name outside the registry, before anything runs.
pub fn validate_operations(names: &[String]) -> anyhow::Result<()> {
    let registry = OperationRegistry::new();
    for name in names {
        if registry.lookup(name).is_err() {
            let known: Vec<&str> = registry.kinds().iter().map(|k| k.name()).collect();
            anyhow::bail!(
                "Unknown operation: {name}\n\n  Hint: Available operations are {}.",
                known.join(", ")
            );
        }
    }
    Ok(())
}

/// Report format from the flag, falling back to the config file.
pub fn report_format(args: &ProcessArgs, config: &Config) -> CoreOutputFormat {
    match args.report_format {
        Some(format) => format.into(),
        None => CoreOutputFormat::parse(&config.output.report_format)
            .unwrap_or(CoreOutputFormat::Json),
    }
}
