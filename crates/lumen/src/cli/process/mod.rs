//! The `lumen process` command for running a batch.

mod batch;
mod setup;
pub mod types;

pub use types::{Naming, ReportFormat};

use clap::Args;
use lumen_core::config::expand_path;
use lumen_core::pipeline::FileDiscovery;
use lumen_core::{BatchCoordinator, BatchRequest, Config};
use std::path::PathBuf;

use batch::{process_batch, ReportTarget};
use setup::{apply_overrides, report_format, validate_operations};

/// Arguments for the `process` command.
#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// Image files or directories to process
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Directory for result images (created if missing)
    #[arg(short = 'd', long, value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Operation to apply; repeat or separate with commas
    #[arg(short = 'o', long = "op", value_name = "OP", required = true, value_delimiter = ',')]
    pub operations: Vec<String>,

    /// Parameter override as op.key=value (e.g. blur.kernel_size=7)
    #[arg(long = "param", value_name = "OP.KEY=VALUE")]
    pub params: Vec<String>,

    /// Images processed at once (0 = available parallelism)
    #[arg(short, long)]
    pub parallel: Option<usize>,

    /// Operations running at once across the batch (0 = available parallelism)
    #[arg(long)]
    pub op_workers: Option<usize>,

    /// Result image format by extension (png, jpg, webp, ...)
    #[arg(long)]
    pub format: Option<String>,

    /// Output file naming
    #[arg(long, value_enum)]
    pub naming: Option<Naming>,

    /// Write a run report to this file (`-` for stdout)
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Run report format
    #[arg(long, value_enum)]
    pub report_format: Option<ReportFormat>,
}

/// Execute the process command.
pub async fn execute(args: ProcessArgs, mut config: Config) -> anyhow::Result<()> {
    validate_operations(&args.operations)?;
    apply_overrides(&args, &mut config)?;

    let inputs = FileDiscovery::new(config.processing.clone()).expand(&args.inputs);
    if inputs.is_empty() {
        anyhow::bail!(
            "No supported image files found in {:?}\n\n  Hint: Check the input paths and try again.",
            args.inputs
        );
    }
    tracing::info!("Found {} image(s) to process", inputs.len());

    let request = BatchRequest::new(
        inputs,
        expand_path(&args.output_dir),
        args.operations.iter().cloned(),
    );
    let coordinator = BatchCoordinator::new(&config);

    let report_target = args.report.as_deref().map(|path| ReportTarget {
        path,
        format: report_format(&args, &config),
        pretty: config.output.pretty,
    });

    process_batch(&coordinator, &request, report_target).await
}
