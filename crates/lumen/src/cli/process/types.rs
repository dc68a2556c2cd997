//! CLI enum types for the process command: report format and output naming.

use clap::ValueEnum;
use lumen_core::{NamingScheme, OutputFormat as CoreOutputFormat};

/// Supported report formats.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ReportFormat {
    /// Single JSON document
    Json,
    /// One JSON object per line (newline-delimited)
    Jsonl,
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportFormat::Json => write!(f, "json"),
            ReportFormat::Jsonl => write!(f, "jsonl"),
        }
    }
}

impl From<ReportFormat> for CoreOutputFormat {
    fn from(format: ReportFormat) -> Self {
        match format {
            ReportFormat::Json => CoreOutputFormat::Json,
            ReportFormat::Jsonl => CoreOutputFormat::JsonLines,
        }
    }
}

/// Output file naming.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Naming {
    /// `operation` for one input, `source` for several
    Auto,
    /// `<op>_image.<ext>` (single input only)
    Operation,
    /// `<stem>_<op>_image.<ext>`
    Source,
}

impl From<Naming> for NamingScheme {
    fn from(naming: Naming) -> Self {
        match naming {
            Naming::Auto => NamingScheme::Auto,
            Naming::Operation => NamingScheme::Operation,
            Naming::Source => NamingScheme::Source,
        }
    }
}
