//! Run report output in JSON or JSONL.
//!
//! JSON writes the whole [`BatchReport`] as one document. JSONL writes one
//! [`ImageReport`] per line followed by a final stats line, so a report can be
//! tailed or streamed into line-oriented tools.

use serde::Serialize;
use std::io::{self, Write};

use crate::types::{BatchReport, BatchStats, ImageReport};

/// Report format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Single JSON document
    Json,
    /// One JSON object per line (newline-delimited JSON)
    JsonLines,
}

impl OutputFormat {
    /// Parse format from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }
}

/// JSONL trailer line carrying the batch stats.
#[derive(Serialize)]
struct StatsLine<'a> {
    stats: &'a BatchStats,
}

/// Serializes reports to a writer.
pub struct OutputWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    pretty: bool,
}

impl<W: Write> OutputWriter<W> {
    /// Create a new report writer. `pretty` only affects JSON.
    pub fn new(writer: W, format: OutputFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
        }
    }

    /// Write a single image report as one JSONL line (or one JSON object).
    pub fn write_image(&mut self, report: &ImageReport) -> io::Result<()> {
        self.write_value(report, self.format == OutputFormat::Json && self.pretty)
    }

    /// Write a full batch report.
    pub fn write_report(&mut self, report: &BatchReport) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => self.write_value(report, self.pretty),
            OutputFormat::JsonLines => {
                for image in report.images.values() {
                    self.write_value(image, false)?;
                }
                self.write_value(
                    &StatsLine {
                        stats: &report.stats,
                    },
                    false,
                )
            }
        }
    }

    fn write_value<T: Serialize>(&mut self, value: &T, pretty: bool) -> io::Result<()> {
        if pretty {
            serde_json::to_writer_pretty(&mut self.writer, value).map_err(io::Error::other)?;
        } else {
            serde_json::to_writer(&mut self.writer, value).map_err(io::Error::other)?;
        }
        writeln!(self.writer)
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    /// Consume the writer and return the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ErrorKind, FailureRecord};
    use std::path::Path;

    fn sample_report() -> BatchReport {
        BatchReport::new(
            vec![
                ImageReport::failed(
                    Path::new("a.png"),
                    FailureRecord::new(ErrorKind::Decode, "corrupt"),
                    1,
                ),
                ImageReport::failed(
                    Path::new("b.png"),
                    FailureRecord::new(ErrorKind::Cancelled, "cancelled"),
                    0,
                ),
            ],
            3,
        )
    }

    #[test]
    fn test_write_json_report() {
        let mut buffer = Vec::new();
        let mut writer = OutputWriter::new(&mut buffer, OutputFormat::Json, false);
        writer.write_report(&sample_report()).unwrap();

        let output = String::from_utf8(buffer).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["stats"]["images_failed"], 2);
        assert_eq!(value["images"]["a.png"]["outcome"]["kind"], "decode");
    }

    #[test]
    fn test_write_jsonl_report() {
        let mut buffer = Vec::new();
        let mut writer = OutputWriter::new(&mut buffer, OutputFormat::JsonLines, true);
        writer.write_report(&sample_report()).unwrap();

        let output = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = output.trim().split('\n').collect();
        // two images plus the stats trailer
        assert_eq!(lines.len(), 3);
        assert!(lines[2].starts_with("{\"stats\""));
    }

    #[test]
    fn test_json_report_roundtrips() {
        let report = sample_report();
        let mut buffer = Vec::new();
        OutputWriter::new(&mut buffer, OutputFormat::Json, true)
            .write_report(&report)
            .unwrap();
        let parsed: BatchReport = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(parsed, report);
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(OutputFormat::parse("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("jsonl"), Some(OutputFormat::JsonLines));
        assert_eq!(OutputFormat::parse("NDJSON"), Some(OutputFormat::JsonLines));
        assert_eq!(OutputFormat::parse("invalid"), None);
    }
}
