//! Batch execution with progress, Ctrl-C cancellation, summary and report output.

use anyhow::Context;
use console::style;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use lumen_core::{
    BatchCoordinator, BatchReport, BatchRequest, BatchStats, ImageReport,
    OutputFormat as CoreOutputFormat, OutputWriter,
};

/// Where and how to write the run report.
pub struct ReportTarget<'a> {
    /// File path, or `-` for stdout
    pub path: &'a Path,
    pub format: CoreOutputFormat,
    pub pretty: bool,
}

/// Run the batch with a progress bar, then print the summary and write the report.
pub async fn process_batch(
    coordinator: &BatchCoordinator,
    request: &BatchRequest,
    report_target: Option<ReportTarget<'_>>,
) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let total = request.inputs().len() as u64;
    let progress = create_progress_bar(total);
    let start_time = Instant::now();

    let on_image = {
        let progress = progress.clone();
        move |report: &ImageReport| {
            let line = completion_line(report);
            if progress.is_hidden() {
                eprintln!("{line}");
            } else {
                progress.println(line);
            }
            progress.inc(1);
            let elapsed = start_time.elapsed().as_secs_f64();
            if elapsed > 0.0 {
                let rate = progress.position() as f64 / elapsed;
                progress.set_message(format!("{:.1} img/sec", rate));
            }
        }
    };

    let report = coordinator
        .run_with_progress(request, cancel.clone(), on_image)
        .await
        .context("Batch aborted before processing")?;

    progress.finish_and_clear();
    print_summary(&report.stats);

    if let Some(target) = report_target {
        write_report(&report, &target)?;
    }

    if cancel.is_cancelled() {
        anyhow::bail!("Interrupted; unfinished images were recorded as cancelled");
    }
    Ok(())
}

/// Cancel the batch on Ctrl-C. Running tasks finish; nothing new starts.
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {}
            result = tokio::signal::ctrl_c() => {
                if result.is_ok() {
                    tracing::warn!("Interrupt received, finishing running tasks");
                    cancel.cancel();
                }
            }
        }
    });
}

/// One line per finished image.
pub fn completion_line(report: &ImageReport) -> String {
    let path = report.source.display();

    if let Some(failure) = report.image_failure() {
        return format!("{} {}: {}", style("✗").red(), path, failure.message);
    }

    let ok = report.succeeded().count();
    let failed: Vec<String> = report
        .failed_operations()
        .map(|(kind, failure)| format!("{kind} ({})", failure.message))
        .collect();

    if failed.is_empty() {
        format!(
            "{} {} ({} ops, {} ms)",
            style("✓").green(),
            path,
            ok,
            report.elapsed_ms
        )
    } else {
        format!(
            "{} {}: {}/{} ops succeeded; failed: {}",
            style("!").yellow(),
            path,
            ok,
            ok + failed.len(),
            failed.join(", ")
        )
    }
}

/// Serialize the report to a file or stdout.
fn write_report(report: &BatchReport, target: &ReportTarget<'_>) -> anyhow::Result<()> {
    if target.path == Path::new("-") {
        let stdout = std::io::stdout();
        let mut writer = OutputWriter::new(stdout.lock(), target.format, target.pretty);
        writer.write_report(report)?;
        writer.flush()?;
        return Ok(());
    }

    let file = File::create(target.path)
        .with_context(|| format!("Failed to create report file {:?}", target.path))?;
    let mut writer = OutputWriter::new(BufWriter::new(file), target.format, target.pretty);
    writer.write_report(report)?;
    writer.flush()?;
    tracing::info!("Report written to {:?}", target.path);
    Ok(())
}

/// Create a progress bar for batch processing.
fn create_progress_bar(total: u64) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(total);
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
    )
    .map(|s| s.progress_chars("##-"))
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.set_message("starting...");
    pb
}

/// Print a formatted summary table after batch processing.
fn print_summary(stats: &BatchStats) {
    let seconds = stats.elapsed_ms as f64 / 1000.0;
    let rate = if seconds > 0.0 {
        stats.images_total as f64 / seconds
    } else {
        0.0
    };

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Images:       {:>8}", stats.images_total);
    eprintln!("    Processed:    {:>8}", stats.images_processed);
    if stats.images_failed > 0 {
        eprintln!(
            "    Failed:       {:>8}",
            style(stats.images_failed).red()
        );
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Outputs:      {:>8}", stats.tasks_succeeded);
    if stats.tasks_failed > 0 {
        eprintln!(
            "    Task errors:  {:>8}",
            style(stats.tasks_failed).yellow()
        );
    }
    eprintln!("    Duration:     {:>7.1}s", seconds);
    eprintln!("    Rate:         {:>7.1} img/sec", rate);
    eprintln!("  ====================================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::{ErrorKind, FailureRecord, ImageOutcome, OperationKind};
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn processed(failed: BTreeMap<OperationKind, FailureRecord>) -> ImageReport {
        let mut succeeded = BTreeMap::new();
        succeeded.insert(OperationKind::Blur, PathBuf::from("out/blur_image.png"));
        ImageReport {
            source: PathBuf::from("photo.png"),
            dimensions: Some((4, 4)),
            outcome: ImageOutcome::Processed { succeeded, failed },
            elapsed_ms: 12,
        }
    }

    #[test]
    fn completion_line_for_full_success() {
        console::set_colors_enabled(false);
        let line = completion_line(&processed(BTreeMap::new()));
        assert_eq!(line, "✓ photo.png (1 ops, 12 ms)");
    }

    #[test]
    fn completion_line_lists_failed_operations() {
        console::set_colors_enabled(false);
        let mut failed = BTreeMap::new();
        failed.insert(
            OperationKind::Canny,
            FailureRecord::new(ErrorKind::Write, "disk full"),
        );
        let line = completion_line(&processed(failed));
        assert!(line.starts_with("! photo.png: 1/2 ops succeeded"));
        assert!(line.contains("canny (disk full)"));
    }

    #[test]
    fn completion_line_for_image_failure() {
        console::set_colors_enabled(false);
        let report = ImageReport::failed(
            Path::new("bad.png"),
            FailureRecord::new(ErrorKind::Decode, "corrupt header"),
            0,
        );
        assert_eq!(completion_line(&report), "✗ bad.png: corrupt header");
    }

    #[test]
    fn report_written_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.jsonl");
        let report = BatchReport::new(vec![processed(BTreeMap::new())], 5);

        write_report(
            &report,
            &ReportTarget {
                path: &path,
                format: CoreOutputFormat::JsonLines,
                pretty: false,
            },
        )
        .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }
}
