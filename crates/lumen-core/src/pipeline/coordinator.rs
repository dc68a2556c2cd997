//! Batch fan-out: validate the request, then process images under a bounded pool.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::{BatchError, OperationError, TaskError};
use crate::operation::{OperationParams, OperationRegistry};
use crate::types::{BatchReport, FailureRecord, ImageReport};

use super::decode::ImageDecoder;
use super::executor::{elapsed_ms, ImageExecutor, ImagePlan};
use super::sink::{source_labels, ImageFormatChoice, ResultSink};

/// Inputs, destination and operations for one run.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    inputs: Vec<PathBuf>,
    output_dir: PathBuf,
    operations: Vec<String>,
}

impl BatchRequest {
    /// Build a request, collapsing repeated inputs and operations.
    ///
    /// The first occurrence wins. Operation names are compared the way they
    /// are parsed (case-insensitive, `-` same as `_`).
    pub fn new<S: Into<String>>(
        inputs: Vec<PathBuf>,
        output_dir: impl Into<PathBuf>,
        operations: impl IntoIterator<Item = S>,
    ) -> Self {
        let mut seen_inputs = HashSet::new();
        let inputs = inputs
            .into_iter()
            .filter(|input| {
                let fresh = seen_inputs.insert(input.clone());
                if !fresh {
                    tracing::warn!("Ignoring repeated input {:?}", input);
                }
                fresh
            })
            .collect();

        let mut seen_ops = HashSet::new();
        let operations = operations
            .into_iter()
            .map(Into::into)
            .filter(|name: &String| {
                let fresh = seen_ops.insert(name.trim().to_lowercase().replace('-', "_"));
                if !fresh {
                    tracing::warn!("Ignoring repeated operation '{}'", name);
                }
                fresh
            })
            .collect();

        Self {
            inputs,
            output_dir: output_dir.into(),
            operations,
        }
    }

    pub fn inputs(&self) -> &[PathBuf] {
        &self.inputs
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn operations(&self) -> &[String] {
        &self.operations
    }
}

/// Runs batches against a fixed configuration.
pub struct BatchCoordinator {
    registry: OperationRegistry,
    config: Config,
    format: ImageFormatChoice,
}

impl BatchCoordinator {
    /// Create a coordinator from configuration.
    pub fn new(config: &Config) -> Self {
        let format = ImageFormatChoice::from_extension(&config.output.format).unwrap_or_else(|| {
            tracing::warn!(
                "Unknown output format '{}', writing png",
                config.output.format
            );
            ImageFormatChoice::default()
        });
        Self {
            registry: OperationRegistry::new(),
            config: config.clone(),
            format,
        }
    }

    /// Resolve every requested operation against the configured parameters.
    pub fn resolve_operations(
        &self,
        names: &[String],
    ) -> Result<Vec<OperationParams>, OperationError> {
        names
            .iter()
            .map(|name| {
                let kind = self.registry.lookup(name)?;
                self.registry
                    .resolve(kind, &self.config.operations.params_for(kind))
            })
            .collect()
    }

    /// Run a batch to completion.
    pub async fn run(
        &self,
        request: &BatchRequest,
        cancel: CancellationToken,
    ) -> Result<BatchReport, BatchError> {
        self.run_with_progress(request, cancel, |_| {}).await
    }

    /// Run a batch, calling `on_image` once per finished image.
    ///
    /// All preconditions are checked before the first image is dispatched;
    /// when one fails nothing is written. After that the run always yields a
    /// report with exactly one entry per input.
    pub async fn run_with_progress<F>(
        &self,
        request: &BatchRequest,
        cancel: CancellationToken,
        on_image: F,
    ) -> Result<BatchReport, BatchError>
    where
        F: Fn(&ImageReport) + Send + Sync + 'static,
    {
        let start = Instant::now();

        if request.inputs().is_empty() {
            return Err(BatchError::EmptyInput);
        }
        let operations = self.resolve_operations(request.operations())?;
        let first = operations.first().ok_or(BatchError::NoOperations)?.kind();

        let labels = source_labels(
            request.inputs(),
            self.config.output.naming,
            request.output_dir(),
            first,
            &self.format,
        )?;
        let sink = Arc::new(ResultSink::prepare(
            request.output_dir(),
            self.format.clone(),
            self.config.output.jpeg_quality,
        )?);

        let image_workers = self.config.processing.image_workers();
        let op_workers = self.config.processing.operation_workers();
        tracing::info!(
            "Processing {} images x {} operations ({} image workers, {} operation workers)",
            request.inputs().len(),
            operations.len(),
            image_workers,
            op_workers
        );

        let executor = Arc::new(ImageExecutor::new(
            self.registry,
            ImageDecoder::new(self.config.limits.clone()),
            Arc::clone(&sink),
            Arc::new(Semaphore::new(op_workers)),
            self.config.limits.operation_timeout_ms.map(Duration::from_millis),
        ));
        let image_permits = Arc::new(Semaphore::new(image_workers));
        let on_image = Arc::new(on_image);

        let mut reports = Vec::with_capacity(request.inputs().len());
        let mut join_set = JoinSet::new();

        for (input, label) in request.inputs().iter().zip(labels) {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = Arc::clone(&image_permits).acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                let report = ImageReport::failed(
                    input,
                    FailureRecord::from(&TaskError::Cancelled(input.clone())),
                    0,
                );
                on_image(&report);
                reports.push(report);
                continue;
            };

            let plan = ImagePlan {
                source: input.clone(),
                tasks: operations
                    .iter()
                    .map(|params| {
                        let output = sink.output_path(label.as_deref(), params.kind());
                        (params.clone(), output)
                    })
                    .collect(),
            };
            let executor = Arc::clone(&executor);
            let cancel = cancel.clone();
            let on_image = Arc::clone(&on_image);

            join_set.spawn(async move {
                let report = executor.process(&plan, &cancel).await;
                drop(permit);
                on_image(&report);
                report
            });
        }

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(report) => reports.push(report),
                Err(e) => tracing::error!("Image worker failed: {}", e),
            }
        }

        // An image lost to a join error still gets a record.
        let reported: HashSet<PathBuf> = reports.iter().map(|r| r.source.clone()).collect();
        for input in request.inputs() {
            if !reported.contains(input) {
                let err = TaskError::Panicked {
                    path: input.clone(),
                    message: "image worker did not report a result".to_string(),
                };
                let report = ImageReport::failed(input, FailureRecord::from(&err), 0);
                on_image(&report);
                reports.push(report);
            }
        }

        let report = BatchReport::new(reports, elapsed_ms(start));
        tracing::info!(
            "Batch finished: {} images processed, {} failed, {} tasks succeeded, {} tasks failed",
            report.stats.images_processed,
            report.stats.images_failed,
            report.stats.tasks_succeeded,
            report.stats.tasks_failed
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{OperationKind, ParamValue};
    use crate::pipeline::sink::NamingScheme;
    use crate::types::{ErrorKind, ImageOutcome};
    use image::{GenericImageView, GrayImage, Luma, Rgb, RgbImage};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn write_gradient(path: &Path, width: u32, height: u32) {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 7 % 256) as u8, (y * 5 % 256) as u8, ((x + y) % 256) as u8])
        })
        .save(path)
        .unwrap();
    }

    fn config_with_workers(images: usize, ops: usize) -> Config {
        let mut config = Config::default();
        config.processing.parallel_workers = images;
        config.processing.operation_workers = ops;
        config
    }

    fn files_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .map(|entries| {
                entries
                    .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_resize_and_quarter_turn_on_single_image() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("photo.png");
        // 100 rows by 200 columns
        write_gradient(&input, 200, 100);
        let out = dir.path().join("out");

        let mut config = Config::default();
        config
            .operations
            .set(OperationKind::Resize, "scale_x", ParamValue::Number(0.5));
        config
            .operations
            .set(OperationKind::Resize, "scale_y", ParamValue::Number(0.5));
        config
            .operations
            .set(OperationKind::Rotate, "angle", ParamValue::Number(90.0));

        let request = BatchRequest::new(vec![input.clone()], &out, ["resize", "rotate"]);
        let report = BatchCoordinator::new(&config)
            .run(&request, CancellationToken::new())
            .await
            .unwrap();

        assert!(report.get(&input).unwrap().is_complete_success());
        let resized = image::open(out.join("resize_image.png")).unwrap();
        assert_eq!(resized.dimensions(), (100, 50));
        let rotated = image::open(out.join("rotate_image.png")).unwrap();
        assert_eq!(rotated.dimensions(), (100, 200));
    }

    #[tokio::test]
    async fn test_decode_failure_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let good_a = dir.path().join("a.png");
        let good_b = dir.path().join("b.png");
        let bad = dir.path().join("broken.png");
        write_gradient(&good_a, 16, 16);
        write_gradient(&good_b, 24, 8);
        std::fs::write(&bad, b"not an image at all").unwrap();
        let out = dir.path().join("out");

        let request = BatchRequest::new(
            vec![good_a.clone(), bad.clone(), good_b.clone()],
            &out,
            ["blur", "threshold"],
        );
        let report = BatchCoordinator::new(&config_with_workers(2, 2))
            .run(&request, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.len(), 3);
        assert!(report.get(&good_a).unwrap().is_complete_success());
        assert!(report.get(&good_b).unwrap().is_complete_success());
        assert_eq!(
            report.get(&bad).unwrap().image_failure().unwrap().kind,
            ErrorKind::Decode
        );
        assert_eq!(report.stats.images_processed, 2);
        assert_eq!(report.stats.tasks_succeeded, 4);
        assert_eq!(
            files_in(&out),
            vec![
                "a_blur_image.png",
                "a_threshold_image.png",
                "b_blur_image.png",
                "b_threshold_image.png",
            ]
        );
    }

    #[tokio::test]
    async fn test_pool_size_does_not_change_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        let inputs: Vec<PathBuf> = (0..4)
            .map(|i| {
                let path = dir.path().join(format!("img{i}.png"));
                write_gradient(&path, 20 + i, 12);
                path
            })
            .collect();
        let ops = ["blur", "canny", "erosion", "contrast_brightness"];

        let serial_out = dir.path().join("serial");
        let serial = BatchCoordinator::new(&config_with_workers(1, 1))
            .run(
                &BatchRequest::new(inputs.clone(), &serial_out, ops),
                CancellationToken::new(),
            )
            .await
            .unwrap();

        let wide_out = dir.path().join("wide");
        let wide = BatchCoordinator::new(&config_with_workers(8, 16))
            .run(
                &BatchRequest::new(inputs.clone(), &wide_out, ops),
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(serial.stats.tasks_succeeded, 16);
        assert_eq!(wide.stats.tasks_succeeded, 16);
        assert_eq!(files_in(&serial_out), files_in(&wide_out));
        for name in files_in(&serial_out) {
            let a = std::fs::read(serial_out.join(&name)).unwrap();
            let b = std::fs::read(wide_out.join(&name)).unwrap();
            assert_eq!(a, b, "{name} differs between pool sizes");
        }
    }

    #[tokio::test]
    async fn test_unknown_operation_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.png");
        write_gradient(&input, 8, 8);
        let out = dir.path().join("out");

        let request = BatchRequest::new(vec![input], &out, ["blur", "sharpen"]);
        let err = BatchCoordinator::new(&Config::default())
            .run(&request, CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            BatchError::Operation(OperationError::Unsupported { ref name }) if name == "sharpen"
        ));
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn test_invalid_parameters_abort_before_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.png");
        write_gradient(&input, 8, 8);

        let mut config = Config::default();
        config
            .operations
            .set(OperationKind::Blur, "kernel_size", ParamValue::Number(0.0));
        let request = BatchRequest::new(vec![input], dir.path().join("out"), ["blur"]);
        let err = BatchCoordinator::new(&config)
            .run(&request, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BatchError::Operation(OperationError::InvalidParameters { .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_request_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = BatchCoordinator::new(&Config::default());

        let no_inputs = BatchRequest::new(vec![], dir.path(), ["blur"]);
        assert!(matches!(
            coordinator.run(&no_inputs, CancellationToken::new()).await,
            Err(BatchError::EmptyInput)
        ));

        let no_ops = BatchRequest::new(
            vec![dir.path().join("a.png")],
            dir.path(),
            Vec::<String>::new(),
        );
        assert!(matches!(
            coordinator.run(&no_ops, CancellationToken::new()).await,
            Err(BatchError::NoOperations)
        ));
    }

    #[tokio::test]
    async fn test_operation_naming_collision_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        write_gradient(&a, 8, 8);
        write_gradient(&b, 8, 8);
        let out = dir.path().join("out");

        let mut config = Config::default();
        config.output.naming = NamingScheme::Operation;
        let request = BatchRequest::new(vec![a, b], &out, ["blur"]);
        let err = BatchCoordinator::new(&config)
            .run(&request, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BatchError::OutputCollision { .. }));
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn test_cancelled_batch_reports_every_input() {
        let dir = tempfile::tempdir().unwrap();
        let inputs: Vec<PathBuf> = (0..3)
            .map(|i| {
                let path = dir.path().join(format!("{i}.png"));
                write_gradient(&path, 8, 8);
                path
            })
            .collect();
        let out = dir.path().join("out");

        let cancel = CancellationToken::new();
        cancel.cancel();
        let report = BatchCoordinator::new(&Config::default())
            .run(&BatchRequest::new(inputs, &out, ["blur"]), cancel)
            .await
            .unwrap();

        assert_eq!(report.len(), 3);
        for image in report.images.values() {
            assert_eq!(image.image_failure().unwrap().kind, ErrorKind::Cancelled);
        }
        assert!(files_in(&out).is_empty());
    }

    #[tokio::test]
    async fn test_repeated_operations_and_inputs_collapse() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.png");
        GrayImage::from_pixel(10, 10, Luma([200])).save(&input).unwrap();
        let out = dir.path().join("out");

        let request = BatchRequest::new(
            vec![input.clone(), input.clone()],
            &out,
            ["threshold", "THRESHOLD", "dilation", "dilation"],
        );
        assert_eq!(request.inputs().len(), 1);
        assert_eq!(request.operations().len(), 2);

        let report = BatchCoordinator::new(&Config::default())
            .run(&request, CancellationToken::new())
            .await
            .unwrap();
        match &report.get(&input).unwrap().outcome {
            ImageOutcome::Processed { succeeded, failed } => {
                assert_eq!(succeeded.len(), 2);
                assert!(failed.is_empty());
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        let thresholded = image::open(out.join("threshold_image.png"))
            .unwrap()
            .to_luma8();
        assert!(thresholded.pixels().all(|p| p[0] == 255));
    }

    #[tokio::test]
    async fn test_progress_called_once_per_image() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        write_gradient(&a, 8, 8);
        let missing = dir.path().join("missing.png");

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let report = BatchCoordinator::new(&Config::default())
            .run_with_progress(
                &BatchRequest::new(vec![a, missing], dir.path().join("out"), ["rotate"]),
                CancellationToken::new(),
                move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                },
            )
            .await
            .unwrap();

        assert_eq!(report.len(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
