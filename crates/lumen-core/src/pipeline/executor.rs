//! Per-image fan-out: decode once, run every requested operation, join.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::operation::{OperationParams, OperationRegistry};
use crate::types::{FailureRecord, ImageOutcome, ImageReport};

use super::decode::ImageDecoder;
use super::sink::ResultSink;
use super::task::Task;

/// Resolved work for one input image.
#[derive(Debug, Clone)]
pub struct ImagePlan {
    pub source: PathBuf,
    /// One entry per requested operation, with its output path
    pub tasks: Vec<(OperationParams, PathBuf)>,
}

/// Runs the tasks of one image, bounded by a batch-wide operation pool.
pub struct ImageExecutor {
    registry: OperationRegistry,
    decoder: ImageDecoder,
    sink: Arc<ResultSink>,
    op_permits: Arc<Semaphore>,
    op_timeout: Option<Duration>,
}

impl ImageExecutor {
    pub fn new(
        registry: OperationRegistry,
        decoder: ImageDecoder,
        sink: Arc<ResultSink>,
        op_permits: Arc<Semaphore>,
        op_timeout: Option<Duration>,
    ) -> Self {
        Self {
            registry,
            decoder,
            sink,
            op_permits,
            op_timeout,
        }
    }

    /// Process one image. Never fails: every requested operation ends up in
    /// either `succeeded` or `failed`, or the whole image is marked failed.
    pub async fn process(&self, plan: &ImagePlan, cancel: &CancellationToken) -> ImageReport {
        let start = Instant::now();
        let path = &plan.source;

        let decoded = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TaskError::Cancelled(path.clone())),
            decoded = self.decoder.decode(path) => decoded,
        };
        let decoded = match decoded {
            Ok(decoded) => decoded,
            Err(e) => {
                match e {
                    TaskError::Cancelled(_) => tracing::debug!("Skipped {:?}: cancelled", path),
                    _ => tracing::error!("Failed to decode {:?}: {}", path, e),
                }
                return ImageReport::failed(path, FailureRecord::from(&e), elapsed_ms(start));
            }
        };

        tracing::debug!(
            "Decoded {:?}: {}x{} {}",
            path,
            decoded.width,
            decoded.height,
            super::decode::format_to_string(decoded.format)
        );
        let dimensions = (decoded.width, decoded.height);
        let source = Arc::new(decoded.image);

        let mut failed = BTreeMap::new();
        let mut join_set = JoinSet::new();

        for (params, output) in &plan.tasks {
            let kind = params.kind();
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = self.op_permits.clone().acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                failed.insert(
                    kind,
                    FailureRecord::from(&TaskError::Cancelled(path.clone())),
                );
                continue;
            };

            let task = Task {
                source_path: path.clone(),
                source: Arc::clone(&source),
                params: params.clone(),
                output: output.clone(),
            };
            let registry = self.registry;
            let sink = Arc::clone(&self.sink);
            let deadline = self.op_timeout;

            tracing::debug!("Dispatching {} for {:?}", kind, path);
            join_set.spawn(async move {
                (kind, task.execute(registry, sink, permit, deadline).await)
            });
        }

        let mut succeeded = BTreeMap::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((kind, Ok(output))) => {
                    tracing::debug!("{} for {:?} wrote {:?}", kind, path, output);
                    succeeded.insert(kind, output);
                }
                Ok((kind, Err(e))) => {
                    tracing::error!("{} failed for {:?}: {}", kind, path, e);
                    failed.insert(kind, FailureRecord::from(&e));
                }
                Err(e) => tracing::error!("Task join error for {:?}: {}", path, e),
            }
        }

        // A task lost to a join error still gets a record.
        for (params, _) in &plan.tasks {
            let kind = params.kind();
            if !succeeded.contains_key(&kind) && !failed.contains_key(&kind) {
                let err = TaskError::Panicked {
                    path: path.clone(),
                    message: format!("{kind} task did not report a result"),
                };
                failed.insert(kind, FailureRecord::from(&err));
            }
        }

        tracing::info!(
            "Processed {:?}: {} succeeded, {} failed",
            path,
            succeeded.len(),
            failed.len()
        );

        ImageReport {
            source: path.clone(),
            dimensions: Some(dimensions),
            outcome: ImageOutcome::Processed { succeeded, failed },
            elapsed_ms: elapsed_ms(start),
        }
    }
}

pub(crate) fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
