//! One (image, operation) unit of work.

use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OwnedSemaphorePermit;
use tokio::time::timeout;

use crate::error::{TaskError, TaskResult};
use crate::operation::{OperationKind, OperationParams, OperationRegistry};

use super::sink::ResultSink;

const RUNNING: u8 = 0;
const COMMITTED: u8 = 1;
const ABANDONED: u8 = 2;

/// A single operation applied to a shared, read-only decoded image.
#[derive(Debug, Clone)]
pub struct Task {
    /// Input path, for error reporting
    pub source_path: PathBuf,
    /// Decoded source, shared by every task on the same image
    pub source: Arc<DynamicImage>,
    pub params: OperationParams,
    /// Where the result lands
    pub output: PathBuf,
}

impl Task {
    /// Apply the operation and write the result.
    ///
    /// Pixel work and encoding run on the blocking pool, which holds `permit`
    /// until the work really ends. A deadline, when given, bounds the whole
    /// task. A task that misses it is reported as timed out and leaves no
    /// output file: whichever side settles the shared state first wins, and a
    /// write that lands after the deadline is removed again.
    pub async fn execute(
        self,
        registry: OperationRegistry,
        sink: Arc<ResultSink>,
        permit: OwnedSemaphorePermit,
        deadline: Option<Duration>,
    ) -> TaskResult<PathBuf> {
        let Task {
            source_path,
            source,
            params,
            output,
        } = self;
        let kind = params.kind();
        let state = Arc::new(AtomicU8::new(RUNNING));

        let mut work = tokio::task::spawn_blocking({
            let output = output.clone();
            let state = Arc::clone(&state);
            let source_path = source_path.clone();
            let limit = deadline.unwrap_or_default();
            move || -> TaskResult<PathBuf> {
                let _permit = permit;

                let result = registry.apply(&params, &source)?;
                if state.load(Ordering::Acquire) == ABANDONED {
                    return Err(timed_out(&source_path, kind, limit));
                }
                sink.write(&result, &output)?;
                if state
                    .compare_exchange(RUNNING, COMMITTED, Ordering::AcqRel, Ordering::Acquire)
                    .is_err()
                {
                    let _ = std::fs::remove_file(&output);
                    return Err(timed_out(&source_path, kind, limit));
                }
                Ok(output)
            }
        });

        let joined = match deadline {
            Some(limit) => match timeout(limit, &mut work).await {
                Ok(joined) => joined,
                Err(_) => {
                    let settled = state.compare_exchange(
                        RUNNING,
                        ABANDONED,
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    );
                    if settled.is_ok() {
                        tracing::warn!(
                            "{} for {:?} missed its {}ms deadline",
                            kind,
                            source_path,
                            limit.as_millis()
                        );
                        return Err(timed_out(&source_path, kind, limit));
                    }
                    // Committed just before the deadline; the file stands.
                    work.await
                }
            },
            None => work.await,
        };

        joined.map_err(|e| panicked(&source_path, kind, e))?
    }
}

fn timed_out(path: &Path, kind: OperationKind, limit: Duration) -> TaskError {
    TaskError::Timeout {
        path: path.to_path_buf(),
        stage: kind.to_string(),
        timeout_ms: limit.as_millis() as u64,
    }
}

fn panicked(path: &Path, kind: OperationKind, err: tokio::task::JoinError) -> TaskError {
    TaskError::Panicked {
        path: path.to_path_buf(),
        message: format!("{kind} worker failed: {err}"),
    }
}
