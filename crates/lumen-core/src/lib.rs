//! Lumen Core - concurrent batch image processing.
//!
//! Lumen applies a set of named operations to every image in a batch and
//! writes one result file per (image, operation) pair.
//!
//! # Architecture
//!
//! ```text
//! BatchCoordinator → ImageExecutor (per image) → Task (per operation) → OperationRegistry → ResultSink
//! ```
//!
//! Images and operations run in parallel under two bounded pools. A failure in
//! one task is recorded in the report and never stops its siblings.
//!
//! # Usage
//!
//! ```rust,ignore
//! use lumen_core::{BatchCoordinator, BatchRequest, Config};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> lumen_core::Result<()> {
//!     let config = Config::load()?;
//!     let request = BatchRequest::new(vec!["photo.jpg".into()], "out", ["blur", "canny"]);
//!
//!     let report = BatchCoordinator::new(&config)
//!         .run(&request, CancellationToken::new())
//!         .await?;
//!     println!("{} tasks succeeded", report.stats.tasks_succeeded);
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod error;
pub mod operation;
pub mod output;
pub mod pipeline;
pub mod types;

// Re-exports for convenient access
pub use config::Config;
pub use error::{BatchError, ConfigError, LumenError, OperationError, Result, TaskError};
pub use operation::{OperationKind, OperationParams, OperationRegistry};
pub use output::{OutputFormat, OutputWriter};
pub use pipeline::{BatchCoordinator, BatchRequest, NamingScheme};
pub use types::{BatchReport, BatchStats, ErrorKind, FailureRecord, ImageOutcome, ImageReport};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
