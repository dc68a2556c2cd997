//! Batch processing pipeline.
//!
//! - **coordinator**: validates a batch and fans images out under a bounded pool
//! - **executor**: decodes one image and fans its operations out
//! - **task**: one operation on one decoded image
//! - **sink**: output directory, naming, and atomic writes
//! - **decode**: load and decode images with limits and a timeout
//! - **validate**: pre-decode checks
//! - **discovery**: expand directories into image files

pub mod coordinator;
pub mod decode;
pub mod discovery;
pub mod executor;
pub mod sink;
pub mod task;
pub mod validate;

// Re-exports for convenient access
pub use coordinator::{BatchCoordinator, BatchRequest};
pub use decode::{DecodedImage, ImageDecoder};
pub use discovery::FileDiscovery;
pub use executor::{ImageExecutor, ImagePlan};
pub use sink::{ImageFormatChoice, NamingScheme, ResultSink};
pub use task::Task;
pub use validate::Validator;
