//! Pipeline orchestration.
//!
//! - [`builder`]: `Pipeline` and `PipelineBuilder`
//! - [`progress`]: stages, progress updates and reporters

pub mod builder;
pub mod progress;

pub use builder::{Pipeline, PipelineBuilder, PipelineResult};
pub use progress::{ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate};
