pub mod checkpoint;
pub mod error;
pub mod index;
pub mod launcher;
pub mod pipeline;
pub mod summary;

pub use checkpoint::{Checkpoint, LinkStore};
pub use error::CoreError;
pub use launcher::{BrowserLauncher, ChromiumLauncher, StaticLauncher};
pub use pipeline::{Pipeline, PipelineOptions, RunReport, Stage};
