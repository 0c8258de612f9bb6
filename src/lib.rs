//! Batch background removal with ONNX segmentation models.
//!
//! [`Session`] wraps a model behind the [`SegmentationModel`] trait and turns
//! an image into a foreground mask; [`ImageProcessor`] walks an input
//! directory, composites each mask as alpha, hardens and trims it, and writes
//! one PNG per input.

pub mod config;
pub mod errors;
pub mod image_processor;
pub mod imageops_ai;
pub mod loader;
pub mod mocks;
pub mod model;
mod progress_tracker;
pub mod traits;

pub use config::{Config, UniformMaskPolicy};
pub use errors::{RembgError, Result};
pub use image_processor::{discover, output_path, ImageProcessor, RunSummary};
pub use model::{Session, SessionConfig};
pub use traits::SegmentationModel;

/// Load the configured model and process the whole input directory.
pub fn run(config: Config) -> Result<RunSummary> {
    let session = Session::new(&config)?;
    ImageProcessor::new(session, config).process_directory()
}
