use crate::errors::Result;
use image::{DynamicImage, GrayImage};

/// Segmentation model seen from the batch driver.
///
/// The driver only needs masks at the source resolution; tensor layout,
/// normalization constants and output rescaling stay behind this trait.
pub trait SegmentationModel {
    /// Identifier the model was resolved and registered under.
    fn model_name(&self) -> &str;

    /// Foreground masks for `image`, each with the same dimensions as `image`.
    ///
    /// Single-output models return exactly one mask.
    fn predict(&self, image: &DynamicImage) -> Result<Vec<GrayImage>>;
}
