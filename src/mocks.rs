use crate::errors::Result;
use crate::traits::SegmentationModel;
use image::{DynamicImage, GenericImageView, GrayImage, Luma};

/// Test model marking a centered rectangle as foreground.
///
/// `margin` is the fraction of width/height left as background on each side.
#[derive(Debug, Clone)]
pub struct MockSegmentationModel {
    pub margin: f32,
}

impl MockSegmentationModel {
    pub const fn new(margin: f32) -> Self {
        Self { margin }
    }

    /// Foreground box `[x, y, w, h]` the mask will contain for an image of this size.
    pub fn foreground_bounds(&self, width: u32, height: u32) -> [u32; 4] {
        let x = (width as f32 * self.margin) as u32;
        let y = (height as f32 * self.margin) as u32;
        let w = width.saturating_sub(2 * x).max(1);
        let h = height.saturating_sub(2 * y).max(1);
        [x, y, w, h]
    }
}

impl SegmentationModel for MockSegmentationModel {
    fn model_name(&self) -> &str {
        "mock"
    }

    fn predict(&self, image: &DynamicImage) -> Result<Vec<GrayImage>> {
        let (width, height) = image.dimensions();
        let [x, y, w, h] = self.foreground_bounds(width, height);
        let mask = GrayImage::from_fn(width, height, |px, py| {
            let inside = px >= x && px < x + w && py >= y && py < y + h;
            // soft ring around the box exercises the hardening step
            let near = px + 1 >= x && px <= x + w && py + 1 >= y && py <= y + h;
            match (inside, near) {
                (true, _) => Luma([230]),
                (false, true) => Luma([60]),
                _ => Luma([0]),
            }
        });
        Ok(vec![mask])
    }
}

/// Model whose predictions always fail, for abort-on-error tests.
#[derive(Debug, Clone, Default)]
pub struct FailingSegmentationModel;

impl SegmentationModel for FailingSegmentationModel {
    fn model_name(&self) -> &str {
        "failing"
    }

    fn predict(&self, _image: &DynamicImage) -> Result<Vec<GrayImage>> {
        Err(crate::errors::RembgError::model(
            "mock inference",
            "inference is not available",
        ))
    }
}

pub const fn create_mock_model() -> MockSegmentationModel {
    MockSegmentationModel::new(0.25)
}
