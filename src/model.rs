use std::path::Path;

use crate::{
    config::{Config, UniformMaskPolicy},
    errors::{RembgError, Result},
    traits::SegmentationModel,
};
use image::{imageops, imageops::FilterType, DynamicImage, GenericImageView, GrayImage, RgbImage};
use ndarray::prelude::*;
use nshare::AsNdarray3;
use ort::session::{builder::SessionBuilder, Session as OrtSession};
use ort::value::TensorRef;
use parking_lot::Mutex;
use tracing::{debug, info};

/// Pre- and post-processing constants bound to a model.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub mean: [f32; 3],
    pub std: [f32; 3],
    /// Square inference resolution.
    pub image_size: u32,
    pub uniform_mask: UniformMaskPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mean: [0.485, 0.456, 0.406],
            std: [0.229, 0.224, 0.225],
            image_size: 320,
            uniform_mask: UniformMaskPolicy::Foreground,
        }
    }
}

/// A loaded segmentation model together with its processing configuration.
pub struct Session {
    name: String,
    config: SessionConfig,
    input_name: String,
    output_name: String,
    session: Mutex<OrtSession>,
}

impl Session {
    /// Resolve and load the model named in `config`.
    ///
    /// Fails with [`RembgError::ModelNotFound`] before touching the runtime
    /// if the model file does not exist.
    pub fn new(config: &Config) -> Result<Self> {
        let session_config = SessionConfig {
            uniform_mask: config.uniform_mask,
            ..SessionConfig::default()
        };
        Self::from_file(
            &config.model_name,
            &config.resolved_model_path(),
            session_config,
            config.device_id,
        )
    }

    pub fn from_file(
        name: &str,
        model_path: &Path,
        config: SessionConfig,
        device_id: i32,
    ) -> Result<Self> {
        if !model_path.is_file() {
            return Err(RembgError::ModelNotFound {
                path: model_path.to_path_buf(),
            });
        }

        let mut session = SessionBuilder::new()
            .map_err(|e| RembgError::model("session builder initialization", e))?
            .with_execution_providers(execution_providers(device_id))
            .map_err(|e| RembgError::model("execution provider registration", e))?
            .with_memory_pattern(true)
            .map_err(|e| RembgError::model("memory pattern configuration", e))?
            .commit_from_file(model_path)
            .map_err(|e| {
                RembgError::model(format!("model load: {}", model_path.display()), e)
            })?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or_else(|| RembgError::model("model input lookup", "model has no inputs"))?;
        let output_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .ok_or_else(|| RembgError::model("model output lookup", "model has no outputs"))?;

        // warm up
        let size = config.image_size as usize;
        let data = Array4::<f32>::zeros((1, 3, size, size));
        session
            .run(ort::inputs![input_name.as_str() => TensorRef::from_array_view(&data)?])
            .map_err(|e| RembgError::model("warm-up inference", e))?;

        info!(
            model = name,
            path = %model_path.display(),
            input = %input_name,
            output = %output_name,
            "model loaded"
        );

        Ok(Self {
            name: name.to_string(),
            config,
            input_name,
            output_name,
            session: Mutex::new(session),
        })
    }

    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Raw model output for an NCHW input tensor.
    pub fn infer(&self, tensor: ArrayView4<f32>) -> Result<Array4<f32>> {
        let mut session = self.session.lock();
        let outputs = session.run(ort::inputs![
            self.input_name.as_str() => TensorRef::from_array_view(&tensor.as_standard_layout())?
        ])?;
        Ok(outputs[self.output_name.as_str()]
            .try_extract_array::<f32>()?
            .into_dimensionality::<Ix4>()?
            .to_owned())
    }
}

impl SegmentationModel for Session {
    fn model_name(&self) -> &str {
        &self.name
    }

    fn predict(&self, image: &DynamicImage) -> Result<Vec<GrayImage>> {
        let tensor = preprocess(&image.to_rgb8(), &self.config);
        let output = self.infer(tensor.view())?;
        debug!(model = %self.name, shape = ?output.shape(), "inference done");

        let (width, height) = image.dimensions();
        let mask = postprocess_mask(output.view(), self.config.uniform_mask, width, height)?;
        Ok(vec![mask])
    }
}

#[cfg(any(feature = "cuda", feature = "tensorrt"))]
fn execution_providers(device_id: i32) -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    use ort::execution_providers::{CUDAExecutionProvider, TensorRTExecutionProvider};

    vec![
        TensorRTExecutionProvider::default()
            .with_device_id(device_id)
            .build(),
        CUDAExecutionProvider::default()
            .with_device_id(device_id)
            .build(),
    ]
}

#[cfg(not(any(feature = "cuda", feature = "tensorrt")))]
fn execution_providers(_device_id: i32) -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    Vec::new()
}

/// Resize to the model resolution and standardize into a `1x3xHxW` tensor.
///
/// Pixel values are divided by the image's own maximum (floored at `1e-6`)
/// before the mean/std standardization.
pub fn preprocess(image: &RgbImage, config: &SessionConfig) -> Array4<f32> {
    let size = config.image_size;
    let image = imageops::resize(image, size, size, FilterType::Lanczos3);

    let pixels = image.as_ndarray3();
    let max = f32::from(pixels.iter().copied().max().unwrap_or(0)).max(1e-6);

    let mut tensor = pixels.mapv(|v| f32::from(v) / max).insert_axis(Axis(0));
    for (c, mut channel) in tensor.axis_iter_mut(Axis(1)).enumerate() {
        let (mean, std) = (config.mean[c], config.std[c]);
        channel.mapv_inplace(|v| (v - mean) / std);
    }
    tensor
}

/// Min-max rescale channel 0 of the model output into an 8-bit mask at
/// `width` x `height`.
///
/// Output without contrast (or with non-finite values) gets `policy` instead.
pub fn postprocess_mask(
    output: ArrayView4<f32>,
    policy: UniformMaskPolicy,
    width: u32,
    height: u32,
) -> Result<GrayImage> {
    let (batch, channels, rows, cols) = output.dim();
    if batch == 0 || channels == 0 || rows == 0 || cols == 0 {
        return Err(RembgError::model(
            "mask extraction",
            format!("unexpected output shape {:?}", output.shape()),
        ));
    }

    let pred = output.slice(s![0, 0, .., ..]);
    let (min, max) = pred
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = max - min;

    let pixels: Vec<u8> = if range.is_finite() && range > 0.0 {
        pred.iter()
            .map(|&v| {
                let v = (v - min) / range;
                if v.is_finite() {
                    (v * 255.0) as u8
                } else {
                    0
                }
            })
            .collect()
    } else {
        let fill = match policy {
            UniformMaskPolicy::Foreground => u8::MAX,
            UniformMaskPolicy::Background => 0,
        };
        debug!(min, max, ?policy, "model output has no contrast");
        vec![fill; rows * cols]
    };

    let mask = GrayImage::from_raw(cols as u32, rows as u32, pixels).ok_or_else(|| {
        RembgError::model("mask extraction", "mask buffer does not match output shape")
    })?;
    Ok(imageops::resize(&mask, width, height, FilterType::Lanczos3))
}
