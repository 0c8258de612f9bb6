use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ImageEncoder};
use tracing::debug;

use crate::errors::{RembgError, Result};

/// Camera raw extensions decoded through the demosaicing pipeline.
pub const RAW_EXTENSIONS: [&str; 4] = ["cr2", "nef", "arw", "dng"];

pub fn is_raw_extension(ext: &str) -> bool {
    RAW_EXTENSIONS
        .iter()
        .any(|raw| raw.eq_ignore_ascii_case(ext))
}

/// Lowercased extension of `path`, if it has a UTF-8 one.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

pub fn is_raw_file(path: &Path) -> bool {
    extension_of(path).is_some_and(|ext| is_raw_extension(&ext))
}

/// Decode `path`, sending camera raw files through the raw pipeline.
pub fn load(path: &Path, raw_enabled: bool) -> Result<DynamicImage> {
    if is_raw_file(path) {
        if !raw_enabled {
            return Err(RembgError::RawUnsupported {
                path: path.to_path_buf(),
            });
        }
        return load_raw(path);
    }

    image::open(path).map_err(|e| RembgError::image(path.display().to_string(), "image decode", e))
}

#[cfg(feature = "raw")]
fn load_raw(path: &Path) -> Result<DynamicImage> {
    debug!(path = %path.display(), "decoding camera raw");
    // 0 disables downscaling in the pipeline
    let decoded = imagepipe::simple_decode_8bit(path, 0, 0)
        .map_err(|e| RembgError::image(path.display().to_string(), "raw decode", e))?;

    let rgb = image::RgbImage::from_raw(decoded.width as u32, decoded.height as u32, decoded.data)
        .ok_or_else(|| {
            RembgError::image(
                path.display().to_string(),
                "raw decode",
                "decoded buffer does not match its dimensions",
            )
        })?;
    Ok(DynamicImage::ImageRgb8(rgb))
}

#[cfg(not(feature = "raw"))]
fn load_raw(path: &Path) -> Result<DynamicImage> {
    Err(RembgError::RawUnsupported {
        path: path.to_path_buf(),
    })
}

/// Write `image` as PNG. `optimize` trades encoding time for the smallest file.
pub fn save_png(image: &DynamicImage, path: &Path, optimize: bool) -> Result<()> {
    let file = File::create(path).map_err(|e| RembgError::FileSystem {
        path: path.to_path_buf(),
        operation: "create output file".to_string(),
        source: e,
    })?;

    let writer = BufWriter::new(file);
    let encoder = if optimize {
        PngEncoder::new_with_quality(writer, CompressionType::Best, FilterType::Adaptive)
    } else {
        PngEncoder::new(writer)
    };

    debug!(path = %path.display(), optimize, "encoding png");
    encoder
        .write_image(
            image.as_bytes(),
            image.width(),
            image.height(),
            image.color().into(),
        )
        .map_err(|e| RembgError::image(path.display().to_string(), "png encode", e))
}
