use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use image::{DynamicImage, RgbaImage};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::errors::{RembgError, Result};
use crate::imageops_ai::{harden_alpha, mask, trim_transparent};
use crate::loader::{self, extension_of, is_raw_extension};
use crate::progress_tracker::ProgressTracker;
use crate::traits::SegmentationModel;

/// Outcome of a directory run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: usize,
    /// Raw files left alone because raw decoding is unavailable.
    pub skipped_raw: usize,
}

/// Files in `input_dir` (not recursive) grouped by `extensions` in order.
///
/// Matching is case-insensitive; within a group files are sorted by name.
/// Groups for raw extensions are left out unless `raw_enabled`.
pub fn discover(input_dir: &Path, extensions: &[String], raw_enabled: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(input_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| RembgError::FileSystem {
            path: input_dir.to_path_buf(),
            operation: "read input directory".to_string(),
            source: e.into(),
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }

    let mut seen = HashSet::new();
    let groups = extensions
        .iter()
        .map(|ext| ext.trim_start_matches('.').to_lowercase())
        .filter(|ext| seen.insert(ext.clone()))
        .filter(|ext| raw_enabled || !is_raw_extension(ext));

    let mut discovered = Vec::new();
    for ext in groups {
        discovered.extend(
            files
                .iter()
                .filter(|path| extension_of(path).as_deref() == Some(ext.as_str()))
                .cloned(),
        );
    }
    Ok(discovered)
}

/// `<output_dir>/<stem>.png` for an input file.
pub fn output_path(input_file: &Path, output_dir: &Path) -> Result<PathBuf> {
    let stem = input_file
        .file_stem()
        .ok_or_else(|| RembgError::Configuration {
            message: format!("input file has no name: {}", input_file.display()),
        })?;
    // dots in the stem are part of the name
    let mut name = stem.to_os_string();
    name.push(".png");
    Ok(output_dir.join(name))
}

pub struct ImageProcessor<M: SegmentationModel> {
    model: M,
    config: Config,
}

impl<M: SegmentationModel> ImageProcessor<M> {
    pub const fn new(model: M, config: Config) -> Self {
        Self { model, config }
    }

    pub const fn config(&self) -> &Config {
        &self.config
    }

    pub const fn model(&self) -> &M {
        &self.model
    }

    /// Process every discovered file, stopping at the first failure.
    pub fn process_directory(&self) -> Result<RunSummary> {
        let input_dir = &self.config.input_dir;
        let output_dir = &self.config.output_dir;

        if !input_dir.is_dir() {
            return Err(RembgError::FileSystem {
                path: input_dir.clone(),
                operation: "open input directory".to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "input directory does not exist",
                ),
            });
        }

        fs::create_dir_all(output_dir).map_err(|e| RembgError::FileSystem {
            path: output_dir.clone(),
            operation: "create output directory".to_string(),
            source: e,
        })?;

        let raw_enabled = self.config.raw_enabled();
        let wants_raw = self.config.extensions.iter().any(|e| is_raw_extension(e));
        let skipped_raw = if !raw_enabled && wants_raw {
            warn!("raw decoding is unavailable; camera raw files will be skipped");
            self.count_raw_files()?
        } else {
            0
        };

        let image_files = discover(input_dir, &self.config.extensions, raw_enabled)?;
        if image_files.is_empty() {
            info!(input = %input_dir.display(), "no images to process");
            return Ok(RunSummary {
                processed: 0,
                skipped_raw,
            });
        }

        let tracker = ProgressTracker::new(image_files.len(), !self.config.no_progress);
        let mut written = HashSet::new();
        for input_file in &image_files {
            let output_file = output_path(input_file, output_dir)?;
            if !written.insert(output_file.clone()) {
                warn!(
                    output = %output_file.display(),
                    "output already written in this run; overwriting"
                );
            }

            tracker.start(input_file, &output_file);
            self.process_single_image(input_file, &output_file)?;
            tracker.finish_one();
        }
        tracker.finish();

        info!(
            processed = image_files.len(),
            skipped_raw,
            model = self.model.model_name(),
            "batch complete"
        );
        Ok(RunSummary {
            processed: image_files.len(),
            skipped_raw,
        })
    }

    pub fn process_single_image(&self, input_file: &Path, output_file: &Path) -> Result<()> {
        let image = loader::load(input_file, self.config.raw_enabled())?;

        let result = if self.config.only_mask {
            DynamicImage::ImageLuma8(self.predict_mask(&image, input_file)?)
        } else {
            let cutout = self.remove_background(&image, input_file)?;
            DynamicImage::ImageRgba8(self.postprocess(cutout))
        };

        loader::save_png(&result, output_file, !self.config.no_optimize)
    }

    /// Composite the predicted mask into `image` as its alpha channel.
    pub fn remove_background(&self, image: &DynamicImage, source: &Path) -> Result<RgbaImage> {
        let mask = self.predict_mask(image, source)?;
        mask::composite(&image.to_rgb8(), &mask, !self.config.no_premultiply).ok_or_else(|| {
            RembgError::image(
                source.display().to_string(),
                "mask composite",
                "mask and image dimensions differ",
            )
        })
    }

    /// Alpha hardening then trim, each as configured.
    pub fn postprocess(&self, mut image: RgbaImage) -> RgbaImage {
        if let Some(threshold) = self.config.hardening_threshold() {
            harden_alpha(&mut image, threshold);
        }
        if self.config.no_trim {
            image
        } else {
            trim_transparent(image)
        }
    }

    fn predict_mask(&self, image: &DynamicImage, source: &Path) -> Result<image::GrayImage> {
        self.model
            .predict(image)?
            .into_iter()
            .next()
            .ok_or_else(|| {
                RembgError::image(
                    source.display().to_string(),
                    "segmentation",
                    "model returned no mask",
                )
            })
    }

    fn count_raw_files(&self) -> Result<usize> {
        let raw_only: Vec<String> = self
            .config
            .extensions
            .iter()
            .filter(|e| is_raw_extension(e))
            .cloned()
            .collect();
        Ok(discover(&self.config.input_dir, &raw_only, true)?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::create_mock_model;
    use image::Rgba;
    use tempfile::TempDir;

    fn touch(dir: &Path, names: &[&str]) -> Result<()> {
        for name in names {
            fs::write(dir.join(name), b"")?;
        }
        Ok(())
    }

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .filter_map(|p| p.file_name()?.to_str().map(String::from))
            .collect()
    }

    #[test]
    fn test_discover_groups_by_extension_order() -> Result<()> {
        let temp_dir = TempDir::new()?;
        touch(temp_dir.path(), &["b.jpg", "a.png", "c.JPG", "d.txt", "e.tiff", "f.jpeg"])?;
        fs::create_dir(temp_dir.path().join("nested.png"))?;

        let extensions = ["png", "jpeg", "jpg", "cr2", "tiff"].map(String::from);
        let found = discover(temp_dir.path(), &extensions, true)?;
        assert_eq!(names(&found), ["a.png", "f.jpeg", "b.jpg", "c.JPG", "e.tiff"]);
        Ok(())
    }

    #[test]
    fn test_discover_skips_raw_when_unavailable() -> Result<()> {
        let temp_dir = TempDir::new()?;
        touch(temp_dir.path(), &["shot.CR2", "photo.jpg"])?;

        let extensions = ["jpg", "cr2"].map(String::from);
        assert_eq!(names(&discover(temp_dir.path(), &extensions, false)?), ["photo.jpg"]);
        assert_eq!(
            names(&discover(temp_dir.path(), &extensions, true)?),
            ["photo.jpg", "shot.CR2"]
        );
        Ok(())
    }

    #[test]
    fn test_discover_is_not_recursive_and_dedupes_groups() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let sub = temp_dir.path().join("sub");
        fs::create_dir(&sub)?;
        touch(&sub, &["deep.png"])?;
        touch(temp_dir.path(), &["top.png"])?;

        let extensions = ["png", ".PNG"].map(String::from);
        assert_eq!(names(&discover(temp_dir.path(), &extensions, true)?), ["top.png"]);
        Ok(())
    }

    #[test]
    fn test_output_path_replaces_extension() -> Result<()> {
        let out = Path::new("out");
        assert_eq!(output_path(Path::new("in/photo.jpg"), out)?, out.join("photo.png"));
        assert_eq!(output_path(Path::new("in/IMG_1.CR2"), out)?, out.join("IMG_1.png"));
        assert_eq!(output_path(Path::new("in/a.b.tiff"), out)?, out.join("a.b.png"));
        assert_eq!(output_path(Path::new("in/plain.png"), out)?, out.join("plain.png"));
        assert_eq!(
            output_path(Path::new("in/IMG.2024.jpg"), out)?,
            out.join("IMG.2024.png")
        );
        Ok(())
    }

    #[test]
    fn test_postprocess_respects_switches() {
        let image = RgbaImage::from_fn(10, 10, |x, y| {
            let alpha = if (3..7).contains(&x) && (3..7).contains(&y) { 200 } else { 40 };
            Rgba([1, 1, 1, alpha])
        });

        let mut config = Config::with_dirs("in", "out");
        let processor = ImageProcessor::new(create_mock_model(), config.clone());
        let hardened = processor.postprocess(image.clone());
        assert_eq!(hardened.dimensions(), (4, 4));
        assert!(hardened.pixels().all(|p| p[3] == 255));

        config.soft_edges = true;
        let processor = ImageProcessor::new(create_mock_model(), config.clone());
        let soft = processor.postprocess(image.clone());
        assert_eq!(soft.dimensions(), (10, 10));

        config.soft_edges = false;
        config.no_trim = true;
        let processor = ImageProcessor::new(create_mock_model(), config);
        let untrimmed = processor.postprocess(image);
        assert_eq!(untrimmed.dimensions(), (10, 10));
        assert!(untrimmed.pixels().all(|p| p[3] == 0 || p[3] == 255));
    }
}
