use clap::{Parser, ValueEnum};
use image::ImageFormat;
use std::path::PathBuf;

use crate::loader::is_raw_extension;

pub const DEFAULT_MODEL_NAME: &str = "MCOnet";
pub const DEFAULT_MODEL_DIR: &str = "rembg/sessions";
pub const DEFAULT_EXTENSIONS: [&str; 5] = ["png", "jpeg", "jpg", "cr2", "tiff"];
pub const DEFAULT_ALPHA_THRESHOLD: u8 = 128;

/// What the mask becomes when the model output carries no contrast at all.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UniformMaskPolicy {
    /// Keep the whole image.
    #[default]
    Foreground,
    /// Treat the whole image as background.
    Background,
}

#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Config {
    pub input_dir: PathBuf,

    #[arg(default_value = "output")]
    pub output_dir: PathBuf,

    #[arg(short = 'n', long, default_value = DEFAULT_MODEL_NAME)]
    pub model_name: String,

    #[arg(long, default_value = DEFAULT_MODEL_DIR)]
    pub model_dir: PathBuf,

    /// Explicit model file; overrides --model-name and --model-dir.
    #[arg(short, long)]
    pub model_path: Option<PathBuf>,

    /// Extensions to pick up, processed group by group in this order.
    #[arg(
        short,
        long,
        value_delimiter = ',',
        default_values_t = DEFAULT_EXTENSIONS.map(String::from),
        value_parser = check_extension
    )]
    pub extensions: Vec<String>,

    /// Alpha below this becomes fully transparent, the rest fully opaque.
    #[arg(short = 't', long, default_value_t = DEFAULT_ALPHA_THRESHOLD)]
    pub alpha_threshold: u8,

    /// Keep the soft alpha produced by the model.
    #[arg(long)]
    pub soft_edges: bool,

    /// Do not crop the result to its visible content.
    #[arg(long)]
    pub no_trim: bool,

    /// Use the default PNG encoder settings instead of best compression.
    #[arg(long)]
    pub no_optimize: bool,

    /// Keep colour channels as-is instead of scaling them by the mask.
    #[arg(long)]
    pub no_premultiply: bool,

    /// Write the grayscale mask instead of the cut-out.
    #[arg(long)]
    pub only_mask: bool,

    /// Skip camera raw files even when raw decoding is compiled in.
    #[arg(long)]
    pub no_raw: bool,

    #[arg(long, value_enum, default_value_t = UniformMaskPolicy::Foreground)]
    pub uniform_mask: UniformMaskPolicy,

    #[arg(short, long, default_value_t = 0)]
    pub device_id: i32,

    #[arg(long)]
    pub no_progress: bool,
}

impl Config {
    /// Configuration with every option at its command-line default.
    pub fn with_dirs(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            model_name: DEFAULT_MODEL_NAME.to_string(),
            model_dir: PathBuf::from(DEFAULT_MODEL_DIR),
            model_path: None,
            extensions: DEFAULT_EXTENSIONS.map(String::from).to_vec(),
            alpha_threshold: DEFAULT_ALPHA_THRESHOLD,
            soft_edges: false,
            no_trim: false,
            no_optimize: false,
            no_premultiply: false,
            only_mask: false,
            no_raw: false,
            uniform_mask: UniformMaskPolicy::default(),
            device_id: 0,
            no_progress: false,
        }
    }

    /// `--model-path` if given, otherwise `<model_dir>/<model_name>.onnx`.
    pub fn resolved_model_path(&self) -> PathBuf {
        self.model_path
            .clone()
            .unwrap_or_else(|| self.model_dir.join(format!("{}.onnx", self.model_name)))
    }

    pub const fn hardening_threshold(&self) -> Option<u8> {
        if self.soft_edges {
            None
        } else {
            Some(self.alpha_threshold)
        }
    }

    /// Raw support is decided once: compiled in and not switched off.
    pub const fn raw_enabled(&self) -> bool {
        cfg!(feature = "raw") && !self.no_raw
    }
}

fn check_extension(s: &str) -> Result<String, String> {
    let ext = s.trim().trim_start_matches('.').to_lowercase();
    if ext.is_empty() {
        return Err("empty extension".to_string());
    }
    if is_raw_extension(&ext) {
        return Ok(ext);
    }

    let supported: Vec<_> = ImageFormat::all()
        .filter(|f| f.reading_enabled())
        .flat_map(|f| f.extensions_str())
        .map(|s| format!("`{}`", s))
        .collect();
    let supported_message = format!("Supported extensions: {}", supported.join(", "));

    let format = ImageFormat::from_extension(&ext)
        .ok_or(format!("{} is not supported. {}", s, supported_message))?;
    if !format.reading_enabled() {
        return Err(format!("{} is not supported. {}", s, supported_message));
    }

    Ok(ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_command_line() {
        let parsed = Config::parse_from(["rembg-batch", "in"]);
        let built = Config::with_dirs("in", "output");

        assert_eq!(parsed.output_dir, built.output_dir);
        assert_eq!(parsed.model_name, built.model_name);
        assert_eq!(parsed.extensions, built.extensions);
        assert_eq!(parsed.alpha_threshold, 128);
        assert_eq!(parsed.uniform_mask, UniformMaskPolicy::Foreground);
        assert!(!parsed.soft_edges && !parsed.no_trim && !parsed.no_optimize);
    }

    #[test]
    fn test_model_path_resolution() {
        let mut config = Config::with_dirs("in", "out");
        assert_eq!(
            config.resolved_model_path(),
            PathBuf::from("rembg/sessions/MCOnet.onnx")
        );

        config.model_name = "u2net".to_string();
        config.model_dir = PathBuf::from("models");
        assert_eq!(config.resolved_model_path(), PathBuf::from("models/u2net.onnx"));

        config.model_name = "u2net.v2".to_string();
        assert_eq!(
            config.resolved_model_path(),
            PathBuf::from("models/u2net.v2.onnx")
        );

        config.model_path = Some(PathBuf::from("/opt/custom.onnx"));
        assert_eq!(config.resolved_model_path(), PathBuf::from("/opt/custom.onnx"));
    }

    #[test]
    fn test_extension_parsing() {
        let config = Config::parse_from(["rembg-batch", "in", "-e", ".JPG,Png,cr2"]);
        assert_eq!(config.extensions, vec!["jpg", "png", "cr2"]);

        assert!(check_extension("txt").is_err());
        assert!(check_extension("").is_err());
    }

    #[test]
    fn test_soft_edges_disable_hardening() {
        let mut config = Config::with_dirs("in", "out");
        assert_eq!(config.hardening_threshold(), Some(128));
        config.soft_edges = true;
        assert_eq!(config.hardening_threshold(), None);
    }

    #[test]
    fn test_no_raw_switches_raw_off() {
        let mut config = Config::with_dirs("in", "out");
        assert_eq!(config.raw_enabled(), cfg!(feature = "raw"));
        config.no_raw = true;
        assert!(!config.raw_enabled());
    }
}
