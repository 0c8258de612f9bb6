use std::path::PathBuf;
use thiserror::Error;

/// Structured error types for batch background removal.
///
/// Each variant carries the context of its failure domain (filesystem, image
/// decoding and encoding, model inference) so that a failed run reports which
/// file and which step broke without callers parsing error strings.
#[derive(Error, Debug)]
pub enum RembgError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Model file not found: {path:?}")]
    ModelNotFound { path: PathBuf },

    #[error("Filesystem error: {operation} failed for {path:?}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Image processing error: {operation} failed (file: {path})")]
    ImageProcessing {
        path: String,
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Model error: {operation} failed")]
    Model {
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Raw decoding is not available for {path:?}")]
    RawUnsupported { path: PathBuf },
}

pub type Result<T> = std::result::Result<T, RembgError>;

impl RembgError {
    pub(crate) fn image<E>(path: impl Into<String>, operation: &str, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::ImageProcessing {
            path: path.into(),
            operation: operation.to_string(),
            source: source.into(),
        }
    }

    pub(crate) fn model<E>(operation: impl Into<String>, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Model {
            operation: operation.into(),
            source: source.into(),
        }
    }
}

/// Convert I/O errors to filesystem errors.
///
/// Code that knows the path and operation should build
/// `RembgError::FileSystem` directly; this is the fallback for `?`.
impl From<std::io::Error> for RembgError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("unknown"),
            operation: "unknown".to_string(),
            source: err,
        }
    }
}

impl From<image::ImageError> for RembgError {
    fn from(err: image::ImageError) -> Self {
        Self::image("unknown", "image processing", err)
    }
}

impl From<ort::Error> for RembgError {
    fn from(err: ort::Error) -> Self {
        Self::model("ort operation", err)
    }
}

/// Shape errors only come out of tensor handling around inference, so they
/// are reported as model errors.
impl From<ndarray::ShapeError> for RembgError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::model("tensor shape conversion", err)
    }
}
