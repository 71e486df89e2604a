use std::path::PathBuf;
use thiserror::Error;

use crate::roi::Roi;

/// Structured error types for the cropping session.
///
/// Each variant captures context specific to its error domain (startup
/// validation, image decoding, export, metadata persistence), so callers can
/// match on the failure class instead of parsing error strings. Only
/// `ImageDecode` is recoverable: the session logs it and skips the image;
/// every other variant aborts the run after a best-effort metadata flush.
#[derive(Error, Debug)]
pub enum CropperError {
    #[error("directory not found or not a directory: {path:?}")]
    DirectoryNotFound { path: PathBuf },

    #[error("failed to decode image {path:?}")]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// A rectangle outside the image bounds reached the exporter. The
    /// selection surface clamps drags to the image, so this means an
    /// invariant was broken upstream; the exporter refuses to clamp
    /// silently and aborts the run instead.
    #[error("crop rectangle {roi:?} exceeds image bounds {width}x{height} for {path:?}")]
    CropOutOfBounds {
        roi: Roi,
        width: u32,
        height: u32,
        path: PathBuf,
    },

    #[error("failed to write ROI metadata to {path:?}")]
    MetadataWrite {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("filesystem error: {operation} failed for {path:?}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, CropperError>;

/// Convert I/O errors to filesystem errors.
///
/// Code that has context should construct `CropperError::FileSystem`
/// directly with the specific path and operation; this conversion is the
/// fallback for call sites where none is available.
impl From<std::io::Error> for CropperError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("unknown"),
            operation: "unknown".to_string(),
            source: err,
        }
    }
}
