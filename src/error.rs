//! Error types for the render pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while turning markup into image bytes.
///
/// Every variant is terminal for the current render: nothing is retried
/// internally and no partial buffer is handed back to the caller.
#[derive(Error, Debug)]
pub enum Error {
    /// Reserved. Sanitization degrades gracefully by dropping unsafe content
    /// and never produces this variant.
    #[error("Sanitization failed: {0}")]
    SanitizationError(String),

    /// Width or height was zero (or overflowed once scaled)
    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensionsError { width: u64, height: u64 },

    /// The vector document could not be decoded
    #[error("Failed to decode vector document: {0}")]
    DecodeError(String),

    /// Decoding did not finish within the configured timeout
    #[error("Rasterization timed out after {0}ms")]
    RasterizationTimeoutError(u64),

    /// No drawing surface could be acquired for the requested size
    #[error("Drawing surface unavailable: {0}")]
    ContextUnavailableError(String),

    /// The final pixel buffer could not be encoded
    #[error("Encoding failed: {0}")]
    EncodeError(String),
}

impl Error {
    pub(crate) fn invalid_dimensions(width: impl Into<u64>, height: impl Into<u64>) -> Self {
        Error::InvalidDimensionsError {
            width: width.into(),
            height: height.into(),
        }
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::EncodeError(err.to_string())
    }
}
