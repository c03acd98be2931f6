//! Error types.

use thiserror::Error;

/// Failure to accept an input image.
///
/// Detection and recognition never fail: an image with no readable symbol
/// yields an empty result instead.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Zero width or height
    #[error("image has zero width or height")]
    EmptyImage,
    /// Raw buffer length does not match the stated geometry
    #[error("buffer holds {actual} bytes, expected {expected}")]
    BufferSizeMismatch {
        /// width * height * channels
        expected: usize,
        /// Actual buffer length
        actual: usize,
    },
    /// Only 1, 3 and 4 channel buffers are accepted
    #[error("unsupported channel count {0}")]
    UnsupportedChannels(u8),
    /// Image file could not be opened or decoded
    #[error(transparent)]
    Image(#[from] image::ImageError),
    /// Configuration document could not be parsed
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Failure inside a symbol decoder on a malformed crop.
///
/// "Nothing found" is not an error; decoders return `Ok(None)` for it.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Crop has zero width or height
    #[error("crop has zero width or height")]
    EmptyCrop,
    /// Decoder-specific failure
    #[error("{decoder}: {message}")]
    Backend {
        /// Decoder name
        decoder: &'static str,
        /// Description from the backend
        message: String,
    },
}
