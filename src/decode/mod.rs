//! Symbol decoding primitives.
//!
//! The pipeline locates and rectifies regions; turning pixels into text is
//! delegated to a [`SymbolDecoder`]. The defaults wrap `rxing` (1-D and QR)
//! and `rqrr` (QR only), and tests substitute their own.

mod rqrr_decoder;
mod rxing_decoder;

use image::GrayImage;

use crate::error::DecodeError;
use crate::models::{CodeType, Point};

pub use rqrr_decoder::RqrrDecoder;
pub use rxing_decoder::RxingDecoder;

/// A successful read
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolRead {
    /// Symbology
    pub code_type: CodeType,
    /// Decoded text
    pub payload: String,
    /// Location reported by the decoder, in the decoded image's coordinates.
    /// Two points for a 1-D scan line, three or more for 2-D symbols, may be empty.
    pub points: Vec<Point>,
}

/// Something that reads symbols from a grayscale image
pub trait SymbolDecoder: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Read one symbol.
    ///
    /// `Ok(None)` means nothing readable was found. `Err` is reserved for
    /// malformed input.
    fn decode(&self, image: &GrayImage) -> Result<Option<SymbolRead>, DecodeError>;
}

impl<T: SymbolDecoder + ?Sized> SymbolDecoder for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn decode(&self, image: &GrayImage) -> Result<Option<SymbolRead>, DecodeError> {
        (**self).decode(image)
    }
}

pub(crate) fn check_dimensions(image: &GrayImage) -> Result<(), DecodeError> {
    if image.width() == 0 || image.height() == 0 {
        Err(DecodeError::EmptyCrop)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_empty_crop_is_an_error() {
        let empty = GrayImage::new(0, 0);
        assert!(matches!(RxingDecoder.decode(&empty), Err(DecodeError::EmptyCrop)));
        assert!(matches!(RqrrDecoder.decode(&empty), Err(DecodeError::EmptyCrop)));
    }

    #[test]
    fn test_blank_crop_reads_nothing() {
        let blank = GrayImage::from_pixel(64, 64, Luma([255]));
        assert_eq!(RxingDecoder.decode(&blank).unwrap(), None);
        assert_eq!(RqrrDecoder.decode(&blank).unwrap(), None);
    }

    #[test]
    fn test_boxed_decoder_delegates() {
        let boxed: Box<dyn SymbolDecoder> = Box::new(RqrrDecoder);
        assert_eq!(boxed.name(), "rqrr");
    }
}
