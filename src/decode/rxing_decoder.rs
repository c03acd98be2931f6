use std::collections::{HashMap, HashSet};

use image::GrayImage;
use rxing::common::HybridBinarizer;
use rxing::{
    BarcodeFormat, BinaryBitmap, DecodeHintType, DecodeHintValue, DecodingHintDictionary,
    Luma8LuminanceSource, MultiFormatReader, Reader, ResultPoint,
};

use super::{SymbolDecoder, SymbolRead, check_dimensions};
use crate::error::DecodeError;
use crate::models::{CodeType, Point};

/// Multi-format reader for the retail 1-D symbologies, Code 128/39 and QR
#[derive(Debug, Clone, Copy, Default)]
pub struct RxingDecoder;

impl RxingDecoder {
    fn hints() -> DecodingHintDictionary {
        let mut hints = HashMap::new();
        hints.insert(DecodeHintType::TRY_HARDER, DecodeHintValue::TryHarder(true));
        let formats: HashSet<BarcodeFormat> = [
            BarcodeFormat::EAN_13,
            BarcodeFormat::EAN_8,
            BarcodeFormat::UPC_A,
            BarcodeFormat::CODE_128,
            BarcodeFormat::CODE_39,
            BarcodeFormat::QR_CODE,
        ]
        .into_iter()
        .collect();
        hints.insert(
            DecodeHintType::POSSIBLE_FORMATS,
            DecodeHintValue::PossibleFormats(formats),
        );
        hints
    }
}

fn code_type(format: &BarcodeFormat) -> CodeType {
    match format {
        BarcodeFormat::EAN_13 => CodeType::Ean13,
        BarcodeFormat::EAN_8 => CodeType::Ean8,
        BarcodeFormat::UPC_A => CodeType::UpcA,
        BarcodeFormat::CODE_128 => CodeType::Code128,
        BarcodeFormat::CODE_39 => CodeType::Code39,
        BarcodeFormat::QR_CODE => CodeType::Qr,
        _ => CodeType::Unknown,
    }
}

impl SymbolDecoder for RxingDecoder {
    fn name(&self) -> &'static str {
        "rxing"
    }

    fn decode(&self, image: &GrayImage) -> Result<Option<SymbolRead>, DecodeError> {
        check_dimensions(image)?;
        let (width, height) = image.dimensions();
        let source = Luma8LuminanceSource::new(image.as_raw().clone(), width, height);
        let mut bitmap = BinaryBitmap::new(HybridBinarizer::new(source));
        let mut reader = MultiFormatReader::default();

        match reader.decode_with_hints(&mut bitmap, &Self::hints()) {
            Ok(result) => {
                let points = result
                    .getRXingResultPoints()
                    .iter()
                    .map(|p| Point::new(p.getX(), p.getY()))
                    .collect();
                Ok(Some(SymbolRead {
                    code_type: code_type(result.getBarcodeFormat()),
                    payload: result.getText().to_string(),
                    points,
                }))
            }
            Err(e) => {
                log::trace!("rxing: {e}");
                Ok(None)
            }
        }
    }
}
