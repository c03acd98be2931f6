use image::GrayImage;

use super::{SymbolDecoder, SymbolRead, check_dimensions};
use crate::error::DecodeError;
use crate::models::{CodeType, Point};

/// QR-only reader, tried on normal and inverted polarity
#[derive(Debug, Clone, Copy, Default)]
pub struct RqrrDecoder;

fn read_grids(image: &GrayImage, inverted: bool) -> Option<SymbolRead> {
    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
        image.width() as usize,
        image.height() as usize,
        |x, y| {
            let v = image.get_pixel(x as u32, y as u32)[0];
            if inverted { 255 - v } else { v }
        },
    );
    for grid in prepared.detect_grids() {
        match grid.decode() {
            Ok((_meta, content)) => {
                let points = grid
                    .bounds
                    .iter()
                    .map(|p| Point::new(p.x as f32, p.y as f32))
                    .collect();
                return Some(SymbolRead {
                    code_type: CodeType::Qr,
                    payload: content,
                    points,
                });
            }
            Err(e) => log::trace!("rqrr grid rejected: {e:?}"),
        }
    }
    None
}

impl SymbolDecoder for RqrrDecoder {
    fn name(&self) -> &'static str {
        "rqrr"
    }

    fn decode(&self, image: &GrayImage) -> Result<Option<SymbolRead>, DecodeError> {
        check_dimensions(image)?;
        Ok(read_grids(image, false).or_else(|| read_grids(image, true)))
    }
}
