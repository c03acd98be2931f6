use image::{GrayImage, Luma};

/// Compact bit matrix for storing binary masks.
///
/// A set bit marks a dark (foreground) pixel.
#[derive(Debug, Clone)]
pub struct BitMatrix {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl BitMatrix {
    /// Create a new bit matrix with given dimensions
    pub fn new(width: usize, height: usize) -> Self {
        let bytes_needed = (width * height).div_ceil(8);
        Self {
            width,
            height,
            data: vec![0; bytes_needed],
        }
    }

    /// Mark every pixel strictly darker than `threshold`
    pub fn from_gray_below(gray: &GrayImage, threshold: u8) -> Self {
        let width = gray.width() as usize;
        let height = gray.height() as usize;
        let mut matrix = Self::new(width, height);
        for (i, &v) in gray.as_raw().iter().enumerate() {
            if v < threshold {
                matrix.data[i / 8] |= 1 << (i % 8);
            }
        }
        matrix
    }

    /// Mark every mask pixel at or above 128
    pub fn from_mask(mask: &GrayImage) -> Self {
        let width = mask.width() as usize;
        let height = mask.height() as usize;
        let mut matrix = Self::new(width, height);
        for (i, &v) in mask.as_raw().iter().enumerate() {
            if v >= 128 {
                matrix.data[i / 8] |= 1 << (i % 8);
            }
        }
        matrix
    }

    /// Get matrix width
    pub fn width(&self) -> usize {
        self.width
    }

    /// Get matrix height
    pub fn height(&self) -> usize {
        self.height
    }

    /// Get bit at (x, y)
    pub fn get(&self, x: usize, y: usize) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let index = y * self.width + x;
        (self.data[index / 8] >> (index % 8)) & 1 == 1
    }

    /// Set bit at (x, y)
    pub fn set(&mut self, x: usize, y: usize, value: bool) {
        if x >= self.width || y >= self.height {
            return;
        }
        let index = y * self.width + x;
        let byte_index = index / 8;
        let bit_index = index % 8;
        if value {
            self.data[byte_index] |= 1 << bit_index;
        } else {
            self.data[byte_index] &= !(1 << bit_index);
        }
    }

    /// Number of set bits
    pub fn count_ones(&self) -> usize {
        self.data.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Tight bounds of the set bits as `(min_x, min_y, max_x, max_y)`, inclusive
    pub fn ones_bounds(&self) -> Option<(usize, usize, usize, usize)> {
        let mut bounds: Option<(usize, usize, usize, usize)> = None;
        for y in 0..self.height {
            for x in 0..self.width {
                if !self.get(x, y) {
                    continue;
                }
                bounds = Some(match bounds {
                    None => (x, y, x, y),
                    Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
                });
            }
        }
        bounds
    }

    /// Render as a mask image: set bits become 255, everything else 0
    pub fn to_mask(&self) -> GrayImage {
        GrayImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            if self.get(x as usize, y as usize) {
                Luma([255])
            } else {
                Luma([0])
            }
        })
    }

    /// Render with normal print polarity: set bits black on white
    pub fn to_print(&self) -> GrayImage {
        GrayImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            if self.get(x as usize, y as usize) {
                Luma([0])
            } else {
                Luma([255])
            }
        })
    }
}

impl Default for BitMatrix {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_matrix() {
        let mut matrix = BitMatrix::new(8, 8);
        assert_eq!(matrix.width(), 8);
        assert_eq!(matrix.height(), 8);

        matrix.set(3, 4, true);
        assert!(matrix.get(3, 4));
        assert!(!matrix.get(3, 3));
        assert_eq!(matrix.count_ones(), 1);

        matrix.set(3, 4, false);
        assert!(!matrix.get(3, 4));
    }

    #[test]
    fn test_out_of_bounds() {
        let mut matrix = BitMatrix::new(8, 8);
        matrix.set(10, 10, true); // Should not panic
        assert!(!matrix.get(10, 10));
    }

    #[test]
    fn test_from_gray_and_bounds() {
        let mut gray = GrayImage::from_pixel(10, 6, Luma([230]));
        gray.put_pixel(2, 1, Luma([10]));
        gray.put_pixel(7, 4, Luma([90]));
        let matrix = BitMatrix::from_gray_below(&gray, 128);
        assert_eq!(matrix.count_ones(), 2);
        assert_eq!(matrix.ones_bounds(), Some((2, 1, 7, 4)));
        assert_eq!(matrix.to_mask().get_pixel(2, 1)[0], 255);
        assert_eq!(matrix.to_print().get_pixel(2, 1)[0], 0);
        assert_eq!(BitMatrix::from_mask(&matrix.to_mask()).count_ones(), 2);
        assert_eq!(BitMatrix::new(4, 4).ones_bounds(), None);
    }
}
