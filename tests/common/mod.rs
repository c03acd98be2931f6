//! Synthetic scenes and decoder doubles for the scenario tests.

use image::{GrayImage, Luma, imageops};
use rust_scan::detector::finder::FinderScanner;
use rust_scan::utils::binarization::otsu_binarize;
use rust_scan::{CodeType, DecodeError, Point, SymbolDecoder, SymbolRead};

pub const INK: Luma<u8> = Luma([20]);
pub const PAPER: Luma<u8> = Luma([240]);

/// Left-hand odd parity patterns, one bit per module, dark = 1
const L_CODES: [&str; 10] = [
    "0001101", "0011001", "0010011", "0111101", "0100011", "0110001", "0101111", "0111011",
    "0110111", "0001011",
];

/// Parity of the six left digits per leading digit, 'G' = even
const PARITY: [&str; 10] = [
    "LLLLLL", "LLGLGG", "LLGGLG", "LLGGGL", "LGLLGG", "LGGLLG", "LGGGLL", "LGLGLG", "LGLGGL",
    "LGGLGL",
];

fn r_code(d: usize) -> String {
    L_CODES[d]
        .chars()
        .map(|c| if c == '1' { '0' } else { '1' })
        .collect()
}

fn g_code(d: usize) -> String {
    r_code(d).chars().rev().collect()
}

/// 95 modules of an EAN-13 symbol for 13 digits (check digit taken as given)
pub fn ean13_modules(digits: &str) -> Vec<bool> {
    let d: Vec<usize> = digits
        .chars()
        .map(|c| c.to_digit(10).expect("digit") as usize)
        .collect();
    assert_eq!(d.len(), 13);

    let mut bits = String::from("101");
    for (i, parity) in PARITY[d[0]].chars().enumerate() {
        let digit = d[i + 1];
        bits += &if parity == 'L' { L_CODES[digit].to_string() } else { g_code(digit) };
    }
    bits += "01010";
    for &digit in &d[7..] {
        bits += &r_code(digit);
    }
    bits += "101";
    bits.chars().map(|c| c == '1').collect()
}

/// Draw upright bars with the first module at `(x0, y0)`
pub fn draw_ean13(canvas: &mut GrayImage, digits: &str, x0: u32, y0: u32, module: u32, bar_height: u32) {
    for (i, dark) in ean13_modules(digits).into_iter().enumerate() {
        if !dark {
            continue;
        }
        for dx in 0..module {
            for y in y0..y0 + bar_height {
                canvas.put_pixel(x0 + i as u32 * module + dx, y, INK);
            }
        }
    }
}

/// EAN-13 turned 90 degrees, pasted with its top-left at `(x0, y0)`
pub fn draw_ean13_rotated(canvas: &mut GrayImage, digits: &str, x0: u32, y0: u32, module: u32, bar_height: u32) {
    let quiet = 3 * module;
    let mut patch = GrayImage::from_pixel(95 * module + 2 * quiet, bar_height, PAPER);
    draw_ean13(&mut patch, digits, quiet, 0, module, bar_height);
    let turned = imageops::rotate90(&patch);
    imageops::overlay(canvas, &turned, x0 as i64, y0 as i64);
}

/// 25x25-module QR-like symbol: three finder patterns and a checkerboard
/// data area, top-left corner at `(x0, y0)`
pub fn draw_qr_like(canvas: &mut GrayImage, x0: u32, y0: u32, module: u32) {
    const N: u32 = 25;
    let finder_origins = [(0, 0), (N - 7, 0), (0, N - 7)];
    for my in 0..N {
        for mx in 0..N {
            let in_finder = finder_origins.iter().find_map(|&(fx, fy)| {
                let (lx, ly) = (mx as i32 - fx as i32, my as i32 - fy as i32);
                ((0..7).contains(&lx) && (0..7).contains(&ly)).then_some((lx, ly))
            });
            let reserved = (mx < 8 && my < 8) || (mx >= N - 8 && my < 8) || (mx < 8 && my >= N - 8);
            let dark = match in_finder {
                Some((lx, ly)) => {
                    let ring = lx == 0 || lx == 6 || ly == 0 || ly == 6;
                    let core = (2..=4).contains(&lx) && (2..=4).contains(&ly);
                    ring || core
                }
                None if reserved => false,
                None => (mx + my) % 2 == 0,
            };
            if !dark {
                continue;
            }
            for dy in 0..module {
                for dx in 0..module {
                    canvas.put_pixel(x0 + mx * module + dx, y0 + my * module + dy, INK);
                }
            }
        }
    }
}

/// Reads upright EAN-13 bars along a few rows. Performs no checksum test.
pub struct Ean13RowReader;

impl Ean13RowReader {
    fn read_row(row: &[bool]) -> Option<(String, usize, usize)> {
        let mut runs: Vec<(bool, usize, usize)> = Vec::new();
        for (x, &dark) in row.iter().enumerate() {
            match runs.last_mut() {
                Some((color, _, len)) if *color == dark => *len += 1,
                _ => runs.push((dark, x, 1)),
            }
        }

        for start in 0..runs.len() {
            if start + 59 > runs.len() || !runs[start].0 {
                continue;
            }
            let window = &runs[start..start + 59];
            let total: usize = window.iter().map(|r| r.2).sum();
            let module = total as f32 / 95.0;
            if module < 1.0 {
                continue;
            }
            let widths: Vec<usize> = window
                .iter()
                .map(|r| (r.2 as f32 / module).round() as usize)
                .collect();
            if let Some(digits) = Self::decode_widths(&widths) {
                let last = window[58];
                return Some((digits, window[0].1, last.1 + last.2));
            }
        }
        None
    }

    fn bits(widths: &[usize], first_dark: bool) -> String {
        let mut out = String::new();
        let mut dark = first_dark;
        for &w in widths {
            out.extend(std::iter::repeat_n(if dark { '1' } else { '0' }, w));
            dark = !dark;
        }
        out
    }

    fn decode_widths(widths: &[usize]) -> Option<String> {
        let guard = |w: &[usize]| w.iter().all(|&x| x == 1);
        if !guard(&widths[0..3]) || !guard(&widths[27..32]) || !guard(&widths[56..59]) {
            return None;
        }

        let mut parity = String::new();
        let mut digits = String::new();
        for i in 0..6 {
            let bits = Self::bits(&widths[3 + 4 * i..7 + 4 * i], false);
            let (d, p) = (0..10).find_map(|d| {
                if L_CODES[d] == bits {
                    Some((d, 'L'))
                } else if g_code(d) == bits {
                    Some((d, 'G'))
                } else {
                    None
                }
            })?;
            parity.push(p);
            digits.push(char::from_digit(d as u32, 10)?);
        }
        let first = PARITY.iter().position(|p| *p == parity)?;

        for i in 0..6 {
            let bits = Self::bits(&widths[32 + 4 * i..36 + 4 * i], true);
            let d = (0..10).find(|&d| r_code(d) == bits)?;
            digits.push(char::from_digit(d as u32, 10)?);
        }
        Some(format!("{first}{digits}"))
    }
}

impl SymbolDecoder for Ean13RowReader {
    fn name(&self) -> &'static str {
        "ean13_rows"
    }

    fn decode(&self, image: &GrayImage) -> Result<Option<SymbolRead>, DecodeError> {
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            return Err(DecodeError::EmptyCrop);
        }
        for (num, den) in [(1, 2), (1, 3), (2, 3), (1, 4), (3, 4)] {
            let y = h * num / den;
            let row: Vec<bool> = (0..w).map(|x| image.get_pixel(x, y)[0] < 128).collect();
            if let Some((payload, x0, x1)) = Self::read_row(&row) {
                return Ok(Some(SymbolRead {
                    code_type: CodeType::Ean13,
                    payload,
                    points: vec![Point::new(x0 as f32, y as f32), Point::new(x1 as f32, y as f32)],
                }));
            }
        }
        Ok(None)
    }
}

/// Reports a fixed QR payload when three finder patterns are visible
pub struct FinderCountQr {
    pub payload: &'static str,
}

impl SymbolDecoder for FinderCountQr {
    fn name(&self) -> &'static str {
        "finder_count_qr"
    }

    fn decode(&self, image: &GrayImage) -> Result<Option<SymbolRead>, DecodeError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(DecodeError::EmptyCrop);
        }
        let patterns = FinderScanner::scan(&otsu_binarize(image), 0.5);
        Ok((patterns.len() >= 3).then(|| SymbolRead {
            code_type: CodeType::Qr,
            payload: self.payload.to_string(),
            points: patterns.iter().map(|p| p.center).collect(),
        }))
    }
}
