//! Check-digit validation of decoded payloads.

use crate::models::CodeType;

/// Accepts or rejects a decoder's payload for its symbology
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadValidator;

impl PayloadValidator {
    /// EAN-13, EAN-8 and UPC-A must carry the right digit count and a valid
    /// weighted mod-10 check digit. Other symbologies carry their own error
    /// detection and pass unchanged.
    pub fn validate(&self, code_type: CodeType, payload: &str) -> bool {
        match code_type {
            CodeType::Ean13 => ean13_valid(payload),
            CodeType::Ean8 => ean8_valid(payload),
            CodeType::UpcA => upca_valid(payload),
            _ => true,
        }
    }
}

fn digits(payload: &str, len: usize) -> Option<Vec<u32>> {
    if payload.len() != len {
        return None;
    }
    payload.chars().map(|c| c.to_digit(10)).collect()
}

/// Weighted sum of all digits, check digit included, divides by 10
fn weighted_mod10(digits: &[u32], weights: [u32; 2]) -> bool {
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, d)| d * weights[i % 2])
        .sum();
    sum % 10 == 0
}

/// 13 digits, weights 1,3,1,3,... from the left
pub fn ean13_valid(payload: &str) -> bool {
    digits(payload, 13).is_some_and(|d| weighted_mod10(&d, [1, 3]))
}

/// 8 digits, weights 3,1,3,1,... from the left
pub fn ean8_valid(payload: &str) -> bool {
    digits(payload, 8).is_some_and(|d| weighted_mod10(&d, [3, 1]))
}

/// 12 digits, weights 3,1,3,1,... from the left
pub fn upca_valid(payload: &str) -> bool {
    digits(payload, 12).is_some_and(|d| weighted_mod10(&d, [3, 1]))
}

/// Check digit completing the first twelve digits of an EAN-13
pub fn ean13_check_digit(first12: &str) -> Option<u32> {
    let d = digits(first12, 12)?;
    let sum: u32 = d.iter().enumerate().map(|(i, v)| v * if i % 2 == 0 { 1 } else { 3 }).sum();
    Some((10 - sum % 10) % 10)
}
