//! Base-unit <-> decimal string conversion for token and currency amounts

use ethers::types::U256;
use ethers::utils::{self, ParseUnits};
use crate::utils::{CcaError, Result};
use super::fixed_point::big_to_f64;

/// Parse a decimal string ("1.25") into base units
///
/// Rejects empty input, signs, exponents and more fractional digits than
/// `decimals` can hold. Nothing is silently truncated.
pub fn parse_units(text: &str, decimals: u8) -> Result<U256> {
    let text = text.trim();
    if text.is_empty() {
        return Err(CcaError::invalid("amount", "is empty"));
    }

    let (whole, fraction) = match text.split_once('.') {
        Some((w, f)) => (w, f),
        None => (text, ""),
    };

    let digits_only = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if !digits_only(whole) || !digits_only(fraction) || (whole.is_empty() && fraction.is_empty()) {
        return Err(CcaError::invalid(
            "amount",
            format!("'{}' is not a non-negative decimal number", text),
        ));
    }
    if fraction.len() > decimals as usize {
        return Err(CcaError::invalid(
            "amount",
            format!("'{}' has more than {} fractional digits", text, decimals),
        ));
    }

    let normalized = match (whole.is_empty(), fraction.is_empty()) {
        (true, _) => format!("0.{}", fraction),
        (false, true) => whole.to_string(),
        (false, false) => format!("{}.{}", whole, fraction),
    };

    match utils::parse_units(normalized, decimals as u32) {
        Ok(ParseUnits::U256(value)) => Ok(value),
        Ok(ParseUnits::I256(_)) => Err(CcaError::invalid("amount", "must not be negative")),
        Err(e) => Err(CcaError::invalid("amount", e.to_string())),
    }
}

/// Render base units as an exact decimal string without trailing zeros
pub fn format_units(amount: U256, decimals: u8) -> Result<String> {
    let text = utils::format_units(amount, decimals as u32)
        .map_err(|e| CcaError::invalid("amount", e.to_string()))?;

    if !text.contains('.') {
        return Ok(text);
    }
    let trimmed = text.trim_end_matches('0').trim_end_matches('.');
    Ok(trimmed.to_string())
}

/// Lossy conversion of base units to a float, for display and estimates only
pub fn to_human_amount(amount: U256, decimals: u8) -> f64 {
    big_to_f64(amount) / 10f64.powi(decimals as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_whole_and_fractional() {
        assert_eq!(parse_units("1", 18).unwrap(), U256::exp10(18));
        assert_eq!(parse_units("1.5", 18).unwrap(), U256::from(15u64) * U256::exp10(17));
        assert_eq!(parse_units(".25", 6).unwrap(), U256::from(250_000u64));
        assert_eq!(parse_units("0", 18).unwrap(), U256::zero());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["", "-1", "1e18", "abc", "1.2.3", ".", "1,5"] {
            assert!(parse_units(bad, 18).is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_parse_rejects_excess_precision() {
        assert!(parse_units("0.1234567", 6).is_err());
        assert!(parse_units("0.123456", 6).is_ok());
    }

    #[test]
    fn test_format_trims_trailing_zeros() {
        assert_eq!(format_units(U256::exp10(18), 18).unwrap(), "1");
        assert_eq!(
            format_units(U256::from(1_250_000_000_000_000_000u64), 18).unwrap(),
            "1.25"
        );
        assert_eq!(format_units(U256::from(1u64), 18).unwrap(), "0.000000000000000001");
    }

    #[test]
    fn test_parse_format_agree() {
        let amount = parse_units("123.000456", 18).unwrap();
        assert_eq!(format_units(amount, 18).unwrap(), "123.000456");
    }

    #[test]
    fn test_to_human_amount() {
        assert_eq!(to_human_amount(U256::exp10(18), 18), 1.0);
        assert_eq!(to_human_amount(U256::from(2_500_000u64), 6), 2.5);
    }
}
