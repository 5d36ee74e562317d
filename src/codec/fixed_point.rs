//! Q96 fixed-point price codec
//!
//! The auction contract stores every price as `human_price * 2^96`, where
//! `human_price = currency_amount / token_amount` in whole units. Both the
//! token and the currency are assumed to carry 18 decimals unless the caller
//! says otherwise.
//!
//! Encoding goes through a `1e18`-scaled integer so the only floating point
//! rounding happens once, on the way in. Decoding runs the inverse in 512-bit
//! integer arithmetic and converts to `f64` at the very end, which keeps the
//! relative error at the mantissa precision (~1e-15).

use ethers::types::{U256, U512};
use crate::utils::{CcaError, Result};

/// Decimals assumed for both token and currency
pub const DEFAULT_DECIMALS: u8 = 18;

/// Largest decimals value accepted by the codec
pub const MAX_DECIMALS: u8 = 36;

/// 2^96
pub fn q96() -> U256 {
    U256::one() << 96
}

/// Convert a human price to its Q96 representation (18/18 decimals)
pub fn encode_price(price: f64) -> Result<U256> {
    encode_price_with_decimals(price, DEFAULT_DECIMALS, DEFAULT_DECIMALS)
}

/// Convert a Q96 price back to a human price (18/18 decimals)
pub fn decode_price(fixed: U256) -> f64 {
    if fixed.is_zero() {
        return 0.0;
    }

    let scaled = fixed.full_mul(U256::exp10(18)) / U512::from(q96());
    big_to_f64(scaled) / 1e18
}

/// Convert a human price to Q96 for an arbitrary token/currency decimals pair
///
/// `q96 = round(price * 1e18) * 2^96 * 10^currency / (1e18 * 10^token)`
pub fn encode_price_with_decimals(
    price: f64,
    token_decimals: u8,
    currency_decimals: u8,
) -> Result<U256> {
    if !price.is_finite() {
        return Err(CcaError::invalid("price", "must be a finite number"));
    }
    if price < 0.0 {
        return Err(CcaError::invalid("price", "must not be negative"));
    }
    check_decimals("token decimals", token_decimals)?;
    check_decimals("currency decimals", currency_decimals)?;

    let scaled = (price * 1e18).round();
    if scaled >= 2f64.powi(128) {
        return Err(CcaError::invalid("price", "too large to encode"));
    }
    let scaled = U256::from(scaled as u128);
    if scaled.is_zero() {
        return Ok(U256::zero());
    }

    let numerator = U512::from(scaled) * U512::from(q96())
        * U512::from(U256::exp10(currency_decimals as usize));
    let denominator = U512::from(U256::exp10(18)) * U512::from(U256::exp10(token_decimals as usize));

    U256::try_from(numerator / denominator)
        .map_err(|_| CcaError::invalid("price", "exceeds 256-bit fixed-point range"))
}

/// Inverse of [`encode_price_with_decimals`]
pub fn decode_price_with_decimals(
    fixed: U256,
    token_decimals: u8,
    currency_decimals: u8,
) -> Result<f64> {
    check_decimals("token decimals", token_decimals)?;
    check_decimals("currency decimals", currency_decimals)?;

    if fixed.is_zero() {
        return Ok(0.0);
    }

    let numerator = fixed.full_mul(U256::exp10(18)) * U512::from(U256::exp10(token_decimals as usize));
    let denominator = U512::from(q96()) * U512::from(U256::exp10(currency_decimals as usize));

    Ok(big_to_f64(numerator / denominator) / 1e18)
}

fn check_decimals(field: &str, decimals: u8) -> Result<()> {
    if decimals > MAX_DECIMALS {
        return Err(CcaError::invalid(
            field,
            format!("{} exceeds the supported maximum of {}", decimals, MAX_DECIMALS),
        ));
    }
    Ok(())
}

/// Correctly rounded integer -> f64 via the decimal representation
pub(crate) fn big_to_f64<T: std::fmt::Display>(value: T) -> f64 {
    value.to_string().parse::<f64>().unwrap_or(f64::MAX)
}
