//! Display formatting for prices, amounts and block distances
//!
//! Thresholds here are a display contract consumed verbatim by front ends;
//! change them only together with the consumers.

use ethers::types::{Address, U256};
use super::fixed_point::decode_price;
use super::units::to_human_amount;

/// Average block time assumed for duration estimates
pub const SECONDS_PER_BLOCK: u64 = 12;

/// Compact display of a Q96 price
///
/// - `0` for zero
/// - exponential with two digits below 1e-6
/// - 6 decimals below 0.01
/// - 4 decimals below 1
/// - 2 decimals below 1000
/// - grouped thousands (at most 2 fraction digits) above
pub fn format_compact(fixed: U256) -> String {
    format_compact_value(decode_price(fixed))
}

/// Same policy as [`format_compact`] for an already decoded price
pub fn format_compact_value(price: f64) -> String {
    if price == 0.0 {
        return "0".to_string();
    }
    if price < 0.000001 {
        return format!("{:.2e}", price);
    }
    if price < 0.01 {
        return format!("{:.6}", price);
    }
    if price < 1.0 {
        return format!("{:.4}", price);
    }
    if price < 1000.0 {
        return format!("{:.2}", price);
    }
    group_thousands(price)
}

/// Human display of a base-unit amount (wei by default)
pub fn format_wei(amount: U256, decimals: u8) -> String {
    let value = to_human_amount(amount, decimals);
    if value == 0.0 {
        return "0".to_string();
    }
    if value < 0.001 {
        return format!("{:.2e}", value);
    }
    if value < 1.0 {
        return format!("{:.4}", value);
    }
    if value < 1000.0 {
        return format!("{:.2}", value);
    }
    group_thousands(value)
}

/// `1234567.891` -> `1,234,567.89`
fn group_thousands(value: f64) -> String {
    let fixed = format!("{:.2}", value);
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let fraction = fraction.trim_end_matches('0');

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    if fraction.is_empty() {
        grouped
    } else {
        format!("{}.{}", grouped, fraction)
    }
}

/// Rough wall-clock duration of a block count
pub fn blocks_to_time(blocks: u64) -> String {
    let seconds = blocks.saturating_mul(SECONDS_PER_BLOCK) as f64;
    let minutes = seconds / 60.0;
    let hours = minutes / 60.0;
    let days = hours / 24.0;

    let plural = |n: f64| if n == 1.0 { "" } else { "s" };

    if days >= 1.0 {
        let n = days.round();
        return format!("~{} day{}", n, plural(n));
    }
    if hours >= 1.0 {
        let n = hours.round();
        return format!("~{} hour{}", n, plural(n));
    }
    if minutes >= 1.0 {
        return format!("~{} min", minutes.round());
    }
    format!("~{}s", seconds.round())
}

/// Relative description of `target` seen from `current`
pub fn block_to_relative_time(target: u64, current: u64) -> String {
    if target > current {
        format!("{} remaining", blocks_to_time(target - current))
    } else if target < current {
        format!("{} ago", blocks_to_time(current - target))
    } else {
        "now".to_string()
    }
}

/// `0x1234...5678`
pub fn truncate_address(address: Address) -> String {
    let full = format!("{:?}", address);
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}
