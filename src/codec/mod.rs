//! Fixed-point price codec and amount formatting
//!
//! Everything in here is pure: no I/O, no shared state.

mod fixed_point;
mod format;
mod units;

pub use fixed_point::{
    decode_price, decode_price_with_decimals, encode_price, encode_price_with_decimals, q96,
    DEFAULT_DECIMALS, MAX_DECIMALS,
};
pub use format::{
    block_to_relative_time, blocks_to_time, format_compact, format_compact_value, format_wei,
    truncate_address, SECONDS_PER_BLOCK,
};
pub use units::{format_units, parse_units, to_human_amount};
