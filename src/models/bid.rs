use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};
use crate::codec::{decode_price, to_human_amount, DEFAULT_DECIMALS};

/// Where a log sits in the chain, used to order competing observations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LogPosition {
    pub block_number: u64,
    pub log_index: u64,
}

impl LogPosition {
    pub fn new(block_number: u64, log_index: u64) -> Self {
        Self { block_number, log_index }
    }
}

/// A bid as emitted by `BidSubmitted`. Never mutated after decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bid {
    /// Contract-assigned, monotonic
    pub id: U256,
    pub owner: Address,
    /// Max price, Q96
    pub price: U256,
    /// Currency budget in base units
    pub amount: U256,
    pub position: LogPosition,
}

impl Bid {
    pub fn price_human(&self) -> f64 {
        decode_price(self.price)
    }

    pub fn amount_human(&self) -> f64 {
        to_human_amount(self.amount, DEFAULT_DECIMALS)
    }
}

/// `BidExited` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidExit {
    pub bid_id: U256,
    pub owner: Address,
    pub tokens_filled: U256,
    pub currency_refunded: U256,
    pub position: LogPosition,
}

/// Where a bid's max price sits relative to the clearing price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FillStatus {
    /// Strictly above clearing: fully filling
    Above,
    /// Within rounding distance of clearing: partially filling
    At,
    /// Below clearing: not filling
    Below,
}

impl FillStatus {
    /// Tolerance on decoded prices; absorbs the codec's float rounding
    pub const EPSILON: f64 = 1e-8;

    pub fn classify(bid_price: f64, clearing_price: f64) -> Self {
        if (bid_price - clearing_price).abs() < Self::EPSILON {
            FillStatus::At
        } else if bid_price > clearing_price {
            FillStatus::Above
        } else {
            FillStatus::Below
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FillStatus::Above => "filling",
            FillStatus::At => "at clearing",
            FillStatus::Below => "not filling",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            FillStatus::Above => "🟢",
            FillStatus::At => "🟠",
            FillStatus::Below => "⚪",
        }
    }
}
