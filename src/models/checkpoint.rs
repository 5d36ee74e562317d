use ethers::types::U256;
use serde::{Deserialize, Serialize};
use crate::codec::decode_price;
use crate::encoding::MPS_TOTAL;
use super::bid::LogPosition;

/// Clearing price and cumulative release for one block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub block_number: u64,
    /// Q96
    pub clearing_price: U256,
    /// Parts-per-ten-million of supply released so far
    pub cumulative_mps: u32,
    pub position: LogPosition,
}

impl Checkpoint {
    pub fn clearing_price_human(&self) -> f64 {
        decode_price(self.clearing_price)
    }

    /// Share of supply released, 0-100
    pub fn released_percent(&self) -> f64 {
        self.cumulative_mps as f64 * 100.0 / MPS_TOTAL as f64
    }

    /// Ordering key for competing observations of the same block.
    /// Later chain position wins; payload breaks exact ties.
    pub(crate) fn precedence(&self) -> (LogPosition, U256, u32) {
        (self.position, self.clearing_price, self.cumulative_mps)
    }
}
