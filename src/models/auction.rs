use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};
use crate::codec::DEFAULT_DECIMALS;

/// Scalar contract state read in one refresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalarReads {
    /// Q96
    pub clearing_price: U256,
    pub currency: Address,
    pub token: Address,
    pub start_block: u64,
    pub end_block: u64,
    pub claim_block: u64,
    pub currency_raised: U256,
    pub total_cleared: U256,
    pub total_supply: U256,
    pub is_graduated: bool,
    pub tokens_recipient: Address,
    pub funds_recipient: Address,
    pub validation_hook: Address,
}

impl ScalarReads {
    /// `address(0)` as currency means the auction takes ETH
    pub fn is_native_currency(&self) -> bool {
        self.currency.is_zero()
    }
}

/// ERC20 metadata of the auctioned token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl Default for TokenMetadata {
    fn default() -> Self {
        Self {
            name: "Unknown".to_string(),
            symbol: "???".to_string(),
            decimals: DEFAULT_DECIMALS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuctionPhase {
    Upcoming,
    Live,
    Ended,
}

impl AuctionPhase {
    /// `[start, end)` is live
    pub fn at(current_block: u64, start_block: u64, end_block: u64) -> Self {
        if current_block < start_block {
            AuctionPhase::Upcoming
        } else if current_block < end_block {
            AuctionPhase::Live
        } else {
            AuctionPhase::Ended
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AuctionPhase::Upcoming => "UPCOMING",
            AuctionPhase::Live => "LIVE",
            AuctionPhase::Ended => "ENDED",
        }
    }
}

/// Derived view of one auction at one block height. Never a source of truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuctionState {
    pub address: Address,
    /// Q96
    pub clearing_price: U256,
    pub clearing_price_human: f64,
    pub currency: Address,
    pub token: Address,
    pub token_metadata: TokenMetadata,
    pub currency_raised: U256,
    pub total_cleared: U256,
    pub start_block: u64,
    pub end_block: u64,
    pub claim_block: u64,
    pub total_supply: U256,
    pub is_graduated: bool,
    pub is_live: bool,
    pub is_upcoming: bool,
    pub is_ended: bool,
    pub current_block: u64,
}

impl AuctionState {
    pub fn phase(&self) -> AuctionPhase {
        AuctionPhase::at(self.current_block, self.start_block, self.end_block)
    }

    pub fn is_claimable(&self) -> bool {
        self.current_block >= self.claim_block
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_boundaries() {
        assert_eq!(AuctionPhase::at(99, 100, 200), AuctionPhase::Upcoming);
        assert_eq!(AuctionPhase::at(100, 100, 200), AuctionPhase::Live);
        assert_eq!(AuctionPhase::at(199, 100, 200), AuctionPhase::Live);
        assert_eq!(AuctionPhase::at(200, 100, 200), AuctionPhase::Ended);
    }

    #[test]
    fn test_metadata_fallback() {
        let meta = TokenMetadata::default();
        assert_eq!(meta.symbol, "???");
        assert_eq!(meta.decimals, 18);
    }
}
