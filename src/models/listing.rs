use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};
use crate::codec::{format_compact, format_wei, truncate_address};
use crate::encoding::AuctionParameters;
use super::auction::AuctionState;

/// One auction announced by the factory's `AuctionCreated` event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionListing {
    pub auction: Address,
    pub token: Address,
    /// Tokens handed to the auction
    pub amount: U256,
    /// Decoded `configData`; `None` if it did not parse
    pub parameters: Option<AuctionParameters>,
    pub created_at: u64,
}

/// A listing with its current state, if the reads succeeded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuctionOverview {
    pub listing: AuctionListing,
    pub state: Option<AuctionState>,
}

impl std::fmt::Display for AuctionOverview {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.state {
            Some(s) => write!(
                f,
                "{} {:<8} {:<9} clearing {} raised {} ETH (blocks {}-{})",
                truncate_address(self.listing.auction),
                s.token_metadata.symbol,
                s.phase().label(),
                format_compact(s.clearing_price),
                format_wei(s.currency_raised, 18),
                s.start_block,
                s.end_block
            ),
            None => write!(
                f,
                "{} token {} (state unavailable, created at block {})",
                truncate_address(self.listing.auction),
                truncate_address(self.listing.token),
                self.listing.created_at
            ),
        }
    }
}
