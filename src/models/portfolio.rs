use ethers::types::Address;
use serde::{Deserialize, Serialize};
use crate::codec::{format_compact, format_compact_value, truncate_address};
use super::auction::AuctionPhase;
use super::bid::{Bid, FillStatus};

/// One unexited bid of a given owner, with the state of its auction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnedBid {
    pub auction: Address,
    pub token_symbol: String,
    pub bid: Bid,
    pub fill: FillStatus,
    pub clearing_price_human: f64,
    pub phase: AuctionPhase,
    /// Claim block reached
    pub claimable: bool,
}

impl OwnedBid {
    /// At or above the clearing price
    pub fn is_filling(&self) -> bool {
        self.fill != FillStatus::Below
    }

    /// Exits are accepted while the auction runs
    pub fn can_exit(&self) -> bool {
        self.phase == AuctionPhase::Live
    }

    pub fn can_claim(&self) -> bool {
        self.phase == AuctionPhase::Ended && self.claimable
    }
}

impl std::fmt::Display for OwnedBid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let action = if self.can_exit() {
            "exit"
        } else if self.can_claim() {
            "claim"
        } else {
            "-"
        };
        write!(
            f,
            "{} {:<8} #{:<5} {} price {} vs {} {:<8} {}",
            truncate_address(self.auction),
            self.token_symbol,
            self.bid.id,
            self.fill.emoji(),
            format_compact(self.bid.price),
            format_compact_value(self.clearing_price_human),
            self.phase.label(),
            action
        )
    }
}
