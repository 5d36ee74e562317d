use serde::{Deserialize, Serialize};
use crate::codec::{block_to_relative_time, format_compact, format_wei, truncate_address};
use super::auction::AuctionState;
use super::bid::{Bid, FillStatus};
use super::checkpoint::Checkpoint;

/// One bid as presented against the current clearing price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BidView {
    pub bid: Bid,
    pub exited: bool,
    pub fill: FillStatus,
}

/// Everything a front end needs to render one auction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuctionSnapshot {
    pub state: AuctionState,
    /// All observed bids, ascending id
    pub bids: Vec<BidView>,
    /// Newest block first
    pub checkpoints: Vec<Checkpoint>,
    /// Last reconstruction failure, if the data shown may be out of date
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stale: Option<String>,
}

impl AuctionSnapshot {
    pub fn active_bids(&self) -> impl Iterator<Item = &BidView> {
        self.bids.iter().filter(|b| !b.exited)
    }

    /// Tokens a currency budget buys at the current clearing price
    pub fn estimate_tokens(&self, budget: f64) -> f64 {
        if self.state.clearing_price_human > 0.0 {
            budget / self.state.clearing_price_human
        } else {
            0.0
        }
    }
}

impl std::fmt::Display for AuctionSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = &self.state;
        let currency = if s.currency.is_zero() { "ETH" } else { "currency" };

        writeln!(f, "═══════════════════════════════════════════════════════════")?;
        writeln!(f, "        {} ({}) AUCTION", s.token_metadata.name, s.token_metadata.symbol)?;
        writeln!(f, "═══════════════════════════════════════════════════════════")?;
        writeln!(f)?;
        writeln!(f, "Address: {:?}", s.address)?;
        writeln!(f, "Status:  {} at block {}", s.phase().label(), s.current_block)?;
        writeln!(f, "Starts:  block {} ({})", s.start_block, block_to_relative_time(s.start_block, s.current_block))?;
        writeln!(f, "Ends:    block {} ({})", s.end_block, block_to_relative_time(s.end_block, s.current_block))?;
        writeln!(f, "Claim:   block {}", s.claim_block)?;
        writeln!(f)?;
        writeln!(f, "═══ CLEARING ═══")?;
        writeln!(f, "Price:     {} {}", format_compact(s.clearing_price), currency)?;
        writeln!(f, "Raised:    {} {}", format_wei(s.currency_raised, 18), currency)?;
        writeln!(f, "Cleared:   {} / {} {}",
            format_wei(s.total_cleared, s.token_metadata.decimals),
            format_wei(s.total_supply, s.token_metadata.decimals),
            s.token_metadata.symbol
        )?;
        writeln!(f, "Graduated: {}", if s.is_graduated { "yes" } else { "no" })?;

        if let Some(latest) = self.checkpoints.first() {
            writeln!(f, "Released:  {:.2}% (checkpoint at block {})", latest.released_percent(), latest.block_number)?;
        }

        let active: Vec<&BidView> = self.active_bids().collect();
        if !active.is_empty() {
            writeln!(f)?;
            writeln!(f, "═══ ACTIVE BIDS ({}) ═══", active.len())?;
            for view in active.iter().take(20) {
                writeln!(f, "{} #{} {} max {} budget {} {} ({})",
                    view.fill.emoji(),
                    view.bid.id,
                    truncate_address(view.bid.owner),
                    format_compact(view.bid.price),
                    format_wei(view.bid.amount, 18),
                    currency,
                    view.fill.label()
                )?;
            }
        }

        if let Some(reason) = &self.stale {
            writeln!(f)?;
            writeln!(f, "⚠️  Showing last known data: {}", reason)?;
        }

        writeln!(f)?;
        writeln!(f, "═══════════════════════════════════════════════════════════")?;

        Ok(())
    }
}
