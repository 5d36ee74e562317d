//! Pure projection of chain reads and reconstructed events into a snapshot

use ethers::types::Address;
use crate::codec::decode_price;
use crate::events::EventReconstructor;
use crate::models::{
    AuctionPhase, AuctionSnapshot, AuctionState, BidView, FillStatus, ScalarReads, TokenMetadata,
};

/// Classify an auction at `current_block` from one set of scalar reads
pub fn project_state(
    address: Address,
    current_block: u64,
    scalars: &ScalarReads,
    token: &TokenMetadata,
) -> AuctionState {
    let phase = AuctionPhase::at(current_block, scalars.start_block, scalars.end_block);

    AuctionState {
        address,
        clearing_price: scalars.clearing_price,
        clearing_price_human: decode_price(scalars.clearing_price),
        currency: scalars.currency,
        token: scalars.token,
        token_metadata: token.clone(),
        currency_raised: scalars.currency_raised,
        total_cleared: scalars.total_cleared,
        start_block: scalars.start_block,
        end_block: scalars.end_block,
        claim_block: scalars.claim_block,
        total_supply: scalars.total_supply,
        is_graduated: scalars.is_graduated,
        is_upcoming: phase == AuctionPhase::Upcoming,
        is_live: phase == AuctionPhase::Live,
        is_ended: phase == AuctionPhase::Ended,
        current_block,
    }
}

/// Full snapshot: state plus every observed bid classified against the clearing price
pub fn project(
    current_block: u64,
    scalars: &ScalarReads,
    token: &TokenMetadata,
    events: &EventReconstructor,
    stale: Option<String>,
) -> AuctionSnapshot {
    let state = project_state(events.auction(), current_block, scalars, token);
    let clearing = state.clearing_price_human;

    let bids = events
        .bids()
        .map(|bid| BidView {
            fill: FillStatus::classify(bid.price_human(), clearing),
            exited: events.is_exited(bid.id),
            bid: bid.clone(),
        })
        .collect();

    let checkpoints = events.checkpoint_sequence().into_iter().cloned().collect();

    AuctionSnapshot { state, bids, checkpoints, stale }
}
