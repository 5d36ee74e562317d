//! Release schedule, auction parameters and transaction call data
mod calls;
mod draft;
mod params;
mod schedule;

pub use calls::{
    claim_tokens, claim_tokens_batch, create_token, distribute_to_auction, exit_bid, submit_bid,
    PreparedCall,
};
pub use draft::{AuctionDraft, TokenLaunch, MIN_TICK_SPACING, PERCENT_TOLERANCE};
pub use params::{deployment_salt, AuctionParameters};
pub use schedule::{
    compute_spans, decode_schedule, encode_schedule, ReleaseSchedule, ReleaseSegment,
    ScheduleStep, MAX_BLOCK_DELTA, MAX_MPS, MPS_TOTAL, STEP_SIZE,
};
