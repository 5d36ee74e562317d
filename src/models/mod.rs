pub mod bid;
pub mod checkpoint;
pub mod auction;
pub mod listing;
pub mod portfolio;
pub mod snapshot;

pub use bid::{Bid, BidExit, FillStatus, LogPosition};
pub use checkpoint::Checkpoint;
pub use auction::{AuctionPhase, AuctionState, ScalarReads, TokenMetadata};
pub use listing::{AuctionListing, AuctionOverview};
pub use portfolio::OwnedBid;
pub use snapshot::{AuctionSnapshot, BidView};
