//! Auction event decoding and state reconstruction
pub mod decoder;
pub mod reconstructor;

pub use decoder::{auction_filter, decode_log, event_signatures, AuctionEvent};
pub use reconstructor::{BatchSummary, EventReconstructor};
