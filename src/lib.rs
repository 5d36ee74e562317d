pub mod config;
pub mod contracts;
pub mod codec;
pub mod encoding;
pub mod events;

pub mod core;
pub mod models;
pub mod blockchain;
pub mod utils;

pub use core::{AuctionSource, AuctionWatcher, LiveSubscription};
pub use events::EventReconstructor;
pub use models::{AuctionSnapshot, AuctionState, Bid, Checkpoint, FillStatus};
pub use utils::{CcaError, Result};
