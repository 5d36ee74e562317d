pub mod traits;
pub mod history;
pub mod projector;
pub mod watcher;
pub mod discovery;

pub use traits::AuctionSource;
pub use history::{fetch_chunked, HistoryFetch, LogBatch};
pub use projector::{project, project_state};
pub use watcher::{AuctionWatcher, LiveSubscription};
pub use discovery::{bids_of_owner, describe_auctions, list_auctions, parse_listing};
