use async_trait::async_trait;
use ethers::types::{Address, Filter, Log};
use tokio::sync::{mpsc, watch};
use crate::models::{ScalarReads, TokenMetadata};
use crate::utils::Result;

/// Core abstraction: anything that can answer chain queries about an auction
#[async_trait]
pub trait AuctionSource: Send + Sync {
    /// Short identifier for logs
    fn name(&self) -> &'static str;

    async fn block_number(&self) -> Result<u64>;

    /// Scalar contract state of one auction
    async fn read_scalars(&self, auction: Address) -> Result<ScalarReads>;

    async fn token_metadata(&self, token: Address) -> Result<TokenMetadata>;

    /// One bounded `eth_getLogs` query
    async fn fetch_logs(&self, filter: &Filter) -> Result<Vec<Log>>;

    /// Forward new logs matching `filter` to `sink`, one notification per batch,
    /// until `shutdown` flips to true or the sink closes.
    async fn stream_logs(
        &self,
        filter: Filter,
        sink: mpsc::Sender<Vec<Log>>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<()>;
}
