//! Chunked historical log queries

use ethers::types::{Filter, Log};
use crate::config::WatchConfig;
use crate::utils::{CcaError, Result};
use super::traits::AuctionSource;

/// Logs of one successful chunk query
#[derive(Debug, Clone)]
pub struct LogBatch {
    /// Last block the query covered
    pub to_block: u64,
    pub logs: Vec<Log>,
}

/// Outcome of a chunked fetch. Chunks fetched before a failure are kept.
#[derive(Debug, Default)]
pub struct HistoryFetch {
    pub batches: Vec<LogBatch>,
    pub error: Option<CcaError>,
}

impl HistoryFetch {
    /// Last block covered without a gap
    pub fn synced_through(&self) -> Option<u64> {
        self.batches.last().map(|b| b.to_block)
    }

    /// All logs, or the error if the range was not fully covered
    pub fn into_logs(self) -> Result<Vec<Log>> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.batches.into_iter().flat_map(|b| b.logs).collect()),
        }
    }
}

/// Fetch `filter` over `[from, to]` in chunks of `log_chunk_size` blocks.
///
/// A chunk the provider refuses for its size is retried at half the span,
/// down to `min_chunk_size`. Any other failure stops the fetch.
pub async fn fetch_chunked<S>(
    source: &S,
    filter: &Filter,
    from: u64,
    to: u64,
    config: &WatchConfig,
) -> HistoryFetch
where
    S: AuctionSource + ?Sized,
{
    let mut batches = Vec::new();
    let mut chunk_size = config.log_chunk_size.max(1);
    let min_chunk_size = config.min_chunk_size.clamp(1, chunk_size);
    let mut current_from = from;

    while current_from <= to {
        let to_block = current_from.saturating_add(chunk_size - 1).min(to);
        let query = filter.clone().from_block(current_from).to_block(to_block);

        tracing::debug!("Querying logs from block {} to {}", current_from, to_block);

        match source.fetch_logs(&query).await {
            Ok(logs) => {
                batches.push(LogBatch { to_block, logs });
                if to_block == u64::MAX {
                    break;
                }
                current_from = to_block + 1;
            }
            Err(e) if e.is_range_limited() && chunk_size > min_chunk_size => {
                let old_size = chunk_size;
                chunk_size = (chunk_size / 2).max(min_chunk_size);
                tracing::warn!(
                    "⚠️  Log query {} to {} refused, reducing chunk size: {} → {}",
                    current_from, to_block, old_size, chunk_size
                );
            }
            Err(e) => {
                tracing::warn!("Failed to query logs {} to {}: {}", current_from, to_block, e);
                let error = match e {
                    CcaError::RpcError(inner) => CcaError::FetchError(inner.to_string()),
                    other => other,
                };
                return HistoryFetch { batches, error: Some(error) };
            }
        }
    }

    HistoryFetch { batches, error: None }
}
