use async_trait::async_trait;
use ethers::prelude::*;
use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use crate::contracts::{IContinuousClearingAuction, IERC20};
use crate::core::AuctionSource;
use crate::models::{ScalarReads, TokenMetadata};
use crate::utils::{CcaError, Result};

/// Default interval of the polling live feed
const DEFAULT_LIVE_POLL: Duration = Duration::from_secs(4);

/// Blockchain RPC client
pub struct BlockchainClient {
    pub provider: Arc<Provider<Http>>,
    ws_url: Option<String>,
    live_poll: Duration,
    chain_id: u64,
}

impl BlockchainClient {
    /// Create a new client
    pub async fn new(rpc_url: &str) -> Result<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| CcaError::RpcError(
                ProviderError::CustomError(format!("Invalid RPC URL: {}", e))
            ))?;

        let provider = Arc::new(provider);

        // Get chain ID
        let chain_id = provider.get_chainid().await?;

        tracing::info!("Connected to chain ID: {}", chain_id);

        Ok(Self {
            provider,
            ws_url: None,
            live_poll: DEFAULT_LIVE_POLL,
            chain_id: chain_id.as_u64(),
        })
    }

    /// Use `eth_subscribe` over this WebSocket endpoint for the live feed
    pub fn with_ws(mut self, ws_url: impl Into<String>) -> Self {
        self.ws_url = Some(ws_url.into());
        self
    }

    /// Poll interval of the live feed when no WebSocket is configured
    pub fn with_live_poll(mut self, interval: Duration) -> Self {
        self.live_poll = interval;
        self
    }

    /// Get chain ID
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Get chain name
    pub fn chain_name(&self) -> &'static str {
        match self.chain_id {
            1 => "Ethereum Mainnet",
            11155111 => "Sepolia",
            8453 => "Base",
            42161 => "Arbitrum One",
            130 => "Unichain",
            _ => "Unknown Chain",
        }
    }

    /// Forward `eth_subscribe` logs until shutdown.
    ///
    /// `resume_after` tracks the last block whose logs have all been delivered,
    /// so a polling feed can pick up where the socket left off.
    async fn stream_over_ws(
        &self,
        ws_url: &str,
        filter: Filter,
        sink: mpsc::Sender<Vec<Log>>,
        mut shutdown: watch::Receiver<bool>,
        resume_after: &mut Option<u64>,
    ) -> Result<()> {
        *resume_after = Some(self.block_number().await?);
        let ws = Provider::<Ws>::connect(ws_url).await?;
        let mut stream = ws.subscribe_logs(&filter).await?;
        tracing::debug!("Subscribed to logs over {}", ws_url);

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                next = stream.next() => match next {
                    Some(log) => {
                        // later logs of the same block may still be in flight
                        if let Some(block) = log.block_number {
                            let complete = block.as_u64().saturating_sub(1);
                            *resume_after = (*resume_after).max(Some(complete));
                        }
                        if sink.send(vec![log]).await.is_err() {
                            break;
                        }
                    }
                    None => {
                        return Err(CcaError::FetchError("log subscription ended".into()));
                    }
                },
            }
        }

        if let Err(e) = stream.unsubscribe().await {
            tracing::debug!("eth_unsubscribe failed: {}", e);
        }
        Ok(())
    }

    /// Poll `eth_getLogs` for blocks after `after` (default: the current head)
    async fn stream_by_polling(
        &self,
        filter: Filter,
        sink: mpsc::Sender<Vec<Log>>,
        mut shutdown: watch::Receiver<bool>,
        after: Option<u64>,
    ) -> Result<()> {
        let mut last_seen = match after {
            Some(block) => block,
            None => self.block_number().await?,
        };
        let mut interval = tokio::time::interval(self.live_poll);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = interval.tick() => {
                    let head = match self.block_number().await {
                        Ok(head) => head,
                        Err(e) => {
                            tracing::debug!("Live poll skipped: {}", e);
                            continue;
                        }
                    };
                    if head <= last_seen {
                        continue;
                    }

                    let query = filter.clone().from_block(last_seen + 1).to_block(head);
                    match self.fetch_logs(&query).await {
                        Ok(logs) => {
                            last_seen = head;
                            if !logs.is_empty() && sink.send(logs).await.is_err() {
                                break;
                            }
                        }
                        // the same range is retried on the next tick
                        Err(e) => tracing::debug!("Live poll {} to {} failed: {}", last_seen + 1, head, e),
                    }
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl AuctionSource for BlockchainClient {
    fn name(&self) -> &'static str {
        if self.ws_url.is_some() { "websocket" } else { "http-poll" }
    }

    /// Get current block number
    async fn block_number(&self) -> Result<u64> {
        let block = self.provider.get_block_number().await
            .map_err(|e| CcaError::FetchError(format!("eth_blockNumber: {}", e)))?;
        Ok(block.as_u64())
    }

    async fn read_scalars(&self, auction: Address) -> Result<ScalarReads> {
        tracing::debug!("Reading scalar state of {:?}", auction);

        let contract = IContinuousClearingAuction::new(auction, self.provider.clone());

        let clearing_price = contract.clearing_price();
        let currency = contract.currency();
        let token = contract.token();
        let start_block = contract.start_block();
        let end_block = contract.end_block();
        let claim_block = contract.claim_block();
        let currency_raised = contract.currency_raised();
        let total_cleared = contract.total_cleared();
        let total_supply = contract.total_supply();
        let is_graduated = contract.is_graduated();
        let tokens_recipient = contract.tokens_recipient();
        let funds_recipient = contract.funds_recipient();
        let validation_hook = contract.validation_hook();

        let (
            clearing_price,
            currency,
            token,
            start_block,
            end_block,
            claim_block,
            currency_raised,
            total_cleared,
            total_supply,
            is_graduated,
            tokens_recipient,
            funds_recipient,
            validation_hook,
        ) = tokio::try_join!(
            clearing_price.call(),
            currency.call(),
            token.call(),
            start_block.call(),
            end_block.call(),
            claim_block.call(),
            currency_raised.call(),
            total_cleared.call(),
            total_supply.call(),
            is_graduated.call(),
            tokens_recipient.call(),
            funds_recipient.call(),
            validation_hook.call(),
        )
        .map_err(|e| CcaError::FetchError(format!("auction {:?}: {}", auction, e)))?;

        Ok(ScalarReads {
            clearing_price,
            currency,
            token,
            start_block,
            end_block,
            claim_block,
            currency_raised,
            total_cleared,
            total_supply: U256::from(total_supply),
            is_graduated,
            tokens_recipient,
            funds_recipient,
            validation_hook,
        })
    }

    /// Each field falls back on its own, as tokens with non-standard metadata are common
    async fn token_metadata(&self, token: Address) -> Result<TokenMetadata> {
        let contract = IERC20::new(token, self.provider.clone());
        let name = contract.name();
        let symbol = contract.symbol();
        let decimals = contract.decimals();

        let (name, symbol, decimals) = tokio::join!(name.call(), symbol.call(), decimals.call());
        let fallback = TokenMetadata::default();

        Ok(TokenMetadata {
            name: name.unwrap_or(fallback.name),
            symbol: symbol.unwrap_or(fallback.symbol),
            decimals: decimals.unwrap_or(fallback.decimals),
        })
    }

    async fn fetch_logs(&self, filter: &Filter) -> Result<Vec<Log>> {
        self.provider
            .get_logs(filter)
            .await
            .map_err(|e| CcaError::FetchError(format!("eth_getLogs: {}", e)))
    }

    async fn stream_logs(
        &self,
        filter: Filter,
        sink: mpsc::Sender<Vec<Log>>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        let ws_url = match self.ws_url.as_deref() {
            Some(ws_url) => ws_url,
            None => return self.stream_by_polling(filter, sink, shutdown, None).await,
        };

        let mut resume_after = None;
        let error = match self
            .stream_over_ws(ws_url, filter.clone(), sink.clone(), shutdown.clone(), &mut resume_after)
            .await
        {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };
        if *shutdown.borrow() {
            return Ok(());
        }

        match resume_after {
            Some(block) => {
                tracing::warn!("⚠️  WebSocket feed lost ({}), polling from block {}", error, block + 1);
                self.stream_by_polling(filter, sink, shutdown, Some(block)).await
            }
            // never reached the head, nothing to resume from
            None => Err(error),
        }
    }
}
