//! Keeps one auction's reconstructed state in sync with the chain
//!
//! Independent sources (block height, scalar reads, historical logs, the live
//! feed) each write into one shared state as they complete. Every write is a
//! whole batch under the lock, so readers never see a partial merge.
//!
//! A rejected live batch or a failed fetch leaves a hole in the event record.
//! The hole is refilled by re-running the history sync from the last block
//! known to be complete; `stale` stays set until that succeeds.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use ethers::types::{Address, Log};
use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use crate::config::WatchConfig;
use crate::events::{auction_filter, EventReconstructor};
use crate::models::{AuctionSnapshot, ScalarReads, TokenMetadata};
use crate::utils::{CcaError, Result};
use super::history::{fetch_chunked, HistoryFetch};
use super::projector::project;
use super::traits::AuctionSource;

/// Notifications buffered between the live feed and the reconstructor
const LIVE_BUFFER: usize = 256;

#[derive(Debug)]
struct WatchState {
    events: EventReconstructor,
    scalars: Option<ScalarReads>,
    token: Option<TokenMetadata>,
    current_block: Option<u64>,
    synced_through: Option<u64>,
    /// Last failure of a chain read
    read_error: Option<String>,
    /// Last failure of the log pipeline
    log_error: Option<String>,
    /// Log-pipeline failures seen so far
    log_failures: u64,
    /// Failures covered by a later successful history sync
    resolved_failures: u64,
}

impl WatchState {
    fn needs_resync(&self) -> bool {
        self.log_failures > self.resolved_failures
    }

    fn stale(&self) -> Option<String> {
        match (&self.read_error, &self.log_error) {
            (None, None) => None,
            (Some(e), None) | (None, Some(e)) => Some(e.clone()),
            (Some(a), Some(b)) => Some(format!("{}; {}", a, b)),
        }
    }
}

pub struct AuctionWatcher<S: ?Sized> {
    source: Arc<S>,
    auction: Address,
    config: WatchConfig,
    state: Arc<RwLock<WatchState>>,
    revision: Arc<watch::Sender<u64>>,
}

impl<S: ?Sized> Clone for AuctionWatcher<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            auction: self.auction,
            config: self.config.clone(),
            state: Arc::clone(&self.state),
            revision: Arc::clone(&self.revision),
        }
    }
}

impl<S> AuctionWatcher<S>
where
    S: AuctionSource + ?Sized + 'static,
{
    pub fn new(source: Arc<S>, auction: Address, config: WatchConfig) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            source,
            auction,
            config,
            state: Arc::new(RwLock::new(WatchState {
                events: EventReconstructor::new(auction),
                scalars: None,
                token: None,
                current_block: None,
                synced_through: None,
                read_error: None,
                log_error: None,
                log_failures: 0,
                resolved_failures: 0,
            })),
            revision: Arc::new(revision),
        }
    }

    pub fn auction(&self) -> Address {
        self.auction
    }

    /// Bumped after every state change
    pub fn updates(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn bump(&self) {
        self.revision.send_modify(|r| *r += 1);
    }

    /// Current projection, once block height and scalars have been read at least once
    pub async fn snapshot(&self) -> Option<AuctionSnapshot> {
        let state = self.state.read().await;
        let scalars = state.scalars.as_ref()?;
        let current_block = state.current_block?;
        let token = state.token.clone().unwrap_or_default();
        Some(project(current_block, scalars, &token, &state.events, state.stale()))
    }

    /// Copy of the reconstructed events
    pub async fn events(&self) -> EventReconstructor {
        self.state.read().await.events.clone()
    }

    pub async fn synced_through(&self) -> Option<u64> {
        self.state.read().await.synced_through
    }

    /// Refresh block height and scalar state concurrently, then refetch any
    /// logs the live feed is known to have missed.
    ///
    /// Each read lands as soon as it completes; a failure keeps the previous value.
    pub async fn refresh(&self) -> Result<()> {
        let (block, scalars) = tokio::join!(self.refresh_block(), self.refresh_scalars());
        block?;
        scalars?;
        self.resync_if_needed().await
    }

    /// Whether a log-pipeline failure is still waiting for a history refetch
    pub async fn needs_resync(&self) -> bool {
        self.state.read().await.needs_resync()
    }

    async fn resync_if_needed(&self) -> Result<()> {
        if self.needs_resync().await {
            tracing::info!("🔁 Refetching logs missed by the live feed for {:?}", self.auction);
            self.sync_history().await?;
        }
        Ok(())
    }

    async fn refresh_block(&self) -> Result<u64> {
        match self.source.block_number().await {
            Ok(block) => {
                let changed = {
                    let mut state = self.state.write().await;
                    let changed = state.current_block != Some(block);
                    state.current_block = Some(block);
                    changed
                };
                if changed {
                    tracing::trace!("Block height {}", block);
                    self.bump();
                }
                Ok(block)
            }
            Err(e) => {
                self.record_read_error(&e).await;
                Err(e)
            }
        }
    }

    async fn refresh_scalars(&self) -> Result<()> {
        let scalars = match self.source.read_scalars(self.auction).await {
            Ok(scalars) => scalars,
            Err(e) => {
                self.record_read_error(&e).await;
                return Err(e);
            }
        };

        let token = scalars.token;
        let needs_metadata = {
            let mut state = self.state.write().await;
            state.scalars = Some(scalars);
            state.read_error = None;
            state.token.is_none()
        };
        self.bump();

        if needs_metadata {
            let metadata = match self.source.token_metadata(token).await {
                Ok(metadata) => metadata,
                Err(e) => {
                    tracing::warn!("Token metadata for {:?} unavailable: {}", token, e);
                    TokenMetadata::default()
                }
            };
            self.state.write().await.token = Some(metadata);
            self.bump();
        }

        Ok(())
    }

    async fn record_read_error(&self, error: &CcaError) {
        tracing::warn!("⚠️  Chain read failed for {:?}: {}", self.auction, error);
        self.state.write().await.read_error = Some(error.to_string());
        self.bump();
    }

    async fn record_log_failure(&self, error: &CcaError) {
        {
            let mut state = self.state.write().await;
            state.log_error = Some(error.to_string());
            state.log_failures += 1;
        }
        self.bump();
    }

    /// Fetch logs from the last synced block (or the configured start) up to the chain head.
    ///
    /// Chunks merge one at a time; on failure everything merged so far is
    /// kept and the next call resumes after it.
    pub async fn sync_history(&self) -> Result<Option<u64>> {
        let head = self.refresh_block().await?;

        let (from, failures) = {
            let state = self.state.read().await;
            let from = match state.synced_through {
                Some(block) => block.saturating_add(1),
                None => self
                    .config
                    .from_block
                    .or_else(|| state.scalars.as_ref().map(|s| s.start_block))
                    .unwrap_or(0),
            };
            (from, state.log_failures)
        };

        let fetch = if from > head {
            HistoryFetch::default()
        } else {
            tracing::info!("📜 Syncing {:?} history from block {} to {}", self.auction, from, head);
            let filter = auction_filter(self.auction);
            fetch_chunked(self.source.as_ref(), &filter, from, head, &self.config).await
        };

        let result = {
            let mut state = self.state.write().await;
            let mut merged = Ok(());
            for batch in &fetch.batches {
                if let Err(e) = state.events.apply_batch(&batch.logs) {
                    merged = Err(e);
                    break;
                }
                state.synced_through = state.synced_through.max(Some(batch.to_block));
            }

            let result = merged.and_then(|_| match fetch.error {
                Some(e) => Err(e),
                None => Ok(state.synced_through),
            });
            match &result {
                Ok(_) => {
                    // failures recorded mid-fetch may lie beyond `head`
                    state.resolved_failures = state.resolved_failures.max(failures);
                    if !state.needs_resync() {
                        state.log_error = None;
                    }
                }
                Err(e) => {
                    state.log_error = Some(e.to_string());
                    state.log_failures += 1;
                }
            }
            result
        };
        self.bump();

        match &result {
            Ok(_) if from > head => {}
            Ok(through) => {
                let state = self.state.read().await;
                tracing::info!(
                    "✅ Synced through block {:?}: {} bids, {} checkpoints",
                    through,
                    state.events.bid_count(),
                    state.events.checkpoint_count()
                );
            }
            Err(e) => tracing::warn!("⚠️  History sync stopped: {}", e),
        }

        result
    }

    /// Initial chain reads followed by the historical sync
    pub async fn sync(&self) -> Result<()> {
        if let Err(e) = self.refresh().await {
            if !e.is_recoverable() {
                return Err(e);
            }
        }
        self.sync_history().await.map(|_| ())
    }

    /// Open the live feed, then catch up on anything mined since the historical sync.
    ///
    /// Overlap between the catch-up fetch and the live feed is harmless, since
    /// merging the same log twice is a no-op. Block height, scalar reads and
    /// gap recovery each run on their own task so a slow read never holds
    /// back the others.
    pub async fn follow(&self) -> LiveSubscription {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let (sink, feed) = mpsc::channel::<Vec<Log>>(LIVE_BUFFER);

        let stream = {
            let watcher = self.clone();
            let shutdown_rx = shutdown_rx.clone();
            tokio::spawn(async move { watcher.stream_feed(sink, shutdown_rx).await })
        };

        let apply = {
            let watcher = self.clone();
            tokio::spawn(async move { watcher.apply_feed(feed).await })
        };

        let heights = self.every(
            self.config.block_poll_interval(),
            shutdown_rx.clone(),
            |w| async move {
                let _ = w.refresh_block().await;
            },
        );
        let scalars = self.every(
            self.config.scalar_refresh_interval(),
            shutdown_rx.clone(),
            |w| async move {
                let _ = w.refresh_scalars().await;
            },
        );
        let recovery = self.every(
            self.config.block_poll_interval(),
            shutdown_rx,
            |w| async move {
                if let Err(e) = w.resync_if_needed().await {
                    tracing::debug!("Resync attempt failed: {}", e);
                }
            },
        );

        tracing::info!("📡 Live subscription open for {:?} ({})", self.auction, self.source.name());

        if let Err(e) = self.sync_history().await {
            tracing::warn!("Catch-up fetch failed, will retry: {}", e);
        }

        LiveSubscription { shutdown, tasks: vec![stream, apply, heights, scalars, recovery] }
    }

    /// `sync` then `follow`. Sync failures degrade to stale data.
    pub async fn start(&self) -> Result<LiveSubscription> {
        if let Err(e) = self.sync().await {
            if !e.is_recoverable() {
                return Err(e);
            }
            tracing::warn!("⚠️  Starting with incomplete history: {}", e);
        }
        Ok(self.follow().await)
    }

    /// Keep the source's log stream open until shutdown, reopening it after failures
    async fn stream_feed(
        &self,
        sink: mpsc::Sender<Vec<Log>>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let filter = auction_filter(self.auction);
        let mut reopening = false;
        while !*shutdown.borrow() {
            if reopening {
                // blocks mined while the feed was down are refetched once it is back
                self.state.write().await.log_failures += 1;
            }
            match self.source.stream_logs(filter.clone(), sink.clone(), shutdown.clone()).await {
                Ok(()) => break,
                Err(e) => {
                    tracing::warn!("⚠️  Live feed for {:?} failed, reopening: {}", self.auction, e);
                    self.record_log_failure(&e).await;
                    reopening = true;
                }
            }
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(self.config.block_poll_interval()) => {}
            }
        }
    }

    async fn apply_feed(&self, mut feed: mpsc::Receiver<Vec<Log>>) {
        while let Some(batch) = feed.recv().await {
            self.apply_live(&batch).await;
        }
    }

    /// Merge one live notification atomically.
    ///
    /// A rejected batch discards every log in it, valid ones included, and
    /// schedules a history refetch to recover them.
    pub async fn apply_live(&self, batch: &[Log]) {
        let changed = {
            let mut state = self.state.write().await;
            match state.events.apply_batch(batch) {
                Ok(summary) => {
                    let recovered = !state.needs_resync() && state.log_error.take().is_some();
                    recovered || !summary.is_empty()
                }
                Err(e) => {
                    tracing::warn!(
                        "⚠️  Rejected live batch of {} logs, scheduling refetch: {}",
                        batch.len(),
                        e
                    );
                    state.log_error = Some(e.to_string());
                    state.log_failures += 1;
                    true
                }
            }
        };
        if changed {
            self.bump();
        }
    }

    /// Run `tick` on a fixed period until shutdown
    fn every<F, Fut>(
        &self,
        period: Duration,
        mut shutdown: watch::Receiver<bool>,
        tick: F,
    ) -> JoinHandle<()>
    where
        F: Fn(Self) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let watcher = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            while !*shutdown.borrow() {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = interval.tick() => tick(watcher.clone()).await,
                }
            }
        })
    }
}

/// Handle on a running live feed. Dropping it also signals shutdown.
pub struct LiveSubscription {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl LiveSubscription {
    pub fn is_active(&self) -> bool {
        self.tasks.iter().any(|task| !task.is_finished())
    }

    /// Stop the feed and wait for its tasks to wind down
    pub async fn unsubscribe(mut self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                tracing::warn!("Live task ended abnormally: {}", e);
            }
        }
        tracing::info!("🔌 Live subscription closed");
    }
}

impl Drop for LiveSubscription {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}
