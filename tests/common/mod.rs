#![allow(dead_code)]

use async_trait::async_trait;
use cca_client::codec::encode_price;
use cca_client::contracts::{addresses, AuctionCreatedFilter};
use cca_client::core::AuctionSource;
use cca_client::events::AuctionEvent;
use cca_client::models::{Bid, BidExit, Checkpoint, LogPosition, ScalarReads, TokenMetadata};
use cca_client::{CcaError, Result};
use ethers::abi::{self, Token};
use ethers::contract::EthEvent;
use ethers::types::{Address, Filter, Log, ValueOrArray, H256, U256, U64};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::{mpsc, watch};

pub fn auction() -> Address {
    Address::from_low_u64_be(0xac)
}

pub fn bidder() -> Address {
    Address::from_low_u64_be(0xb0b)
}

pub fn bid_log(id: u64, price: f64, block: u64) -> Log {
    bid_log_in(auction(), bidder(), id, price, block)
}

/// A `BidSubmitted` log from any auction and owner
pub fn bid_log_in(auction: Address, owner: Address, id: u64, price: f64, block: u64) -> Log {
    AuctionEvent::BidSubmitted(Bid {
        id: id.into(),
        owner,
        price: encode_price(price).unwrap(),
        amount: U256::exp10(18),
        position: LogPosition::new(block, id),
    })
    .to_log(auction)
}

pub fn exit_log(id: u64, block: u64) -> Log {
    exit_log_in(auction(), bidder(), id, block)
}

pub fn exit_log_in(auction: Address, owner: Address, id: u64, block: u64) -> Log {
    AuctionEvent::BidExited(BidExit {
        bid_id: id.into(),
        owner,
        tokens_filled: U256::zero(),
        currency_refunded: U256::exp10(18),
        position: LogPosition::new(block, 50 + id),
    })
    .to_log(auction)
}

/// Factory `AuctionCreated` log without decodable parameters
pub fn created_log(auction: Address, block: u64) -> Log {
    Log {
        address: addresses::cca_factory(),
        topics: vec![
            AuctionCreatedFilter::signature(),
            H256::from(auction),
            H256::from(Address::from_low_u64_be(0x70)),
        ],
        data: abi::encode(&[Token::Uint(U256::exp10(24)), Token::Bytes(Vec::new())]).into(),
        block_number: Some(U64::from(block)),
        ..Default::default()
    }
}

pub fn checkpoint_log(block: u64, price: f64, mps: u32) -> Log {
    AuctionEvent::CheckpointUpdated(Checkpoint {
        block_number: block,
        clearing_price: encode_price(price).unwrap(),
        cumulative_mps: mps,
        position: LogPosition::new(block, 99),
    })
    .to_log(auction())
}

pub fn scalars(start: u64, end: u64, clearing: f64) -> ScalarReads {
    ScalarReads {
        clearing_price: encode_price(clearing).unwrap(),
        currency: Address::zero(),
        token: Address::from_low_u64_be(0x70),
        start_block: start,
        end_block: end,
        claim_block: end,
        currency_raised: U256::exp10(18),
        total_cleared: U256::zero(),
        total_supply: U256::exp10(24),
        is_graduated: false,
        tokens_recipient: Address::zero(),
        funds_recipient: Address::zero(),
        validation_hook: Address::zero(),
    }
}

/// In-memory chain: serves logs from a vector and a live channel
pub struct MemorySource {
    head: AtomicU64,
    history: Mutex<Vec<Log>>,
    scalars: Mutex<ScalarReads>,
    fail_fetches: AtomicBool,
    fail_reads: AtomicBool,
    /// Next `stream_logs` call fails before delivering anything
    fail_stream: AtomicBool,
    /// Largest block span a log query may cover
    max_span: Option<u64>,
    live: Mutex<Option<mpsc::Receiver<Vec<Log>>>>,
    pub fetch_calls: AtomicUsize,
}

impl MemorySource {
    pub fn new(head: u64, scalars: ScalarReads) -> (Self, mpsc::Sender<Vec<Log>>) {
        let (tx, rx) = mpsc::channel(16);
        let source = Self {
            head: AtomicU64::new(head),
            history: Mutex::new(Vec::new()),
            scalars: Mutex::new(scalars),
            fail_fetches: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
            fail_stream: AtomicBool::new(false),
            max_span: None,
            live: Mutex::new(Some(rx)),
            fetch_calls: AtomicUsize::new(0),
        };
        (source, tx)
    }

    pub fn with_max_span(mut self, span: u64) -> Self {
        self.max_span = Some(span);
        self
    }

    pub fn push_history(&self, logs: impl IntoIterator<Item = Log>) {
        self.history.lock().unwrap().extend(logs);
    }

    pub fn set_head(&self, head: u64) {
        self.head.store(head, Ordering::SeqCst);
    }

    pub fn fail_fetches(&self, fail: bool) {
        self.fail_fetches.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_stream_once(&self) {
        self.fail_stream.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl AuctionSource for MemorySource {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn block_number(&self) -> Result<u64> {
        Ok(self.head.load(Ordering::SeqCst))
    }

    async fn read_scalars(&self, _auction: Address) -> Result<ScalarReads> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(CcaError::FetchError("eth_call: connection reset".into()));
        }
        Ok(self.scalars.lock().unwrap().clone())
    }

    async fn token_metadata(&self, _token: Address) -> Result<TokenMetadata> {
        Ok(TokenMetadata {
            name: "Test Token".into(),
            symbol: "TST".into(),
            decimals: 18,
        })
    }

    async fn fetch_logs(&self, filter: &Filter) -> Result<Vec<Log>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(CcaError::FetchError("eth_getLogs: connection reset".into()));
        }

        let from = filter.get_from_block().map(|b| b.as_u64()).unwrap_or(0);
        let to = filter.get_to_block().map(|b| b.as_u64()).unwrap_or(u64::MAX);
        if let Some(max) = self.max_span {
            if to - from + 1 > max {
                return Err(CcaError::FetchError(
                    "eth_getLogs: -32005 query returned more than 10000 results".into(),
                ));
            }
        }

        Ok(self
            .history
            .lock()
            .unwrap()
            .iter()
            .filter(|log| {
                let block = log.block_number.map(|b| b.as_u64()).unwrap_or(0);
                let address = match &filter.address {
                    Some(ValueOrArray::Value(address)) => *address == log.address,
                    Some(ValueOrArray::Array(addresses)) => addresses.contains(&log.address),
                    None => true,
                };
                address && block >= from && block <= to
            })
            .cloned()
            .collect())
    }

    async fn stream_logs(
        &self,
        _filter: Filter,
        sink: mpsc::Sender<Vec<Log>>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        if self.fail_stream.swap(false, Ordering::SeqCst) {
            return Err(CcaError::FetchError("eth_subscribe: socket closed".into()));
        }

        let receiver = self.live.lock().unwrap().take();
        let mut receiver = match receiver {
            Some(receiver) => receiver,
            None => return Ok(()),
        };

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                batch = receiver.recv() => match batch {
                    Some(batch) => {
                        if sink.send(batch).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }
        Ok(())
    }
}
