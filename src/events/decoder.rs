//! Typed decoding of auction event logs
//!
//! Each log is matched on its signature topic and validated against that
//! event's schema before it can touch reconstructed state. Anything that
//! does not fit is rejected as `MalformedLog`.

use ethers::abi::{self, Token};
use ethers::contract::{parse_log, EthEvent};
use ethers::types::{Address, Filter, Log, H256, U256, U64};
use crate::contracts::{BidExitedFilter, BidSubmittedFilter, CheckpointUpdatedFilter};
use crate::models::{Bid, BidExit, Checkpoint, LogPosition};
use crate::utils::{CcaError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuctionEvent {
    BidSubmitted(Bid),
    BidExited(BidExit),
    CheckpointUpdated(Checkpoint),
}

impl AuctionEvent {
    pub fn position(&self) -> LogPosition {
        match self {
            AuctionEvent::BidSubmitted(bid) => bid.position,
            AuctionEvent::BidExited(exit) => exit.position,
            AuctionEvent::CheckpointUpdated(checkpoint) => checkpoint.position,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AuctionEvent::BidSubmitted(_) => "BidSubmitted",
            AuctionEvent::BidExited(_) => "BidExited",
            AuctionEvent::CheckpointUpdated(_) => "CheckpointUpdated",
        }
    }

    /// Re-encode as the raw log the auction at `auction` would emit
    pub fn to_log(&self, auction: Address) -> Log {
        let (topics, data) = match self {
            AuctionEvent::BidSubmitted(bid) => (
                vec![BidSubmittedFilter::signature(), uint_topic(bid.id), bid.owner.into()],
                abi::encode(&[Token::Uint(bid.price), Token::Uint(bid.amount)]),
            ),
            AuctionEvent::BidExited(exit) => (
                vec![BidExitedFilter::signature(), uint_topic(exit.bid_id), exit.owner.into()],
                abi::encode(&[Token::Uint(exit.tokens_filled), Token::Uint(exit.currency_refunded)]),
            ),
            AuctionEvent::CheckpointUpdated(checkpoint) => (
                vec![CheckpointUpdatedFilter::signature()],
                abi::encode(&[
                    Token::Uint(checkpoint.block_number.into()),
                    Token::Uint(checkpoint.clearing_price),
                    Token::Uint(checkpoint.cumulative_mps.into()),
                ]),
            ),
        };

        let position = self.position();
        Log {
            address: auction,
            topics,
            data: data.into(),
            block_number: Some(U64::from(position.block_number)),
            log_index: Some(U256::from(position.log_index)),
            removed: Some(false),
            ..Default::default()
        }
    }
}

fn uint_topic(value: U256) -> H256 {
    let mut topic = [0u8; 32];
    value.to_big_endian(&mut topic);
    H256::from(topic)
}

/// Signature topics of the three reconstructed events
pub fn event_signatures() -> Vec<H256> {
    vec![
        BidSubmittedFilter::signature(),
        BidExitedFilter::signature(),
        CheckpointUpdatedFilter::signature(),
    ]
}

/// Filter matching every reconstructed event of one auction; callers set the block range
pub fn auction_filter(auction: Address) -> Filter {
    Filter::new().address(auction).topic0(event_signatures())
}

/// Decode one raw log emitted by `auction`
pub fn decode_log(auction: Address, log: &Log) -> Result<AuctionEvent> {
    if log.address != auction {
        return Err(CcaError::MalformedLog(format!(
            "log from {:?} does not belong to auction {:?}",
            log.address, auction
        )));
    }

    let position = log_position(log)?;
    let signature = log
        .topics
        .first()
        .copied()
        .ok_or_else(|| CcaError::MalformedLog(format!("log at {:?} has no topics", position)))?;

    if signature == BidSubmittedFilter::signature() {
        let event: BidSubmittedFilter = parse_log(log.clone()).map_err(|e| malformed("BidSubmitted", e))?;
        Ok(AuctionEvent::BidSubmitted(Bid {
            id: event.id,
            owner: event.owner,
            price: event.price,
            amount: U256::from(event.amount),
            position,
        }))
    } else if signature == BidExitedFilter::signature() {
        let event: BidExitedFilter = parse_log(log.clone()).map_err(|e| malformed("BidExited", e))?;
        Ok(AuctionEvent::BidExited(BidExit {
            bid_id: event.bid_id,
            owner: event.owner,
            tokens_filled: event.tokens_filled,
            currency_refunded: event.currency_refunded,
            position,
        }))
    } else if signature == CheckpointUpdatedFilter::signature() {
        let event: CheckpointUpdatedFilter =
            parse_log(log.clone()).map_err(|e| malformed("CheckpointUpdated", e))?;
        if event.block_number > U256::from(u64::MAX) {
            return Err(CcaError::MalformedLog(format!(
                "CheckpointUpdated block number {} out of range",
                event.block_number
            )));
        }
        Ok(AuctionEvent::CheckpointUpdated(Checkpoint {
            block_number: event.block_number.as_u64(),
            clearing_price: event.clearing_price,
            cumulative_mps: event.cumulative_mps,
            position,
        }))
    } else {
        Err(CcaError::MalformedLog(format!("unknown event signature {:?}", signature)))
    }
}

fn log_position(log: &Log) -> Result<LogPosition> {
    let block_number = log
        .block_number
        .ok_or_else(|| CcaError::MalformedLog("log has no block number".into()))?;
    let log_index = log.log_index.unwrap_or_default();
    if log_index > U256::from(u64::MAX) {
        return Err(CcaError::MalformedLog(format!("log index {} out of range", log_index)));
    }
    Ok(LogPosition::new(block_number.as_u64(), log_index.as_u64()))
}

fn malformed(event: &str, error: impl std::fmt::Display) -> CcaError {
    CcaError::MalformedLog(format!("{}: {}", event, error))
}
