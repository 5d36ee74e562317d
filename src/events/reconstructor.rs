//! Convergent reconstruction of one auction's event history
//!
//! Historical fetches and the live feed overlap and may arrive in any order.
//! State is kept as maps keyed by stable identifiers (bid id, block number)
//! and every merge rule is a commutative, idempotent choice between two
//! observations, so replaying or reordering logs converges to the same state.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use ethers::types::{Address, Log, U256};
use crate::models::{Bid, BidExit, Checkpoint};
use crate::utils::{CcaError, Result};
use super::decoder::{decode_log, AuctionEvent};

/// What one batch changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub new_bids: usize,
    pub new_exits: usize,
    pub checkpoints: usize,
    /// Reorged-out logs that were skipped
    pub removed: usize,
}

impl BatchSummary {
    pub fn is_empty(&self) -> bool {
        self.new_bids == 0 && self.new_exits == 0 && self.checkpoints == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventReconstructor {
    auction: Address,
    bids: BTreeMap<U256, Bid>,
    exits: BTreeMap<U256, BidExit>,
    checkpoints: BTreeMap<u64, Checkpoint>,
}

impl EventReconstructor {
    pub fn new(auction: Address) -> Self {
        Self {
            auction,
            bids: BTreeMap::new(),
            exits: BTreeMap::new(),
            checkpoints: BTreeMap::new(),
        }
    }

    pub fn auction(&self) -> Address {
        self.auction
    }

    /// Decode and merge one batch of raw logs.
    ///
    /// Every log is decoded before anything is applied: if one log is
    /// malformed the whole batch is rejected and state is untouched.
    pub fn apply_batch(&mut self, logs: &[Log]) -> Result<BatchSummary> {
        let mut summary = BatchSummary::default();
        let mut events = Vec::with_capacity(logs.len());

        for log in logs {
            if log.removed == Some(true) {
                tracing::debug!("Skipping removed log in tx {:?}", log.transaction_hash);
                summary.removed += 1;
                continue;
            }
            events.push(decode_log(self.auction, log)?);
        }

        for event in events {
            self.apply_event(event, &mut summary);
        }

        if !summary.is_empty() {
            tracing::debug!(
                "Merged batch of {} logs: {} new bids, {} new exits, {} checkpoints",
                logs.len(),
                summary.new_bids,
                summary.new_exits,
                summary.checkpoints
            );
        }

        Ok(summary)
    }

    /// Merge already-decoded events
    pub fn apply_events(&mut self, events: impl IntoIterator<Item = AuctionEvent>) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for event in events {
            self.apply_event(event, &mut summary);
        }
        summary
    }

    /// Union with another reconstruction of the same auction
    pub fn merge(&mut self, other: &EventReconstructor) -> Result<BatchSummary> {
        if other.auction != self.auction {
            return Err(CcaError::MalformedLog(format!(
                "cannot merge events of {:?} into {:?}",
                other.auction, self.auction
            )));
        }

        let events = other
            .bids
            .values()
            .cloned()
            .map(AuctionEvent::BidSubmitted)
            .chain(other.exits.values().cloned().map(AuctionEvent::BidExited))
            .chain(other.checkpoints.values().cloned().map(AuctionEvent::CheckpointUpdated));

        Ok(self.apply_events(events))
    }

    fn apply_event(&mut self, event: AuctionEvent, summary: &mut BatchSummary) {
        match event {
            AuctionEvent::BidSubmitted(bid) => {
                if upsert_earliest(&mut self.bids, bid.id, bid, |b| b.position) {
                    summary.new_bids += 1;
                }
            }
            AuctionEvent::BidExited(exit) => {
                if upsert_earliest(&mut self.exits, exit.bid_id, exit, |e| e.position) {
                    summary.new_exits += 1;
                }
            }
            AuctionEvent::CheckpointUpdated(checkpoint) => {
                match self.checkpoints.entry(checkpoint.block_number) {
                    Entry::Vacant(slot) => {
                        slot.insert(checkpoint);
                        summary.checkpoints += 1;
                    }
                    Entry::Occupied(mut slot) => {
                        // latest observation for a block wins
                        if checkpoint.precedence() > slot.get().precedence() {
                            slot.insert(checkpoint);
                            summary.checkpoints += 1;
                        }
                    }
                }
            }
        }
    }

    /// Every observed bid, exited or not, ascending id
    pub fn bids(&self) -> impl Iterator<Item = &Bid> {
        self.bids.values()
    }

    pub fn bid(&self, id: U256) -> Option<&Bid> {
        self.bids.get(&id)
    }

    pub fn exits(&self) -> impl Iterator<Item = &BidExit> {
        self.exits.values()
    }

    pub fn is_exited(&self, id: U256) -> bool {
        self.exits.contains_key(&id)
    }

    /// Observed bids minus exited ones, ascending id
    pub fn active_bids(&self) -> Vec<&Bid> {
        self.bids
            .values()
            .filter(|bid| !self.exits.contains_key(&bid.id))
            .collect()
    }

    /// Unexited bids placed by `owner`, ascending id
    pub fn bids_of(&self, owner: Address) -> Vec<&Bid> {
        self.bids
            .values()
            .filter(|bid| bid.owner == owner && !self.exits.contains_key(&bid.id))
            .collect()
    }

    /// Checkpoints newest block first
    pub fn checkpoint_sequence(&self) -> Vec<&Checkpoint> {
        self.checkpoints.values().rev().collect()
    }

    pub fn latest_checkpoint(&self) -> Option<&Checkpoint> {
        self.checkpoints.values().next_back()
    }

    pub fn bid_count(&self) -> usize {
        self.bids.len()
    }

    pub fn checkpoint_count(&self) -> usize {
        self.checkpoints.len()
    }
}

/// Keep the chain-earliest observation of a key; returns true on first sight
fn upsert_earliest<T>(
    map: &mut BTreeMap<U256, T>,
    key: U256,
    value: T,
    position: impl Fn(&T) -> crate::models::LogPosition,
) -> bool {
    match map.entry(key) {
        Entry::Vacant(slot) => {
            slot.insert(value);
            true
        }
        Entry::Occupied(mut slot) => {
            if position(&value) < position(slot.get()) {
                slot.insert(value);
            }
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::H256;
    use crate::codec::encode_price;
    use crate::models::LogPosition;

    fn auction() -> Address {
        Address::from_low_u64_be(0xac)
    }

    fn bid_log(id: u64, price: f64, block: u64, index: u64) -> Log {
        AuctionEvent::BidSubmitted(Bid {
            id: id.into(),
            owner: Address::from_low_u64_be(0xb0b),
            price: encode_price(price).unwrap(),
            amount: U256::exp10(18),
            position: LogPosition::new(block, index),
        })
        .to_log(auction())
    }

    fn exit_log(id: u64, block: u64) -> Log {
        AuctionEvent::BidExited(BidExit {
            bid_id: id.into(),
            owner: Address::from_low_u64_be(0xb0b),
            tokens_filled: U256::zero(),
            currency_refunded: U256::exp10(18),
            position: LogPosition::new(block, 0),
        })
        .to_log(auction())
    }

    fn checkpoint_log(block: u64, price: f64, mps: u32, index: u64) -> Log {
        AuctionEvent::CheckpointUpdated(Checkpoint {
            block_number: block,
            clearing_price: encode_price(price).unwrap(),
            cumulative_mps: mps,
            position: LogPosition::new(block, index),
        })
        .to_log(auction())
    }

    fn sample_logs() -> Vec<Log> {
        vec![
            bid_log(1, 0.001, 101, 0),
            checkpoint_log(101, 0.001, 100_000, 1),
            bid_log(2, 0.002, 102, 0),
            checkpoint_log(102, 0.0015, 200_000, 1),
            checkpoint_log(102, 0.0016, 200_000, 4),
            exit_log(1, 105),
            bid_log(3, 0.0018, 106, 2),
        ]
    }

    #[test]
    fn test_exited_bid_leaves_active_set_only() {
        let mut events = EventReconstructor::new(auction());
        events
            .apply_batch(&[bid_log(7, 0.0018, 100, 0), exit_log(7, 110)])
            .unwrap();

        assert!(events.active_bids().iter().all(|b| b.id != U256::from(7u64)));
        assert!(events.bid(7.into()).is_some());
        assert!(events.is_exited(7.into()));
    }

    #[test]
    fn test_bids_of_owner() {
        let mut other = bid_log(4, 0.003, 103, 0);
        other.topics[2] = H256::from(Address::from_low_u64_be(0xca7));
        let mut events = EventReconstructor::new(auction());
        events.apply_batch(&sample_logs()).unwrap();
        events.apply_batch(&[other]).unwrap();

        let mine: Vec<U256> = events
            .bids_of(Address::from_low_u64_be(0xb0b))
            .iter()
            .map(|b| b.id)
            .collect();
        // bid 1 exited, bid 4 belongs to someone else
        assert_eq!(mine, vec![U256::from(2u64), U256::from(3u64)]);
        assert_eq!(events.bids_of(Address::from_low_u64_be(0xca7)).len(), 1);
        assert!(events.bids_of(Address::zero()).is_empty());
    }

    #[test]
    fn test_replay_is_idempotent() {
        let mut once = EventReconstructor::new(auction());
        once.apply_batch(&sample_logs()).unwrap();

        let mut twice = once.clone();
        let summary = twice.apply_batch(&sample_logs()).unwrap();

        assert!(summary.is_empty());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_batch_order_does_not_matter() {
        let logs = sample_logs();
        let mut forward = EventReconstructor::new(auction());
        forward.apply_batch(&logs).unwrap();

        let mut reversed_logs = logs.clone();
        reversed_logs.reverse();
        let mut reversed = EventReconstructor::new(auction());
        reversed.apply_batch(&reversed_logs).unwrap();

        // a rotation as well as a reversal
        let mut rotated_logs = logs.clone();
        rotated_logs.rotate_left(3);
        let mut rotated = EventReconstructor::new(auction());
        rotated.apply_batch(&rotated_logs).unwrap();

        assert_eq!(forward, reversed);
        assert_eq!(forward, rotated);
    }

    #[test]
    fn test_later_checkpoint_for_block_wins() {
        let mut events = EventReconstructor::new(auction());
        events.apply_batch(&sample_logs()).unwrap();

        let sequence = events.checkpoint_sequence();
        assert_eq!(sequence.len(), 2);
        assert_eq!(sequence[0].block_number, 102);
        assert_eq!(sequence[0].clearing_price, encode_price(0.0016).unwrap());
        assert_eq!(sequence[1].block_number, 101);
    }

    #[test]
    fn test_malformed_log_rejects_whole_batch() {
        let mut events = EventReconstructor::new(auction());
        events.apply_batch(&[bid_log(1, 0.001, 100, 0)]).unwrap();
        let before = events.clone();

        let mut foreign = bid_log(9, 0.001, 101, 0);
        foreign.address = Address::from_low_u64_be(1);
        let result = events.apply_batch(&[bid_log(2, 0.002, 101, 1), foreign]);

        assert!(matches!(result, Err(CcaError::MalformedLog(_))));
        assert_eq!(events, before);
    }

    #[test]
    fn test_removed_logs_are_skipped() {
        let mut removed = bid_log(4, 0.001, 100, 0);
        removed.removed = Some(true);

        let mut events = EventReconstructor::new(auction());
        let summary = events.apply_batch(&[removed]).unwrap();
        assert_eq!(summary.removed, 1);
        assert_eq!(events.bid_count(), 0);
    }

    #[test]
    fn test_merge_is_commutative() {
        let logs = sample_logs();
        let mut history = EventReconstructor::new(auction());
        history.apply_batch(&logs[..4]).unwrap();
        let mut live = EventReconstructor::new(auction());
        live.apply_batch(&logs[2..]).unwrap();

        let mut a = history.clone();
        a.merge(&live).unwrap();
        let mut b = live.clone();
        b.merge(&history).unwrap();

        assert_eq!(a, b);
        assert_eq!(a.bid_count(), 3);
        assert!(a.merge(&EventReconstructor::new(Address::zero())).is_err());
    }
}
