mod common;

use cca_client::events::EventReconstructor;
use cca_client::codec::decode_price;
use common::*;
use ethers::types::{Log, U256};

fn all_permutations(items: &[Log]) -> Vec<Vec<Log>> {
    // Heap's algorithm
    fn permute(k: usize, items: &mut Vec<Log>, out: &mut Vec<Vec<Log>>) {
        if k <= 1 {
            out.push(items.clone());
            return;
        }
        for i in 0..k {
            permute(k - 1, items, out);
            let j = if k % 2 == 0 { i } else { 0 };
            items.swap(j, k - 1);
        }
    }
    let mut items = items.to_vec();
    let mut out = Vec::new();
    permute(items.len(), &mut items, &mut out);
    out
}

fn logs() -> Vec<Log> {
    vec![
        bid_log(1, 0.001, 101),
        bid_log(2, 0.0018, 102),
        exit_log(1, 110),
        checkpoint_log(102, 0.0012, 100_000),
        checkpoint_log(110, 0.0015, 300_000),
    ]
}

#[test]
fn test_bid_seven_exit() {
    let mut events = EventReconstructor::new(auction());
    events.apply_batch(&[bid_log(7, 0.0018, 100)]).unwrap();
    events.apply_batch(&[exit_log(7, 120)]).unwrap();

    let seven = U256::from(7u64);
    assert!(events.active_bids().iter().all(|b| b.id != seven));
    let raw = events.bid(seven).unwrap();
    assert!((decode_price(raw.price) - 0.0018).abs() < 1e-12);
    assert_eq!(raw.amount, U256::exp10(18));
}

#[test]
fn test_every_permutation_converges() {
    let mut reference = EventReconstructor::new(auction());
    reference.apply_batch(&logs()).unwrap();

    let permutations = all_permutations(&logs());
    assert_eq!(permutations.len(), 120);
    for permutation in permutations {
        let mut events = EventReconstructor::new(auction());
        events.apply_batch(&permutation).unwrap();
        assert_eq!(events, reference);
    }
}

#[test]
fn test_duplicates_across_batches_are_idempotent() {
    let mut reference = EventReconstructor::new(auction());
    reference.apply_batch(&logs()).unwrap();

    let mut events = EventReconstructor::new(auction());
    for log in logs().iter().chain(logs().iter()).rev() {
        events.apply_batch(std::slice::from_ref(log)).unwrap();
    }
    assert_eq!(events, reference);

    // duplicate exits have no extra effect
    events.apply_batch(&[exit_log(1, 110), exit_log(1, 110)]).unwrap();
    assert_eq!(events, reference);
}

#[test]
fn test_historical_then_live_equals_live_then_historical() {
    let all = logs();
    let (history, live) = all.split_at(3);

    let mut a = EventReconstructor::new(auction());
    a.apply_batch(history).unwrap();
    a.apply_batch(live).unwrap();
    a.apply_batch(history).unwrap();

    let mut b = EventReconstructor::new(auction());
    b.apply_batch(live).unwrap();
    b.apply_batch(history).unwrap();

    assert_eq!(a, b);
    let sequence: Vec<u64> = a.checkpoint_sequence().iter().map(|c| c.block_number).collect();
    assert_eq!(sequence, vec![110, 102]);
    assert_eq!(a.latest_checkpoint().unwrap().cumulative_mps, 300_000);
}
