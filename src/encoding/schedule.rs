//! Release schedule encoding
//!
//! The contract takes the supply schedule as a flat byte string of 8-byte
//! big-endian entries, `mps (24 bits) | blockDelta (40 bits)`, with no length
//! prefix. It rejects the whole auction unless
//! `Σ mps_i * blockDelta_i == 10_000_000` and `Σ blockDelta_i == end - start`.
//!
//! Spans are derived from the percentages first, then per-block rates. The
//! last segment absorbs every rounding error: its span takes the block
//! remainder, and its rate is recomputed from whatever supply is still owed.
//! When that owed amount does not divide evenly, the last segment is emitted
//! as two consecutive entries whose rates differ by one.

use ethers::types::Bytes;
use serde::{Deserialize, Serialize};
use crate::utils::{CcaError, Result};

/// 100% of supply, in parts-per-ten-million
pub const MPS_TOTAL: u64 = 10_000_000;

/// Largest rate representable in an entry (24 bits)
pub const MAX_MPS: u64 = (1 << 24) - 1;

/// Largest block delta representable in an entry (40 bits)
pub const MAX_BLOCK_DELTA: u64 = (1 << 40) - 1;

/// Width of one packed entry
pub const STEP_SIZE: usize = 8;

/// User-entered share of supply for one phase of the auction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReleaseSegment {
    /// 0-100
    pub percentage: f64,
}

impl ReleaseSegment {
    pub fn new(percentage: f64) -> Self {
        Self { percentage }
    }
}

/// One packed schedule entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleStep {
    /// Supply released per block, parts-per-ten-million
    pub mps: u32,
    pub block_delta: u64,
}

impl ScheduleStep {
    /// Build an entry, rejecting fields wider than their packed slots
    pub fn new(mps: u64, block_delta: u64) -> Result<Self> {
        if block_delta > MAX_BLOCK_DELTA {
            return Err(CcaError::invalid(
                "schedule",
                format!("block delta {} exceeds 40 bits", block_delta),
            ));
        }
        Ok(Self { mps: checked_rate(mps)?, block_delta })
    }

    /// Pack into the 8-byte entry. Each field is truncated to its slot so an
    /// out-of-range value never spills into its neighbour.
    pub fn pack(&self) -> [u8; STEP_SIZE] {
        let mps = self.mps as u64 & MAX_MPS;
        let block_delta = self.block_delta & MAX_BLOCK_DELTA;
        ((mps << 40) | block_delta).to_be_bytes()
    }

    pub fn unpack(bytes: [u8; STEP_SIZE]) -> Self {
        let word = u64::from_be_bytes(bytes);
        Self {
            mps: (word >> 40) as u32,
            block_delta: word & MAX_BLOCK_DELTA,
        }
    }

    pub fn released(&self) -> u128 {
        self.mps as u128 * self.block_delta as u128
    }
}

/// A schedule that is known to satisfy the exact-total invariant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseSchedule {
    steps: Vec<ScheduleStep>,
}

impl ReleaseSchedule {
    pub fn steps(&self) -> &[ScheduleStep] {
        &self.steps
    }

    pub fn total_mps(&self) -> u128 {
        self.steps.iter().map(ScheduleStep::released).sum()
    }

    pub fn total_blocks(&self) -> u64 {
        self.steps.iter().map(|s| s.block_delta).sum()
    }

    /// Packed entries, concatenated in order
    pub fn to_bytes(&self) -> Bytes {
        self.steps
            .iter()
            .flat_map(|s| s.pack())
            .collect::<Vec<u8>>()
            .into()
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes()))
    }
}

/// Block span of each segment, proportional to its share of the total
///
/// The spans always sum to `duration` exactly.
pub fn compute_spans(segments: &[ReleaseSegment], duration: u64) -> Result<Vec<u64>> {
    if duration == 0 {
        return Err(CcaError::DegenerateSchedule("auction duration must be positive".into()));
    }
    if duration > MAX_BLOCK_DELTA {
        return Err(CcaError::invalid("duration", "exceeds the 40-bit block delta range"));
    }
    if segments.is_empty() {
        return Err(CcaError::DegenerateSchedule("no release segments".into()));
    }

    for (i, segment) in segments.iter().enumerate() {
        let p = segment.percentage;
        if !p.is_finite() || !(0.0..=100.0).contains(&p) {
            return Err(CcaError::invalid(
                format!("segment {} percentage", i + 1),
                format!("{} is not between 0 and 100", p),
            ));
        }
    }

    let total: f64 = segments.iter().map(|s| s.percentage).sum();
    if total <= 0.0 {
        return Err(CcaError::DegenerateSchedule("percentages sum to zero".into()));
    }

    let mut spans: Vec<i128> = segments
        .iter()
        .map(|s| (s.percentage / total * duration as f64).round() as i128)
        .collect();

    let assigned: i128 = spans.iter().sum();
    if let Some(last) = spans.last_mut() {
        *last += duration as i128 - assigned;
    }

    spans
        .into_iter()
        .enumerate()
        .map(|(i, span)| {
            if span <= 0 {
                Err(CcaError::DegenerateSchedule(format!(
                    "segment {} spans {} blocks; widen the auction or merge segments",
                    i + 1,
                    span
                )))
            } else {
                Ok(span as u64)
            }
        })
        .collect()
}

/// Compile percentages and a duration into a release schedule
pub fn encode_schedule(segments: &[ReleaseSegment], duration: u64) -> Result<ReleaseSchedule> {
    let spans = compute_spans(segments, duration)?;

    let mut steps: Vec<ScheduleStep> = Vec::with_capacity(segments.len() + 1);
    for (segment, &span) in segments.iter().zip(&spans).take(segments.len() - 1) {
        let points = (segment.percentage * 100_000.0).round() as u64;
        steps.push(ScheduleStep::new(points / span, span)?);
    }

    let last_span = spans[spans.len() - 1];
    let others: u128 = steps.iter().map(ScheduleStep::released).sum();
    let owed = MPS_TOTAL as i128 - others as i128;
    if owed < 0 {
        return Err(CcaError::EncodingInvariantViolation {
            achieved: others as i128,
            expected: MPS_TOTAL,
        });
    }

    let rate = owed / last_span as i128;
    let remainder = (owed % last_span as i128) as u64;
    if rate <= 0 && owed > 0 {
        // no nonzero base rate fits the last segment
        return Err(CcaError::EncodingInvariantViolation {
            achieved: others as i128,
            expected: MPS_TOTAL,
        });
    }

    let rate = rate as u64;
    if remainder == 0 {
        steps.push(ScheduleStep::new(rate, last_span)?);
    } else {
        steps.push(ScheduleStep::new(rate, last_span - remainder)?);
        steps.push(ScheduleStep::new(rate + 1, remainder)?);
    }

    let schedule = ReleaseSchedule { steps };
    if schedule.total_mps() != MPS_TOTAL as u128 || schedule.total_blocks() != duration {
        return Err(CcaError::EncodingInvariantViolation {
            achieved: schedule.total_mps() as i128,
            expected: MPS_TOTAL,
        });
    }

    tracing::debug!(
        "Encoded release schedule: {} segments -> {} entries over {} blocks",
        segments.len(),
        schedule.steps.len(),
        duration
    );

    Ok(schedule)
}

/// Parse a packed schedule blob back into entries
pub fn decode_schedule(data: &[u8]) -> Result<Vec<ScheduleStep>> {
    if data.len() % STEP_SIZE != 0 {
        return Err(CcaError::invalid(
            "schedule",
            format!("{} bytes is not a multiple of {}", data.len(), STEP_SIZE),
        ));
    }

    Ok(data
        .chunks_exact(STEP_SIZE)
        .map(|chunk| {
            let mut word = [0u8; STEP_SIZE];
            word.copy_from_slice(chunk);
            ScheduleStep::unpack(word)
        })
        .collect())
}

fn checked_rate(rate: u64) -> Result<u32> {
    if rate > MAX_MPS {
        return Err(CcaError::invalid("schedule", format!("rate {} exceeds 24 bits", rate)));
    }
    Ok(rate as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segments(pcts: &[f64]) -> Vec<ReleaseSegment> {
        pcts.iter().copied().map(ReleaseSegment::new).collect()
    }

    #[test]
    fn test_linear_schedule() {
        let schedule = encode_schedule(&segments(&[25.0, 25.0, 25.0, 25.0]), 100).unwrap();

        assert_eq!(schedule.steps().len(), 4);
        for step in schedule.steps() {
            assert_eq!(step.block_delta, 25);
            assert_eq!(step.mps, 100_000);
        }
        assert_eq!(schedule.total_mps(), 10_000_000);
        assert_eq!(
            schedule.to_hex(),
            format!("0x{}", "0186a00000000019".repeat(4))
        );
    }

    #[test]
    fn test_spans_absorb_rounding_in_last_segment() {
        let spans = compute_spans(&segments(&[25.0, 25.0, 25.0, 25.0]), 99).unwrap();
        assert_eq!(spans, vec![25, 25, 25, 24]);
        assert_eq!(spans.iter().sum::<u64>(), 99);
    }

    #[test]
    fn test_uneven_remainder_splits_last_segment() {
        let schedule = encode_schedule(&segments(&[25.0, 25.0, 25.0, 25.0]), 99).unwrap();

        assert_eq!(schedule.total_mps(), 10_000_000);
        assert_eq!(schedule.total_blocks(), 99);

        let steps = schedule.steps();
        assert_eq!(steps.len(), 5);
        // 2_500_000 over 24 blocks -> 104_166 * 8 + 104_167 * 16
        assert_eq!(steps[3], ScheduleStep { mps: 104_166, block_delta: 8 });
        assert_eq!(steps[4], ScheduleStep { mps: 104_167, block_delta: 16 });
    }

    #[test]
    fn test_exact_totals_across_shapes() {
        let shapes: [&[f64]; 5] = [
            &[5.0, 10.0, 25.0, 60.0],
            &[50.0, 25.0, 15.0, 10.0],
            &[33.3, 33.3, 33.4],
            &[100.0],
            &[12.5, 87.5],
        ];
        for shape in shapes {
            for duration in [100, 997, 50_000, 1_234_567] {
                let schedule = encode_schedule(&segments(shape), duration)
                    .unwrap_or_else(|e| panic!("{:?} over {}: {}", shape, duration, e));
                assert_eq!(schedule.total_mps(), MPS_TOTAL as u128, "{:?} over {}", shape, duration);
                assert_eq!(schedule.total_blocks(), duration);
            }
        }
    }

    #[test]
    fn test_zero_duration_rejected() {
        assert!(matches!(
            encode_schedule(&segments(&[100.0]), 0),
            Err(CcaError::DegenerateSchedule(_))
        ));
    }

    #[test]
    fn test_zero_span_rejected() {
        // 0.1% of 100 blocks rounds to nothing
        assert!(matches!(
            encode_schedule(&segments(&[99.9, 0.1]), 100),
            Err(CcaError::DegenerateSchedule(_))
        ));
        assert!(matches!(
            encode_schedule(&segments(&[0.1, 99.9]), 100),
            Err(CcaError::DegenerateSchedule(_))
        ));
    }

    #[test]
    fn test_uncorrectable_last_segment_is_reported() {
        // 15M-block segments cannot carry a nonzero integer rate
        let result = encode_schedule(&segments(&[50.0, 50.0]), 30_000_000);
        assert!(matches!(result, Err(CcaError::EncodingInvariantViolation { .. })));
    }

    #[test]
    fn test_bad_percentages_rejected() {
        for bad in [-1.0, 101.0, f64::NAN] {
            assert!(matches!(
                encode_schedule(&segments(&[bad, 50.0]), 100),
                Err(CcaError::InvalidInput { .. })
            ));
        }
        assert!(matches!(
            encode_schedule(&segments(&[0.0, 0.0]), 100),
            Err(CcaError::DegenerateSchedule(_))
        ));
        assert!(matches!(encode_schedule(&[], 100), Err(CcaError::DegenerateSchedule(_))));
    }

    #[test]
    fn test_pack_layout() {
        let step = ScheduleStep { mps: 0xABCDEF, block_delta: 0x12_3456_789A };
        assert_eq!(step.pack(), [0xAB, 0xCD, 0xEF, 0x12, 0x34, 0x56, 0x78, 0x9A]);
        assert_eq!(ScheduleStep::unpack(step.pack()), step);
    }

    #[test]
    fn test_oversized_fields_stay_in_their_slots() {
        let step = ScheduleStep { mps: 0x0100_0001, block_delta: 0x01_0000_0000_0002 };
        assert_eq!(step.pack(), [0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x02]);

        assert!(matches!(
            ScheduleStep::new(MAX_MPS + 1, 10),
            Err(CcaError::InvalidInput { .. })
        ));
        assert!(matches!(
            ScheduleStep::new(1, MAX_BLOCK_DELTA + 1),
            Err(CcaError::InvalidInput { .. })
        ));
        assert_eq!(
            ScheduleStep::new(MAX_MPS, MAX_BLOCK_DELTA).unwrap().pack(),
            [0xFF; STEP_SIZE]
        );
    }

    #[test]
    fn test_decode_schedule() {
        let schedule = encode_schedule(&segments(&[5.0, 10.0, 25.0, 60.0]), 50_000).unwrap();
        let decoded = decode_schedule(&schedule.to_bytes()).unwrap();
        assert_eq!(decoded, schedule.steps());

        assert!(decode_schedule(&[0u8; 12]).is_err());
    }
}
