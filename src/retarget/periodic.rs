//! Interval-based retargeting
//!
//! The target only changes on blocks whose height is a multiple of the
//! interval. On those blocks the previous target is scaled by how long the
//! last interval actually took, clamped to a factor of four either way.

use crate::chain::{BlockHeaderView, BlockRef};
use crate::target::scale_target;
use crate::utils::clamp;
use crate::{CompactTarget, ConsensusParams};
use tracing::{debug, trace, warn};

/// Flavor of the periodic rule
///
/// Both compute the same targets; V1 also reports the pre-scaling target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodicVariant {
    V0,
    V1,
}

/// Required target for the block after `tip`
pub fn next_target(
    variant: PeriodicVariant,
    tip: Option<BlockRef<'_>>,
    candidate: &BlockHeaderView,
    params: &ConsensusParams,
) -> CompactTarget {
    let limit_bits = params.pow_limit_compact();
    let Some(tip) = tip else {
        return limit_bits;
    };

    let interval = params.interval() as u64;
    let next_height = tip.height() + 1;

    if next_height % interval != 0 {
        if params.allow_min_difficulty_blocks {
            if candidate.time > tip.time().saturating_add(params.target_spacing.saturating_mul(2)) {
                trace!(height = next_height, "minimum-difficulty block permitted");
                return limit_bits;
            }
            return last_regular_bits(tip, interval, limit_bits);
        }
        return tip.bits();
    }

    // The first retarget spans one block fewer so it never reaches before genesis.
    let lookback = if next_height == interval { interval - 1 } else { interval };
    let (steps, first) = tip
        .ancestors()
        .take(lookback as usize + 1)
        .enumerate()
        .last()
        .unwrap_or((0, tip));
    if (steps as u64) < lookback {
        warn!(height = next_height, lookback, available = steps, "retarget window truncated by missing predecessor");
    }

    let timespan = params.target_timespan;
    let measured = tip.time() - first.time();
    let actual = clamp(measured, timespan / 4, timespan.saturating_mul(4));

    let limit = params.pow_limit_value();
    let old = tip.bits().decode().value;
    let new = scale_target(&old, actual as u64, timespan as u64, &limit);
    let bits = CompactTarget::from_target(&new);

    match variant {
        PeriodicVariant::V0 => {
            debug!(measured, actual_timespan = actual, target_timespan = timespan, "retarget");
        }
        PeriodicVariant::V1 => {
            debug!(
                actual_timespan = actual,
                target_timespan = timespan,
                before = %tip.bits(),
                after = %bits,
                "retarget"
            );
        }
    }
    bits
}

/// Bits of the most recent block not mined under the minimum-difficulty rule
fn last_regular_bits(tip: BlockRef<'_>, interval: u64, limit_bits: CompactTarget) -> CompactTarget {
    let mut block = tip;
    while let Some(prev) = block.prev() {
        if block.height() % interval == 0 || block.bits() != limit_bits {
            break;
        }
        block = prev;
    }
    block.bits()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::BlockIndex;
    use crate::retarget::test_support::steady_chain;
    use primitive_types::U256;

    const LIMIT: CompactTarget = CompactTarget(0x1e0f_ffff);
    const HARD: CompactTarget = CompactTarget(0x1d00_ffff);

    fn params() -> ConsensusParams {
        ConsensusParams {
            pow_limit: LIMIT,
            target_spacing: 60,
            target_timespan: 600,
            ..ConsensusParams::default()
        }
    }

    fn permissive() -> ConsensusParams {
        ConsensusParams {
            allow_min_difficulty_blocks: true,
            ..params()
        }
    }

    fn scaled(bits: CompactTarget, num: u64, den: u64) -> CompactTarget {
        let value = bits.decode().value * U256::from(num) / U256::from(den);
        CompactTarget::from_target(&value)
    }

    fn run(index: &BlockIndex, candidate_time: i64, params: &ConsensusParams) -> CompactTarget {
        let candidate = BlockHeaderView::new(candidate_time, HARD);
        let v0 = next_target(PeriodicVariant::V0, index.tip(), &candidate, params);
        let v1 = next_target(PeriodicVariant::V1, index.tip(), &candidate, params);
        assert_eq!(v0, v1);
        v1
    }

    #[test]
    fn test_genesis_returns_limit() {
        let candidate = BlockHeaderView::new(0, HARD);
        assert_eq!(next_target(PeriodicVariant::V0, None, &candidate, &params()), LIMIT);
    }

    #[test]
    fn test_between_boundaries_keeps_tip_bits() {
        // Tip at height 4; next height 5 is not a multiple of 10.
        let index = steady_chain(5, 1000, 60, HARD);
        assert_eq!(run(&index, 1_000_000, &params()), HARD);
    }

    #[test]
    fn test_permissive_late_candidate_gets_limit() {
        let index = steady_chain(5, 1000, 60, HARD);
        let tip_time = index.tip().unwrap().time();

        assert_eq!(run(&index, tip_time + 121, &permissive()), LIMIT);
        assert_eq!(run(&index, tip_time + 120, &permissive()), HARD);
    }

    #[test]
    fn test_permissive_walks_back_past_minimum_difficulty_blocks() {
        let mut index = steady_chain(3, 1000, 60, HARD);
        index.push(BlockHeaderView::new(1180, LIMIT));
        index.push(BlockHeaderView::new(1240, LIMIT));

        assert_eq!(run(&index, 1250, &permissive()), HARD);
    }

    #[test]
    fn test_permissive_walk_back_stops_at_boundary() {
        // Heights 0..=11, where 10 and 11 carry the limit. Height 10 is a
        // boundary, so the walk stops there.
        let mut index = steady_chain(10, 1000, 60, HARD);
        index.push(BlockHeaderView::new(1600, LIMIT));
        index.push(BlockHeaderView::new(1660, LIMIT));

        assert_eq!(run(&index, 1670, &permissive()), LIMIT);
    }

    #[test]
    fn test_first_retarget_spans_one_block_fewer() {
        // Tip at height 9, next height 10: walk back 9 blocks, 540 s elapsed.
        let index = steady_chain(10, 1000, 60, HARD);
        assert_eq!(run(&index, 2000, &params()), scaled(HARD, 540, 600));
    }

    #[test]
    fn test_steady_state_keeps_target() {
        // Tip at height 19, next height 20: walk back 10 blocks, 600 s elapsed.
        let index = steady_chain(20, 1000, 60, HARD);
        assert_eq!(run(&index, 3000, &params()), HARD);
    }

    #[test]
    fn test_adjustment_is_clamped() {
        let fast = steady_chain(20, 1000, 1, HARD);
        assert_eq!(run(&fast, 3000, &params()), scaled(HARD, 150, 600));

        let slow = steady_chain(20, 1000, 10_000, HARD);
        assert_eq!(run(&slow, 300_000, &params()), scaled(HARD, 2400, 600));
    }

    #[test]
    fn test_result_capped_at_limit() {
        let slow = steady_chain(20, 1000, 10_000, LIMIT);
        assert_eq!(run(&slow, 300_000, &params()), LIMIT);
    }

    #[test]
    fn test_snapshot_shorter_than_interval_uses_oldest_block() {
        // Heights 15..=19 only; the walk stops at 15 after 240 s.
        let index = BlockIndex::from_headers(
            15,
            (0..5).map(|i| BlockHeaderView::new(1000 + i * 60, HARD)),
        );
        assert_eq!(run(&index, 2000, &params()), scaled(HARD, 240, 600));
    }
}
