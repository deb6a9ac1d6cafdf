//! Kimoto Gravity Well
//!
//! Walks back from the tip averaging targets, and stops as soon as the ratio
//! of expected to observed elapsed time leaves an envelope that narrows as
//! more blocks are seen. The average is then scaled by that ratio.

use crate::chain::BlockRef;
use crate::target::{running_average, scale_target, target_hex};
use crate::{CompactTarget, ConsensusParams, Error, Result};
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Tuning for the gravity well
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KgwParams {
    /// Expected seconds between blocks
    #[serde(default = "default_target_spacing")]
    pub target_spacing: u64,

    /// Blocks that must exist before the well is used
    #[serde(default = "default_past_blocks_min")]
    pub past_blocks_min: u64,

    /// Maximum lookback; 0 means unbounded
    #[serde(default = "default_past_blocks_max")]
    pub past_blocks_max: u64,
}

impl Default for KgwParams {
    fn default() -> Self {
        Self {
            target_spacing: default_target_spacing(),
            past_blocks_min: default_past_blocks_min(),
            past_blocks_max: default_past_blocks_max(),
        }
    }
}

impl KgwParams {
    pub fn validate(&self) -> Result<()> {
        if self.target_spacing == 0 {
            return Err(Error::config("kgw.target_spacing must be greater than 0"));
        }
        if self.past_blocks_max > 0 && self.past_blocks_min > self.past_blocks_max {
            return Err(Error::config(
                "kgw.past_blocks_min must not exceed kgw.past_blocks_max",
            ));
        }
        Ok(())
    }
}

const DAY_SECONDS: u64 = 24 * 60 * 60;

fn default_target_spacing() -> u64 { 150 }
// 2.16 hours and 7 days of blocks at the default spacing
fn default_past_blocks_min() -> u64 { DAY_SECONDS * 25 / 1000 / default_target_spacing() }
fn default_past_blocks_max() -> u64 { DAY_SECONDS * 7 / default_target_spacing() }

/// Envelope half-width after `mass` blocks
fn event_horizon(mass: u64) -> f64 {
    1.0 + 0.7084 * (mass as f64 / 28.2).powf(-1.228)
}

/// Required target for the block after `tip`
pub fn next_target(tip: Option<BlockRef<'_>>, kgw: &KgwParams, params: &ConsensusParams) -> CompactTarget {
    let limit = params.pow_limit_value();
    let tip = match tip {
        Some(tip) if tip.height() > 0 && tip.height() >= kgw.past_blocks_min => tip,
        _ => {
            trace!(min = kgw.past_blocks_min, "insufficient history");
            return CompactTarget::from_target(&limit);
        }
    };

    let mut average = U256::zero();
    let mut mass: u64 = 0;
    let mut actual: i64 = 0;
    let mut expected: i64 = 0;

    for (i, reading) in (1u64..).zip(tip.ancestors().take_while(|block| block.height() > 0)) {
        if kgw.past_blocks_max > 0 && i > kgw.past_blocks_max {
            break;
        }
        mass += 1;

        let current = reading.bits().decode().value;
        average = if i == 1 {
            current
        } else {
            running_average(&average, &current, i)
        };

        actual = (tip.time() - reading.time()).max(0);
        expected = (kgw.target_spacing.saturating_mul(mass)).min(i64::MAX as u64) as i64;
        let ratio = if actual != 0 && expected != 0 {
            expected as f64 / actual as f64
        } else {
            1.0
        };

        let horizon = event_horizon(mass);
        if mass >= kgw.past_blocks_min && (ratio <= 1.0 / horizon || ratio >= horizon) {
            break;
        }
    }

    let new = if actual != 0 && expected != 0 {
        scale_target(&average, actual as u64, expected as u64, &limit)
    } else {
        average.min(limit)
    };

    trace!(mass, actual, expected, average = %target_hex(&average), "gravity well");
    CompactTarget::from_target(&new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{BlockHeaderView, BlockIndex};
    use crate::retarget::test_support::steady_chain;

    const LIMIT: CompactTarget = CompactTarget(0x1e0f_ffff);
    const HARD: CompactTarget = CompactTarget(0x1d00_ffff);

    fn params() -> ConsensusParams {
        ConsensusParams {
            pow_limit: LIMIT,
            ..ConsensusParams::default()
        }
    }

    fn scaled(bits: CompactTarget, num: u64, den: u64) -> CompactTarget {
        let value = bits.decode().value * U256::from(num) / U256::from(den);
        CompactTarget::from_target(&value)
    }

    fn run(index: &BlockIndex) -> CompactTarget {
        let p = params();
        next_target(index.tip(), &p.kgw, &p)
    }

    #[test]
    fn test_default_bounds() {
        let kgw = KgwParams::default();
        assert_eq!(kgw.past_blocks_min, 14);
        assert_eq!(kgw.past_blocks_max, 4032);
        assert!(kgw.validate().is_ok());

        let inverted = KgwParams {
            past_blocks_min: 50,
            past_blocks_max: 10,
            ..kgw
        };
        assert!(inverted.validate().is_err());
        assert!(KgwParams { past_blocks_max: 0, ..inverted }.validate().is_ok());
    }

    #[test]
    fn test_short_history_returns_limit() {
        assert_eq!(run(&steady_chain(6, 0, 150, HARD)), LIMIT);
        assert_eq!(run(&steady_chain(1, 0, 150, HARD)), LIMIT);
    }

    #[test]
    fn test_steady_chain_walks_to_genesis() {
        // 100 blocks at exactly the spacing never leave the envelope. The walk
        // covers heights 99..=1: mass 99 over 98 intervals.
        let index = steady_chain(100, 0, 150, HARD);
        assert_eq!(run(&index), scaled(HARD, 98 * 150, 99 * 150));
    }

    #[test]
    fn test_fast_blocks_stop_at_minimum_mass() {
        // One-second blocks break out of the envelope as soon as mass reaches 14.
        let index = steady_chain(100, 0, 1, HARD);
        assert_eq!(run(&index), scaled(HARD, 13, 14 * 150));
    }

    #[test]
    fn test_slow_blocks_stop_at_minimum_mass() {
        let index = steady_chain(100, 0, 1500, HARD);
        assert_eq!(run(&index), scaled(HARD, 13 * 1500, 14 * 150));
    }

    #[test]
    fn test_slow_blocks_capped_at_limit() {
        let index = steady_chain(100, 0, 100_000, LIMIT);
        assert_eq!(run(&index), LIMIT);
    }

    #[test]
    fn test_lookback_bounded_by_max() {
        let p = ConsensusParams {
            kgw: KgwParams {
                past_blocks_min: 5,
                past_blocks_max: 10,
                ..KgwParams::default()
            },
            ..params()
        };
        let index = steady_chain(100, 0, 150, HARD);
        // Steady blocks stay inside the envelope, so the walk ends at 10 blocks.
        assert_eq!(next_target(index.tip(), &p.kgw, &p), scaled(HARD, 9 * 150, 10 * 150));
    }

    #[test]
    fn test_average_never_wraps_when_targets_fall() {
        // An easier target followed by harder ones makes the running
        // difference negative.
        let mut index = BlockIndex::new();
        index.push(BlockHeaderView::new(0, LIMIT));
        for i in 1..20 {
            let bits = if i < 10 { LIMIT } else { HARD };
            index.push(BlockHeaderView::new(i * 150, bits));
        }

        let bits = run(&index);
        let value = bits.decode().value;
        assert!(value > HARD.decode().value);
        assert!(value < LIMIT.decode().value);
    }
}
