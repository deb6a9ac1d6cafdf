//! Dark Gravity Wave v3

use crate::chain::BlockRef;
use crate::target::{cumulative_average, scale_target, target_hex};
use crate::utils::clamp;
use crate::{CompactTarget, ConsensusParams};
use primitive_types::U256;
use tracing::trace;

pub const PAST_BLOCKS: u64 = 24;

/// Required target for the block after `tip`
///
/// Uses the last 24 blocks: a cumulative mean of their targets, scaled by the
/// sum of their intervals over the expected span, within a factor of three.
pub fn next_target(tip: Option<BlockRef<'_>>, params: &ConsensusParams) -> CompactTarget {
    let limit = params.pow_limit_value();
    let tip = match tip {
        Some(tip) if tip.height() > 0 && tip.height() >= PAST_BLOCKS => tip,
        _ => {
            trace!(min = PAST_BLOCKS, "insufficient history");
            return CompactTarget::from_target(&limit);
        }
    };

    let mut average = U256::zero();
    let mut count: u64 = 0;
    let mut actual: i64 = 0;
    let mut last_time: Option<i64> = None;

    for reading in tip
        .ancestors()
        .take_while(|block| block.height() > 0)
        .take(PAST_BLOCKS as usize)
    {
        count += 1;

        let current = reading.bits().decode().value;
        average = if count == 1 {
            current
        } else {
            cumulative_average(&average, &current, count)
        };

        if let Some(last) = last_time {
            actual = actual.saturating_add(last - reading.time());
        }
        last_time = Some(reading.time());
    }

    let target = (count as i64).saturating_mul(params.target_spacing);
    let actual = clamp(actual, target / 3, target.saturating_mul(3));
    let new = scale_target(&average, actual.max(0) as u64, target.max(1) as u64, &limit);

    trace!(count, actual, target, average = %target_hex(&average), "dark gravity wave v3");
    CompactTarget::from_target(&new)
}
