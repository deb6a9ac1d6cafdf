//! Dark Gravity Wave v2
//!
//! Averages the targets of the last 14 blocks and blends a short running
//! average of block intervals with the mean over up to 140 blocks.

use crate::chain::BlockRef;
use crate::target::{running_average, scale_target, target_hex};
use crate::{CompactTarget, ConsensusParams};
use primitive_types::U256;
use tracing::trace;

pub const PAST_BLOCKS_MIN: u64 = 14;
pub const PAST_BLOCKS_MAX: u64 = 140;

/// Required target for the block after `tip`
pub fn next_target(tip: Option<BlockRef<'_>>, params: &ConsensusParams) -> CompactTarget {
    let limit = params.pow_limit_value();
    let tip = match tip {
        Some(tip) if tip.height() > 0 && tip.height() >= PAST_BLOCKS_MIN => tip,
        _ => {
            trace!(min = PAST_BLOCKS_MIN, "insufficient history");
            return CompactTarget::from_target(&limit);
        }
    };

    let mut average = U256::zero();
    let mut count: u64 = 0;

    // Short running average of intervals, plus sum and count over the full walk
    let mut interval_average: i64 = 0;
    let mut interval_count: i64 = 0;
    let mut interval_sum: i64 = 0;
    let mut interval_total: i64 = 0;
    let mut last_time: Option<i64> = None;

    for reading in tip
        .ancestors()
        .take_while(|block| block.height() > 0)
        .take(PAST_BLOCKS_MAX as usize)
    {
        count += 1;

        if count <= PAST_BLOCKS_MIN {
            let current = reading.bits().decode().value;
            average = if count == 1 {
                current
            } else {
                running_average(&average, &current, count)
            };
        }

        if let Some(last) = last_time {
            let delta = last - reading.time();
            if interval_count <= PAST_BLOCKS_MIN as i64 {
                interval_count += 1;
                interval_average = if interval_count == 1 {
                    delta
                } else {
                    (delta - interval_average) / interval_count + interval_average
                };
            }
            interval_total += 1;
            interval_sum = interval_sum.saturating_add(delta);
        }
        last_time = Some(reading.time());
    }

    let mut new = average.min(limit);
    if interval_count != 0 && interval_total != 0 && params.target_spacing > 0 {
        let spacing = params.target_spacing as f64;
        let smart = (interval_average as f64 * 0.7 + (interval_sum as f64 / interval_total as f64) * 0.3).max(1.0);
        let shift = spacing / smart;

        let target_timespan = count as f64 * spacing;
        let actual_timespan = (target_timespan / shift).clamp(target_timespan / 3.0, target_timespan * 3.0);

        let (actual, target) = (actual_timespan as i64, target_timespan as i64);
        if target > 0 {
            new = scale_target(&average, actual.max(0) as u64, target as u64, &limit);
        }
        trace!(smart, actual, target, "smart average");
    }

    trace!(count, average = %target_hex(&average), "dark gravity wave");
    CompactTarget::from_target(&new)
}
