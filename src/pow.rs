//! Proof-of-work verification and block proof
//!
//! A header's hash, read as a little-endian 256-bit integer, must not exceed
//! the target its compact `bits` decode to. Block proof converts a target
//! into the work quantity summed for fork choice.

use crate::target::target_hex;
use crate::{CompactTarget, ConsensusParams, Error, Hash256, Result, Work};
use primitive_types::U256;
use tracing::trace;

/// Check `hash` against `bits` under the network's limit
pub fn check_proof_of_work(hash: &Hash256, bits: CompactTarget, params: &ConsensusParams) -> Result<()> {
    if params.skip_pow_check {
        return Ok(());
    }

    let target = bits.to_target()?;
    if target.is_zero() {
        return Err(Error::target_out_of_range(bits.bits(), "zero target"));
    }
    if target > params.pow_limit_value() {
        return Err(Error::target_out_of_range(bits.bits(), "easier than proof-of-work limit"));
    }

    let value = hash.to_u256();
    if value > target {
        trace!(hash = %hash, bits = %bits, "hash above target");
        return Err(Error::insufficient_work(hash, target_hex(&target)));
    }
    Ok(())
}

/// Work represented by a block with target `bits`
///
/// `2^256 / (target + 1)` computed as `!target / (target + 1) + 1` so no
/// 257-bit intermediate is needed. Malformed or zero targets carry no work.
pub fn block_proof(bits: CompactTarget) -> Work {
    let decoded = bits.decode();
    if !decoded.is_usable() {
        return Work::zero();
    }

    let target = decoded.value;
    match target.checked_add(U256::one()) {
        Some(divisor) => Work::new(!target / divisor + U256::one()),
        None => Work::zero(),
    }
}
