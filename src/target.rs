//! Compact target encoding and target arithmetic
//!
//! The 32-bit compact form is `size:8 | sign:1 | mantissa:23`, where the
//! value is `mantissa * 256^(size - 3)`. Decoding reports sign and overflow
//! separately so callers can reject rather than clamp.

use crate::{Error, Result};
use primitive_types::{U256, U512};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const MANTISSA_MASK: u32 = 0x007f_ffff;
const SIGN_BIT: u32 = 0x0080_0000;

/// Compact (`nBits`) encoding of a 256-bit target
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct CompactTarget(pub u32);

/// Result of decoding a compact target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedTarget {
    /// Magnitude, with bits above 256 dropped
    pub value: U256,
    /// Sign bit set on a non-zero mantissa
    pub negative: bool,
    /// Magnitude does not fit in 256 bits
    pub overflow: bool,
}

impl CompactTarget {
    /// Wrap raw `nBits`
    pub fn new(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw `nBits`
    pub fn bits(&self) -> u32 {
        self.0
    }

    /// Decode into value and flags
    pub fn decode(self) -> DecodedTarget {
        let compact = self.0;
        let size = compact >> 24;
        let mut word = compact & MANTISSA_MASK;

        let value = if size <= 3 {
            word >>= 8 * (3 - size);
            U256::from(word)
        } else {
            let shift = 8 * (size - 3);
            if shift < 256 {
                U256::from(word) << shift
            } else {
                U256::zero()
            }
        };

        let negative = word != 0 && compact & SIGN_BIT != 0;
        let overflow = word != 0
            && (size > 34 || (word > 0xff && size > 33) || (word > 0xffff && size > 32));

        DecodedTarget {
            value,
            negative,
            overflow,
        }
    }

    /// Decode, rejecting negative and overflowing encodings
    pub fn to_target(self) -> Result<U256> {
        let decoded = self.decode();
        if decoded.negative {
            return Err(Error::malformed_target(self.0, "negative"));
        }
        if decoded.overflow {
            return Err(Error::malformed_target(self.0, "overflow"));
        }
        Ok(decoded.value)
    }

    /// Encode a non-negative target, truncating to the mantissa's precision
    pub fn from_target(value: &U256) -> Self {
        let mut size = (value.bits() as u32 + 7) / 8;
        let mut compact = if size <= 3 {
            (value.low_u64() << (8 * (3 - size))) as u32
        } else {
            (*value >> (8 * (size - 3))).low_u32()
        };

        // Keep the sign bit clear by moving one byte into the exponent.
        if compact & SIGN_BIT != 0 {
            compact >>= 8;
            size += 1;
        }

        Self(compact | (size << 24))
    }
}

impl DecodedTarget {
    /// Valid as a proof-of-work target: positive, in range, non-zero
    pub fn is_usable(&self) -> bool {
        !self.negative && !self.overflow && !self.value.is_zero()
    }
}

impl fmt::Display for CompactTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

impl fmt::Debug for CompactTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompactTarget(0x{:08x})", self.0)
    }
}

impl From<u32> for CompactTarget {
    fn from(bits: u32) -> Self {
        Self(bits)
    }
}

impl FromStr for CompactTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        if digits.is_empty() || digits.len() > 8 {
            return Err(Error::invalid_hex(format!(
                "Invalid compact target '{}': expected 1-8 hex digits",
                s
            )));
        }
        u32::from_str_radix(digits, 16)
            .map(Self)
            .map_err(|e| Error::invalid_hex(format!("Invalid compact target '{}': {}", s, e)))
    }
}

impl Serialize for CompactTarget {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&format!("0x{:08x}", self.0))
    }
}

impl<'de> Deserialize<'de> for CompactTarget {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Int(u32),
            Str(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Int(bits) => Ok(Self(bits)),
            Repr::Str(s) => CompactTarget::from_str(&s).map_err(serde::de::Error::custom),
        }
    }
}

/// Big-endian hex of a 256-bit value
pub fn target_hex(value: &U256) -> String {
    let mut be = [0u8; 32];
    value.to_big_endian(&mut be);
    hex::encode(be)
}

/// `value * numerator / denominator`, computed in 512 bits and capped at `limit`
///
/// `denominator` must be non-zero; callers establish that before scaling.
pub fn scale_target(value: &U256, numerator: u64, denominator: u64, limit: &U256) -> U256 {
    debug_assert!(denominator != 0);
    let wide = value.full_mul(U256::from(numerator)) / U512::from(denominator.max(1));
    if wide > U512::from(*limit) {
        return *limit;
    }
    narrow(&wide).unwrap_or(*limit)
}

/// Running mean step `prev + (current - prev) / count` with signed semantics
pub fn running_average(prev: &U256, current: &U256, count: u64) -> U256 {
    let count = U256::from(count.max(1));
    if current >= prev {
        *prev + (*current - *prev) / count
    } else {
        *prev - (*prev - *current) / count
    }
}

/// Cumulative mean step `(prev * count + current) / (count + 1)` without wrapping
pub fn cumulative_average(prev: &U256, current: &U256, count: u64) -> U256 {
    let wide = prev.full_mul(U256::from(count)) + U512::from(*current);
    let mean = wide / U512::from(count.saturating_add(1));
    narrow(&mean).unwrap_or_else(U256::max_value)
}

fn narrow(wide: &U512) -> Option<U256> {
    let mut bytes = [0u8; 64];
    wide.to_little_endian(&mut bytes);
    if bytes[32..].iter().any(|b| *b != 0) {
        return None;
    }
    Some(U256::from_little_endian(&bytes[..32]))
}
