//! Core value types
//!
//! Digests are kept in the little-endian byte order of the node's in-memory
//! integers and displayed big-endian, the way block hashes are printed.

use crate::utils::{bytes_to_hex, hex_to_bytes, validate_hex_string};
use crate::{Error, Result};
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;

/// Branch selector mask applied to a 512-bit intermediate digest
pub const SELECTOR_MASK: u8 = 0b1100;

/// 256-bit digest (little-endian bytes)
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    /// Size in bytes
    pub const SIZE: usize = 32;

    /// Create from little-endian bytes
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Borrow the little-endian bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Interpret the digest as an unsigned 256-bit integer
    pub fn to_u256(&self) -> U256 {
        U256::from_little_endian(&self.0)
    }

    /// Build a digest from an integer value
    pub fn from_u256(value: &U256) -> Self {
        let mut bytes = [0u8; 32];
        value.to_little_endian(&mut bytes);
        Self(bytes)
    }

    /// Big-endian hex, as block hashes are displayed
    pub fn to_hex(&self) -> String {
        let mut be = self.0;
        be.reverse();
        bytes_to_hex(&be)
    }
}

impl FromStr for Hash256 {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        validate_hex_string(s, Some(Self::SIZE * 2))?;
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&hex_to_bytes(s)?);
        bytes.reverse();
        Ok(Self(bytes))
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Hash256").field(&self.to_hex()).finish()
    }
}

impl Serialize for Hash256 {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash256 {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Hash256::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// 512-bit intermediate digest (little-endian bytes)
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hash512(pub [u8; 64]);

impl Hash512 {
    /// Size in bytes
    pub const SIZE: usize = 64;

    /// Create from little-endian bytes
    pub fn new(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Borrow the little-endian bytes
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// `value & 0b1100`: bits 2 and 3 of the integer, which live in byte 0
    pub fn selector_bits(&self) -> u8 {
        self.0[0] & SELECTOR_MASK
    }

    /// The low 256 bits
    pub fn trim256(&self) -> Hash256 {
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.0[..32]);
        Hash256(out)
    }

    /// Big-endian hex
    pub fn to_hex(&self) -> String {
        let mut be = self.0;
        be.reverse();
        bytes_to_hex(&be)
    }
}

impl Default for Hash512 {
    fn default() -> Self {
        Self([0u8; 64])
    }
}

impl fmt::Display for Hash512 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Hash512 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Hash512").field(&self.to_hex()).finish()
    }
}

/// Amount of work a block (or a chain of blocks) represents
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Work(U256);

impl Work {
    /// No work; returned for malformed targets
    pub fn zero() -> Self {
        Self(U256::zero())
    }

    /// Wrap a raw work value
    pub fn new(value: U256) -> Self {
        Self(value)
    }

    /// Raw work value
    pub fn value(&self) -> U256 {
        self.0
    }

    /// Whether this is the zero work value
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl Add for Work {
    type Output = Work;

    fn add(self, rhs: Work) -> Work {
        Work(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Work {
    fn sum<I: Iterator<Item = Work>>(iter: I) -> Work {
        iter.fold(Work::zero(), Add::add)
    }
}

impl fmt::Display for Work {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut be = [0u8; 32];
        self.0.to_big_endian(&mut be);
        write!(f, "{}", bytes_to_hex(&be))
    }
}

impl fmt::Debug for Work {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Work").field(&self.to_string()).finish()
    }
}
