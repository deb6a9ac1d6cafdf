//! Chained multi-algorithm block hash
//!
//! Thirteen 512-bit hash rounds run back to back. Four of them pick one of
//! four primitives from bits 2-3 of the previous round's digest, so the
//! primitives that run depend on the input. The result is the low 256 bits of
//! the last round.
//!
//! Groestl, JH, Keccak and Skein come from RustCrypto crates. Blake, BMW,
//! Luffa, CubeHash, SHAvite and SIMD (the 512-bit SHA-3 round candidates
//! without a maintained crate) are supplied by the node through
//! [`HashPrimitives`]. Every call hashes with fresh state.

use crate::{Hash256, Hash512};
use digest::consts::U64;
use digest::Digest;
use std::fmt;

/// One-shot 512-bit digest with freshly initialised state
pub fn one_shot<D: Digest<OutputSize = U64>>(data: &[u8]) -> Hash512 {
    let mut out = [0u8; Hash512::SIZE];
    out.copy_from_slice(&D::digest(data));
    Hash512::new(out)
}

/// Source of the ten 512-bit primitives
///
/// Implementations must be pure: the same input always gives the same output
/// and no state carries over between calls.
pub trait HashPrimitives {
    fn blake(&self, data: &[u8]) -> Hash512;

    fn bmw(&self, data: &[u8]) -> Hash512;

    fn groestl(&self, data: &[u8]) -> Hash512 {
        one_shot::<groestl::Groestl512>(data)
    }

    fn jh(&self, data: &[u8]) -> Hash512 {
        one_shot::<jh::Jh512>(data)
    }

    /// Keccak-512 with pre-FIPS padding
    fn keccak(&self, data: &[u8]) -> Hash512 {
        one_shot::<sha3::Keccak512>(data)
    }

    fn skein(&self, data: &[u8]) -> Hash512 {
        one_shot::<skein::Skein512<U64>>(data)
    }

    fn luffa(&self, data: &[u8]) -> Hash512;

    fn cubehash(&self, data: &[u8]) -> Hash512;

    fn shavite(&self, data: &[u8]) -> Hash512;

    fn simd(&self, data: &[u8]) -> Hash512;
}

/// Named primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Blake,
    Bmw,
    Groestl,
    Jh,
    Keccak,
    Skein,
    Luffa,
    Cubehash,
    Shavite,
    Simd,
}

impl Primitive {
    /// All primitives, in declaration order
    pub const ALL: [Primitive; 10] = [
        Primitive::Blake,
        Primitive::Bmw,
        Primitive::Groestl,
        Primitive::Jh,
        Primitive::Keccak,
        Primitive::Skein,
        Primitive::Luffa,
        Primitive::Cubehash,
        Primitive::Shavite,
        Primitive::Simd,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Primitive::Blake => "blake",
            Primitive::Bmw => "bmw",
            Primitive::Groestl => "groestl",
            Primitive::Jh => "jh",
            Primitive::Keccak => "keccak",
            Primitive::Skein => "skein",
            Primitive::Luffa => "luffa",
            Primitive::Cubehash => "cubehash",
            Primitive::Shavite => "shavite",
            Primitive::Simd => "simd",
        }
    }

    /// Run this primitive on `data`
    pub fn digest<P: HashPrimitives + ?Sized>(self, primitives: &P, data: &[u8]) -> Hash512 {
        match self {
            Primitive::Blake => primitives.blake(data),
            Primitive::Bmw => primitives.bmw(data),
            Primitive::Groestl => primitives.groestl(data),
            Primitive::Jh => primitives.jh(data),
            Primitive::Keccak => primitives.keccak(data),
            Primitive::Skein => primitives.skein(data),
            Primitive::Luffa => primitives.luffa(data),
            Primitive::Cubehash => primitives.cubehash(data),
            Primitive::Shavite => primitives.shavite(data),
            Primitive::Simd => primitives.simd(data),
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Value of `digest & 0b1100`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Selector {
    Zero,
    Four,
    Eight,
    Twelve,
}

impl Selector {
    pub const ALL: [Selector; 4] = [Selector::Zero, Selector::Four, Selector::Eight, Selector::Twelve];

    /// Read bits 2-3 of a 512-bit digest
    pub fn from_digest(digest: &Hash512) -> Self {
        match digest.selector_bits() {
            0 => Selector::Zero,
            4 => Selector::Four,
            8 => Selector::Eight,
            _ => Selector::Twelve,
        }
    }

    /// Masked value
    pub fn value(&self) -> u8 {
        match self {
            Selector::Zero => 0,
            Selector::Four => 4,
            Selector::Eight => 8,
            Selector::Twelve => 12,
        }
    }
}

/// The four branching rounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Branch {
    First,
    Second,
    Third,
    Fourth,
}

impl Branch {
    pub const ALL: [Branch; 4] = [Branch::First, Branch::Second, Branch::Third, Branch::Fourth];

    /// Primitive taken for a selector at this branch
    pub fn primitive(self, selector: Selector) -> Primitive {
        use Primitive::*;
        let arms = match self {
            Branch::First => [Blake, Groestl, Skein, Jh],
            Branch::Second => [Luffa, Groestl, Skein, Keccak],
            Branch::Third => [Shavite, Groestl, Simd, Keccak],
            Branch::Fourth => [Shavite, Jh, Luffa, Keccak],
        };
        match selector {
            Selector::Zero => arms[0],
            Selector::Four => arms[1],
            Selector::Eight => arms[2],
            Selector::Twelve => arms[3],
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Round {
    Fixed(Primitive),
    Branch(Branch),
}

/// Number of 512-bit rounds
pub const ROUNDS: usize = 13;

const PIPELINE: [Round; ROUNDS] = [
    Round::Fixed(Primitive::Blake),
    Round::Fixed(Primitive::Bmw),
    Round::Branch(Branch::First),
    Round::Fixed(Primitive::Groestl),
    Round::Fixed(Primitive::Skein),
    Round::Branch(Branch::Second),
    Round::Fixed(Primitive::Jh),
    Round::Fixed(Primitive::Keccak),
    Round::Branch(Branch::Third),
    Round::Fixed(Primitive::Luffa),
    Round::Fixed(Primitive::Cubehash),
    Round::Branch(Branch::Fourth),
    Round::Fixed(Primitive::Simd),
];

/// Every intermediate digest of one hash computation
#[derive(Debug, Clone)]
pub struct HashTrace {
    /// Primitive run in each round
    pub path: [Primitive; ROUNDS],
    /// Output of each round
    pub digests: [Hash512; ROUNDS],
}

impl HashTrace {
    /// The final 256-bit digest
    pub fn result(&self) -> Hash256 {
        self.digests[ROUNDS - 1].trim256()
    }
}

/// The node's block hash over a set of primitives
#[derive(Debug, Clone, Default)]
pub struct ChainedHash<P> {
    primitives: P,
}

impl<P: HashPrimitives> ChainedHash<P> {
    pub fn new(primitives: P) -> Self {
        Self { primitives }
    }

    pub fn primitives(&self) -> &P {
        &self.primitives
    }

    /// Hash `data` to 256 bits; an empty slice is a valid input
    pub fn hash(&self, data: &[u8]) -> Hash256 {
        self.run(data, |_, _, _| {}).trim256()
    }

    /// Hash `data` and keep every round's primitive and output
    pub fn trace(&self, data: &[u8]) -> HashTrace {
        let mut path = [Primitive::Blake; ROUNDS];
        let mut digests = [Hash512::default(); ROUNDS];
        self.run(data, |round, primitive, digest| {
            path[round] = primitive;
            digests[round] = *digest;
        });
        HashTrace { path, digests }
    }

    fn run<F>(&self, data: &[u8], mut observe: F) -> Hash512
    where
        F: FnMut(usize, Primitive, &Hash512),
    {
        let mut current = Hash512::default();
        for (round, stage) in PIPELINE.iter().enumerate() {
            let primitive = match stage {
                Round::Fixed(primitive) => *primitive,
                Round::Branch(branch) => branch.primitive(Selector::from_digest(&current)),
            };
            current = if round == 0 {
                primitive.digest(&self.primitives, data)
            } else {
                primitive.digest(&self.primitives, current.as_bytes())
            };
            observe(round, primitive, &current);
        }
        current
    }
}
