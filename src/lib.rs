//! BTH Proof-of-Work Core
//!
//! Consensus-critical pieces of a chained multi-algorithm proof-of-work chain:
//! - The 13-round chained hash with data-dependent branching
//! - Difficulty retargeting (periodic, Kimoto Gravity Well, Dark Gravity Wave v2/v3)
//! - Proof-of-work verification and block/chain work for fork choice

pub mod chain;
pub mod config;
pub mod crypto;
pub mod error;
pub mod pow;
pub mod retarget;
pub mod target;
pub mod types;
pub mod utils;

pub use chain::{BlockHeaderView, BlockIndex, BlockRef, ChainSnapshot};
pub use config::{Config, ConsensusParams, Network};
pub use crypto::{ChainedHash, HashPrimitives};
pub use error::{Error, Result};
pub use pow::{block_proof, check_proof_of_work};
pub use retarget::{DifficultyEngine, RetargetAlgorithm, RetargetSchedule};
pub use target::{CompactTarget, DecodedTarget};
pub use types::*;

/// Application information
pub const APP_NAME: &str = "bth-pow";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
