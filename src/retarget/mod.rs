//! Difficulty retargeting
//!
//! Five interchangeable algorithms compute the compact target required of the
//! block after a given tip. A [`RetargetSchedule`] names which one is active
//! from which height, and [`DifficultyEngine`] resolves it per call.
//!
//! Every algorithm returns the proof-of-work limit when there is no tip or too
//! little history, and never returns a target easier than the limit.

use crate::chain::{BlockHeaderView, BlockRef};
use crate::{CompactTarget, ConsensusParams, Error, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::Span;

pub mod dgw;
pub mod dgw3;
pub mod kgw;
pub mod periodic;

pub use kgw::KgwParams;
pub use periodic::PeriodicVariant;

/// Retarget algorithm
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum RetargetAlgorithm {
    /// Interval-based rule
    PeriodicV0,
    /// Interval-based rule with before/after diagnostics
    PeriodicV1,
    /// Kimoto Gravity Well
    KimotoGravityWell,
    /// Dark Gravity Wave v2
    DarkGravityWave,
    /// Dark Gravity Wave v3
    #[default]
    #[serde(rename = "dark-gravity-wave-v3")]
    #[value(name = "dark-gravity-wave-v3")]
    DarkGravityWave3,
}

impl RetargetAlgorithm {
    pub const ALL: [RetargetAlgorithm; 5] = [
        RetargetAlgorithm::PeriodicV0,
        RetargetAlgorithm::PeriodicV1,
        RetargetAlgorithm::KimotoGravityWell,
        RetargetAlgorithm::DarkGravityWave,
        RetargetAlgorithm::DarkGravityWave3,
    ];

    /// Name used in configuration and logs
    pub fn name(&self) -> &'static str {
        match self {
            RetargetAlgorithm::PeriodicV0 => "periodic-v0",
            RetargetAlgorithm::PeriodicV1 => "periodic-v1",
            RetargetAlgorithm::KimotoGravityWell => "kimoto-gravity-well",
            RetargetAlgorithm::DarkGravityWave => "dark-gravity-wave",
            RetargetAlgorithm::DarkGravityWave3 => "dark-gravity-wave-v3",
        }
    }

    /// Required target for the block after `tip`
    pub fn next_target(
        &self,
        tip: Option<BlockRef<'_>>,
        candidate: &BlockHeaderView,
        params: &ConsensusParams,
    ) -> CompactTarget {
        match self {
            RetargetAlgorithm::PeriodicV0 => {
                periodic::next_target(PeriodicVariant::V0, tip, candidate, params)
            }
            RetargetAlgorithm::PeriodicV1 => {
                periodic::next_target(PeriodicVariant::V1, tip, candidate, params)
            }
            RetargetAlgorithm::KimotoGravityWell => kgw::next_target(tip, &params.kgw, params),
            RetargetAlgorithm::DarkGravityWave => dgw::next_target(tip, params),
            RetargetAlgorithm::DarkGravityWave3 => dgw3::next_target(tip, params),
        }
    }
}

impl fmt::Display for RetargetAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Algorithm switch at a block height
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activation {
    /// First height computed with `algorithm`
    pub height: u64,
    pub algorithm: RetargetAlgorithm,
}

/// Height-ordered algorithm activations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RetargetSchedule(Vec<Activation>);

impl Default for RetargetSchedule {
    fn default() -> Self {
        Self::fixed(RetargetAlgorithm::default())
    }
}

impl RetargetSchedule {
    /// Validated schedule from activations
    pub fn new(activations: Vec<Activation>) -> Result<Self> {
        let schedule = Self(activations);
        schedule.validate()?;
        Ok(schedule)
    }

    /// One algorithm at every height
    pub fn fixed(algorithm: RetargetAlgorithm) -> Self {
        Self(vec![Activation {
            height: 0,
            algorithm,
        }])
    }

    pub fn activations(&self) -> &[Activation] {
        &self.0
    }

    /// Non-empty, starting at height 0, strictly increasing heights
    pub fn validate(&self) -> Result<()> {
        match self.0.first() {
            None => return Err(Error::config("Retarget schedule is empty")),
            Some(first) if first.height != 0 => {
                return Err(Error::config(format!(
                    "Retarget schedule must start at height 0, starts at {}",
                    first.height
                )))
            }
            Some(_) => {}
        }

        if let Some(pair) = self.0.windows(2).find(|pair| pair[0].height >= pair[1].height) {
            return Err(Error::config(format!(
                "Retarget schedule heights must increase: {} then {}",
                pair[0].height, pair[1].height
            )));
        }
        Ok(())
    }

    /// Algorithm active at `height`
    pub fn algorithm_at(&self, height: u64) -> RetargetAlgorithm {
        self.0
            .iter()
            .take_while(|activation| activation.height <= height)
            .last()
            .map(|activation| activation.algorithm)
            .unwrap_or_default()
    }
}

/// Retarget dispatcher bound to a network's parameters
#[derive(Debug, Clone)]
pub struct DifficultyEngine {
    params: ConsensusParams,
}

impl DifficultyEngine {
    /// Create an engine after validating `params`
    pub fn new(params: ConsensusParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &ConsensusParams {
        &self.params
    }

    /// Algorithm that computes the block after `tip`
    pub fn algorithm_for(&self, tip: Option<BlockRef<'_>>) -> RetargetAlgorithm {
        self.params.retarget.algorithm_at(next_height(tip))
    }

    /// Required target for the block after `tip`
    pub fn next_target(&self, tip: Option<BlockRef<'_>>, candidate: &BlockHeaderView) -> CompactTarget {
        let algorithm = self.algorithm_for(tip);
        let span = retarget_span(algorithm, next_height(tip));
        let _enter = span.enter();

        let bits = algorithm.next_target(tip, candidate, &self.params);
        tracing::debug!(bits = %bits, "next target");
        bits
    }
}

fn next_height(tip: Option<BlockRef<'_>>) -> u64 {
    tip.map(|block| block.height() + 1).unwrap_or(0)
}

/// Create a tracing span for one retarget decision
pub fn retarget_span(algorithm: RetargetAlgorithm, height: u64) -> Span {
    tracing::debug_span!("retarget", algorithm = algorithm.name(), height = height)
}
