//! Configuration for the consensus core and the inspector binary
//!
//! Network parameters come from a preset, or from a YAML/JSON file layered
//! with `BTH_POW__*` environment variables. Command-line options select the
//! file, the preset and logging.

use crate::retarget::{KgwParams, RetargetAlgorithm, RetargetSchedule};
use crate::utils::LogFormat;
use crate::{CompactTarget, Error, Result};
use clap::{Parser, Subcommand, ValueEnum};
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Prefix for environment overrides, e.g. `BTH_POW__TARGET_SPACING=120`
pub const ENV_PREFIX: &str = "BTH_POW";

/// Consensus parameters shared by retargeting and verification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusParams {
    /// Easiest permitted target
    #[serde(default = "default_pow_limit")]
    pub pow_limit: CompactTarget,

    /// Desired seconds between blocks
    #[serde(default = "default_target_spacing")]
    pub target_spacing: i64,

    /// Seconds covered by one periodic retarget window
    #[serde(default = "default_target_timespan")]
    pub target_timespan: i64,

    /// Permit minimum-difficulty blocks after a long gap (test networks)
    #[serde(default)]
    pub allow_min_difficulty_blocks: bool,

    /// Accept any proof of work (regression-test networks only)
    #[serde(default)]
    pub skip_pow_check: bool,

    /// Which retarget algorithm is active from which height
    #[serde(default)]
    pub retarget: RetargetSchedule,

    /// Kimoto Gravity Well tuning
    #[serde(default)]
    pub kgw: KgwParams,
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self {
            pow_limit: default_pow_limit(),
            target_spacing: default_target_spacing(),
            target_timespan: default_target_timespan(),
            allow_min_difficulty_blocks: false,
            skip_pow_check: false,
            retarget: RetargetSchedule::default(),
            kgw: KgwParams::default(),
        }
    }
}

impl ConsensusParams {
    /// Preset parameters for a network
    pub fn for_network(network: Network) -> Self {
        match network {
            Network::Main => Self::default(),
            Network::Test => Self {
                allow_min_difficulty_blocks: true,
                ..Self::default()
            },
            Network::Regtest => Self::regtest(),
        }
    }

    /// Regression-test network: trivial limit, permissive rules, no PoW check
    pub fn regtest() -> Self {
        Self {
            pow_limit: CompactTarget(0x207f_ffff),
            allow_min_difficulty_blocks: true,
            skip_pow_check: true,
            ..Self::default()
        }
    }

    /// Load from a YAML or JSON file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        let params: Self = if path.extension().and_then(|s| s.to_str()) == Some("json") {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };
        params.validate()?;
        Ok(params)
    }

    /// Load an optional file, then apply `BTH_POW__*` environment overrides
    pub fn load_layered(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let params: Self = builder.build()?.try_deserialize()?;
        params.validate()?;
        Ok(params)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let limit = self
            .pow_limit
            .to_target()
            .map_err(|e| Error::config(format!("Invalid pow_limit: {}", e)))?;
        if limit.is_zero() {
            return Err(Error::config("pow_limit must decode to a non-zero target"));
        }

        if self.target_spacing <= 0 {
            return Err(Error::config("target_spacing must be greater than 0"));
        }
        if self.target_timespan < self.target_spacing {
            return Err(Error::config(
                "target_timespan must cover at least one target_spacing",
            ));
        }

        self.retarget.validate()?;
        self.kgw.validate()?;
        Ok(())
    }

    /// Decoded proof-of-work limit
    pub fn pow_limit_value(&self) -> U256 {
        self.pow_limit.decode().value
    }

    /// Proof-of-work limit in canonical compact form
    pub fn pow_limit_compact(&self) -> CompactTarget {
        CompactTarget::from_target(&self.pow_limit_value())
    }

    /// Blocks between periodic retargets, never less than one
    pub fn interval(&self) -> i64 {
        (self.target_timespan / self.target_spacing.max(1)).max(1)
    }
}

// Default value functions for serde
fn default_pow_limit() -> CompactTarget { CompactTarget(0x1e0f_ffff) }
fn default_target_spacing() -> i64 { 150 }
fn default_target_timespan() -> i64 { 302_400 }

/// Network presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Main,
    Test,
    Regtest,
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Main => write!(f, "main"),
            Network::Test => write!(f, "test"),
            Network::Regtest => write!(f, "regtest"),
        }
    }
}

/// Log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Directive understood by `EnvFilter`
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Command-line options for the inspector
#[derive(Debug, Clone, Parser)]
#[command(
    name = "bth-pow",
    version = env!("CARGO_PKG_VERSION"),
    about = "Inspect difficulty retargeting and proof-of-work decisions",
    long_about = "Computes next required targets, block and chain work, and proof-of-work verdicts from header histories"
)]
pub struct Config {
    /// Consensus parameter file (YAML or JSON); environment overrides apply on top
    #[arg(long, value_name = "FILE", global = true)]
    pub config_file: Option<PathBuf>,

    /// Network preset used when no parameter file is given
    #[arg(short = 'n', long, value_enum, default_value = "main", global = true)]
    pub network: Network,

    /// Force one retarget algorithm at every height
    #[arg(short = 'a', long, value_enum, global = true)]
    pub algorithm: Option<RetargetAlgorithm>,

    /// Log level
    #[arg(short = 'l', long, value_enum, default_value = "info", global = true)]
    pub log_level: LogLevel,

    /// Log output format
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Inspector subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Required target for the block after the last header in a chain file
    NextTarget {
        /// Chain file (YAML or JSON)
        chain_file: PathBuf,
    },
    /// Check a hash against compact bits
    Check {
        /// Block hash, big-endian hex
        hash: String,
        /// Compact target, hex
        bits: String,
    },
    /// Work represented by compact bits
    Work {
        /// Compact target, hex
        bits: String,
    },
    /// Accumulated work of every header in a chain file
    ChainWork {
        /// Chain file (YAML or JSON)
        chain_file: PathBuf,
    },
    /// Print the resolved consensus parameters as YAML
    PrintConfig,
}

impl Config {
    /// Resolve consensus parameters from the file or preset, then the override
    pub fn consensus_params(&self) -> Result<ConsensusParams> {
        let mut params = match &self.config_file {
            Some(path) => ConsensusParams::load_layered(Some(path))?,
            None => ConsensusParams::for_network(self.network),
        };

        if let Some(algorithm) = self.algorithm {
            params.retarget = RetargetSchedule::fixed(algorithm);
        }

        params.validate()?;
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn temp_with(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_defaults_are_valid() {
        let params = ConsensusParams::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.interval(), 2016);
        assert_eq!(params.pow_limit_compact(), CompactTarget(0x1e0f_ffff));
        assert_eq!(
            params.retarget.algorithm_at(0),
            RetargetAlgorithm::DarkGravityWave3
        );
    }

    #[test]
    fn test_interval_is_at_least_one() {
        let zero_spacing = ConsensusParams {
            target_spacing: 0,
            ..ConsensusParams::default()
        };
        assert_eq!(zero_spacing.interval(), 302_400);

        let short_timespan = ConsensusParams {
            target_spacing: 600,
            target_timespan: 60,
            ..ConsensusParams::default()
        };
        assert_eq!(short_timespan.interval(), 1);
    }

    #[test]
    fn test_presets() {
        assert!(!ConsensusParams::for_network(Network::Main).allow_min_difficulty_blocks);
        assert!(ConsensusParams::for_network(Network::Test).allow_min_difficulty_blocks);

        let regtest = ConsensusParams::for_network(Network::Regtest);
        assert!(regtest.skip_pow_check);
        assert!(regtest.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let bad_limit = ConsensusParams {
            pow_limit: CompactTarget(0x0492_3456),
            ..ConsensusParams::default()
        };
        assert!(bad_limit.validate().is_err());

        let zero_limit = ConsensusParams {
            pow_limit: CompactTarget(0),
            ..ConsensusParams::default()
        };
        assert!(zero_limit.validate().is_err());

        let no_spacing = ConsensusParams {
            target_spacing: 0,
            ..ConsensusParams::default()
        };
        assert!(no_spacing.validate().is_err());

        let short_timespan = ConsensusParams {
            target_timespan: 100,
            ..ConsensusParams::default()
        };
        assert!(short_timespan.validate().is_err());
    }

    #[test]
    fn test_params_from_yaml() {
        let yaml = r#"
pow_limit: "0x1d00ffff"
target_spacing: 60
target_timespan: 600
allow_min_difficulty_blocks: true
retarget:
  - { height: 0, algorithm: periodic-v1 }
  - { height: 100, algorithm: kimoto-gravity-well }
"#;
        let file = temp_with(".yaml", yaml);
        let params = ConsensusParams::load_from_file(file.path()).unwrap();

        assert_eq!(params.pow_limit, CompactTarget(0x1d00_ffff));
        assert_eq!(params.interval(), 10);
        assert!(params.allow_min_difficulty_blocks);
        assert!(!params.skip_pow_check);
        assert_eq!(params.retarget.algorithm_at(99), RetargetAlgorithm::PeriodicV1);
        assert_eq!(params.retarget.algorithm_at(100), RetargetAlgorithm::KimotoGravityWell);
        assert_eq!(params.kgw, KgwParams::default());
    }

    #[test]
    fn test_params_from_json() {
        let json = r#"{"pow_limit": 486604799, "skip_pow_check": true}"#;
        let file = temp_with(".json", json);
        let params = ConsensusParams::load_from_file(file.path()).unwrap();

        assert_eq!(params.pow_limit, CompactTarget(0x1d00_ffff));
        assert!(params.skip_pow_check);
        assert_eq!(params.target_spacing, 150);
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let file = temp_with(".yaml", "target_spacing: -5\n");
        assert!(matches!(
            ConsensusParams::load_from_file(file.path()),
            Err(Error::Config { .. })
        ));
    }

    #[test]
    fn test_layered_env_override() {
        let file = temp_with(".yaml", "target_spacing: 60\ntarget_timespan: 600\n");
        std::env::set_var("BTH_POW__TARGET_TIMESPAN", "1200");

        let params = ConsensusParams::load_layered(Some(file.path()));
        std::env::remove_var("BTH_POW__TARGET_TIMESPAN");

        let params = params.unwrap();
        assert_eq!(params.target_spacing, 60);
        assert_eq!(params.target_timespan, 1200);
        assert_eq!(params.interval(), 20);
    }

    #[test]
    fn test_cli_parsing() {
        let config = Config::try_parse_from(["bth-pow", "work", "1d00ffff"]).unwrap();
        assert_eq!(config.network, Network::Main);
        assert_eq!(config.log_level, LogLevel::Info);
        assert!(matches!(config.command, Command::Work { .. }));

        let config = Config::try_parse_from([
            "bth-pow",
            "next-target",
            "chain.yaml",
            "--network",
            "regtest",
            "--algorithm",
            "dark-gravity-wave",
        ])
        .unwrap();
        let params = config.consensus_params().unwrap();
        assert!(params.skip_pow_check);
        assert_eq!(params.retarget.algorithm_at(1_000_000), RetargetAlgorithm::DarkGravityWave);
    }
}
