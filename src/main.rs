//! BTH PoW Inspector - Main Application
//!
//! Computes retarget decisions, block work and proof-of-work verdicts from
//! header histories stored as YAML or JSON.

use anyhow::{Context, Result};
use bth_pow::{
    block_proof, check_proof_of_work,
    config::{Command, Config},
    target::target_hex,
    utils::init_logging,
    BlockHeaderView, ChainSnapshot, CompactTarget, ConsensusParams, DifficultyEngine, Hash256,
    APP_NAME, APP_VERSION,
};
use clap::Parser;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

fn main() -> Result<()> {
    let config = Config::parse();
    init_logging(config.log_level.as_filter(), config.log_format);

    debug!("Starting {} v{}", APP_NAME, APP_VERSION);
    let params = config
        .consensus_params()
        .context("Failed to resolve consensus parameters")?;

    let output = run(&config.command, params)?;
    println!("{}", output);
    Ok(())
}

/// Execute one subcommand and return what it prints
fn run(command: &Command, params: ConsensusParams) -> Result<String> {
    match command {
        Command::NextTarget { chain_file } => next_target(chain_file, params),
        Command::Check { hash, bits } => check(hash, bits, &params),
        Command::Work { bits } => work(bits),
        Command::ChainWork { chain_file } => chain_work(chain_file),
        Command::PrintConfig => Ok(serde_yaml::to_string(&params)?),
    }
}

fn load_snapshot(path: &Path) -> Result<ChainSnapshot> {
    ChainSnapshot::load_from_file(path)
        .with_context(|| format!("Failed to load chain file {}", path.display()))
}

fn next_target(chain_file: &Path, params: ConsensusParams) -> Result<String> {
    let snapshot = load_snapshot(chain_file)?;
    let index = snapshot.to_index();
    let tip = index.tip();

    // Without an explicit candidate, assume one arriving on schedule.
    let candidate = snapshot.candidate.unwrap_or_else(|| match tip {
        Some(tip) => BlockHeaderView::new(tip.time() + params.target_spacing, tip.bits()),
        None => BlockHeaderView::new(0, params.pow_limit),
    });

    let engine = DifficultyEngine::new(params)?;
    let algorithm = engine.algorithm_for(tip);
    let bits = engine.next_target(tip, &candidate);
    let height = tip.map(|block| block.height() + 1).unwrap_or(0);

    info!(height, algorithm = %algorithm, bits = %bits, "next target computed");
    Ok(format!(
        "height:    {}\nalgorithm: {}\nbits:      {}\ntarget:    {}",
        height,
        algorithm,
        bits,
        target_hex(&bits.decode().value)
    ))
}

fn check(hash: &str, bits: &str, params: &ConsensusParams) -> Result<String> {
    let hash = Hash256::from_str(hash)?;
    let bits = CompactTarget::from_str(bits)?;

    if let Err(err) = check_proof_of_work(&hash, bits, params) {
        if err.is_rejection() {
            warn!(category = err.category(), hash = %hash, bits = %bits, "header rejected");
        }
        return Err(anyhow::Error::new(err).context(format!("Proof of work rejected for {}", hash)));
    }
    Ok(format!("accepted: {} meets {}", hash, bits))
}

fn work(bits: &str) -> Result<String> {
    let bits = CompactTarget::from_str(bits)?;
    let decoded = bits.decode();
    Ok(format!(
        "bits:   {}\ntarget: {}\nwork:   {}",
        bits,
        target_hex(&decoded.value),
        block_proof(bits)
    ))
}

fn chain_work(chain_file: &Path) -> Result<String> {
    let snapshot = load_snapshot(chain_file)?;
    let index = snapshot.to_index();
    let tip = index
        .tip()
        .with_context(|| format!("Chain file {} has no headers", chain_file.display()))?;

    Ok(format!(
        "height: {}\nblocks: {}\nwork:   {}",
        tip.height(),
        index.len(),
        index.chain_work(tip)
    ))
}
