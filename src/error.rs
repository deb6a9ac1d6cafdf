//! Error handling for the proof-of-work core
//!
//! Rejections of a header (malformed or out-of-range targets, insufficient
//! work) are final and never retried. Configuration and I/O failures only
//! arise while loading parameters or chain files.

use thiserror::Error;

/// Result type alias for proof-of-work operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the proof-of-work core
#[derive(Error, Debug)]
pub enum Error {
    /// Compact target decodes as negative or overflows 256 bits
    #[error("Malformed target 0x{bits:08x}: {reason}")]
    MalformedTarget { bits: u32, reason: &'static str },

    /// Compact target is zero or easier than the proof-of-work limit
    #[error("Target 0x{bits:08x} out of range: {reason}")]
    TargetOutOfRange { bits: u32, reason: &'static str },

    /// Hash does not satisfy the target
    #[error("Insufficient work: hash {hash} above target {target}")]
    InsufficientWork { hash: String, target: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Chain index lookups and construction
    #[error("Chain index error: {message}")]
    ChainIndex { message: String },

    /// Hex decoding of hashes and compact targets
    #[error("Invalid hex: {message}")]
    InvalidHex { message: String },

    /// Layered configuration loading
    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a malformed target error
    pub fn malformed_target(bits: u32, reason: &'static str) -> Self {
        Self::MalformedTarget { bits, reason }
    }

    /// Create a target range error
    pub fn target_out_of_range(bits: u32, reason: &'static str) -> Self {
        Self::TargetOutOfRange { bits, reason }
    }

    /// Create an insufficient work error
    pub fn insufficient_work(hash: impl ToString, target: impl ToString) -> Self {
        Self::InsufficientWork {
            hash: hash.to_string(),
            target: target.to_string(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a chain index error
    pub fn chain_index(message: impl Into<String>) -> Self {
        Self::ChainIndex {
            message: message.into(),
        }
    }

    /// Create a hex decoding error
    pub fn invalid_hex(message: impl Into<String>) -> Self {
        Self::InvalidHex {
            message: message.into(),
        }
    }

    /// True for the two target rejections that make a header's `bits` invalid
    pub fn is_invalid_target(&self) -> bool {
        matches!(
            self,
            Error::MalformedTarget { .. } | Error::TargetOutOfRange { .. }
        )
    }

    /// True when the error rejects a header outright
    pub fn is_rejection(&self) -> bool {
        self.is_invalid_target() || matches!(self, Error::InsufficientWork { .. })
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Error::MalformedTarget { .. } => "malformed_target",
            Error::TargetOutOfRange { .. } => "target_out_of_range",
            Error::InsufficientWork { .. } => "insufficient_work",
            Error::Config { .. } => "config",
            Error::ChainIndex { .. } => "chain_index",
            Error::InvalidHex { .. } => "invalid_hex",
            Error::Settings(_) => "settings",
            Error::Json(_) => "json",
            Error::Yaml(_) => "yaml",
            Error::Io(_) => "io",
        }
    }
}
