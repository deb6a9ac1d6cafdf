//! Utility functions and helpers
//!
//! Hex conversion, clamping and logging setup shared by the library and the
//! command-line inspector.

use crate::{Error, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Validate hex string format
pub fn validate_hex_string(s: &str, expected_len: Option<usize>) -> Result<()> {
    if let Some(len) = expected_len {
        if s.len() != len {
            return Err(Error::invalid_hex(format!(
                "Expected length {}, got {}",
                len,
                s.len()
            )));
        }
    }

    if !s.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::invalid_hex(
            "String contains non-hexadecimal characters",
        ));
    }

    Ok(())
}

/// Convert hex string to bytes
pub fn hex_to_bytes(hex: &str) -> Result<Vec<u8>> {
    validate_hex_string(hex, None)?;
    hex::decode(hex).map_err(|e| Error::invalid_hex(e.to_string()))
}

/// Convert bytes to hex string
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Clamp a value between min and max
pub fn clamp<T: PartialOrd>(value: T, min: T, max: T) -> T {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable single-line output
    Text,
    /// One JSON object per event
    Json,
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins over `level` when set.
pub fn init_logging(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_hex_string() {
        assert!(validate_hex_string("deadbeef", Some(8)).is_ok());
        assert!(validate_hex_string("DEADBEEF", Some(8)).is_ok());
        assert!(validate_hex_string("123456789abcdef0", None).is_ok());

        assert!(validate_hex_string("deadbeef", Some(10)).is_err());
        assert!(validate_hex_string("deadbzzf", None).is_err());
        assert!(validate_hex_string("", Some(1)).is_err());
    }

    #[test]
    fn test_hex_conversion() {
        let bytes = vec![0xde, 0xad, 0xbe, 0xef];
        let hex = "deadbeef";

        assert_eq!(hex_to_bytes(hex).unwrap(), bytes);
        assert_eq!(bytes_to_hex(&bytes), hex);
        assert!(hex_to_bytes("abc").is_err());
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(5, 0, 10), 5);
        assert_eq!(clamp(-1, 0, 10), 0);
        assert_eq!(clamp(15, 0, 10), 10);
        assert_eq!(clamp(5.5, 0.0, 10.0), 5.5);
    }
}
