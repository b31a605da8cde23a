//! # Decoder Configuration
//!
//! Configuration types for the streaming decode engine.

use serde::{Deserialize, Serialize};

/// Smallest read-ahead buffer the codec library's buffered stream accepts
/// (it must be strictly larger than this).
const MIN_IO_BUFFER_EXCLUSIVE: usize = 32 * 1024;

/// Streaming decoder configuration.
///
/// Controls the container adapter's I/O buffer, codec error tolerance and
/// duration discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Size of the bounded read-ahead buffer between the byte stream and the
    /// demuxer, in bytes.
    ///
    /// Must be a power of two larger than 32 KiB.
    ///
    /// Default: 128 KiB.
    #[serde(default = "default_io_buffer_len")]
    pub io_buffer_len: usize,

    /// Number of consecutive corrupt packets the codec may reject before the
    /// decoder gives up and enters the failed state.
    ///
    /// Default: 10.
    #[serde(default = "default_max_consecutive_decode_errors")]
    pub max_consecutive_decode_errors: usize,

    /// Whether a track without duration metadata may be scanned packet by
    /// packet at open time to discover its length.
    ///
    /// When disabled such a track opens with no decodable data.
    ///
    /// Default: true.
    #[serde(default = "default_scan_duration")]
    pub scan_duration: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            io_buffer_len: default_io_buffer_len(),
            max_consecutive_decode_errors: default_max_consecutive_decode_errors(),
            scan_duration: default_scan_duration(),
        }
    }
}

impl DecoderConfig {
    /// Create a configuration with the smallest accepted I/O buffer (64 KiB)
    /// and a tighter corrupt-packet budget.
    pub fn low_memory() -> Self {
        Self {
            io_buffer_len: 2 * MIN_IO_BUFFER_EXCLUSIVE, // 64 KiB is the first valid power of two
            max_consecutive_decode_errors: 4,
            ..Default::default()
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if !self.io_buffer_len.is_power_of_two() {
            return Err("io_buffer_len must be a power of two".to_string());
        }

        if self.io_buffer_len <= MIN_IO_BUFFER_EXCLUSIVE {
            return Err(format!(
                "io_buffer_len must be larger than {} bytes",
                MIN_IO_BUFFER_EXCLUSIVE
            ));
        }

        if self.max_consecutive_decode_errors == 0 {
            return Err("max_consecutive_decode_errors must be > 0".to_string());
        }

        Ok(())
    }
}

fn default_io_buffer_len() -> usize {
    128 * 1024
}

fn default_max_consecutive_decode_errors() -> usize {
    10
}

fn default_scan_duration() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = DecoderConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.io_buffer_len, 131072);
        assert!(config.scan_duration);
    }

    #[test]
    fn test_low_memory_preset() {
        let config = DecoderConfig::low_memory();
        let default = DecoderConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.io_buffer_len, 64 * 1024);
        assert!(config.io_buffer_len < default.io_buffer_len);
        assert!(config.max_consecutive_decode_errors < default.max_consecutive_decode_errors);
    }

    #[test]
    fn test_rejects_small_or_odd_buffers() {
        let mut config = DecoderConfig::default();

        config.io_buffer_len = 32 * 1024;
        assert!(config.validate().is_err());

        config.io_buffer_len = 100_000;
        assert!(config.validate().is_err());

        config.io_buffer_len = 128 * 1024;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_error_budget() {
        let config = DecoderConfig {
            max_consecutive_decode_errors: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
