//! Router configuration.
//!
//! Only buffer sizing is configurable; the classification constants are
//! fixed. A configuration is validated once at startup and a router is never
//! built from an invalid one.
//!
//! # Example
//!
//! ```
//! use uoe_router::RouterConfig;
//!
//! let config = RouterConfig::from_json_str(r#"{ "max_chunk_len": 64 }"#).unwrap();
//! assert_eq!(config.max_chunk_len, 64);
//! assert!(config.validate().is_ok());
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::backpressure::DEFAULT_BUFFER_CAPACITY;
use crate::error::{Result, RouterError};
use crate::protocol::HEADER_WINDOW;

/// Default largest chunk the transport delivers.
pub const DEFAULT_MAX_CHUNK_LEN: usize = 2048;

/// Default capacity of each inter-stage channel, in chunks.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Largest buffer the byte budget can represent.
pub const MAX_BUFFER_CAPACITY: usize = u32::MAX as usize;

/// Sizing for the data buffer and pipeline channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RouterConfig {
    /// Data buffer size in bytes.
    pub buffer_capacity_bytes: usize,
    /// Largest chunk accepted from the transport.
    pub max_chunk_len: usize,
    /// Capacity of each pipeline channel, in chunks.
    pub channel_capacity: usize,
    /// Log every classification at debug level.
    pub log_decisions: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            buffer_capacity_bytes: DEFAULT_BUFFER_CAPACITY,
            max_chunk_len: DEFAULT_MAX_CHUNK_LEN,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            log_decisions: false,
        }
    }
}

impl RouterConfig {
    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Smallest buffer that can hold an unclassified frame plus one chunk.
    pub fn min_buffer_capacity(&self) -> usize {
        HEADER_WINDOW + self.max_chunk_len
    }

    /// Check the sizing rules.
    ///
    /// The data buffer must absorb the whole decode latency: while the
    /// oldest frame is unclassified it holds fewer than [`HEADER_WINDOW`]
    /// bytes, and the next chunk must still fit.
    pub fn validate(&self) -> Result<()> {
        if self.max_chunk_len == 0 {
            return Err(RouterError::Config("max_chunk_len must be non-zero".into()));
        }
        if self.channel_capacity < HEADER_WINDOW {
            return Err(RouterError::Config(format!(
                "channel_capacity {} is below the header window of {} chunks",
                self.channel_capacity, HEADER_WINDOW
            )));
        }
        if self.buffer_capacity_bytes < self.min_buffer_capacity() {
            return Err(RouterError::Config(format!(
                "buffer_capacity_bytes {} must be at least {} (header window {} + max_chunk_len {})",
                self.buffer_capacity_bytes,
                self.min_buffer_capacity(),
                HEADER_WINDOW,
                self.max_chunk_len
            )));
        }
        if self.buffer_capacity_bytes > MAX_BUFFER_CAPACITY {
            return Err(RouterError::Config(format!(
                "buffer_capacity_bytes {} exceeds maximum {}",
                self.buffer_capacity_bytes, MAX_BUFFER_CAPACITY
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = RouterConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.buffer_capacity_bytes, DEFAULT_BUFFER_CAPACITY);
        assert_eq!(config.max_chunk_len, DEFAULT_MAX_CHUNK_LEN);
        assert_eq!(config.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
        assert!(!config.log_decisions);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = RouterConfig::from_json_str(
            r#"{ "buffer_capacity_bytes": 4096, "log_decisions": true }"#,
        )
        .unwrap();
        assert_eq!(config.buffer_capacity_bytes, 4096);
        assert!(config.log_decisions);
        assert_eq!(config.max_chunk_len, DEFAULT_MAX_CHUNK_LEN);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = RouterConfig::from_json_str(r#"{ "buffer_bytes": 1 }"#);
        assert!(matches!(result, Err(RouterError::Json(_))));
    }

    #[test]
    fn test_buffer_smaller_than_decode_latency() {
        let config = RouterConfig {
            buffer_capacity_bytes: HEADER_WINDOW + 63,
            max_chunk_len: 64,
            ..RouterConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("buffer_capacity_bytes"));

        let config = RouterConfig {
            buffer_capacity_bytes: HEADER_WINDOW + 64,
            ..config
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_chunk_len_rejected() {
        let config = RouterConfig {
            max_chunk_len: 0,
            ..RouterConfig::default()
        };
        assert!(matches!(config.validate(), Err(RouterError::Config(_))));
    }

    #[test]
    fn test_small_channel_rejected() {
        let config = RouterConfig {
            channel_capacity: HEADER_WINDOW - 1,
            ..RouterConfig::default()
        };
        assert!(matches!(config.validate(), Err(RouterError::Config(_))));
    }

    #[test]
    fn test_from_file() {
        let name = format!("uoe-router-config-{}.json", std::process::id());
        let path = std::env::temp_dir().join(name);
        std::fs::write(&path, r#"{ "channel_capacity": 64 }"#).unwrap();

        let config = RouterConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.channel_capacity, 64);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = RouterConfig::from_file("/nonexistent/uoe-router.json");
        assert!(matches!(result, Err(RouterError::Io(_))));
    }
}
