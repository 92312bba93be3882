//! Error types for uoe-router.
//!
//! Classification itself never fails; every frame gets a [`Destination`].
//! These errors cover configuration, transport plumbing and buffer sizing.
//!
//! [`Destination`]: crate::protocol::Destination

use thiserror::Error;

/// Main error type for all router operations.
#[derive(Debug, Error)]
pub enum RouterError {
    /// I/O error while loading configuration or replaying captures.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error (configuration, statistics).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration, rejected at startup.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A chunk exceeds the configured transport width.
    #[error("Chunk of {len} bytes exceeds maximum {max}")]
    ChunkTooLarge { len: usize, max: usize },

    /// The data buffer filled up before the oldest frame was classified.
    ///
    /// This means the buffer is smaller than the decode latency; it is a
    /// sizing defect, never ordinary backpressure.
    #[error("Data buffer overflow: {buffered} of {capacity} bytes held by an unclassified frame")]
    BufferOverflow { buffered: usize, capacity: usize },

    /// A pipeline stage hung up.
    #[error("Channel closed")]
    ChannelClosed,

    /// A pipeline task panicked or was cancelled.
    #[error("Pipeline task failed: {0}")]
    TaskFailed(String),
}

/// Result type alias using RouterError.
pub type Result<T> = std::result::Result<T, RouterError>;
