//! Sequential router and its builder.
//!
//! The [`Router`] steps every stage synchronously for each pushed chunk:
//! 1. Fan-out: size check, then both-ready gate
//! 2. Header path: extractor and decision engine
//! 3. Data path: buffer the raw chunk
//! 4. Combiner: release tagged chunks as the consumer pulls them
//!
//! # Example
//!
//! ```
//! use uoe_router::protocol::{split_into_chunks, FrameAssembler, FrameBuilder};
//! use uoe_router::{Destination, PushOutcome, Router};
//!
//! let mut router = Router::builder().max_chunk_len(16).build().unwrap();
//! let frame = FrameBuilder::new(0x0806).payload(vec![0u8; 28]).build();
//!
//! for chunk in split_into_chunks(&frame, 16) {
//!     assert!(matches!(router.try_push(chunk).unwrap(), PushOutcome::Accepted));
//! }
//!
//! let mut assembler = FrameAssembler::new();
//! let tagged = router.drain().find_map(|out| assembler.push(out)).unwrap();
//! assert_eq!(tagged.destination, Destination::Arp);
//! assert_eq!(tagged.to_bytes(), frame);
//! ```

use std::sync::Arc;

use crate::classify::{Classified, Classifier, FragmentTracker};
use crate::config::RouterConfig;
use crate::datapath::{Combiner, DataBuffer, FanOut};
use crate::error::{Result, RouterError};
use crate::pipeline::Pipeline;
use crate::protocol::{Chunk, OutputChunk};
use crate::stats::RouterStats;

/// Result of offering a chunk to the router.
#[derive(Debug)]
pub enum PushOutcome {
    /// The chunk was taken by both paths.
    Accepted,
    /// The data buffer is full; drain output and offer the chunk again.
    Backpressure(Chunk),
}

impl PushOutcome {
    /// True when the chunk was taken.
    pub fn is_accepted(&self) -> bool {
        matches!(self, PushOutcome::Accepted)
    }
}

/// Builder for configuring a [`Router`] or a [`Pipeline`].
#[derive(Debug, Clone, Default)]
pub struct RouterBuilder {
    config: RouterConfig,
}

impl RouterBuilder {
    /// Create a builder with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration.
    pub fn from_config(config: RouterConfig) -> Self {
        Self { config }
    }

    /// Set the data buffer size in bytes.
    ///
    /// Default: 16384
    pub fn buffer_capacity(mut self, bytes: usize) -> Self {
        self.config.buffer_capacity_bytes = bytes;
        self
    }

    /// Set the largest chunk accepted from the transport.
    ///
    /// Default: 2048
    pub fn max_chunk_len(mut self, len: usize) -> Self {
        self.config.max_chunk_len = len;
        self
    }

    /// Set the capacity of each pipeline channel, in chunks.
    ///
    /// Default: 1024
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.channel_capacity = capacity;
        self
    }

    /// Log every classification at debug level.
    pub fn log_decisions(mut self, enabled: bool) -> Self {
        self.config.log_decisions = enabled;
        self
    }

    /// The configuration built so far.
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Validate and build a sequential router.
    pub fn build(self) -> Result<Router> {
        Router::new(self.config)
    }

    /// Validate and spawn a staged pipeline on the current Tokio runtime.
    pub fn spawn(self) -> Result<Pipeline> {
        Pipeline::spawn(self.config)
    }
}

/// Single-threaded router stepping all stages per chunk.
#[derive(Debug)]
pub struct Router {
    config: RouterConfig,
    fanout: FanOut,
    classifier: Classifier,
    buffer: DataBuffer,
    combiner: Combiner,
    stats: Arc<RouterStats>,
}

impl Router {
    /// Create a router builder.
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Validate `config` and build a router.
    pub fn new(config: RouterConfig) -> Result<Self> {
        config.validate()?;
        tracing::debug!(
            "Router ready: buffer {} bytes, max chunk {} bytes",
            config.buffer_capacity_bytes,
            config.max_chunk_len
        );

        Ok(Self {
            fanout: FanOut::new(config.max_chunk_len),
            classifier: Classifier::new(),
            buffer: DataBuffer::new(config.buffer_capacity_bytes),
            combiner: Combiner::new(),
            stats: Arc::new(RouterStats::new()),
            config,
        })
    }

    /// Offer one chunk.
    ///
    /// # Errors
    ///
    /// - `ChunkTooLarge` if the chunk is wider than `max_chunk_len`
    /// - `BufferOverflow` if the buffer is full while its oldest frame is
    ///   still unclassified; this cannot clear by draining
    pub fn try_push(&mut self, chunk: Chunk) -> Result<PushOutcome> {
        self.fanout.check(&chunk)?;

        match self
            .fanout
            .forward(chunk, &mut self.buffer, &mut self.classifier)
        {
            Ok(classified) => {
                if let Some(classified) = classified {
                    self.accept_decision(classified);
                }
                Ok(PushOutcome::Accepted)
            }
            Err(chunk) => {
                if self.can_release() {
                    self.stats.record_backpressure();
                    return Ok(PushOutcome::Backpressure(chunk));
                }
                tracing::error!(
                    "Data buffer full with unclassified frame ({} of {} bytes)",
                    self.buffer.len(),
                    self.buffer.capacity()
                );
                Err(RouterError::BufferOverflow {
                    buffered: self.buffer.len(),
                    capacity: self.buffer.capacity(),
                })
            }
        }
    }

    fn accept_decision(&mut self, classified: Classified) {
        if self.config.log_decisions {
            tracing::debug!(
                "Frame -> {} (ethertype {:#06x}, proto {}, port {}, {:?})",
                classified.decision.destination,
                classified.fields.ethertype,
                classified.fields.ip_protocol,
                classified.fields.dest_port,
                classified.decision.verdict
            );
        }
        self.stats.record_decision(&classified);
        self.combiner.push_decision(classified.decision.destination);
    }

    fn can_release(&self) -> bool {
        self.buffer.has_chunk() && self.combiner.can_release()
    }

    /// Release the next tagged chunk, if its frame is classified.
    pub fn next_output(&mut self) -> Option<OutputChunk> {
        let out = self.combiner.next(&mut self.buffer)?;
        self.stats.record_output(&out);
        Some(out)
    }

    /// Release every chunk that is ready.
    pub fn drain(&mut self) -> impl Iterator<Item = OutputChunk> + '_ {
        std::iter::from_fn(move || self.next_output())
    }

    /// Frames held in the data buffer, including one still arriving.
    pub fn pending_frames(&self) -> usize {
        self.buffer.frames()
    }

    /// Bytes held in the data buffer.
    pub fn buffered_bytes(&self) -> usize {
        self.buffer.len()
    }

    /// Decisions waiting for their frame to be pulled.
    pub fn pending_decisions(&self) -> usize {
        self.combiner.pending_decisions()
    }

    /// The fragment tracker, for inspection.
    pub fn tracker(&self) -> &FragmentTracker {
        self.classifier.engine().tracker()
    }

    /// Shared statistics.
    pub fn stats(&self) -> Arc<RouterStats> {
        self.stats.clone()
    }

    /// Active configuration.
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Discard buffered data and return every stage to its initial state.
    ///
    /// Statistics are kept.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.classifier.reset();
        self.combiner.reset();
    }
}
