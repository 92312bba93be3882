//! Frame fan-out onto the data path and the header path.
//!
//! Every accepted chunk goes to both consumers; `Bytes` makes the copy a
//! reference-count bump. A chunk is accepted only when both sides are ready,
//! so the two paths never disagree about which frames they have seen.

use super::DataBuffer;
use crate::classify::{Classified, Classifier};
use crate::error::{Result, RouterError};
use crate::protocol::Chunk;

/// Both-ready gate in front of the data buffer and the classifier.
#[derive(Debug, Clone, Copy)]
pub struct FanOut {
    max_chunk_len: usize,
}

impl FanOut {
    /// Create a gate that admits chunks of at most `max_chunk_len` bytes.
    pub fn new(max_chunk_len: usize) -> Self {
        Self { max_chunk_len }
    }

    /// Largest admissible chunk.
    #[inline]
    pub fn max_chunk_len(&self) -> usize {
        self.max_chunk_len
    }

    /// Reject chunks wider than the configured transport.
    pub fn check(&self, chunk: &Chunk) -> Result<()> {
        if chunk.len() > self.max_chunk_len {
            return Err(RouterError::ChunkTooLarge {
                len: chunk.len(),
                max: self.max_chunk_len,
            });
        }
        Ok(())
    }

    /// Duplicate `chunk` into `buffer` and `classifier`.
    ///
    /// The classifier always keeps pace, so readiness is decided by the
    /// buffer alone; a refused chunk is handed back untouched and neither
    /// side has seen it.
    pub fn forward(
        &self,
        chunk: Chunk,
        buffer: &mut DataBuffer,
        classifier: &mut Classifier,
    ) -> std::result::Result<Option<Classified>, Chunk> {
        let header_copy = chunk.clone();
        buffer.push(chunk)?;
        Ok(classifier.feed(&header_copy))
    }
}
