//! Header path: extractor feeding the decision engine.

use super::{ClassificationEngine, Decision, HeaderExtractor, HeaderFields};
use crate::protocol::Chunk;

/// One classified frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classified {
    /// Fields the decision was based on.
    pub fields: HeaderFields,
    /// Resulting decision.
    pub decision: Decision,
}

/// Streaming classifier: bytes in, one [`Classified`] per frame out.
///
/// A single instance must see every frame in arrival order; it is the only
/// writer of the fragment tracker.
#[derive(Debug, Default)]
pub struct Classifier {
    extractor: HeaderExtractor,
    engine: ClassificationEngine,
}

impl Classifier {
    /// Create a classifier at a frame boundary with nothing tracked.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one chunk; returns the decision once the frame is classified.
    pub fn feed(&mut self, chunk: &Chunk) -> Option<Classified> {
        let fields = self.extractor.feed(chunk)?;
        let decision = self.engine.decide(&fields);
        Some(Classified { fields, decision })
    }

    /// The decision engine, for inspection.
    pub fn engine(&self) -> &ClassificationEngine {
        &self.engine
    }

    /// The header extractor, for inspection.
    pub fn extractor(&self) -> &HeaderExtractor {
        &self.extractor
    }

    /// Return to a frame boundary and forget any tracked datagram.
    pub fn reset(&mut self) {
        self.extractor.reset();
        self.engine.reset();
    }
}
