//! Classify module - header extraction and the decision table.
//!
//! - [`HeaderExtractor`] latches fields at fixed offsets as bytes stream past
//! - [`ClassificationEngine`] maps fields to a [`Destination`], keeping
//!   fragments of one datagram on the same path via [`FragmentTracker`]
//! - [`Classifier`] chains the two for one serialized stream of frames
//!
//! [`Destination`]: crate::protocol::Destination

mod classifier;
mod engine;
mod extractor;
mod tracker;

pub use classifier::{Classified, Classifier};
pub use engine::{classify_by_protocol_and_port, ClassificationEngine, Decision, Verdict};
pub use extractor::{HeaderExtractor, HeaderFields};
pub use tracker::{FragmentTracker, TrackedDatagram};
