//! Datapath module - raw bytes from fan-out to tagged output.
//!
//! - [`FanOut`] duplicates each accepted chunk onto both paths
//! - [`DataBuffer`] holds raw chunks until their frame is classified
//! - [`Combiner`] pairs the oldest buffered frame with the oldest decision

mod buffer;
mod combiner;
mod fanout;

pub use buffer::DataBuffer;
pub use combiner::Combiner;
pub use fanout::FanOut;
