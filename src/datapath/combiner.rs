//! Combiner re-joining buffered bytes with their classification.
//!
//! Decisions arrive in frame order, one per frame. The combiner tags the
//! first chunk of each frame with the oldest pending decision and lets the
//! remaining chunks of that frame through untagged. A chunk that opens a
//! frame whose decision has not arrived yet is refused; the caller stalls.

use std::collections::VecDeque;

use super::DataBuffer;
use crate::protocol::{Chunk, Destination, OutputChunk};

/// Pairs frame chunks with queued decisions in strict FIFO order.
#[derive(Debug, Default)]
pub struct Combiner {
    decisions: VecDeque<Destination>,
    /// Inside a frame whose first chunk has been released.
    in_frame: bool,
}

impl Combiner {
    /// Create a combiner with no pending decisions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the decision for the next unreleased frame.
    pub fn push_decision(&mut self, destination: Destination) {
        self.decisions.push_back(destination);
    }

    /// Decisions waiting for their frame.
    #[inline]
    pub fn pending_decisions(&self) -> usize {
        self.decisions.len()
    }

    /// True while a frame is being released.
    #[inline]
    pub fn in_frame(&self) -> bool {
        self.in_frame
    }

    /// True when the next chunk in arrival order can be released.
    #[inline]
    pub fn can_release(&self) -> bool {
        self.in_frame || !self.decisions.is_empty()
    }

    /// Tag and release one chunk.
    ///
    /// Hands the chunk back if it opens a frame with no decision yet.
    pub fn combine(&mut self, chunk: Chunk) -> Result<OutputChunk, Chunk> {
        let destination = if self.in_frame {
            None
        } else {
            match self.decisions.pop_front() {
                Some(destination) => Some(destination),
                None => return Err(chunk),
            }
        };

        self.in_frame = !chunk.last;
        Ok(OutputChunk::new(chunk.data, chunk.last, destination))
    }

    /// Release the next chunk held by `buffer`, if its decision is ready.
    pub fn next(&mut self, buffer: &mut DataBuffer) -> Option<OutputChunk> {
        if !buffer.has_chunk() {
            return None;
        }
        let opens_frame = buffer.front_is_frame_start();
        if opens_frame && self.decisions.is_empty() {
            return None;
        }
        debug_assert_eq!(opens_frame, !self.in_frame);

        let chunk = buffer.pop_chunk()?;
        let destination = if opens_frame {
            self.decisions.pop_front()
        } else {
            None
        };
        self.in_frame = !chunk.last;
        Some(OutputChunk::new(chunk.data, chunk.last, destination))
    }

    /// Drop pending decisions and frame state.
    pub fn reset(&mut self) {
        self.decisions.clear();
        self.in_frame = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn chunk(data: &'static [u8], last: bool) -> Chunk {
        Chunk::new(Bytes::from_static(data), last)
    }

    #[test]
    fn test_stalls_without_decision() {
        let mut combiner = Combiner::new();
        let back = combiner.combine(chunk(b"abc", true)).unwrap_err();
        assert_eq!(&back.data[..], b"abc");
        assert!(!combiner.can_release());
    }

    #[test]
    fn test_tags_first_chunk_only() {
        let mut combiner = Combiner::new();
        combiner.push_decision(Destination::UdpOffload);

        let first = combiner.combine(chunk(b"a", false)).unwrap();
        assert_eq!(first.destination, Some(Destination::UdpOffload));
        assert!(combiner.in_frame());

        let middle = combiner.combine(chunk(b"b", false)).unwrap();
        assert_eq!(middle.destination, None);

        let last = combiner.combine(chunk(b"c", true)).unwrap();
        assert_eq!(last.destination, None);
        assert!(last.last);
        assert!(!combiner.in_frame());
        assert_eq!(combiner.pending_decisions(), 0);
    }

    #[test]
    fn test_decisions_consumed_in_order() {
        let mut combiner = Combiner::new();
        combiner.push_decision(Destination::Arp);
        combiner.push_decision(Destination::Trash);

        let a = combiner.combine(chunk(b"1", true)).unwrap();
        let b = combiner.combine(chunk(b"2", true)).unwrap();
        assert_eq!(a.destination, Some(Destination::Arp));
        assert_eq!(b.destination, Some(Destination::Trash));
        assert!(combiner.combine(chunk(b"3", true)).is_err());
    }

    #[test]
    fn test_next_drains_buffer() {
        let mut buffer = DataBuffer::new(64);
        let mut combiner = Combiner::new();

        buffer.push(chunk(b"ab", false)).unwrap();
        buffer.push(chunk(b"cd", true)).unwrap();
        assert!(combiner.next(&mut buffer).is_none(), "no decision yet");
        assert_eq!(buffer.len(), 4);

        combiner.push_decision(Destination::Raw);
        let first = combiner.next(&mut buffer).unwrap();
        let second = combiner.next(&mut buffer).unwrap();
        assert_eq!(first.destination, Some(Destination::Raw));
        assert_eq!(&second.data[..], b"cd");
        assert!(combiner.next(&mut buffer).is_none());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_next_streams_open_frame() {
        let mut buffer = DataBuffer::new(64);
        let mut combiner = Combiner::new();
        combiner.push_decision(Destination::External);

        buffer.push(chunk(b"head", false)).unwrap();
        assert!(combiner.next(&mut buffer).is_some());
        assert!(combiner.next(&mut buffer).is_none(), "waiting for more input");

        buffer.push(chunk(b"tail", true)).unwrap();
        let tail = combiner.next(&mut buffer).unwrap();
        assert_eq!(tail.destination, None);
        assert!(tail.last);
    }
}
