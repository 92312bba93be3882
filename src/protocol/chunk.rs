//! Chunk types exchanged with the transport on both sides of the router.
//!
//! A frame is an ordered run of chunks terminated by one with `last == true`.
//! Chunk boundaries carry no meaning for classification; they are preserved
//! byte-for-byte on the output side.
//!
//! # Example
//!
//! ```
//! use uoe_router::protocol::{Chunk, Destination, FrameAssembler, OutputChunk};
//! use bytes::Bytes;
//!
//! let mut assembler = FrameAssembler::new();
//! let first = OutputChunk::new(Bytes::from_static(b"he"), false, Some(Destination::Raw));
//! let second = OutputChunk::new(Bytes::from_static(b"llo"), true, None);
//!
//! assert!(assembler.push(first).is_none());
//! let frame = assembler.push(second).unwrap();
//! assert_eq!(frame.destination, Destination::Raw);
//! assert_eq!(frame.to_vec(), b"hello");
//! # let _ = Chunk::last(Bytes::new());
//! ```

use bytes::{Bytes, BytesMut};

use super::Destination;

/// One transport step of an incoming frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Payload bytes (zero-copy via `bytes::Bytes`).
    pub data: Bytes,
    /// Set on the chunk that ends the frame.
    pub last: bool,
}

impl Chunk {
    /// Create a chunk.
    pub fn new(data: Bytes, last: bool) -> Self {
        Self { data, last }
    }

    /// Create a non-final chunk.
    pub fn more(data: Bytes) -> Self {
        Self::new(data, false)
    }

    /// Create the final chunk of a frame.
    pub fn last(data: Bytes) -> Self {
        Self::new(data, true)
    }

    /// Create a chunk by copying a slice.
    pub fn from_slice(data: &[u8], last: bool) -> Self {
        Self::new(Bytes::copy_from_slice(data), last)
    }

    /// Number of bytes carried.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when the chunk carries no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A chunk leaving the router.
///
/// `destination` is set on the first chunk of every frame and on no other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputChunk {
    /// Bytes exactly as received.
    pub data: Bytes,
    /// Set on the chunk that ends the frame.
    pub last: bool,
    /// Frame tag, present only on the first chunk.
    pub destination: Option<Destination>,
}

impl OutputChunk {
    /// Create an output chunk.
    pub fn new(data: Bytes, last: bool, destination: Option<Destination>) -> Self {
        Self {
            data,
            last,
            destination,
        }
    }

    /// True when this chunk opens a frame.
    #[inline]
    pub fn is_first(&self) -> bool {
        self.destination.is_some()
    }
}

/// A complete frame reassembled from output chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedFrame {
    /// Frame tag.
    pub destination: Destination,
    /// Chunks in arrival order, boundaries preserved.
    pub chunks: Vec<Bytes>,
}

impl TaggedFrame {
    /// Total frame length.
    pub fn len(&self) -> usize {
        self.chunks.iter().map(Bytes::len).sum()
    }

    /// True for a zero-length frame.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Concatenate all chunks.
    pub fn to_bytes(&self) -> Bytes {
        if self.chunks.len() == 1 {
            return self.chunks[0].clone();
        }
        let mut buf = BytesMut::with_capacity(self.len());
        for chunk in &self.chunks {
            buf.extend_from_slice(chunk);
        }
        buf.freeze()
    }

    /// Concatenate all chunks into a vector.
    pub fn to_vec(&self) -> Vec<u8> {
        self.to_bytes().to_vec()
    }
}

/// Collects output chunks back into [`TaggedFrame`]s.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    current: Option<TaggedFrame>,
}

impl FrameAssembler {
    /// Create an empty assembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one output chunk; returns the frame once its last chunk arrives.
    ///
    /// A chunk without a tag arriving outside a frame is ignored; the router
    /// never produces one.
    pub fn push(&mut self, chunk: OutputChunk) -> Option<TaggedFrame> {
        if let Some(destination) = chunk.destination {
            self.current = Some(TaggedFrame {
                destination,
                chunks: Vec::new(),
            });
        }

        let frame = self.current.as_mut()?;
        frame.chunks.push(chunk.data);

        if chunk.last {
            self.current.take()
        } else {
            None
        }
    }

    /// True while a frame is partially assembled.
    pub fn in_frame(&self) -> bool {
        self.current.is_some()
    }
}
