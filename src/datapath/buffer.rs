//! Data buffer holding raw frame bytes until their decision is ready.
//!
//! Chunks are kept exactly as received, grouped per frame, in arrival order.
//! Each buffered chunk holds a [`BudgetPermit`] for its length, so the
//! occupancy seen by the [`BufferBudget`] always matches what is buffered.
//!
//! A full buffer rejects the chunk and hands it back; the caller must drain
//! the combiner before retrying. Nothing is ever dropped.

use std::collections::VecDeque;

use crate::backpressure::{BudgetPermit, BufferBudget};
use crate::protocol::Chunk;

#[derive(Debug)]
struct BufferedChunk {
    chunk: Chunk,
    _permit: BudgetPermit,
}

#[derive(Debug, Default)]
struct BufferedFrame {
    chunks: VecDeque<BufferedChunk>,
    /// Chunks of this frame already popped.
    released: usize,
    /// Last chunk has been pushed.
    complete: bool,
}

/// Bounded, order-preserving FIFO of frame chunks.
#[derive(Debug)]
pub struct DataBuffer {
    frames: VecDeque<BufferedFrame>,
    budget: BufferBudget,
    bytes: usize,
}

impl DataBuffer {
    /// Create a buffer of `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self::with_budget(BufferBudget::new(capacity))
    }

    /// Create a buffer drawing on an existing budget.
    pub fn with_budget(budget: BufferBudget) -> Self {
        Self {
            frames: VecDeque::new(),
            budget,
            bytes: 0,
        }
    }

    /// Check if a chunk of `len` bytes fits right now.
    #[inline]
    pub fn can_accept(&self, len: usize) -> bool {
        self.budget.can_accept(len)
    }

    /// Append a chunk to the newest frame (opening a new one if needed).
    ///
    /// Hands the chunk back when the byte budget cannot cover it.
    pub fn push(&mut self, chunk: Chunk) -> Result<(), Chunk> {
        let Some(permit) = self.budget.try_reserve(chunk.len()) else {
            return Err(chunk);
        };

        self.bytes += chunk.len();
        let last = chunk.last;
        let buffered = BufferedChunk {
            chunk,
            _permit: permit,
        };

        match self.frames.back_mut() {
            Some(frame) if !frame.complete => {
                frame.complete = last;
                frame.chunks.push_back(buffered);
            }
            _ => self.frames.push_back(BufferedFrame {
                chunks: VecDeque::from([buffered]),
                released: 0,
                complete: last,
            }),
        }
        Ok(())
    }

    /// True when the next chunk to pop opens a frame.
    ///
    /// False while the head frame is mid-emission or the buffer is empty.
    pub fn front_is_frame_start(&self) -> bool {
        self.frames
            .front()
            .map_or(false, |frame| frame.released == 0 && !frame.chunks.is_empty())
    }

    /// True when a chunk is available to pop.
    pub fn has_chunk(&self) -> bool {
        self.frames
            .front()
            .map_or(false, |frame| !frame.chunks.is_empty())
    }

    /// Pop the oldest chunk, returning its bytes to the budget.
    pub fn pop_chunk(&mut self) -> Option<Chunk> {
        let frame = self.frames.front_mut()?;
        let buffered = frame.chunks.pop_front()?;
        frame.released += 1;

        if buffered.chunk.last {
            self.frames.pop_front();
        }

        self.bytes -= buffered.chunk.len();
        Some(buffered.chunk)
    }

    /// Pop the oldest frame once it is complete and nothing of it was popped.
    pub fn pop_frame(&mut self) -> Option<Vec<Chunk>> {
        let frame = self.frames.front()?;
        if !frame.complete || frame.released != 0 {
            return None;
        }

        let frame = self.frames.pop_front()?;
        let chunks: Vec<Chunk> = frame.chunks.into_iter().map(|b| b.chunk).collect();
        self.bytes -= chunks.iter().map(Chunk::len).sum::<usize>();
        Some(chunks)
    }

    /// Frames with at least one chunk still buffered or still open.
    #[inline]
    pub fn frames(&self) -> usize {
        self.frames.len()
    }

    /// Complete frames currently buffered.
    pub fn complete_frames(&self) -> usize {
        self.frames.iter().filter(|frame| frame.complete).count()
    }

    /// Bytes currently buffered.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes
    }

    /// True when nothing is buffered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Total capacity in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.budget.capacity()
    }

    /// Drop everything buffered.
    pub fn clear(&mut self) {
        self.frames.clear();
        self.bytes = 0;
    }
}
