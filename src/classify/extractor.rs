//! Header field extractor.
//!
//! A byte-position state machine that latches the classification fields as
//! they stream past, whatever the chunk size:
//! - `Collecting`: inside the header window, latching fields by offset
//! - `Draining`: fields already emitted, skipping to the end of the frame
//!
//! Exactly one [`HeaderFields`] record is emitted per frame, either when
//! offset 37 has been seen or when the frame ends, whichever comes first.
//!
//! # Example
//!
//! ```
//! use uoe_router::classify::HeaderExtractor;
//! use uoe_router::protocol::Chunk;
//!
//! let mut extractor = HeaderExtractor::new();
//! let mut frame = vec![0u8; 40];
//! frame[12] = 0x08;
//! frame[13] = 0x06;
//!
//! assert!(extractor.feed(&Chunk::from_slice(&frame[..20], false)).is_none());
//! let fields = extractor.feed(&Chunk::from_slice(&frame[20..], true)).unwrap();
//! assert_eq!(fields.ethertype, 0x0806);
//! ```

use crate::protocol::{
    Chunk, FRAG_OFFSET_HI_MASK, HEADER_WINDOW, MORE_FRAGMENTS_BIT, OFFSET_DATAGRAM_ID_HI,
    OFFSET_DATAGRAM_ID_LO, OFFSET_DEST_PORT_HI, OFFSET_DEST_PORT_LO, OFFSET_ETHERTYPE_HI,
    OFFSET_ETHERTYPE_LO, OFFSET_FRAG_HI, OFFSET_FRAG_LO, OFFSET_PROTOCOL,
};

/// Classification fields of one frame.
///
/// Fields whose offset was never reached stay zero/false.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeaderFields {
    /// EtherType (or 802.3 length).
    pub ethertype: u16,
    /// IPv4 protocol number.
    pub ip_protocol: u8,
    /// IPv4 more-fragments flag.
    pub more_fragments: bool,
    /// IPv4 fragment offset (13 bits, 8-byte units).
    pub frag_offset: u16,
    /// IPv4 identification.
    pub datagram_id: u16,
    /// Transport destination port.
    pub dest_port: u16,
    /// Header-window bytes actually seen (at most [`HEADER_WINDOW`]).
    pub observed: usize,
}

impl HeaderFields {
    /// True when the frame ended before the whole header window passed.
    #[inline]
    pub fn is_truncated(&self) -> bool {
        self.observed < HEADER_WINDOW
    }

    fn latch(&mut self, offset: usize, byte: u8) {
        match offset {
            OFFSET_ETHERTYPE_HI => self.ethertype = set_hi(self.ethertype, byte),
            OFFSET_ETHERTYPE_LO => self.ethertype = set_lo(self.ethertype, byte),
            OFFSET_DATAGRAM_ID_HI => self.datagram_id = set_hi(self.datagram_id, byte),
            OFFSET_DATAGRAM_ID_LO => self.datagram_id = set_lo(self.datagram_id, byte),
            OFFSET_FRAG_HI => {
                self.more_fragments = byte & MORE_FRAGMENTS_BIT != 0;
                self.frag_offset = set_hi(self.frag_offset, byte & FRAG_OFFSET_HI_MASK);
            }
            OFFSET_FRAG_LO => self.frag_offset = set_lo(self.frag_offset, byte),
            OFFSET_PROTOCOL => self.ip_protocol = byte,
            OFFSET_DEST_PORT_HI => self.dest_port = set_hi(self.dest_port, byte),
            OFFSET_DEST_PORT_LO => self.dest_port = set_lo(self.dest_port, byte),
            _ => {}
        }
    }
}

#[inline]
fn set_hi(value: u16, byte: u8) -> u16 {
    (value & 0x00FF) | (u16::from(byte) << 8)
}

#[inline]
fn set_lo(value: u16, byte: u8) -> u16 {
    (value & 0xFF00) | u16::from(byte)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Collecting,
    Draining,
}

/// Streaming extractor for [`HeaderFields`].
#[derive(Debug)]
pub struct HeaderExtractor {
    /// Bytes of the current frame seen so far.
    offset: usize,
    fields: HeaderFields,
    state: State,
}

impl HeaderExtractor {
    /// Create an extractor positioned at the start of a frame.
    pub fn new() -> Self {
        Self {
            offset: 0,
            fields: HeaderFields::default(),
            state: State::Collecting,
        }
    }

    /// Consume one chunk.
    ///
    /// Returns the frame's fields on the chunk that completes the header
    /// window or ends the frame, and `None` otherwise.
    pub fn feed(&mut self, chunk: &Chunk) -> Option<HeaderFields> {
        let mut emitted = None;
        let mut latched = 0;

        if self.state == State::Collecting {
            let wanted = HEADER_WINDOW - self.offset;
            for &byte in chunk.data.iter().take(wanted) {
                self.fields.latch(self.offset, byte);
                self.offset += 1;
                latched += 1;
            }
            self.fields.observed = self.offset;

            if self.offset == HEADER_WINDOW {
                emitted = Some(self.fields);
                self.state = State::Draining;
            }
        }

        // Past the window only the running length matters.
        self.offset = self.offset.saturating_add(chunk.len() - latched);

        if chunk.last {
            if self.state == State::Collecting {
                emitted = Some(self.fields);
            }
            self.reset();
        }

        emitted
    }

    /// Bytes of the current frame seen so far.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// True between the end of the header window and the end of the frame.
    #[inline]
    pub fn is_draining(&self) -> bool {
        self.state == State::Draining
    }

    /// Drop any partial frame and start over.
    pub fn reset(&mut self) {
        self.offset = 0;
        self.fields = HeaderFields::default();
        self.state = State::Collecting;
    }
}

impl Default for HeaderExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ip_proto, split_into_chunks, FrameBuilder, Ipv4Packet};
    use bytes::Bytes;

    fn udp_frame() -> Bytes {
        let packet = Ipv4Packet::new(ip_proto::UDP, 0xCAFE)
            .fragment(0x0123, true)
            .udp(1000, 0x1F90, b"payload bytes");
        FrameBuilder::ipv4(&packet).build()
    }

    fn extract_all(frame: &Bytes, chunk_size: usize) -> Vec<HeaderFields> {
        let mut extractor = HeaderExtractor::new();
        split_into_chunks(frame, chunk_size)
            .iter()
            .filter_map(|chunk| extractor.feed(chunk))
            .collect()
    }

    #[test]
    fn test_extracts_all_fields() {
        let fields = extract_all(&udp_frame(), 0);

        assert_eq!(fields.len(), 1);
        let fields = fields[0];
        assert_eq!(fields.ethertype, 0x0800);
        assert_eq!(fields.ip_protocol, ip_proto::UDP);
        assert!(fields.more_fragments);
        assert_eq!(fields.frag_offset, 0x0123);
        assert_eq!(fields.datagram_id, 0xCAFE);
        assert_eq!(fields.dest_port, 0x1F90);
        assert!(!fields.is_truncated());
    }

    #[test]
    fn test_chunk_size_independent() {
        let frame = udp_frame();
        let reference = extract_all(&frame, 0);

        for size in 1..=frame.len() {
            assert_eq!(extract_all(&frame, size), reference, "chunk size {}", size);
        }
    }

    #[test]
    fn test_emits_when_window_completes_before_last() {
        let frame = udp_frame();
        let mut extractor = HeaderExtractor::new();

        let head = Chunk::more(frame.slice(..HEADER_WINDOW - 1));
        assert!(extractor.feed(&head).is_none());
        let fields = extractor.feed(&Chunk::more(frame.slice(HEADER_WINDOW - 1..HEADER_WINDOW)));
        assert!(fields.is_some());
        assert!(extractor.is_draining());

        // Rest of the frame produces nothing more.
        let middle = Chunk::more(frame.slice(HEADER_WINDOW..45));
        assert!(extractor.feed(&middle).is_none());
        assert!(extractor.feed(&Chunk::last(frame.slice(45..))).is_none());
        assert_eq!(extractor.offset(), 0);
        assert!(!extractor.is_draining());
    }

    #[test]
    fn test_running_offset_tracks_frame_length() {
        let frame = udp_frame();
        let mut extractor = HeaderExtractor::new();

        extractor.feed(&Chunk::more(frame.slice(..10)));
        assert_eq!(extractor.offset(), 10);
        extractor.feed(&Chunk::more(frame.slice(10..50)));
        assert_eq!(extractor.offset(), 50);
        extractor.feed(&Chunk::more(frame.slice(50..55)));
        assert_eq!(extractor.offset(), 55);
    }

    #[test]
    fn test_short_frame_zero_fills() {
        // Ends after the EtherType and part of the IPv4 header.
        let frame = udp_frame().slice(..22);
        let fields = extract_all(&frame, 5);

        assert_eq!(fields.len(), 1);
        let fields = fields[0];
        assert_eq!(fields.ethertype, 0x0800);
        assert_eq!(fields.datagram_id, 0xCAFE);
        assert_eq!(fields.frag_offset, 0x0123);
        assert_eq!(fields.ip_protocol, 0);
        assert_eq!(fields.dest_port, 0);
        assert_eq!(fields.observed, 22);
        assert!(fields.is_truncated());
    }

    #[test]
    fn test_empty_frame_emits_defaults() {
        let mut extractor = HeaderExtractor::new();
        let fields = extractor.feed(&Chunk::last(Bytes::new())).unwrap();
        assert_eq!(fields, HeaderFields::default());
    }

    #[test]
    fn test_empty_intermediate_chunks_ignored() {
        let frame = udp_frame();
        let mut extractor = HeaderExtractor::new();

        assert!(extractor.feed(&Chunk::more(Bytes::new())).is_none());
        assert!(extractor.feed(&Chunk::more(frame.slice(..30))).is_none());
        assert!(extractor.feed(&Chunk::more(Bytes::new())).is_none());
        let fields = extractor.feed(&Chunk::last(frame.slice(30..))).unwrap();
        assert_eq!(fields.dest_port, 0x1F90);
    }

    #[test]
    fn test_back_to_back_frames_do_not_leak_state() {
        let first = udp_frame();
        let second = FrameBuilder::new(0x0806).payload(vec![0u8; 28]).build();

        let mut extractor = HeaderExtractor::new();
        let a = extractor.feed(&Chunk::last(first)).unwrap();
        let b = extractor.feed(&Chunk::last(second)).unwrap();

        assert_eq!(a.ethertype, 0x0800);
        assert_eq!(b.ethertype, 0x0806);
        assert_eq!(b.datagram_id, 0);
        assert_eq!(b.dest_port, 0);
        assert!(!b.more_fragments);
    }

    #[test]
    fn test_reset_discards_partial_frame() {
        let frame = udp_frame();
        let mut extractor = HeaderExtractor::new();
        extractor.feed(&Chunk::more(frame.slice(..20)));
        extractor.reset();

        assert_eq!(extractor.offset(), 0);
        let fields = extractor.feed(&Chunk::last(Bytes::from_static(&[0u8; 4]))).unwrap();
        assert_eq!(fields.ethertype, 0);
        assert_eq!(fields.observed, 4);
    }
}
