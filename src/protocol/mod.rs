//! Protocol module - header layout, chunk types, and frame builders.
//!
//! This module holds everything that describes bytes on the wire:
//! - Fixed offsets and classification constants
//! - Input/output chunk types and the [`Destination`] tag
//! - Frame builders for demos and tests

mod builder;
mod chunk;
mod constants;
mod destination;

pub use builder::{
    internet_checksum, split_into_chunks, FrameBuilder, Ipv4Packet, BROADCAST_MAC,
    ETHERNET_HEADER_LEN, IPV4_HEADER_LEN,
};
pub use chunk::{Chunk, FrameAssembler, OutputChunk, TaggedFrame};
pub use constants::{
    ip_proto, ETHERTYPE_ARP, ETHERTYPE_IPV4, ETHERTYPE_RAW_MAX, FRAG_OFFSET_HI_MASK,
    FRAG_OFFSET_MASK, HEADER_WINDOW, MORE_FRAGMENTS_BIT, NBNS_PORTS, OFFSET_DATAGRAM_ID_HI,
    OFFSET_DATAGRAM_ID_LO, OFFSET_DEST_PORT_HI, OFFSET_DEST_PORT_LO, OFFSET_ETHERTYPE_HI,
    OFFSET_ETHERTYPE_LO, OFFSET_FRAG_HI, OFFSET_FRAG_LO, OFFSET_PROTOCOL, STANDARD_PORT_MAX,
};
pub use destination::Destination;
