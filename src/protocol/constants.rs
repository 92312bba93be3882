//! Fixed header layout and classification constants.
//!
//! Only the bytes needed to classify a frame are ever inspected:
//! ```text
//! ┌─────────┬─────────┬───────────┬───────────┬────────┬──────────┐
//! │ Dst/Src │EtherType│   IP Id   │Flags/Frag │ Proto  │ L4 Dport │
//! │ 0..=11  │ 12..=13 │  18..=19  │  20..=21  │   23   │ 36..=37  │
//! └─────────┴─────────┴───────────┴───────────┴────────┴──────────┘
//! ```
//!
//! All multi-byte fields are Big Endian. Offsets assume an untagged Ethernet
//! header followed by an IPv4 header without options.

use std::ops::RangeInclusive;

/// ARP EtherType.
pub const ETHERTYPE_ARP: u16 = 0x0806;

/// IPv4 EtherType.
pub const ETHERTYPE_IPV4: u16 = 0x0800;

/// Largest EtherType value still interpreted as an 802.3 length field.
///
/// Frames at or below this value are handed to the raw Ethernet consumer.
pub const ETHERTYPE_RAW_MAX: u16 = 0x05DC;

/// IP protocol numbers understood by the classifier.
pub mod ip_proto {
    /// Internet Control Message Protocol.
    pub const ICMP: u8 = 0x01;
    /// Internet Group Management Protocol.
    pub const IGMP: u8 = 0x02;
    /// Transmission Control Protocol.
    pub const TCP: u8 = 0x06;
    /// User Datagram Protocol.
    pub const UDP: u8 = 0x11;
}

/// NetBIOS name/datagram/session service ports, dropped because of volume.
pub const NBNS_PORTS: RangeInclusive<u16> = 137..=139;

/// Highest well-known ("standard") port number.
pub const STANDARD_PORT_MAX: u16 = 1023;

/// EtherType, high byte.
pub const OFFSET_ETHERTYPE_HI: usize = 12;
/// EtherType, low byte.
pub const OFFSET_ETHERTYPE_LO: usize = 13;
/// IPv4 identification, high byte.
pub const OFFSET_DATAGRAM_ID_HI: usize = 18;
/// IPv4 identification, low byte.
pub const OFFSET_DATAGRAM_ID_LO: usize = 19;
/// IPv4 flags (bit 5 = more fragments) and fragment offset bits 12..8.
pub const OFFSET_FRAG_HI: usize = 20;
/// IPv4 fragment offset bits 7..0.
pub const OFFSET_FRAG_LO: usize = 21;
/// IPv4 protocol.
pub const OFFSET_PROTOCOL: usize = 23;
/// Transport destination port, high byte.
pub const OFFSET_DEST_PORT_HI: usize = 36;
/// Transport destination port, low byte.
pub const OFFSET_DEST_PORT_LO: usize = 37;

/// Number of leading bytes that must pass before a decision can be made.
pub const HEADER_WINDOW: usize = OFFSET_DEST_PORT_LO + 1;

/// More-fragments flag inside the byte at [`OFFSET_FRAG_HI`].
pub const MORE_FRAGMENTS_BIT: u8 = 0b0010_0000;

/// Fragment offset bits inside the byte at [`OFFSET_FRAG_HI`].
pub const FRAG_OFFSET_HI_MASK: u8 = 0b0001_1111;

/// Mask of the 13-bit fragment offset.
pub const FRAG_OFFSET_MASK: u16 = 0x1FFF;
