//! Builders for Ethernet, ARP, IPv4 and transport frames.
//!
//! These produce well-formed wire bytes for demos, replay tools and tests.
//! The router itself never builds frames.
//!
//! # Example
//!
//! ```
//! use uoe_router::protocol::{ip_proto, split_into_chunks, FrameBuilder, Ipv4Packet};
//!
//! let packet = Ipv4Packet::new(ip_proto::UDP, 0x1234).udp(5000, 53, b"query");
//! let frame = FrameBuilder::ipv4(&packet).build();
//! assert_eq!(&frame[12..14], &[0x08, 0x00]);
//!
//! let chunks = split_into_chunks(&frame, 16);
//! assert!(chunks.last().unwrap().last);
//! ```

use std::net::Ipv4Addr;

use bytes::{BufMut, Bytes, BytesMut};

use super::constants::{ip_proto, ETHERTYPE_ARP, ETHERTYPE_IPV4, FRAG_OFFSET_MASK};
use super::Chunk;

/// Ethernet header length.
pub const ETHERNET_HEADER_LEN: usize = 14;

/// IPv4 header length without options.
pub const IPV4_HEADER_LEN: usize = 20;

const IPV4_VERSION_IHL: u8 = 0x45;
const IPV4_DEFAULT_TTL: u8 = 64;
const IPV4_FLAG_MF: u16 = 0x2000;

/// Broadcast MAC address.
pub const BROADCAST_MAC: [u8; 6] = [0xFF; 6];

/// Ethernet frame builder.
#[derive(Debug, Clone)]
pub struct FrameBuilder {
    dst_mac: [u8; 6],
    src_mac: [u8; 6],
    ethertype: u16,
    payload: Bytes,
}

impl FrameBuilder {
    /// Frame with the given EtherType and an empty payload.
    pub fn new(ethertype: u16) -> Self {
        Self {
            dst_mac: BROADCAST_MAC,
            src_mac: [0x02, 0x00, 0x00, 0x00, 0x00, 0x01],
            ethertype,
            payload: Bytes::new(),
        }
    }

    /// IPv4 frame carrying `packet`.
    pub fn ipv4(packet: &Ipv4Packet) -> Self {
        Self::new(ETHERTYPE_IPV4).payload(packet.to_bytes())
    }

    /// ARP request asking who has `target_ip`.
    pub fn arp_request(sender_mac: [u8; 6], sender_ip: Ipv4Addr, target_ip: Ipv4Addr) -> Self {
        let mut arp = BytesMut::with_capacity(28);
        arp.put_u16(1); // hardware type: Ethernet
        arp.put_u16(ETHERTYPE_IPV4);
        arp.put_u8(6);
        arp.put_u8(4);
        arp.put_u16(1); // opcode: request
        arp.put_slice(&sender_mac);
        arp.put_slice(&sender_ip.octets());
        arp.put_slice(&[0u8; 6]);
        arp.put_slice(&target_ip.octets());

        Self::new(ETHERTYPE_ARP)
            .src_mac(sender_mac)
            .payload(arp.freeze())
    }

    /// Legacy 802.3 frame: the EtherType field carries the payload length.
    ///
    /// The length field saturates at `u16::MAX`.
    pub fn raw(payload: &[u8]) -> Self {
        Self::new(length_field(payload.len())).payload(Bytes::copy_from_slice(payload))
    }

    /// Set the destination MAC.
    pub fn dst_mac(mut self, mac: [u8; 6]) -> Self {
        self.dst_mac = mac;
        self
    }

    /// Set the source MAC.
    pub fn src_mac(mut self, mac: [u8; 6]) -> Self {
        self.src_mac = mac;
        self
    }

    /// Replace the payload.
    pub fn payload(mut self, payload: impl Into<Bytes>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Encode the frame (no FCS).
    pub fn build(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(ETHERNET_HEADER_LEN + self.payload.len());
        buf.put_slice(&self.dst_mac);
        buf.put_slice(&self.src_mac);
        buf.put_u16(self.ethertype);
        buf.put_slice(&self.payload);
        buf.freeze()
    }
}

/// IPv4 packet without options.
#[derive(Debug, Clone)]
pub struct Ipv4Packet {
    /// Protocol number (see [`ip_proto`]).
    pub protocol: u8,
    /// Identification field.
    pub id: u16,
    /// More-fragments flag.
    pub more_fragments: bool,
    /// Fragment offset in 8-byte units (13 bits).
    pub fragment_offset: u16,
    /// Time to live.
    pub ttl: u8,
    /// Source address.
    pub src: Ipv4Addr,
    /// Destination address.
    pub dst: Ipv4Addr,
    /// Transport header and data.
    pub payload: Bytes,
}

impl Ipv4Packet {
    /// Unfragmented packet with an empty payload.
    pub fn new(protocol: u8, id: u16) -> Self {
        Self {
            protocol,
            id,
            more_fragments: false,
            fragment_offset: 0,
            ttl: IPV4_DEFAULT_TTL,
            src: Ipv4Addr::new(192, 168, 1, 10),
            dst: Ipv4Addr::new(192, 168, 1, 1),
            payload: Bytes::new(),
        }
    }

    /// Set the fragmentation fields.
    pub fn fragment(mut self, fragment_offset: u16, more_fragments: bool) -> Self {
        self.fragment_offset = fragment_offset & FRAG_OFFSET_MASK;
        self.more_fragments = more_fragments;
        self
    }

    /// Set source and destination addresses.
    pub fn addrs(mut self, src: Ipv4Addr, dst: Ipv4Addr) -> Self {
        self.src = src;
        self.dst = dst;
        self
    }

    /// Replace the payload with raw bytes (continuation fragments).
    pub fn payload(mut self, payload: impl Into<Bytes>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Payload becomes a UDP datagram (checksum left at zero).
    ///
    /// The length field saturates at `u16::MAX`.
    pub fn udp(self, src_port: u16, dst_port: u16, data: &[u8]) -> Self {
        let mut buf = BytesMut::with_capacity(8 + data.len());
        buf.put_u16(src_port);
        buf.put_u16(dst_port);
        buf.put_u16(length_field(8 + data.len()));
        buf.put_u16(0);
        buf.put_slice(data);
        self.payload(buf.freeze())
    }

    /// Payload becomes a TCP segment with a bare 20-byte header.
    pub fn tcp(self, src_port: u16, dst_port: u16, data: &[u8]) -> Self {
        let mut buf = BytesMut::with_capacity(20 + data.len());
        buf.put_u16(src_port);
        buf.put_u16(dst_port);
        buf.put_u32(0); // sequence
        buf.put_u32(0); // acknowledgment
        buf.put_u8(0x50); // data offset: 5 words
        buf.put_u8(0x02); // SYN
        buf.put_u16(0xFFFF);
        buf.put_u16(0);
        buf.put_u16(0);
        buf.put_slice(data);
        self.payload(buf.freeze())
    }

    /// Payload becomes an ICMP echo request.
    pub fn icmp_echo(self, ident: u16, seq: u16, data: &[u8]) -> Self {
        let mut buf = BytesMut::with_capacity(8 + data.len());
        buf.put_u8(8);
        buf.put_u8(0);
        buf.put_u16(0);
        buf.put_u16(ident);
        buf.put_u16(seq);
        buf.put_slice(data);
        let checksum = internet_checksum(&buf);
        buf[2..4].copy_from_slice(&checksum.to_be_bytes());
        self.payload(buf.freeze())
    }

    /// Encode header and payload, computing the header checksum.
    ///
    /// The total-length field saturates at `u16::MAX`.
    pub fn to_bytes(&self) -> Bytes {
        let total_len = length_field(IPV4_HEADER_LEN + self.payload.len());
        let mut frag = self.fragment_offset & FRAG_OFFSET_MASK;
        if self.more_fragments {
            frag |= IPV4_FLAG_MF;
        }

        let mut buf = BytesMut::with_capacity(IPV4_HEADER_LEN + self.payload.len());
        buf.put_u8(IPV4_VERSION_IHL);
        buf.put_u8(0);
        buf.put_u16(total_len);
        buf.put_u16(self.id);
        buf.put_u16(frag);
        buf.put_u8(self.ttl);
        buf.put_u8(self.protocol);
        buf.put_u16(0);
        buf.put_slice(&self.src.octets());
        buf.put_slice(&self.dst.octets());

        let checksum = internet_checksum(&buf[..IPV4_HEADER_LEN]);
        buf[10..12].copy_from_slice(&checksum.to_be_bytes());

        buf.put_slice(&self.payload);
        buf.freeze()
    }
}

impl Default for Ipv4Packet {
    fn default() -> Self {
        Self::new(ip_proto::UDP, 0)
    }
}

/// RFC 1071 ones' complement checksum.
pub fn internet_checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;
    for pair in data.chunks(2) {
        let word = match pair {
            [hi, lo] => u16::from_be_bytes([*hi, *lo]),
            [hi] => u16::from_be_bytes([*hi, 0]),
            _ => 0,
        };
        sum += u32::from(word);
    }
    while sum >> 16 != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    !(sum as u16)
}

/// A 16-bit length field for `len` bytes.
#[inline]
fn length_field(len: usize) -> u16 {
    u16::try_from(len).unwrap_or(u16::MAX)
}

/// Split a frame into transport chunks of at most `size` bytes.
///
/// The final chunk carries `last`. An empty frame yields one empty final
/// chunk; `size == 0` yields the whole frame as a single chunk.
pub fn split_into_chunks(frame: &Bytes, size: usize) -> Vec<Chunk> {
    if frame.is_empty() || size == 0 {
        return vec![Chunk::last(frame.clone())];
    }

    let mut chunks = Vec::with_capacity(frame.len().div_ceil(size));
    let mut start = 0;
    while start < frame.len() {
        let end = (start + size).min(frame.len());
        chunks.push(Chunk::new(frame.slice(start..end), end == frame.len()));
        start = end;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::constants::*;

    #[test]
    fn test_udp_frame_layout() {
        let packet = Ipv4Packet::new(ip_proto::UDP, 0xBEEF).udp(4000, 53, b"abc");
        let frame = FrameBuilder::ipv4(&packet).build();

        assert_eq!(frame.len(), ETHERNET_HEADER_LEN + IPV4_HEADER_LEN + 8 + 3);
        assert_eq!(
            u16::from_be_bytes([frame[OFFSET_ETHERTYPE_HI], frame[OFFSET_ETHERTYPE_LO]]),
            ETHERTYPE_IPV4
        );
        assert_eq!(
            u16::from_be_bytes([frame[OFFSET_DATAGRAM_ID_HI], frame[OFFSET_DATAGRAM_ID_LO]]),
            0xBEEF
        );
        assert_eq!(frame[OFFSET_PROTOCOL], ip_proto::UDP);
        assert_eq!(
            u16::from_be_bytes([frame[OFFSET_DEST_PORT_HI], frame[OFFSET_DEST_PORT_LO]]),
            53
        );
    }

    #[test]
    fn test_tcp_dest_port_lands_on_same_offset() {
        let packet = Ipv4Packet::new(ip_proto::TCP, 1).tcp(40000, 80, b"");
        let frame = FrameBuilder::ipv4(&packet).build();
        assert_eq!(
            u16::from_be_bytes([frame[OFFSET_DEST_PORT_HI], frame[OFFSET_DEST_PORT_LO]]),
            80
        );
    }

    #[test]
    fn test_fragment_fields_encoding() {
        let packet = Ipv4Packet::new(ip_proto::UDP, 7)
            .fragment(0x1ABC, true)
            .payload(vec![0u8; 16]);
        let frame = FrameBuilder::ipv4(&packet).build();

        assert_eq!(frame[OFFSET_FRAG_HI] & MORE_FRAGMENTS_BIT, MORE_FRAGMENTS_BIT);
        let offset = (u16::from(frame[OFFSET_FRAG_HI] & FRAG_OFFSET_HI_MASK) << 8)
            | u16::from(frame[OFFSET_FRAG_LO]);
        assert_eq!(offset, 0x1ABC);
    }

    #[test]
    fn test_ipv4_header_checksum_verifies() {
        let packet = Ipv4Packet::new(ip_proto::ICMP, 99).icmp_echo(1, 1, b"ping");
        let bytes = packet.to_bytes();
        // Checksumming a header that includes its own checksum yields zero.
        assert_eq!(internet_checksum(&bytes[..IPV4_HEADER_LEN]), 0);
    }

    #[test]
    fn test_arp_request_layout() {
        let frame = FrameBuilder::arp_request(
            [0x02, 0, 0, 0, 0, 0x42],
            Ipv4Addr::new(10, 0, 0, 1),
            Ipv4Addr::new(10, 0, 0, 2),
        )
        .build();
        assert_eq!(frame.len(), ETHERNET_HEADER_LEN + 28);
        assert_eq!(&frame[12..14], &ETHERTYPE_ARP.to_be_bytes());
        assert_eq!(&frame[0..6], &BROADCAST_MAC);
    }

    #[test]
    fn test_raw_frame_carries_length() {
        let frame = FrameBuilder::raw(&[0xAA; 30]).build();
        assert_eq!(u16::from_be_bytes([frame[12], frame[13]]), 30);
    }

    #[test]
    fn test_split_into_chunks() {
        let frame = Bytes::from_static(b"0123456789");
        let chunks = split_into_chunks(&frame, 4);

        assert_eq!(chunks.len(), 3);
        assert_eq!(&chunks[0].data[..], b"0123");
        assert_eq!(&chunks[2].data[..], b"89");
        assert!(!chunks[0].last);
        assert!(!chunks[1].last);
        assert!(chunks[2].last);
    }

    #[test]
    fn test_split_empty_frame() {
        let chunks = split_into_chunks(&Bytes::new(), 8);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].last);
        assert!(chunks[0].is_empty());
    }

    #[test]
    fn test_oversized_lengths_saturate() {
        let data = vec![0u8; 70_000];

        let raw = FrameBuilder::raw(&data).build();
        assert_eq!(&raw[12..14], &[0xFF, 0xFF]);
        assert_eq!(raw.len(), ETHERNET_HEADER_LEN + data.len());

        let frame = FrameBuilder::ipv4(&Ipv4Packet::new(ip_proto::UDP, 1).udp(1, 2, &data)).build();
        let ip = ETHERNET_HEADER_LEN;
        let udp = ip + IPV4_HEADER_LEN;
        assert_eq!(&frame[ip + 2..ip + 4], &[0xFF, 0xFF]);
        assert_eq!(&frame[udp + 4..udp + 6], &[0xFF, 0xFF]);
        assert_eq!(frame.len(), udp + 8 + data.len());
    }
}
