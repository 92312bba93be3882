//! Classify - route a mixed batch of frames through the sequential router.
//!
//! This example demonstrates:
//! - Building a router with the builder pattern
//! - Pushing frames as fixed-size transport chunks
//! - Reassembling tagged output and reading statistics
//!
//! ```text
//! RUST_LOG=uoe_router=debug cargo run --example classify
//! ```

use std::net::Ipv4Addr;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uoe_router::protocol::{ip_proto, split_into_chunks, FrameAssembler, FrameBuilder, Ipv4Packet};
use uoe_router::{PushOutcome, Router};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).without_time())
        .try_init()
        .ok();

    let mut router = Router::builder()
        .max_chunk_len(16)
        .log_decisions(true)
        .build()?;

    let frames = [
        (
            "ARP request",
            FrameBuilder::arp_request(
                [0x02, 0, 0, 0, 0, 0x10],
                Ipv4Addr::new(10, 0, 0, 16),
                Ipv4Addr::new(10, 0, 0, 1),
            )
            .build(),
        ),
        (
            "DNS query",
            FrameBuilder::ipv4(&Ipv4Packet::new(ip_proto::UDP, 1).udp(40000, 53, b"query")).build(),
        ),
        (
            "UDP stream",
            FrameBuilder::ipv4(&Ipv4Packet::new(ip_proto::UDP, 2).udp(40000, 5000, &[0u8; 64]))
                .build(),
        ),
        (
            "NetBIOS",
            FrameBuilder::ipv4(&Ipv4Packet::new(ip_proto::UDP, 3).udp(137, 137, b"nbns")).build(),
        ),
        (
            "HTTP",
            FrameBuilder::ipv4(&Ipv4Packet::new(ip_proto::TCP, 4).tcp(40000, 80, b"GET /")).build(),
        ),
        (
            "ping",
            FrameBuilder::ipv4(&Ipv4Packet::new(ip_proto::ICMP, 5).icmp_echo(1, 1, b"abcd"))
                .build(),
        ),
        ("802.3 raw", FrameBuilder::raw(&[0xAA; 46]).build()),
        ("IPv6", FrameBuilder::new(0x86DD).payload(vec![0u8; 40]).build()),
    ];

    let mut assembler = FrameAssembler::new();
    let mut tagged = Vec::new();
    for (_, frame) in &frames {
        for chunk in split_into_chunks(frame, 16) {
            let mut pending = chunk;
            while let PushOutcome::Backpressure(chunk) = router.try_push(pending)? {
                tagged.extend(router.drain().filter_map(|c| assembler.push(c)));
                pending = chunk;
            }
        }
    }
    tagged.extend(router.drain().filter_map(|c| assembler.push(c)));

    for ((name, _), frame) in frames.iter().zip(&tagged) {
        println!("{:<12} {:>4} bytes -> {}", name, frame.len(), frame.destination);
    }
    println!("{}", router.stats().snapshot().to_json()?);

    Ok(())
}
