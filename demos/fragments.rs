//! Fragments - fragment continuity and the single-datagram tracker.
//!
//! Continuation fragments carry no transport header, so they follow the
//! destination chosen for their first fragment. A second fragmented datagram
//! arriving while one is tracked is sent to trash.
//!
//! ```text
//! RUST_LOG=uoe_router=debug cargo run --example fragments
//! ```

use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uoe_router::protocol::{ip_proto, split_into_chunks, FrameAssembler, FrameBuilder, Ipv4Packet};
use uoe_router::Router;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).without_time())
        .try_init()
        .ok();

    let mut router = Router::builder().max_chunk_len(64).build()?;

    let first = |id: u16, port: u16| {
        FrameBuilder::ipv4(
            &Ipv4Packet::new(ip_proto::UDP, id)
                .fragment(0, true)
                .udp(40000, port, &[0x11; 40]),
        )
        .build()
    };
    let next = |id: u16, offset: u16, more: bool| {
        FrameBuilder::ipv4(
            &Ipv4Packet::new(ip_proto::UDP, id)
                .fragment(offset, more)
                .payload(vec![0x22; 48]),
        )
        .build()
    };

    let sequence = [
        ("A first (port 7000)", first(0xA, 7000)),
        ("B first (port 53)", first(0xB, 53)),
        ("A middle", next(0xA, 6, true)),
        ("B last", next(0xB, 6, false)),
        ("A last", next(0xA, 12, false)),
        ("A stale", next(0xA, 18, false)),
    ];

    let mut assembler = FrameAssembler::new();
    for (name, frame) in &sequence {
        for chunk in split_into_chunks(frame, 64) {
            router.try_push(chunk)?;
        }
        loop {
            let next = router.drain().next();
            let Some(chunk) = next else {
                break;
            };
            let Some(tagged) = assembler.push(chunk) else {
                continue;
            };
            println!(
                "{:<20} -> {:<12} tracking: {:?}",
                name,
                tagged.destination,
                router.tracker().get().map(|t| t.datagram_id)
            );
        }
    }

    let stats = router.stats().snapshot();
    println!(
        "conflicts: {}, orphans: {}",
        stats.fragment_conflicts, stats.orphan_fragments
    );
    Ok(())
}
