//! Pipeline - staged async router with a slow consumer.
//!
//! The producer pushes frames as fast as it can; the consumer sleeps between
//! chunks. The byte budget holds the producer back, so memory stays bounded
//! by the configured buffer.
//!
//! ```text
//! RUST_LOG=uoe_router=debug cargo run --example pipeline
//! ```

use std::time::Duration;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uoe_router::protocol::{ip_proto, FrameAssembler, FrameBuilder, Ipv4Packet};
use uoe_router::{RouterBuilder, RouterConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).without_time())
        .try_init()
        .ok();

    let config = RouterConfig::from_json_str(
        r#"{ "buffer_capacity_bytes": 1024, "max_chunk_len": 128, "channel_capacity": 64 }"#,
    )?;
    let pipeline = RouterBuilder::from_config(config).spawn()?;
    let stats = pipeline.stats();
    let (input, mut output, tasks) = pipeline.into_parts();

    let producer = tokio::spawn(async move {
        for id in 0..200u16 {
            let port = if id % 3 == 0 { 53 } else { 9000 + id };
            let packet = Ipv4Packet::new(ip_proto::UDP, id).udp(40000, port, &[id as u8; 400]);
            input.send_frame(&FrameBuilder::ipv4(&packet).build(), 128).await?;
        }
        Ok::<_, uoe_router::RouterError>(())
    });

    let mut assembler = FrameAssembler::new();
    let mut frames = 0usize;
    while let Some(chunk) = output.recv().await {
        tokio::time::sleep(Duration::from_micros(50)).await;
        if assembler.push(chunk).is_some() {
            frames += 1;
            if frames % 50 == 0 {
                println!(
                    "{} frames delivered, {} backpressured sends",
                    frames,
                    stats.snapshot().backpressure_events
                );
            }
        }
    }

    producer.await??;
    let snapshot = tasks.join().await?;
    println!("{}", snapshot.to_json()?);
    Ok(())
}
