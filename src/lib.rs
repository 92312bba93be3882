//! # uoe-router
//!
//! Packet classification and fragment-continuity routing for a UDP offload
//! engine.
//!
//! Ethernet frames arrive as a stream of transport chunks. Each frame is
//! duplicated onto two paths: the header path reads a fixed window of header
//! bytes and decides a [`Destination`]; the data path buffers the raw bytes
//! until that decision is ready. A combiner re-joins the two and emits every
//! frame, unmodified and in arrival order, tagged with its destination.
//!
//! ## Architecture
//!
//! - **Header path**: extractor latches EtherType, IPv4 protocol, fragment
//!   fields and destination port; the decision engine keeps all fragments of
//!   one datagram on the same destination
//! - **Data path**: byte-bounded buffer with backpressure; nothing is dropped
//! - **Combiner**: tags the first chunk of each frame with its decision
//!
//! Two drivers share these stages: [`Router`] steps them synchronously, and
//! [`Pipeline`] runs each as a Tokio task.
//!
//! ## Example
//!
//! ```
//! use uoe_router::protocol::{ip_proto, split_into_chunks, FrameBuilder, Ipv4Packet};
//! use uoe_router::{Destination, Router};
//!
//! let mut router = Router::builder().build().unwrap();
//! let packet = Ipv4Packet::new(ip_proto::UDP, 1).udp(5000, 9000, b"hello");
//! let frame = FrameBuilder::ipv4(&packet).build();
//!
//! for chunk in split_into_chunks(&frame, 8) {
//!     router.try_push(chunk).unwrap();
//! }
//! let first = router.next_output().unwrap();
//! assert_eq!(first.destination, Some(Destination::UdpOffload));
//! ```

pub mod backpressure;
pub mod classify;
pub mod config;
pub mod datapath;
pub mod error;
pub mod pipeline;
pub mod protocol;
pub mod router;
pub mod stats;

pub use config::RouterConfig;
pub use error::{Result, RouterError};
pub use pipeline::{Pipeline, PipelineInput, PipelineTasks};
pub use protocol::{Chunk, Destination, OutputChunk, TaggedFrame};
pub use router::{PushOutcome, Router, RouterBuilder};
pub use stats::{RouterStats, StatsSnapshot};
