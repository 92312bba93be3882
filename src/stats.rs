//! Router statistics.
//!
//! Lock-free counters shared between the router stages and any observer.
//! [`RouterStats::snapshot`] gives a consistent-enough copy for reporting;
//! counters are monotonic and never reset while the router runs.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::classify::{Classified, Verdict};
use crate::error::Result;
use crate::protocol::{Chunk, Destination, OutputChunk};

/// Shared counters, updated with relaxed atomics.
#[derive(Debug, Default)]
pub struct RouterStats {
    frames_in: AtomicU64,
    bytes_in: AtomicU64,
    frames_out: AtomicU64,
    bytes_out: AtomicU64,
    per_destination: [AtomicU64; 5],
    fragmented_datagrams: AtomicU64,
    fragment_conflicts: AtomicU64,
    orphan_fragments: AtomicU64,
    truncated_frames: AtomicU64,
    backpressure_events: AtomicU64,
}

impl RouterStats {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a chunk accepted by the fan-out.
    pub fn record_input(&self, chunk: &Chunk) {
        self.bytes_in.fetch_add(chunk.len() as u64, Ordering::Relaxed);
        if chunk.last {
            self.frames_in.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Count one classification.
    pub fn record_decision(&self, classified: &Classified) {
        let decision = classified.decision;
        self.per_destination[decision.destination.index()].fetch_add(1, Ordering::Relaxed);

        match decision.verdict {
            Verdict::FirstFragment => {
                self.fragmented_datagrams.fetch_add(1, Ordering::Relaxed);
            }
            Verdict::FragmentConflict => {
                self.fragment_conflicts.fetch_add(1, Ordering::Relaxed);
            }
            Verdict::OrphanFragment => {
                self.orphan_fragments.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }

        if classified.fields.is_truncated() {
            self.truncated_frames.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Count a chunk handed downstream.
    pub fn record_output(&self, chunk: &OutputChunk) {
        self.bytes_out.fetch_add(chunk.data.len() as u64, Ordering::Relaxed);
        if chunk.last {
            self.frames_out.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Count a chunk refused because the data buffer was full.
    pub fn record_backpressure(&self) {
        self.backpressure_events.fetch_add(1, Ordering::Relaxed);
    }

    /// Frames classified as `destination`.
    pub fn frames_to(&self, destination: Destination) -> u64 {
        self.per_destination[destination.index()].load(Ordering::Relaxed)
    }

    /// New fragmented datagrams refused because one was already tracked.
    pub fn fragment_conflicts(&self) -> u64 {
        self.fragment_conflicts.load(Ordering::Relaxed)
    }

    /// Copy all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        StatsSnapshot {
            frames_in: load(&self.frames_in),
            bytes_in: load(&self.bytes_in),
            frames_out: load(&self.frames_out),
            bytes_out: load(&self.bytes_out),
            destinations: DestinationCounts {
                arp: self.frames_to(Destination::Arp),
                raw: self.frames_to(Destination::Raw),
                external: self.frames_to(Destination::External),
                udp_offload: self.frames_to(Destination::UdpOffload),
                trash: self.frames_to(Destination::Trash),
            },
            fragmented_datagrams: load(&self.fragmented_datagrams),
            fragment_conflicts: load(&self.fragment_conflicts),
            orphan_fragments: load(&self.orphan_fragments),
            truncated_frames: load(&self.truncated_frames),
            backpressure_events: load(&self.backpressure_events),
        }
    }
}

/// Per-destination frame counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DestinationCounts {
    pub arp: u64,
    pub raw: u64,
    pub external: u64,
    pub udp_offload: u64,
    pub trash: u64,
}

impl DestinationCounts {
    /// Count for one destination.
    pub fn get(&self, destination: Destination) -> u64 {
        match destination {
            Destination::Arp => self.arp,
            Destination::Raw => self.raw,
            Destination::External => self.external,
            Destination::UdpOffload => self.udp_offload,
            Destination::Trash => self.trash,
        }
    }

    /// Sum over all destinations.
    pub fn total(&self) -> u64 {
        Destination::ALL.iter().map(|d| self.get(*d)).sum()
    }
}

/// Point-in-time copy of [`RouterStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub frames_in: u64,
    pub bytes_in: u64,
    pub frames_out: u64,
    pub bytes_out: u64,
    pub destinations: DestinationCounts,
    pub fragmented_datagrams: u64,
    pub fragment_conflicts: u64,
    pub orphan_fragments: u64,
    pub truncated_frames: u64,
    pub backpressure_events: u64,
}

impl StatsSnapshot {
    /// Serialize as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
