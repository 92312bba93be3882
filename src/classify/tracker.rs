//! Single-slot tracker for the fragmented datagram in flight.

use crate::protocol::Destination;

/// The datagram currently being tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackedDatagram {
    /// IPv4 identification shared by all fragments.
    pub datagram_id: u16,
    /// Destination decided from the first fragment.
    pub destination: Destination,
}

/// Holds at most one fragmented IPv4 datagram.
///
/// Only the classification engine mutates it, one frame at a time.
#[derive(Debug, Default)]
pub struct FragmentTracker {
    active: Option<TrackedDatagram>,
}

impl FragmentTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// The tracked datagram, if any.
    #[inline]
    pub fn get(&self) -> Option<TrackedDatagram> {
        self.active
    }

    /// True while a datagram is tracked.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Destination of the tracked datagram when `datagram_id` matches.
    #[inline]
    pub fn lookup(&self, datagram_id: u16) -> Option<Destination> {
        self.active
            .filter(|tracked| tracked.datagram_id == datagram_id)
            .map(|tracked| tracked.destination)
    }

    /// Start tracking a datagram.
    ///
    /// Callers check [`is_active`](Self::is_active) first; a second datagram
    /// is never allowed to replace the first.
    pub fn track(&mut self, datagram_id: u16, destination: Destination) {
        debug_assert!(self.active.is_none());
        self.active = Some(TrackedDatagram {
            datagram_id,
            destination,
        });
    }

    /// Stop tracking, returning what was tracked.
    pub fn clear(&mut self) -> Option<TrackedDatagram> {
        self.active.take()
    }
}
