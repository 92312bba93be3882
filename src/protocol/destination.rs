//! Downstream consumer selected for a frame.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Downstream consumer that receives a classified frame.
///
/// Exactly one value is produced per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    /// ARP handler.
    Arp,
    /// Legacy 802.3 (length-field) Ethernet consumer.
    Raw,
    /// External/software path.
    External,
    /// UDP offload path.
    UdpOffload,
    /// Discard sink.
    Trash,
}

impl Destination {
    /// All destinations, in a stable order.
    pub const ALL: [Destination; 5] = [
        Destination::Arp,
        Destination::Raw,
        Destination::External,
        Destination::UdpOffload,
        Destination::Trash,
    ];

    /// Stable index into [`Destination::ALL`].
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Destination::Arp => 0,
            Destination::Raw => 1,
            Destination::External => 2,
            Destination::UdpOffload => 3,
            Destination::Trash => 4,
        }
    }

    /// Short lowercase name, matching the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            Destination::Arp => "arp",
            Destination::Raw => "raw",
            Destination::External => "external",
            Destination::UdpOffload => "udp_offload",
            Destination::Trash => "trash",
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
