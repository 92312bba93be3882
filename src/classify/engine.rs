//! Classification decision engine.
//!
//! Turns one [`HeaderFields`] record into one [`Destination`], consulting and
//! updating the [`FragmentTracker`]. Decision order:
//!
//! 1. ARP EtherType → `Arp`
//! 2. EtherType in the 802.3 length range → `Raw`
//! 3. Anything but IPv4 → `Trash`
//! 4. IPv4 first fragment / unfragmented → protocol and port table; a first
//!    fragment with more-fragments set starts tracking, unless another
//!    datagram is already tracked (then `Trash`, tracker untouched)
//! 5. IPv4 continuation → tracked destination if the id matches (the last
//!    fragment clears the tracker), otherwise `Trash`
//!
//! The engine is a total function: there is no error path.

use crate::protocol::{
    ip_proto, Destination, ETHERTYPE_ARP, ETHERTYPE_IPV4, ETHERTYPE_RAW_MAX, NBNS_PORTS,
    STANDARD_PORT_MAX,
};

use super::{FragmentTracker, HeaderFields};

/// Which rule produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// ARP EtherType.
    Arp,
    /// 802.3 length-field frame.
    Raw,
    /// Neither ARP, raw nor IPv4.
    UnknownEthertype,
    /// IPv4 datagram that is not fragmented.
    Unfragmented,
    /// First fragment; tracking started.
    FirstFragment,
    /// First fragment while another datagram is tracked.
    FragmentConflict,
    /// Middle fragment of the tracked datagram.
    Continuation,
    /// Final fragment of the tracked datagram; tracking stopped.
    LastFragment,
    /// Continuation fragment that matches nothing tracked.
    OrphanFragment,
}

/// Destination plus the rule that chose it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Chosen consumer.
    pub destination: Destination,
    /// Rule that fired.
    pub verdict: Verdict,
}

impl Decision {
    fn new(destination: Destination, verdict: Verdict) -> Self {
        Self {
            destination,
            verdict,
        }
    }
}

/// Route an IPv4 first fragment (or unfragmented datagram) by transport.
///
/// Every UDP port up to 1023 outside NBNS, DNS on 53 included, goes to
/// `External`; only higher ports are offloaded.
///
/// # Example
///
/// ```
/// use uoe_router::classify::classify_by_protocol_and_port;
/// use uoe_router::protocol::{ip_proto, Destination};
///
/// assert_eq!(classify_by_protocol_and_port(ip_proto::UDP, 5000), Destination::UdpOffload);
/// assert_eq!(classify_by_protocol_and_port(ip_proto::UDP, 53), Destination::External);
/// assert_eq!(classify_by_protocol_and_port(ip_proto::UDP, 138), Destination::Trash);
/// assert_eq!(classify_by_protocol_and_port(ip_proto::TCP, 22), Destination::External);
/// ```
pub fn classify_by_protocol_and_port(protocol: u8, port: u16) -> Destination {
    match protocol {
        ip_proto::UDP if NBNS_PORTS.contains(&port) => Destination::Trash,
        ip_proto::UDP if port <= STANDARD_PORT_MAX => Destination::External,
        ip_proto::UDP => Destination::UdpOffload,
        ip_proto::TCP if port <= STANDARD_PORT_MAX => Destination::External,
        ip_proto::TCP => Destination::Trash,
        ip_proto::ICMP | ip_proto::IGMP => Destination::External,
        _ => Destination::Trash,
    }
}

/// Stateful classifier; owns the fragment tracker.
#[derive(Debug, Default)]
pub struct ClassificationEngine {
    tracker: FragmentTracker,
}

impl ClassificationEngine {
    /// Create an engine with no datagram tracked.
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify one frame.
    pub fn classify(&mut self, fields: &HeaderFields) -> Destination {
        self.decide(fields).destination
    }

    /// Classify one frame and report which rule fired.
    pub fn decide(&mut self, fields: &HeaderFields) -> Decision {
        if fields.ethertype == ETHERTYPE_ARP {
            return Decision::new(Destination::Arp, Verdict::Arp);
        }
        if fields.ethertype <= ETHERTYPE_RAW_MAX {
            return Decision::new(Destination::Raw, Verdict::Raw);
        }
        if fields.ethertype != ETHERTYPE_IPV4 {
            return Decision::new(Destination::Trash, Verdict::UnknownEthertype);
        }

        if fields.frag_offset == 0 {
            self.decide_first(fields)
        } else {
            self.decide_continuation(fields)
        }
    }

    fn decide_first(&mut self, fields: &HeaderFields) -> Decision {
        if fields.more_fragments {
            if let Some(tracked) = self.tracker.get() {
                tracing::warn!(
                    "Fragmented datagram {:#06x} dropped while {:#06x} is in flight",
                    fields.datagram_id,
                    tracked.datagram_id
                );
                return Decision::new(Destination::Trash, Verdict::FragmentConflict);
            }
        }

        let base = classify_by_protocol_and_port(fields.ip_protocol, fields.dest_port);
        if !fields.more_fragments {
            return Decision::new(base, Verdict::Unfragmented);
        }

        tracing::debug!(
            "Tracking fragmented datagram {:#06x} -> {}",
            fields.datagram_id,
            base
        );
        self.tracker.track(fields.datagram_id, base);
        Decision::new(base, Verdict::FirstFragment)
    }

    fn decide_continuation(&mut self, fields: &HeaderFields) -> Decision {
        let Some(destination) = self.tracker.lookup(fields.datagram_id) else {
            return Decision::new(Destination::Trash, Verdict::OrphanFragment);
        };

        if fields.more_fragments {
            return Decision::new(destination, Verdict::Continuation);
        }

        self.tracker.clear();
        tracing::debug!("Fragmented datagram {:#06x} complete", fields.datagram_id);
        Decision::new(destination, Verdict::LastFragment)
    }

    /// The fragment tracker, for inspection.
    pub fn tracker(&self) -> &FragmentTracker {
        &self.tracker
    }

    /// Forget any tracked datagram.
    pub fn reset(&mut self) {
        self.tracker.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ipv4(protocol: u8, port: u16) -> HeaderFields {
        HeaderFields {
            ethertype: ETHERTYPE_IPV4,
            ip_protocol: protocol,
            dest_port: port,
            observed: crate::protocol::HEADER_WINDOW,
            ..HeaderFields::default()
        }
    }

    fn fragment(id: u16, offset: u16, more: bool, protocol: u8, port: u16) -> HeaderFields {
        HeaderFields {
            datagram_id: id,
            frag_offset: offset,
            more_fragments: more,
            ..ipv4(protocol, port)
        }
    }

    #[test]
    fn test_arp_ignores_ipv4_fields() {
        let mut engine = ClassificationEngine::new();
        let fields = HeaderFields {
            ethertype: ETHERTYPE_ARP,
            ..fragment(5, 100, true, ip_proto::UDP, 5000)
        };
        assert_eq!(engine.classify(&fields), Destination::Arp);
        assert!(!engine.tracker().is_active());
    }

    #[test]
    fn test_raw_ethertype_range() {
        let mut engine = ClassificationEngine::new();
        for ethertype in [0x0000, 0x0111, 0x05DC] {
            let fields = HeaderFields {
                ethertype,
                ..HeaderFields::default()
            };
            assert_eq!(engine.classify(&fields), Destination::Raw, "{:#06x}", ethertype);
        }

        let fields = HeaderFields {
            ethertype: 0x05DD,
            ..HeaderFields::default()
        };
        assert_eq!(engine.classify(&fields), Destination::Trash);
    }

    #[test]
    fn test_unknown_ethertype_is_trash() {
        let mut engine = ClassificationEngine::new();
        for ethertype in [0x86DD, 0x8100, 0xFFFF, 0x1234] {
            let fields = HeaderFields {
                ethertype,
                ..ipv4(ip_proto::UDP, 5000)
            };
            let decision = engine.decide(&fields);
            assert_eq!(decision.destination, Destination::Trash);
            assert_eq!(decision.verdict, Verdict::UnknownEthertype);
        }
    }

    #[test]
    fn test_protocol_port_table() {
        let cases = [
            (ip_proto::UDP, 53, Destination::External),
            (ip_proto::UDP, 136, Destination::External),
            (ip_proto::UDP, 137, Destination::Trash),
            (ip_proto::UDP, 138, Destination::Trash),
            (ip_proto::UDP, 139, Destination::Trash),
            (ip_proto::UDP, 140, Destination::External),
            (ip_proto::UDP, 1023, Destination::External),
            (ip_proto::UDP, 1024, Destination::UdpOffload),
            (ip_proto::UDP, 65535, Destination::UdpOffload),
            (ip_proto::TCP, 80, Destination::External),
            (ip_proto::TCP, 1023, Destination::External),
            (ip_proto::TCP, 1024, Destination::Trash),
            (ip_proto::TCP, 9000, Destination::Trash),
            (ip_proto::ICMP, 0, Destination::External),
            (ip_proto::IGMP, 4242, Destination::External),
            (0x29, 80, Destination::Trash),
            (0, 0, Destination::Trash),
        ];

        for (protocol, port, expected) in cases {
            assert_eq!(
                classify_by_protocol_and_port(protocol, port),
                expected,
                "protocol {} port {}",
                protocol,
                port
            );
        }
    }

    #[test]
    fn test_unfragmented_does_not_track() {
        let mut engine = ClassificationEngine::new();
        let decision = engine.decide(&ipv4(ip_proto::TCP, 80));
        assert_eq!(decision.destination, Destination::External);
        assert_eq!(decision.verdict, Verdict::Unfragmented);
        assert!(!engine.tracker().is_active());
    }

    #[test]
    fn test_fragment_continuity() {
        let mut engine = ClassificationEngine::new();

        let first = engine.decide(&fragment(0x10, 0, true, ip_proto::UDP, 53));
        assert_eq!(first.destination, Destination::External);
        assert_eq!(first.verdict, Verdict::FirstFragment);

        // Continuations carry garbage where the port used to be.
        let middle = engine.decide(&fragment(0x10, 185, true, 0, 0xABCD));
        assert_eq!(middle.destination, Destination::External);
        assert_eq!(middle.verdict, Verdict::Continuation);

        let last = engine.decide(&fragment(0x10, 370, false, 0, 0));
        assert_eq!(last.destination, Destination::External);
        assert_eq!(last.verdict, Verdict::LastFragment);
        assert!(!engine.tracker().is_active());

        let stale = engine.decide(&fragment(0x10, 555, false, 0, 0));
        assert_eq!(stale.destination, Destination::Trash);
        assert_eq!(stale.verdict, Verdict::OrphanFragment);
    }

    #[test]
    fn test_concurrent_fragmented_datagrams() {
        let mut engine = ClassificationEngine::new();

        assert_eq!(
            engine.classify(&fragment(0xA, 0, true, ip_proto::TCP, 443)),
            Destination::External
        );

        let conflict = engine.decide(&fragment(0xB, 0, true, ip_proto::UDP, 5000));
        assert_eq!(conflict.destination, Destination::Trash);
        assert_eq!(conflict.verdict, Verdict::FragmentConflict);

        let tracked = engine.tracker().get().unwrap();
        assert_eq!(tracked.datagram_id, 0xA);
        assert_eq!(tracked.destination, Destination::External);

        // B's continuations are orphans; A continues normally.
        assert_eq!(
            engine.classify(&fragment(0xB, 100, false, 0, 0)),
            Destination::Trash
        );
        assert_eq!(
            engine.classify(&fragment(0xA, 100, false, 0, 0)),
            Destination::External
        );
        assert!(!engine.tracker().is_active());
    }

    #[test]
    fn test_trash_first_fragment_still_tracked() {
        let mut engine = ClassificationEngine::new();

        assert_eq!(
            engine.classify(&fragment(3, 0, true, ip_proto::TCP, 9000)),
            Destination::Trash
        );
        assert!(engine.tracker().is_active());
        assert_eq!(
            engine.classify(&fragment(3, 10, false, 0, 0)),
            Destination::Trash
        );
        assert!(!engine.tracker().is_active());
    }

    #[test]
    fn test_unfragmented_passes_while_tracking() {
        let mut engine = ClassificationEngine::new();
        engine.classify(&fragment(1, 0, true, ip_proto::UDP, 2000));

        assert_eq!(
            engine.classify(&ipv4(ip_proto::UDP, 53)),
            Destination::External
        );
        assert_eq!(engine.tracker().get().unwrap().datagram_id, 1);
    }

    #[test]
    fn test_orphan_without_tracker() {
        let mut engine = ClassificationEngine::new();
        let decision = engine.decide(&fragment(9, 8, true, ip_proto::UDP, 5000));
        assert_eq!(decision.destination, Destination::Trash);
        assert_eq!(decision.verdict, Verdict::OrphanFragment);
        assert!(!engine.tracker().is_active());
    }

    #[test]
    fn test_reset_clears_tracker() {
        let mut engine = ClassificationEngine::new();
        engine.classify(&fragment(1, 0, true, ip_proto::UDP, 2000));
        engine.reset();
        assert!(!engine.tracker().is_active());
        assert_eq!(
            engine.classify(&fragment(1, 10, false, 0, 0)),
            Destination::Trash
        );
    }
}
